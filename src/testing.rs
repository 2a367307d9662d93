//! In-memory stand-ins for the store, provider and notifier seams.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};

use uuid::Uuid;

use crate::client::WeatherProvider;
use crate::domain::{Frequency, SubscriptionToken};
use crate::error::{StoreError, StoreResult, WeatherError};
use crate::model::{CurrentConditions, NewSubscription, Subscription, WeatherSnapshot};
use crate::repo::{SubscriptionStore, WeatherStore};
use crate::service::Notifier;

pub fn new_subscription(email: &str, city: &str, frequency: Frequency) -> Subscription {
    Subscription::new(NewSubscription {
        email: email.parse().expect("Invalid test email"),
        city: city.parse().expect("Invalid test city"),
        frequency,
    })
}

pub fn conditions(temperature: f64) -> CurrentConditions {
    CurrentConditions {
        temperature,
        humidity: 55,
        description: "Overcast".into(),
        observed_at: Utc::now(),
    }
}

#[derive(Debug)]
enum PendingWrite {
    Insert(Subscription),
    Update(Subscription),
    Delete(Uuid),
}

#[derive(Debug, Default)]
struct SubscriptionState {
    rows: Vec<Subscription>,
    pending: Vec<PendingWrite>,
    flushes: usize,
    fail_flushes: bool,
}

/// Subscription store with the same staging and uniqueness rules as the Postgres one.
/// Clones share state, so a test can keep a handle while a service owns another.
#[derive(Debug, Clone, Default)]
pub struct MemorySubscriptionStore {
    state: Arc<Mutex<SubscriptionState>>,
}

impl MemorySubscriptionStore {
    pub fn with_rows(rows: Vec<Subscription>) -> Self {
        let store = Self::default();
        store.state.lock().unwrap().rows = rows;
        store
    }

    pub fn rows(&self) -> Vec<Subscription> {
        self.state.lock().unwrap().rows.clone()
    }

    pub fn flushes(&self) -> usize {
        self.state.lock().unwrap().flushes
    }

    pub fn fail_flushes(&self) {
        self.state.lock().unwrap().fail_flushes = true;
    }

    /// Insert directly, bypassing staging, to simulate a concurrent writer
    pub fn insert_concurrently(&self, subscription: Subscription) {
        self.state.lock().unwrap().rows.push(subscription);
    }

    /// Delete directly, bypassing staging, to simulate a concurrent unsubscribe
    pub fn delete_concurrently(&self, id: Uuid) {
        self.state.lock().unwrap().rows.retain(|s| s.id != id);
    }
}

#[async_trait::async_trait]
impl SubscriptionStore for MemorySubscriptionStore {
    async fn find_by_identity(
        &self,
        email: &str,
        city: &str,
    ) -> StoreResult<Option<Subscription>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .rows
            .iter()
            .find(|s| s.email == email && s.city == city)
            .cloned())
    }

    async fn find_by_token(&self, token: &SubscriptionToken) -> StoreResult<Option<Subscription>> {
        let state = self.state.lock().unwrap();
        Ok(state.rows.iter().find(|s| &s.token == token).cloned())
    }

    async fn find_due(&self, force_all: bool) -> StoreResult<Vec<Subscription>> {
        let now = Utc::now();
        let state = self.state.lock().unwrap();
        Ok(state
            .rows
            .iter()
            .filter(|s| s.confirmed && (force_all || s.is_due(now)))
            .cloned()
            .collect())
    }

    fn add(&self, subscription: &Subscription) {
        let mut state = self.state.lock().unwrap();
        state.pending.push(PendingWrite::Insert(subscription.clone()));
    }

    fn save(&self, subscription: &Subscription) {
        let mut state = self.state.lock().unwrap();
        state.pending.push(PendingWrite::Update(subscription.clone()));
    }

    fn delete(&self, subscription: &Subscription) {
        let mut state = self.state.lock().unwrap();
        state.pending.push(PendingWrite::Delete(subscription.id));
    }

    async fn flush(&self) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        state.flushes += 1;
        let pending = std::mem::take(&mut state.pending);
        if state.fail_flushes {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }

        let mut rows = state.rows.clone();
        for write in pending {
            match write {
                PendingWrite::Insert(subscription) => {
                    if rows.iter().any(|s| {
                        s.id == subscription.id
                            || (s.email == subscription.email && s.city == subscription.city)
                            || s.token == subscription.token
                    }) {
                        return Err(StoreError::UniqueViolation(
                            "duplicate key value violates unique constraint \"subscription_unique\""
                                .into(),
                        ));
                    }
                    rows.push(subscription);
                }
                PendingWrite::Update(subscription) => {
                    if let Some(existing) = rows.iter_mut().find(|s| s.id == subscription.id) {
                        *existing = subscription;
                    }
                }
                PendingWrite::Delete(id) => rows.retain(|s| s.id != id),
            }
        }
        state.rows = rows;
        Ok(())
    }
}

/// Store whose queries fail, standing in for an unavailable database
#[derive(Debug, Default)]
pub struct UnavailableSubscriptionStore;

#[async_trait::async_trait]
impl SubscriptionStore for UnavailableSubscriptionStore {
    async fn find_by_identity(&self, _: &str, _: &str) -> StoreResult<Option<Subscription>> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn find_by_token(&self, _: &SubscriptionToken) -> StoreResult<Option<Subscription>> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn find_due(&self, _: bool) -> StoreResult<Vec<Subscription>> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }

    fn add(&self, _: &Subscription) {}

    fn save(&self, _: &Subscription) {}

    fn delete(&self, _: &Subscription) {}

    async fn flush(&self) -> StoreResult<()> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryWeatherStore {
    snapshots: Arc<Mutex<Vec<WeatherSnapshot>>>,
    lookups: Arc<AtomicUsize>,
}

impl MemoryWeatherStore {
    pub fn with_snapshots(snapshots: Vec<WeatherSnapshot>) -> Self {
        Self {
            snapshots: Arc::new(Mutex::new(snapshots)),
            ..Self::default()
        }
    }

    pub fn snapshots(&self) -> Vec<WeatherSnapshot> {
        self.snapshots.lock().unwrap().clone()
    }

    /// Number of `find_recent` queries served
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl WeatherStore for MemoryWeatherStore {
    async fn find_recent(
        &self,
        city: &str,
        within: Duration,
    ) -> StoreResult<Option<WeatherSnapshot>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let observed_after = Utc::now() - within;
        let snapshots = self.snapshots.lock().unwrap();
        Ok(snapshots
            .iter()
            .filter(|s| s.city == city && s.forecast_time > observed_after)
            .max_by_key(|s| s.forecast_time)
            .cloned())
    }

    async fn save(&self, snapshot: &WeatherSnapshot) -> StoreResult<()> {
        self.snapshots.lock().unwrap().push(snapshot.clone());
        Ok(())
    }
}

/// Provider answering from a fixed table of cities; any other city is unknown
#[derive(Debug, Default)]
pub struct StubWeatherProvider {
    cities: HashMap<String, CurrentConditions>,
    calls: AtomicUsize,
}

impl StubWeatherProvider {
    pub fn with_city(mut self, city: &str, conditions: CurrentConditions) -> Self {
        self.cities.insert(city.to_lowercase(), conditions);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl WeatherProvider for StubWeatherProvider {
    async fn fetch_current(&self, city: &str) -> Result<CurrentConditions, WeatherError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.cities
            .get(&city.to_lowercase())
            .cloned()
            .ok_or_else(|| WeatherError::Provider("No matching location found.".into()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Confirmation(String),
    Welcome(String),
    Update(String, f64),
    Goodbye(String, String),
}

/// Notifier that records what it was asked to send
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Sent>>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn send_confirmation(&self, subscription: &Subscription) {
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Confirmation(subscription.email.clone()));
    }

    async fn send_welcome(&self, subscription: &Subscription) {
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Welcome(subscription.email.clone()));
    }

    async fn send_update(&self, subscription: &Subscription, weather: &WeatherSnapshot) {
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Update(subscription.email.clone(), weather.temperature));
    }

    async fn send_goodbye(&self, email: &str, city: &str) {
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Goodbye(email.to_string(), city.to_string()));
    }
}

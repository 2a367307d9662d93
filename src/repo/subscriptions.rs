use std::sync::{Mutex, PoisonError};

use uuid::Uuid;

use chrono::{DateTime, Utc};

use sqlx::PgPool;

use crate::domain::{Frequency, SubscriptionToken};
use crate::error::{StoreError, StoreResult};
use crate::model::Subscription;

use super::SubscriptionStore;

const SUBSCRIPTION_COLUMNS: &str = "id, email, city, frequency, confirmed, token, last_sent_at, created_at, updated_at";

/// Write staged by `add`/`save`/`delete`, applied on `flush`
#[derive(Debug)]
enum PendingWrite {
    Insert(Subscription),
    Update(Subscription),
    Delete(Uuid),
}

/// Postgres Subscription store.
///
/// Acts as a unit of work: build one per request or dispatch run so that staged
/// writes from unrelated operations never share a commit.
#[derive(Debug)]
pub struct PgSubscriptionStore {
    pool: PgPool,
    pending: Mutex<Vec<PendingWrite>>,
}

impl PgSubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            pending: Mutex::new(Vec::new()),
        }
    }

    fn stage(&self, write: PendingWrite) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(write);
    }

    fn take_pending(&self) -> Vec<PendingWrite> {
        std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

#[async_trait::async_trait]
impl SubscriptionStore for PgSubscriptionStore {
    #[tracing::instrument(name = "Fetch subscription by identity", skip(self))]
    async fn find_by_identity(
        &self,
        email: &str,
        city: &str,
    ) -> StoreResult<Option<Subscription>> {
        let query =
            format!("select {SUBSCRIPTION_COLUMNS} from subscriptions where email=$1 and city=$2");
        let row = sqlx::query_as::<_, SubscriptionRow>(&query)
            .bind(email)
            .bind(city)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Subscription::try_from).transpose()
    }

    #[tracing::instrument(name = "Fetch subscription by token", skip(self, token))]
    async fn find_by_token(&self, token: &SubscriptionToken) -> StoreResult<Option<Subscription>> {
        let query = format!("select {SUBSCRIPTION_COLUMNS} from subscriptions where token=$1");
        let row = sqlx::query_as::<_, SubscriptionRow>(&query)
            .bind(token.as_ref())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Subscription::try_from).transpose()
    }

    #[tracing::instrument(name = "Fetch due subscriptions", skip(self))]
    async fn find_due(&self, force_all: bool) -> StoreResult<Vec<Subscription>> {
        let now = Utc::now();
        let query = format!(
            "select {SUBSCRIPTION_COLUMNS} from subscriptions \
             where confirmed = true \
             and ($1 \
                  or last_sent_at is null \
                  or (frequency = $2 and last_sent_at < $3) \
                  or (frequency = $4 and last_sent_at < $5)) \
             order by created_at"
        );
        let rows = sqlx::query_as::<_, SubscriptionRow>(&query)
            .bind(force_all)
            .bind(Frequency::Hourly.as_str())
            .bind(now - Frequency::Hourly.interval())
            .bind(Frequency::Daily.as_str())
            .bind(now - Frequency::Daily.interval())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Subscription::try_from).collect()
    }

    fn add(&self, subscription: &Subscription) {
        self.stage(PendingWrite::Insert(subscription.clone()));
    }

    fn save(&self, subscription: &Subscription) {
        self.stage(PendingWrite::Update(subscription.clone()));
    }

    fn delete(&self, subscription: &Subscription) {
        self.stage(PendingWrite::Delete(subscription.id));
    }

    #[tracing::instrument(name = "Flush staged subscription writes", skip(self))]
    async fn flush(&self) -> StoreResult<()> {
        let pending = self.take_pending();
        if pending.is_empty() {
            return Ok(());
        }

        // Staged writes are committed together or not at all
        let mut tx = self.pool.begin().await?;
        for write in &pending {
            match write {
                PendingWrite::Insert(subscription) => {
                    sqlx::query(
                        "insert into subscriptions(id, email, city, frequency, confirmed, token, last_sent_at, created_at, updated_at) \
                         values ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
                    )
                    .bind(subscription.id)
                    .bind(&subscription.email)
                    .bind(&subscription.city)
                    .bind(subscription.frequency.as_str())
                    .bind(subscription.confirmed)
                    .bind(subscription.token.as_ref())
                    .bind(subscription.last_sent_at)
                    .bind(subscription.created_at)
                    .bind(subscription.updated_at)
                    .execute(&mut *tx)
                    .await?;
                }
                PendingWrite::Update(subscription) => {
                    let updated = sqlx::query(
                        "update subscriptions \
                         set frequency=$2, confirmed=$3, last_sent_at=$4, updated_at=$5 \
                         where id=$1",
                    )
                    .bind(subscription.id)
                    .bind(subscription.frequency.as_str())
                    .bind(subscription.confirmed)
                    .bind(subscription.last_sent_at)
                    .bind(subscription.updated_at)
                    .execute(&mut *tx)
                    .await?;

                    if updated.rows_affected() == 0 {
                        tracing::info!(
                            subscription_id = %subscription.id,
                            "Subscription was deleted before its update was committed"
                        );
                    }
                }
                PendingWrite::Delete(id) => {
                    sqlx::query("delete from subscriptions where id=$1")
                        .bind(id)
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }
        tx.commit().await?;

        tracing::debug!(writes = pending.len(), "Committed subscription writes");
        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    email: String,
    city: String,
    frequency: String,
    confirmed: bool,
    token: String,
    last_sent_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = StoreError;

    fn try_from(row: SubscriptionRow) -> StoreResult<Self> {
        let frequency = row.frequency.parse().map_err(StoreError::MalformedRecord)?;

        Ok(Self {
            id: row.id,
            email: row.email,
            city: row.city,
            frequency,
            confirmed: row.confirmed,
            token: row.token.into(),
            last_sent_at: row.last_sent_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

mod subscriptions;
mod weather;

pub use subscriptions::PgSubscriptionStore;
pub use weather::PgWeatherStore;

use chrono::Duration;

use crate::domain::SubscriptionToken;
use crate::error::StoreResult;
use crate::model::{Subscription, WeatherSnapshot};

/// Subscription persistence, implemented for each backing database.
///
/// `add`, `save` and `delete` only stage a write; nothing is committed until `flush`.
/// NOTE: Kept as a trait so the services can be exercised against in-memory stores
#[async_trait::async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Fetch the subscription for an (email, city) identity pair
    async fn find_by_identity(&self, email: &str, city: &str)
        -> StoreResult<Option<Subscription>>;

    /// Fetch the subscription holding a confirm/unsubscribe token
    async fn find_by_token(&self, token: &SubscriptionToken) -> StoreResult<Option<Subscription>>;

    /// Fetch confirmed subscriptions due for an update, or every confirmed one when `force_all`
    async fn find_due(&self, force_all: bool) -> StoreResult<Vec<Subscription>>;

    /// Stage an insert of a new subscription
    fn add(&self, subscription: &Subscription);

    /// Stage an update of a loaded subscription.
    /// Updating a subscription deleted in the meantime writes nothing.
    fn save(&self, subscription: &Subscription);

    /// Stage a deletion
    fn delete(&self, subscription: &Subscription);

    /// Commit every staged write.
    /// Fails with `StoreError::UniqueViolation` if an (email, city) pair or token already exists.
    async fn flush(&self) -> StoreResult<()>;
}

/// Weather snapshot persistence
#[async_trait::async_trait]
pub trait WeatherStore: Send + Sync {
    /// Most recent snapshot for a city observed within `within` of now
    async fn find_recent(&self, city: &str, within: Duration)
        -> StoreResult<Option<WeatherSnapshot>>;

    async fn save(&self, snapshot: &WeatherSnapshot) -> StoreResult<()>;
}

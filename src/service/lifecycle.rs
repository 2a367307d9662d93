use std::sync::Arc;

use chrono::Utc;

use crate::domain::SubscriptionToken;
use crate::error::{StoreError, StoreResult};
use crate::model::{NewSubscription, Subscription};
use crate::repo::SubscriptionStore;

use super::Notifier;

/// Result of a subscribe request
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    Created(Subscription),
    /// A subscription for the same (email, city) pair is already stored
    AlreadyExists,
}

/// Create, confirm and unsubscribe transitions for a single unit of work
pub struct SubscriptionLifecycle<S> {
    store: S,
    notifier: Arc<dyn Notifier>,
}

impl<S: SubscriptionStore> SubscriptionLifecycle<S> {
    pub fn new(store: S, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Store a new unconfirmed subscription and ask the subscriber to confirm it.
    ///
    /// The input is expected to be validated already. Only persistence failures
    /// are returned as errors; a duplicate is an `AlreadyExists` outcome.
    #[tracing::instrument(
        name = "Create subscription",
        skip(self, new_subscription),
        fields(city = %new_subscription.city.as_ref())
    )]
    pub async fn create_subscription(
        &self,
        new_subscription: NewSubscription,
    ) -> StoreResult<CreateOutcome> {
        let existing = self
            .store
            .find_by_identity(new_subscription.email.as_ref(), new_subscription.city.as_ref())
            .await?;
        if existing.is_some() {
            tracing::info!("Subscription already exists");
            return Ok(CreateOutcome::AlreadyExists);
        }

        let subscription = Subscription::new(new_subscription);
        self.store.add(&subscription);

        // The existence check above can race a concurrent subscribe; the
        // unique constraint settles it
        match self.store.flush().await {
            Ok(()) => {}
            Err(StoreError::UniqueViolation(constraint)) => {
                tracing::warn!(%constraint, "Subscription created concurrently");
                return Ok(CreateOutcome::AlreadyExists);
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to store subscription");
                return Err(e);
            }
        }

        self.notifier.send_confirmation(&subscription).await;

        Ok(CreateOutcome::Created(subscription))
    }

    /// Confirm the subscription holding `token`. Returns `false` for an unknown token.
    /// Confirming twice is allowed and sends the welcome email again.
    #[tracing::instrument(name = "Confirm subscription", skip_all)]
    pub async fn confirm_subscription(&self, token: &SubscriptionToken) -> StoreResult<bool> {
        let Some(mut subscription) = self.store.find_by_token(token).await? else {
            tracing::info!("Unknown confirmation token");
            return Ok(false);
        };

        subscription.confirm(Utc::now());
        self.store.save(&subscription);
        self.store.flush().await?;

        self.notifier.send_welcome(&subscription).await;

        Ok(true)
    }

    /// Delete the subscription holding `token`. Returns `false` for an unknown token.
    #[tracing::instrument(name = "Unsubscribe", skip_all)]
    pub async fn unsubscribe(&self, token: &SubscriptionToken) -> StoreResult<bool> {
        let Some(subscription) = self.store.find_by_token(token).await? else {
            tracing::info!("Unknown unsubscribe token");
            return Ok(false);
        };
        let Subscription { email, city, .. } = subscription.clone();

        self.store.delete(&subscription);
        self.store.flush().await?;

        self.notifier.send_goodbye(&email, &city).await;

        Ok(true)
    }
}

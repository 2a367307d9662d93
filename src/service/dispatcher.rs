use std::sync::Arc;

use chrono::Utc;

use crate::error::StoreResult;
use crate::repo::SubscriptionStore;

use super::{Notifier, WeatherCache};

/// Number of processed subscriptions committed per flush
pub const FLUSH_BATCH_SIZE: usize = 10;

/// Sends weather updates to due subscribers.
///
/// A run is sequential and expects to be the only dispatcher writing to the store.
pub struct NotificationDispatcher<S> {
    store: S,
    weather: Arc<WeatherCache>,
    notifier: Arc<dyn Notifier>,
}

impl<S: SubscriptionStore> NotificationDispatcher<S> {
    pub fn new(store: S, weather: Arc<WeatherCache>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            weather,
            notifier,
        }
    }

    /// Send an update to every due subscription, or every confirmed one when `force_all`.
    ///
    /// Returns how many subscriptions had weather resolved and an update attempted.
    /// A subscription whose weather cannot be resolved is skipped and stays due.
    /// Only a failure to query due subscriptions is returned as an error.
    #[tracing::instrument(name = "Send weather updates", skip(self))]
    pub async fn send_weather_updates(&self, force_all: bool) -> StoreResult<usize> {
        let due = self.store.find_due(force_all).await?;
        tracing::info!(due = due.len(), "Dispatching weather updates");

        let mut count = 0;
        for mut subscription in due {
            let Some(weather) = self.weather.get_weather_for_city(&subscription.city).await
            else {
                tracing::warn!(
                    subscription_id = %subscription.id,
                    city = %subscription.city,
                    "No weather available, skipping update"
                );
                continue;
            };

            // Delivery failures are logged by the notifier; the update still counts as sent
            self.notifier.send_update(&subscription, &weather).await;

            subscription.mark_sent(Utc::now());
            self.store.save(&subscription);
            count += 1;

            if count % FLUSH_BATCH_SIZE == 0 {
                self.flush(count).await;
            }
        }

        if count % FLUSH_BATCH_SIZE != 0 {
            self.flush(count).await;
        }

        tracing::info!(sent = count, "Weather updates dispatched");
        Ok(count)
    }

    /// Commit the staged batch. A failure loses only this batch's `last_sent_at`
    /// updates, so the run carries on with the rest.
    async fn flush(&self, processed: usize) {
        if let Err(e) = self.store.flush().await {
            tracing::error!(processed, error = %e, "Failed to persist weather update batch");
        }
    }
}

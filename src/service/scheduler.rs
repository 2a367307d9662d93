use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use tokio_util::sync::CancellationToken;

use crate::repo::SubscriptionStore;

use super::{NotificationDispatcher, Notifier, WeatherCache};

/// Background task running a dispatch at a fixed period.
///
/// Every run gets a fresh store from `new_store`, so staged writes never
/// outlive the run that made them.
pub struct DispatchScheduler<F> {
    period: Duration,
    new_store: F,
    weather: Arc<WeatherCache>,
    notifier: Arc<dyn Notifier>,
}

impl<F, S> DispatchScheduler<F>
where
    F: Fn() -> S + Send + Sync,
    S: SubscriptionStore,
{
    pub fn new(
        period: Duration,
        new_store: F,
        weather: Arc<WeatherCache>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            period,
            new_store,
            weather,
            notifier,
        }
    }

    /// Dispatch immediately, then once per period until `cancel` fires.
    /// A run in progress is finished before the loop observes cancellation.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(period_seconds = self.period.as_secs(), "Dispatch scheduler started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Dispatch scheduler cancelled");
                    break;
                }
                _ = interval.tick() => self.dispatch().await,
            }
        }
    }

    async fn dispatch(&self) {
        let dispatcher = NotificationDispatcher::new(
            (self.new_store)(),
            self.weather.clone(),
            self.notifier.clone(),
        );

        if let Err(e) = dispatcher.send_weather_updates(false).await {
            tracing::error!(error = %e, "Scheduled weather update run failed");
        }
    }
}

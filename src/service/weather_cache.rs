use std::sync::Arc;
use std::time::Duration;

use crate::client::WeatherProvider;
use crate::domain::CityName;
use crate::error::WeatherError;
use crate::model::WeatherSnapshot;
use crate::repo::WeatherStore;

use super::TtlCache;

/// How long a resolved lookup is served from memory
pub const CACHE_TTL: Duration = Duration::from_secs(30 * 60);

/// Maximum age of a stored snapshot, by observation time, that may be reused
pub fn snapshot_freshness() -> chrono::Duration {
    chrono::Duration::hours(1)
}

/// Current weather lookup, shared by the HTTP layer and the dispatcher.
///
/// Resolution order: live cache entry, then a fresh stored snapshot, then the
/// provider (whose result is persisted). The cache TTL is shorter than the
/// snapshot freshness window.
pub struct WeatherCache {
    store: Arc<dyn WeatherStore>,
    provider: Arc<dyn WeatherProvider>,
    cache: TtlCache<WeatherSnapshot>,
}

impl WeatherCache {
    pub fn new(store: Arc<dyn WeatherStore>, provider: Arc<dyn WeatherProvider>) -> Self {
        Self {
            store,
            provider,
            cache: TtlCache::new(),
        }
    }

    /// Current weather for a city, or `None` if it cannot be resolved.
    /// Failures are logged here and never reach the caller.
    #[tracing::instrument(name = "Get weather for city", skip(self))]
    pub async fn get_weather_for_city(&self, city: &str) -> Option<WeatherSnapshot> {
        let key = CityName::cache_key(city);

        match self
            .cache
            .get_or_populate(&key, CACHE_TTL, || self.populate(city))
            .await
        {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::error!(city, error = %e, "Failed to resolve current weather");
                None
            }
        }
    }

    async fn populate(&self, city: &str) -> Result<WeatherSnapshot, WeatherError> {
        if let Some(recent) = self.store.find_recent(city, snapshot_freshness()).await? {
            tracing::debug!(city, forecast_time = %recent.forecast_time, "Reusing stored snapshot");
            return Ok(recent);
        }

        let conditions = self.provider.fetch_current(city).await?;
        let snapshot = WeatherSnapshot::from_conditions(city, conditions);
        self.store.save(&snapshot).await?;

        tracing::info!(city, temperature = snapshot.temperature, "Fetched live weather");
        Ok(snapshot)
    }
}

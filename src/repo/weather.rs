use uuid::Uuid;

use chrono::{DateTime, Duration, Utc};

use sqlx::PgPool;

use crate::error::StoreResult;
use crate::model::WeatherSnapshot;

use super::WeatherStore;

/// Postgres weather snapshot store. Writes are committed immediately.
#[derive(Debug, Clone)]
pub struct PgWeatherStore {
    pool: PgPool,
}

impl PgWeatherStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl WeatherStore for PgWeatherStore {
    #[tracing::instrument(name = "Fetch recent weather snapshot", skip(self))]
    async fn find_recent(
        &self,
        city: &str,
        within: Duration,
    ) -> StoreResult<Option<WeatherSnapshot>> {
        let observed_after = Utc::now() - within;
        let row = sqlx::query_as::<_, WeatherRow>(
            "select id, city, temperature, humidity, description, forecast_time, created_at, updated_at \
             from weather_data \
             where city=$1 and forecast_time > $2 \
             order by forecast_time desc \
             limit 1",
        )
        .bind(city)
        .bind(observed_after)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(WeatherSnapshot::from))
    }

    #[tracing::instrument(name = "Insert weather snapshot", skip(self, snapshot), fields(city = %snapshot.city))]
    async fn save(&self, snapshot: &WeatherSnapshot) -> StoreResult<()> {
        sqlx::query(
            "insert into weather_data(id, city, temperature, humidity, description, forecast_time, created_at, updated_at) \
             values ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(snapshot.id)
        .bind(&snapshot.city)
        .bind(snapshot.temperature)
        .bind(snapshot.humidity)
        .bind(&snapshot.description)
        .bind(snapshot.forecast_time)
        .bind(snapshot.created_at)
        .bind(snapshot.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WeatherRow {
    id: Uuid,
    city: String,
    temperature: f64,
    humidity: i32,
    description: String,
    forecast_time: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<WeatherRow> for WeatherSnapshot {
    fn from(row: WeatherRow) -> Self {
        Self {
            id: row.id,
            city: row.city,
            temperature: row.temperature,
            humidity: row.humidity,
            description: row.description,
            forecast_time: row.forecast_time,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

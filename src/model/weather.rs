use uuid::Uuid;

use chrono::{DateTime, Utc};

use serde::Serialize;

/// Current conditions as reported by a weather provider
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentConditions {
    /// Degrees Celsius
    pub temperature: f64,
    /// Relative humidity, 0..=100 percent
    pub humidity: i32,
    pub description: String,
    pub observed_at: DateTime<Utc>,
}

/// Stored weather observation for a city
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherSnapshot {
    #[serde(skip)]
    pub id: Uuid,
    pub city: String,
    pub temperature: f64,
    pub humidity: i32,
    pub description: String,
    /// Observation time reported by the provider, used for freshness checks
    pub forecast_time: DateTime<Utc>,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl WeatherSnapshot {
    pub fn from_conditions(city: &str, conditions: CurrentConditions) -> Self {
        Self {
            id: Uuid::new_v4(),
            city: city.to_string(),
            temperature: conditions.temperature,
            humidity: conditions.humidity,
            description: conditions.description,
            forecast_time: conditions.observed_at,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

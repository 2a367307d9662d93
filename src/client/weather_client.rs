use std::time::Duration;

use anyhow::Context;

use chrono::{TimeZone, Utc};

use reqwest::Client;

use serde::Deserialize;

use secrecy::Secret;

use url::Url;

use crate::error::WeatherError;
use crate::model::CurrentConditions;

/// Source of live weather conditions
#[async_trait::async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Fetch the current conditions for a city.
    /// Fails on an unknown city, a timeout, or a malformed payload.
    async fn fetch_current(&self, city: &str) -> Result<CurrentConditions, WeatherError>;
}

/// REST client for a WeatherAPI-compatible `current.json` endpoint
#[derive(Debug)]
pub struct WeatherApiClient {
    client: Client,
    api_current_url: Url,
    api_key: Secret<String>,
    language: String,
}

impl WeatherApiClient {
    pub fn new(
        api_base_url: Url,
        api_key: Secret<String>,
        language: String,
        connect_timeout: Duration,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .build()
            .context("Failed to build weather http client")?;

        // Joining onto a base without a trailing slash would drop its last path segment
        let mut api_base_url = api_base_url;
        if !api_base_url.path().ends_with('/') {
            let path = format!("{}/", api_base_url.path());
            api_base_url.set_path(&path);
        }
        let api_current_url = api_base_url
            .join("current.json")
            .context("Failed to create current weather endpoint URL")?;

        Ok(Self {
            client,
            api_current_url,
            api_key,
            language,
        })
    }
}

#[async_trait::async_trait]
impl WeatherProvider for WeatherApiClient {
    #[tracing::instrument(name = "Fetch current weather via API", skip(self))]
    async fn fetch_current(&self, city: &str) -> Result<CurrentConditions, WeatherError> {
        use secrecy::ExposeSecret;

        let response = self
            .client
            .get(self.api_current_url.clone())
            .query(&[
                ("key", self.api_key.expose_secret().as_str()),
                ("q", city),
                ("lang", self.language.as_str()),
            ])
            .send()
            .await?;

        // Error payloads are reported in the body, whatever the status code
        let status = response.status();
        let body = response.text().await?;
        let payload: CurrentResponse = serde_json::from_str(&body).map_err(|e| {
            WeatherError::MalformedResponse(format!("status {}: {}", status, e))
        })?;

        payload.into_conditions()
    }
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    error: Option<ApiError>,
    location: Option<serde_json::Value>,
    current: Option<Current>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Current {
    temp_c: Option<f64>,
    humidity: Option<i32>,
    condition: Option<Condition>,
    last_updated_epoch: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Condition {
    text: Option<String>,
}

impl CurrentResponse {
    fn into_conditions(self) -> Result<CurrentConditions, WeatherError> {
        if let Some(message) = self.error.and_then(|e| e.message) {
            if !message.is_empty() {
                return Err(WeatherError::Provider(message));
            }
        }

        let (Some(_), Some(current)) = (self.location, self.current) else {
            return Err(missing("location/current"));
        };

        let temperature = current.temp_c.ok_or_else(|| missing("current.temp_c"))?;
        let humidity = current.humidity.ok_or_else(|| missing("current.humidity"))?;
        if !(0..=100).contains(&humidity) {
            return Err(WeatherError::MalformedResponse(format!(
                "humidity {} outside 0..=100",
                humidity
            )));
        }
        let description = current
            .condition
            .and_then(|c| c.text)
            .ok_or_else(|| missing("current.condition.text"))?;
        let epoch = current
            .last_updated_epoch
            .ok_or_else(|| missing("current.last_updated_epoch"))?;
        let observed_at = Utc.timestamp_opt(epoch, 0).single().ok_or_else(|| {
            WeatherError::MalformedResponse(format!("invalid observation timestamp {}", epoch))
        })?;

        Ok(CurrentConditions {
            temperature,
            humidity,
            description,
            observed_at,
        })
    }
}

fn missing(field: &str) -> WeatherError {
    WeatherError::MalformedResponse(format!("missing {}", field))
}

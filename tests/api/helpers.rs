use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;

use reqwest::{Client, Method, Response};

use secrecy::Secret;

use serde::Serialize;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;

use url::Url;

use wiremock::MockServer;

use weather_updates::app;
use weather_updates::client::{EmailClient, WeatherApiClient};
use weather_updates::error::StoreResult;
use weather_updates::model::WeatherSnapshot;
use weather_updates::repo::{PgWeatherStore, WeatherStore};
use weather_updates::service::{EmailNotifier, WeatherCache};

#[derive(Debug, Default, Serialize)]
pub struct NewSubscriber {
    pub email: Option<String>,
    pub city: Option<String>,
    pub frequency: Option<String>,
}

impl NewSubscriber {
    pub fn new(email: &str, city: &str, frequency: &str) -> Self {
        Self {
            email: Some(email.into()),
            city: Some(city.into()),
            frequency: Some(frequency.into()),
        }
    }
}

/// Weather store kept in memory, so weather endpoints run without a database
#[derive(Debug, Default)]
pub struct MemoryWeatherStore {
    snapshots: Mutex<Vec<WeatherSnapshot>>,
}

#[async_trait::async_trait]
impl WeatherStore for MemoryWeatherStore {
    async fn find_recent(
        &self,
        city: &str,
        within: chrono::Duration,
    ) -> StoreResult<Option<WeatherSnapshot>> {
        let observed_after = Utc::now() - within;
        Ok(self
            .snapshots
            .lock()
            .unwrap()
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

pub struct TestApp {
    addr: String,

    pub client: Client,
    pub email_server: MockServer,
    pub weather_server: MockServer,
}

impl TestApp {
    /// Spawn the app against a migrated test database
    pub async fn spawn(pool: &PgPool) -> Self {
        Self::spawn_with(pool.clone(), Arc::new(PgWeatherStore::new(pool.clone()))).await
    }

    /// Spawn the app with a pool that never connects. Only endpoints that reject
    /// a request before touching the database, or that need no database, work.
    pub async fn spawn_without_database() -> Self {
        let options = PgConnectOptions::new()
            .host("127.0.0.1")
            .port(1)
            .database("unreachable");
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy_with(options);

        Self::spawn_with(pool, Arc::new(MemoryWeatherStore::default())).await
    }

    async fn spawn_with(pool: PgPool, weather_store: Arc<dyn WeatherStore>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to listen on random port");
        let port = listener.local_addr().unwrap().port();

        let addr = format!("http://127.0.0.1:{}", port);

        let email_server = MockServer::start().await;
        let weather_server = MockServer::start().await;

        let email_client = {
            let sender = "test@test.com"
                .parse()
                .expect("Failed to parse sender email address");
            let api_base_url =
                Url::parse(&email_server.uri()).expect("Failed to parse mock server uri");
            let api_auth_token = Secret::new("TestAuthorization".into());
            let api_timeout = Duration::from_secs(2);

            EmailClient::new(sender, api_timeout, api_base_url, api_auth_token)
                .expect("Failed to create email client")
        };
        let base_url = Url::parse(&addr).expect("Failed to parse app address");
        let notifier = Arc::new(EmailNotifier::new(email_client, base_url));

        let weather_client = WeatherApiClient::new(
            Url::parse(&weather_server.uri()).expect("Failed to parse mock server uri"),
            Secret::new("TestKey".into()),
            "en".into(),
            Duration::from_secs(1),
            Duration::from_secs(2),
        )
        .expect("Failed to create weather client");
        let weather = Arc::new(WeatherCache::new(weather_store, Arc::new(weather_client)));

        let server =
            app::run(listener, pool, notifier, weather).expect("Failed to spawn app instance");
        let _ = tokio::spawn(server);

        let client = Client::new();

        Self {
            addr,
            client,
            email_server,
            weather_server,
        }
    }

    pub fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", &self.addr, url);
        self.client.request(method, url)
    }

    pub async fn health_check(&self) -> reqwest::Result<Response> {
        self.request(Method::GET, "health_check").send().await
    }

    pub async fn subscribe_json(&self, new_subscriber: &NewSubscriber) -> reqwest::Result<Response> {
        self.request(Method::POST, "api/subscribe")
            .json(new_subscriber)
            .send()
            .await
    }

    pub async fn subscribe_form(&self, new_subscriber: &NewSubscriber) -> reqwest::Result<Response> {
        self.request(Method::POST, "api/subscribe")
            .form(new_subscriber)
            .send()
            .await
    }

    pub async fn get_url(&self, url: &str) -> reqwest::Result<Response> {
        self.client.get(url).send().await
    }

    pub async fn weather(&self, city: Option<&str>) -> reqwest::Result<Response> {
        let mut req = self.request(Method::GET, "api/weather");
        if let Some(city) = city {
            req = req.query(&[("city", city)]);
        }
        req.send().await
    }

    /// Links found in the text body of the `n`th email received by the mock email API
    pub async fn email_links(&self, n: usize) -> Vec<String> {
        let requests = self
            .email_server
            .received_requests()
            .await
            .expect("Request recording is disabled");
        let body: serde_json::Value =
            serde_json::from_slice(&requests[n].body).expect("Failed to parse email request");
        let text = body["TextBody"].as_str().expect("Email without a text body");

        linkify::LinkFinder::new()
            .links(text)
            .filter(|l| *l.kind() == linkify::LinkKind::Url)
            .map(|l| l.as_str().to_string())
            .collect()
    }
}

pub fn current_weather_body(temperature: f64) -> serde_json::Value {
    serde_json::json!({
        "location": { "name": "London" },
        "current": {
            "last_updated_epoch": Utc::now().timestamp(),
            "temp_c": temperature,
            "humidity": 81,
            "condition": { "text": "Light rain" }
        }
    })
}

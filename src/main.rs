use std::net::TcpListener;
use std::sync::Arc;

use anyhow::Context;

use sqlx::PgPool;

use tokio_util::sync::CancellationToken;

use weather_updates::app;
use weather_updates::client::{EmailClient, WeatherApiClient};
use weather_updates::command::{Command, USAGE};
use weather_updates::repo::{PgSubscriptionStore, PgWeatherStore};
use weather_updates::service::{
    DispatchScheduler, EmailNotifier, NotificationDispatcher, Notifier, WeatherCache,
};
use weather_updates::settings::Settings;
use weather_updates::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let command = match Command::parse(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}\n{}", e, USAGE);
            std::process::exit(2);
        }
    };

    let subscriber = telemetry::create_subscriber("info", std::io::stdout);
    telemetry::set_subscriber(subscriber)?;

    let settings = Settings::load()?;

    let pool = PgPool::connect_with(settings.database.with_db())
        .await
        .context("Failed to connect to the database")?;

    let notifier: Arc<dyn Notifier> = {
        let email_client = EmailClient::new(
            settings.email.sender()?,
            settings.email.api_timeout(),
            settings.email.api_base_url()?,
            settings.email.api_auth_token(),
        )?;
        Arc::new(EmailNotifier::new(email_client, settings.app.base_url()?))
    };

    let weather = {
        let provider = WeatherApiClient::new(
            settings.weather.api_base_url()?,
            settings.weather.api_key(),
            settings.weather.language().to_string(),
            settings.weather.connect_timeout(),
            settings.weather.timeout(),
        )?;
        Arc::new(WeatherCache::new(
            Arc::new(PgWeatherStore::new(pool.clone())),
            Arc::new(provider),
        ))
    };

    match command {
        Command::Serve => {
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run database migrations")?;

            let cancel = CancellationToken::new();
            let scheduler = settings.dispatch.enabled.then(|| {
                let scheduler = DispatchScheduler::new(
                    settings.dispatch.interval(),
                    {
                        let pool = pool.clone();
                        move || PgSubscriptionStore::new(pool.clone())
                    },
                    weather.clone(),
                    notifier.clone(),
                );
                let cancel = cancel.clone();
                tokio::spawn(async move { scheduler.run(cancel).await })
            });

            let listener = TcpListener::bind(settings.app.addr())?;
            let result = app::run(listener, pool, notifier, weather)?
                .await
                .context("Failed to run app");

            cancel.cancel();
            if let Some(scheduler) = scheduler {
                scheduler.await.context("Dispatch scheduler panicked")?;
            }

            result
        }
        Command::SendWeatherUpdates { force_all } => {
            let dispatcher =
                NotificationDispatcher::new(PgSubscriptionStore::new(pool), weather, notifier);
            let count = dispatcher
                .send_weather_updates(force_all)
                .await
                .context("Failed to send weather updates")?;

            if count > 0 {
                println!("Sent {} weather updates", count);
            } else {
                println!("No subscriptions due for weather updates");
            }

            Ok(())
        }
    }
}

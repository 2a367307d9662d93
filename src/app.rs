use std::net::TcpListener;
use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::{get, HttpResponse, Responder};
use actix_web::{web, App, HttpServer};

use sqlx::PgPool;

use tracing_actix_web::TracingLogger;

use crate::controller;
use crate::service::{Notifier, WeatherCache};

/// Simple health-check endpoint
#[tracing::instrument(name = "Health check")]
#[get("/health_check")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().finish()
}

/// Run the application on a specified TCP listener
pub fn run(
    listener: TcpListener,
    pool: PgPool,
    notifier: Arc<dyn Notifier>,
    weather: Arc<WeatherCache>,
) -> anyhow::Result<Server> {
    // Wrap application data
    let pool = web::Data::new(pool);
    let notifier: web::Data<dyn Notifier> = web::Data::from(notifier);
    let weather = web::Data::from(weather);

    // Start the server
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(pool.clone())
            .app_data(notifier.clone())
            .app_data(weather.clone())
            .service(health_check)
            .service(controller::scope())
    })
    .listen(listener)?
    .run();

    Ok(server)
}

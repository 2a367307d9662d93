use actix_web::dev::HttpServiceFactory;
use actix_web::web;

use crate::error::RestError;

pub mod subscriptions;
pub mod weather;

/// Every `/api` endpoint
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/api")
        .app_data(json_config())
        .app_data(form_config())
        .app_data(query_config())
        .service(subscriptions::services())
        .service(weather::services())
}

// Extractor failures are reported in the same JSON shape as handler errors

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|e, _req| RestError::BadRequest(e.to_string()).into())
}

fn form_config() -> web::FormConfig {
    web::FormConfig::default()
        .error_handler(|e, _req| RestError::BadRequest(e.to_string()).into())
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|e, _req| RestError::BadRequest(e.to_string()).into())
}

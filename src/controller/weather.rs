use actix_web::dev::HttpServiceFactory;
use actix_web::{get, web, HttpResponse};

use serde::Deserialize;

use crate::domain::CityName;
use crate::error::{RestError, RestResult};
use crate::service::WeatherCache;

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    city: Option<String>,
}

/// Current weather for a city
#[tracing::instrument(name = "Get current weather", skip(weather))]
#[get("/weather")]
async fn current(
    weather: web::Data<WeatherCache>,
    query: web::Query<WeatherQuery>,
) -> RestResult<HttpResponse> {
    let city: CityName = query
        .into_inner()
        .city
        .unwrap_or_default()
        .parse()
        .map_err(RestError::BadRequest)?;

    let snapshot = weather
        .get_weather_for_city(city.as_ref())
        .await
        .ok_or_else(|| RestError::NotFound("City not found".into()))?;

    Ok(HttpResponse::Ok().json(snapshot))
}

/// Weather endpoints, mounted under `/api`
pub fn services() -> impl HttpServiceFactory {
    current
}

mod email_client;
mod weather_client;

pub use email_client::{Email, EmailClient};
pub use weather_client::{WeatherApiClient, WeatherProvider};

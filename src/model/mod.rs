mod subscription;
mod weather;

pub use subscription::{NewSubscription, Subscription};
pub use weather::{CurrentConditions, WeatherSnapshot};

mod dispatcher;
mod lifecycle;
mod notifier;
mod scheduler;
mod ttl_cache;
mod weather_cache;

pub use dispatcher::{NotificationDispatcher, FLUSH_BATCH_SIZE};
pub use lifecycle::{CreateOutcome, SubscriptionLifecycle};
pub use notifier::{EmailNotifier, Notifier};
pub use scheduler::DispatchScheduler;
pub use ttl_cache::TtlCache;
pub use weather_cache::{snapshot_freshness, WeatherCache, CACHE_TTL};

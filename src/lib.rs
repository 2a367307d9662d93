/// Basic application code
pub mod app;
/// REST clients for outside services
pub mod client;
/// Command line parsing
pub mod command;
/// Controllers for REST endpoints
pub mod controller;
/// Domain objects
pub mod domain;
/// Error enums
pub mod error;
/// Persisted records
pub mod model;
/// Repositories
pub mod repo;
/// Subscription lifecycle, weather lookup and update dispatch
pub mod service;
/// Application settings
pub mod settings;
/// Application telemetry for tracing and logging
pub mod telemetry;

#[cfg(test)]
mod testing;

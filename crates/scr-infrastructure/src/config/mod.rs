//! Configuration management
//!
//! Application configuration types and the figment-based loader that merges
//! defaults, a TOML file and `SCR_*` environment variables.

pub mod loader;
pub mod types;

pub use loader::ConfigLoader;
pub use types::{AppConfig, DeliveryMode, EventAdminConfig, LoggingConfig, RuntimeConfig};

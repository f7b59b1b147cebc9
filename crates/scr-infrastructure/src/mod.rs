//! # Infrastructure Layer
//!
//! Cross-cutting technical concerns and the in-memory collaborators the
//! runtime is wired to.
//!
//! ### Configuration
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | TOML + environment configuration through figment |
//! | [`constants`] | Infrastructure constants |
//! | [`descriptors`] | Component descriptor files |
//!
//! ### Observability
//! | Module | Description |
//! |--------|-------------|
//! | [`logging`] | Structured logging with tracing |
//!
//! ### Collaborators
//! | Module | Description |
//! |--------|-------------|
//! | [`infrastructure`] | Configuration admin and event admin |
//! | [`bootstrap`] | Runtime wiring from configuration |

pub mod bootstrap;
pub mod config;
pub mod constants;
pub mod descriptors;
pub mod error_ext;
pub mod infrastructure;
pub mod logging;

pub use bootstrap::RuntimeContext;
pub use config::{AppConfig, ConfigLoader};
pub use error_ext::ErrorContext;
pub use infrastructure::{EventAdmin, InMemoryConfigurationAdmin};

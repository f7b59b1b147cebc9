//! Collaborator ports
//!
//! Interfaces the runtime consumes but does not implement itself. The
//! infrastructure layer ships in-memory implementations.

pub mod configuration;

pub use configuration::{ConfigurationEvent, ConfigurationListener, ConfigurationProvider};

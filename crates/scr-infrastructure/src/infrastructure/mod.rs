//! Collaborator implementations
//!
//! In-memory implementations of the ports the runtime consumes:
//!
//! | Type | Port |
//! |------|------|
//! | [`InMemoryConfigurationAdmin`] | `ConfigurationProvider` |
//! | [`EventAdmin`] | `EventPublisher` |

pub mod configuration;
pub mod events;

pub use configuration::InMemoryConfigurationAdmin;
pub use events::{EventAdmin, handler_object};

//! # Service Component Runtime - Domain Layer
//!
//! Plain data and contracts shared by the engine and its collaborators.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`value_objects`] | Properties, service records, reference and component descriptors |
//! | [`filter`] | Target filter language |
//! | [`events`] | Registry events and the event bus port |
//! | [`ports`] | Configuration collaborator port |
//! | [`error`] | Domain error type |
//! | [`constants`] | Reserved property keys and capability names |

pub mod constants;
pub mod error;
pub mod events;
pub mod filter;
pub mod ports;
pub mod value_objects;

pub use error::{Error, Result};
pub use filter::Filter;

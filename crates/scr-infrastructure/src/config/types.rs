//! Configuration types

use crate::constants::{DEFAULT_EVENT_QUEUE_CAPACITY, DEFAULT_LOG_LEVEL};
use scr_domain::value_objects::Properties;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Runtime bootstrap configuration
    pub runtime: RuntimeConfig,
    /// Event admin configuration
    pub event_admin: EventAdminConfig,
    /// Configuration dictionaries seeded into the configuration admin, by PID
    pub configurations: BTreeMap<String, Properties>,
}

// ============================================================================
// Logging Configuration
// ============================================================================

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Enable JSON output format
    pub json_format: bool,
    /// Log to a daily-rolling file in addition to stderr
    pub file_output: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            json_format: false,
            file_output: None,
        }
    }
}

// ============================================================================
// Runtime Configuration
// ============================================================================

/// Runtime bootstrap configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Condition ids registered as condition services at startup
    pub conditions: Vec<String>,
    /// Post component state changes on the event admin
    pub publish_component_events: bool,
    /// Descriptor files loaded at startup
    pub descriptors: Vec<PathBuf>,
}

// ============================================================================
// Event Admin Configuration
// ============================================================================

/// How `post` hands events to handlers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Deliver on the posting thread
    #[default]
    Sync,
    /// Queue and deliver from a tokio task
    Async,
}

/// Event admin configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventAdminConfig {
    /// Delivery mode of `post`
    pub delivery: DeliveryMode,
    /// Capacity of the asynchronous queue
    pub capacity: usize,
}

impl Default for EventAdminConfig {
    fn default() -> Self {
        Self {
            delivery: DeliveryMode::Sync,
            capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
        }
    }
}

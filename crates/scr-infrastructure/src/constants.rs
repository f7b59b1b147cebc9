//! Infrastructure layer constants
//!
//! Contains constants that are part of the infrastructure implementation.
//! Domain-specific constants are defined in `scr_domain::constants`.

// ============================================================================
// CONFIGURATION CONSTANTS
// ============================================================================

/// Default configuration file name
pub const DEFAULT_CONFIG_FILENAME: &str = "scr.toml";

/// Default configuration directory name
pub const DEFAULT_CONFIG_DIR: &str = "scr";

/// Environment variable prefix for configuration
pub const CONFIG_ENV_PREFIX: &str = "SCR";

/// Separator between nested keys in environment variable names
pub const CONFIG_ENV_SEPARATOR: &str = "__";

// ============================================================================
// LOGGING CONSTANTS
// ============================================================================

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable overriding the configured log filter
pub const LOG_FILTER_ENV: &str = "SCR_LOG";

/// File stem used for rolling log files when the path has none
pub const DEFAULT_LOG_FILE_STEM: &str = "scr";

// ============================================================================
// EVENT ADMIN CONSTANTS
// ============================================================================

/// Default capacity of the asynchronous event queue
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 1024;

/// Consumer name the event admin acquires handler services under
pub const EVENT_ADMIN_CONSUMER: &str = "scr.event.admin";

// ============================================================================
// CONFIGURATION ADMIN CONSTANTS
// ============================================================================

/// Separator between a factory PID and the generated instance suffix
pub const FACTORY_PID_SEPARATOR: char = '~';

//! Error handling types

use thiserror::Error;

/// Result type alias for operations that can fail
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the Service Component Runtime
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed registration data (reserved key with the wrong value type)
    #[error("Invalid properties: {message}")]
    InvalidProperties {
        /// Description of the offending property
        message: String,
    },

    /// Mandatory references or conditions are not met
    #[error("Unsatisfied dependency for component '{component}': {reason}")]
    UnsatisfiedDependency {
        /// Component whose dependencies are unmet
        component: String,
        /// What is missing
        reason: String,
    },

    /// An activation callback reported an error
    #[error("Activation of component '{component}' failed: {message}")]
    ActivationFailed {
        /// Component that failed to activate
        component: String,
        /// Description of the failure
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A factory instance was disposed twice
    #[error("Component instance {instance} is already disposed")]
    AlreadyDisposed {
        /// Identifier of the disposed instance
        instance: u64,
    },

    /// Target or condition filter failed to parse
    #[error("Filter syntax error in '{filter}' at position {position}: {message}")]
    FilterSyntax {
        /// The filter text as supplied
        filter: String,
        /// Character offset of the error
        position: usize,
        /// Description of the syntax problem
        message: String,
    },

    /// Resource not found error
    #[error("Not found: {resource}")]
    NotFound {
        /// The resource that was not found
        resource: String,
    },

    /// Configuration-related error
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// I/O operation error
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O error
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// JSON parsing or serialization error
    #[error("JSON parsing error: {source}")]
    Json {
        /// The underlying JSON error
        #[from]
        source: serde_json::Error,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error
        message: String,
    },
}

// Registry and descriptor error creation methods
impl Error {
    /// Create an invalid properties error
    pub fn invalid_properties<S: Into<String>>(message: S) -> Self {
        Self::InvalidProperties {
            message: message.into(),
        }
    }

    /// Create a filter syntax error
    pub fn filter_syntax<F: Into<String>, S: Into<String>>(
        filter: F,
        position: usize,
        message: S,
    ) -> Self {
        Self::FilterSyntax {
            filter: filter.into(),
            position,
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

// Lifecycle error creation methods
impl Error {
    /// Create an unsatisfied dependency error
    pub fn unsatisfied<C: Into<String>, R: Into<String>>(component: C, reason: R) -> Self {
        Self::UnsatisfiedDependency {
            component: component.into(),
            reason: reason.into(),
        }
    }

    /// Create an activation failure
    pub fn activation_failed<C: Into<String>, S: Into<String>>(component: C, message: S) -> Self {
        Self::ActivationFailed {
            component: component.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create an activation failure wrapping the callback's own error
    pub fn activation_failed_with_source<
        C: Into<String>,
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    >(
        component: C,
        message: S,
        source: E,
    ) -> Self {
        Self::ActivationFailed {
            component: component.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an already disposed error
    pub fn already_disposed(instance: u64) -> Self {
        Self::AlreadyDisposed { instance }
    }
}

// Configuration and I/O error creation methods
impl Error {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error with source
    pub fn configuration_with_source<
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    >(
        message: S,
        source: E,
    ) -> Self {
        Self::Configuration {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io {
            message: message.into(),
            source: None,
        }
    }

    /// Create an I/O error with source
    pub fn io_with_source<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        message: S,
        source: E,
    ) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

// Classification helpers
impl Error {
    /// Whether this error reports unmet dependencies rather than a failure
    pub fn is_unsatisfied(&self) -> bool {
        matches!(self, Self::UnsatisfiedDependency { .. })
    }

    /// Whether this error came from a failing activation callback
    pub fn is_activation_failure(&self) -> bool {
        matches!(self, Self::ActivationFailed { .. })
    }
}

//! Configuration loader
//!
//! Handles loading configuration from various sources including
//! TOML files, environment variables, and default values.

use crate::config::AppConfig;
use crate::constants::*;
use crate::error_ext::ErrorContext;
use crate::logging::{log_config_loaded, parse_log_level};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use scr_domain::constants::SERVICE_RANKING;
use scr_domain::error::{Error, Result};
use scr_domain::value_objects::PropertyValue;
use std::env;
use std::path::{Path, PathBuf};

/// Configuration loader service
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Configuration file path
    config_path: Option<PathBuf>,

    /// Environment prefix
    env_prefix: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader with default settings
    pub fn new() -> Self {
        Self {
            config_path: None,
            env_prefix: CONFIG_ENV_PREFIX.to_string(),
        }
    }

    /// Set the configuration file path
    pub fn with_config_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the environment variable prefix
    pub fn with_env_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Load configuration from all sources
    ///
    /// Configuration sources are merged in this order (later sources override earlier):
    /// 1. Default values from `AppConfig::default()`
    /// 2. TOML configuration file (explicit path, or the first `scr.toml` found)
    /// 3. Environment variables with prefix, nested keys split on `__`
    ///    (e.g. `SCR_EVENT_ADMIN__CAPACITY`)
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] when extraction or validation fails.
    pub fn load(&self) -> Result<AppConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));

        match &self.config_path {
            Some(config_path) if config_path.exists() => {
                figment = figment.merge(Toml::file(config_path));
                log_config_loaded(config_path, true);
            }
            Some(config_path) => log_config_loaded(config_path, false),
            None => {
                if let Some(default_path) = Self::find_default_config_path() {
                    figment = figment.merge(Toml::file(&default_path));
                    log_config_loaded(&default_path, true);
                }
            }
        }

        figment = figment
            .merge(Env::prefixed(&format!("{}_", self.env_prefix)).split(CONFIG_ENV_SEPARATOR));

        let app_config: AppConfig = figment
            .extract()
            .config_context("Failed to extract configuration")?;

        validate_app_config(&app_config)?;
        Ok(app_config)
    }

    /// Save configuration to file
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] when serialization fails, [`Error::Io`] when
    /// the file cannot be written.
    pub fn save_to_file<P: AsRef<Path>>(&self, config: &AppConfig, path: P) -> Result<()> {
        let toml_string =
            toml::to_string_pretty(config).config_context("Failed to serialize config to TOML")?;
        std::fs::write(path.as_ref(), toml_string).io_context("Failed to write config file")?;
        Ok(())
    }

    /// Get the current configuration file path
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    fn find_default_config_path() -> Option<PathBuf> {
        let current_dir = env::current_dir().ok()?;

        let candidates = [
            Some(current_dir.join(DEFAULT_CONFIG_FILENAME)),
            Some(
                current_dir
                    .join(DEFAULT_CONFIG_DIR)
                    .join(DEFAULT_CONFIG_FILENAME),
            ),
            dirs::config_dir().map(|d| d.join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILENAME)),
        ];

        candidates.into_iter().flatten().find(|path| path.exists())
    }
}

/// Validate application configuration
fn validate_app_config(config: &AppConfig) -> Result<()> {
    parse_log_level(&config.logging.level)?;
    validate_event_admin_config(config)?;
    validate_runtime_config(config)?;
    validate_configurations(config)?;
    Ok(())
}

fn validate_event_admin_config(config: &AppConfig) -> Result<()> {
    if config.event_admin.capacity == 0 {
        return Err(Error::configuration("Event queue capacity cannot be 0"));
    }
    Ok(())
}

fn validate_runtime_config(config: &AppConfig) -> Result<()> {
    if config.runtime.conditions.iter().any(|id| id.trim().is_empty()) {
        return Err(Error::configuration("Condition ids cannot be empty"));
    }
    Ok(())
}

fn validate_configurations(config: &AppConfig) -> Result<()> {
    for (pid, properties) in &config.configurations {
        if pid.trim().is_empty() {
            return Err(Error::configuration("Configuration PIDs cannot be empty"));
        }
        match properties.get(SERVICE_RANKING) {
            None | Some(PropertyValue::Integer(_)) => {}
            Some(other) => {
                return Err(Error::configuration(format!(
                    "Configuration '{}': {} must be an integer, found {}",
                    pid,
                    SERVICE_RANKING,
                    other.type_name()
                )));
            }
        }
    }
    Ok(())
}

//! Bootstrap settings.
//!
//! Settings cover what must be known before the configuration tree is
//! available: bind address, session parameters, refresh endpoints and
//! logging. They load in layers, later layers overriding earlier ones:
//!
//! 1. Built-in defaults
//! 2. TOML file
//! 3. Environment variables (`TABULA__SECTION__KEY`)
//!
//! # Example
//!
//! ```
//! use tabula_config::SettingsLoader;
//!
//! let settings = SettingsLoader::new().load().unwrap();
//! assert_eq!(settings.server.http_addr, "0.0.0.0:8080");
//! ```

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Server hosting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address to bind the HTTP listener to.
    pub http_addr: String,
    /// Seconds to wait for in-flight requests on shutdown.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:8080".to_string(),
            shutdown_timeout_secs: 30,
        }
    }
}

/// Session and authentication gate settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Server secret mixed into session fingerprints.
    pub secret: String,
    /// Session time-to-live in minutes.
    pub ttl_minutes: u64,
    /// Path prefixes exempt from fixation and CSRF checks.
    pub exempt_paths: Vec<String>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            secret: String::new(),
            ttl_minutes: 480,
            exempt_paths: vec!["/health".to_string(), "/login".to_string()],
        }
    }
}

/// Refresh job settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshSettings {
    /// URL of the remote services-description document.
    pub services_endpoint: Option<String>,
    /// URL of the remote project-catalog document.
    pub catalog_endpoint: Option<String>,
    /// Directory holding failover snapshots.
    pub failover_dir: String,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            services_endpoint: None,
            catalog_endpoint: None,
            failover_dir: "var/failover".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level filter (e.g. `info`, `tabula=debug`).
    pub level: String,
    /// Output format: `json` or `pretty`.
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

/// Complete bootstrap settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Server hosting settings.
    pub server: ServerSettings,
    /// Session settings.
    pub session: SessionSettings,
    /// Refresh settings.
    pub refresh: RefreshSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
    /// Path to the bootstrap configuration-tree XML document.
    pub config_tree_path: Option<String>,
}

impl Settings {
    /// Validates the settings after all layers have been applied.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.ttl_minutes == 0 {
            return Err(ConfigError::validation_error(
                "session.ttl_minutes must be greater than zero",
            ));
        }
        if self.server.http_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::validation_error(format!(
                "server.http_addr is not a valid socket address: {}",
                self.server.http_addr
            )));
        }
        match self.logging.format.as_str() {
            "json" | "pretty" => Ok(()),
            other => Err(ConfigError::validation_error(format!(
                "logging.format must be 'json' or 'pretty', got '{other}'"
            ))),
        }
    }
}

/// Layered settings loader.
#[derive(Debug, Default)]
pub struct SettingsLoader {
    settings: Settings,
    env_prefix: Option<String>,
}

impl SettingsLoader {
    /// Creates a loader starting from the built-in defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a TOML settings file over the current layer.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        self.settings = toml::from_str(&content)?;
        Ok(self)
    }

    /// Loads a TOML settings file when it exists, silently continuing
    /// otherwise.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Parses settings from a TOML string.
    pub fn with_string(mut self, content: &str) -> Result<Self, ConfigError> {
        self.settings = toml::from_str(content)?;
        Ok(self)
    }

    /// Loads a `.env` file, ignoring a missing file.
    #[must_use]
    pub fn with_dotenv(self) -> Self {
        let _ = dotenvy::dotenv();
        self
    }

    /// Enables environment overrides with the given prefix.
    ///
    /// Variables use `PREFIX__SECTION__KEY`, for example
    /// `TABULA__SERVER__HTTP_ADDR=127.0.0.1:9000`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Finalizes the settings: applies environment overrides and validates.
    pub fn load(mut self) -> Result<Settings, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }
        self.settings.validate()?;
        Ok(self.settings)
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        let vars: HashMap<String, String> = env::vars()
            .filter(|(k, _)| k.starts_with(prefix))
            .collect();
        for (key, value) in vars {
            self.apply_env_var(&key, &value, prefix)?;
        }
        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let stripped = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env_parse_error(key, "invalid key format"))?;

        let parts: Vec<&str> = stripped.split("__").collect();
        match parts.as_slice() {
            ["SERVER", "HTTP_ADDR"] => {
                self.settings.server.http_addr = value.to_string();
            }
            ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
                self.settings.server.shutdown_timeout_secs = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))?;
            }
            ["SESSION", "SECRET"] => {
                self.settings.session.secret = value.to_string();
            }
            ["SESSION", "TTL_MINUTES"] => {
                self.settings.session.ttl_minutes = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))?;
            }
            ["REFRESH", "SERVICES_ENDPOINT"] => {
                self.settings.refresh.services_endpoint = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }
            ["REFRESH", "CATALOG_ENDPOINT"] => {
                self.settings.refresh.catalog_endpoint = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }
            ["REFRESH", "FAILOVER_DIR"] => {
                self.settings.refresh.failover_dir = value.to_string();
            }
            ["LOGGING", "LEVEL"] => {
                self.settings.logging.level = value.to_string();
            }
            ["LOGGING", "FORMAT"] => {
                self.settings.logging.format = value.to_string();
            }
            ["CONFIG_TREE_PATH"] => {
                self.settings.config_tree_path = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }
            // Unknown key - ignore
            _ => {}
        }
        Ok(())
    }
}

//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or refreshing configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// Failed to read a configuration file.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// XML parsing error.
    #[error("failed to parse XML document: {message}")]
    Xml {
        /// Description of the parse failure.
        message: String,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// Remote document fetch failed.
    #[error("remote fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    /// Environment variable parsing error.
    #[error("failed to parse environment variable {var}: {reason}")]
    EnvParseError {
        /// The environment variable name.
        var: String,
        /// Explanation of the parsing error.
        reason: String,
    },

    /// Validation error after loading.
    #[error("configuration validation failed: {0}")]
    ValidationError(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Creates a new file not found error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Creates a new read error.
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Creates a new XML parse error.
    pub fn xml(message: impl Into<String>) -> Self {
        Self::Xml {
            message: message.into(),
        }
    }

    /// Creates a new environment variable parse error.
    pub fn env_parse_error(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvParseError {
            var: var.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new validation error.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_not_found_error() {
        let err = ConfigError::file_not_found("/etc/tabula/config.xml");
        assert!(err.to_string().contains("/etc/tabula/config.xml"));
    }

    #[test]
    fn test_xml_error() {
        let err = ConfigError::xml("unexpected end of document");
        assert!(err.to_string().contains("unexpected end of document"));
    }

    #[test]
    fn test_env_parse_error() {
        let err = ConfigError::env_parse_error("TABULA__SESSION__TTL_MINUTES", "expected integer");
        assert!(err.to_string().contains("TABULA__SESSION__TTL_MINUTES"));
        assert!(err.to_string().contains("expected integer"));
    }

    #[test]
    fn test_validation_error() {
        let err = ConfigError::validation_error("session secret must not be empty");
        assert!(err.to_string().contains("session secret"));
    }
}

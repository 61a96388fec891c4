//! Error types for Tabula.
//!
//! This module provides the [`TabulaError`] type, the standard error used
//! throughout the platform, and its [`ErrorCategory`] classification.
//!
//! The category → HTTP mapping follows the platform's error design: every
//! denial in the access class (authentication, authorization, session
//! fixation, CSRF) maps to 403, missing configuration entries surface as
//! not-found, and upstream outages surface as 503 while the request
//! continues in degraded mode where the caller allows it.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`TabulaError`].
pub type TabulaResult<T> = Result<T, TabulaError>;

/// Categories of errors for classification and handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Request validation errors (malformed parameters, unknown format).
    Validation,
    /// Authentication failures (missing/invalid session or token).
    Authentication,
    /// Authorization denials (page not reachable, CSRF, fixation).
    AccessDenied,
    /// Missing configuration, project or service entry.
    NotFound,
    /// Upstream/sibling service unavailable.
    Upstream,
    /// Internal server errors.
    Internal,
}

impl ErrorCategory {
    /// Returns the default HTTP status code for this error category.
    ///
    /// Authentication failures intentionally map to 403 rather than 401:
    /// the platform never issues challenge responses, a failed gate is a
    /// terminal denial.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::Authentication | Self::AccessDenied => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Upstream => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Standard error type for Tabula.
///
/// # Example
///
/// ```
/// use tabula_core::{TabulaError, ErrorCategory};
///
/// fn lookup(project: &str) -> Result<(), TabulaError> {
///     Err(TabulaError::not_found("unknown project", Some(project.to_string())))
/// }
///
/// let err = lookup("p1").unwrap_err();
/// assert_eq!(err.category(), ErrorCategory::NotFound);
/// ```
#[derive(Error, Debug)]
pub enum TabulaError {
    /// Request validation failed.
    #[error("validation error: {message}")]
    Validation {
        /// Human-readable error message.
        message: String,
    },

    /// Authentication failed.
    #[error("authentication failed: {message}")]
    Authentication {
        /// Human-readable error message.
        message: String,
    },

    /// Access denied.
    #[error("access denied: {message}")]
    AccessDenied {
        /// Human-readable error message.
        message: String,
        /// The page that was requested, if resolved.
        page_id: Option<String>,
    },

    /// Resource not found.
    #[error("not found: {message}")]
    NotFound {
        /// Human-readable error message.
        message: String,
        /// The identifier of the resource.
        resource_id: Option<String>,
    },

    /// Upstream service unavailable.
    #[error("upstream unavailable: {message}")]
    Upstream {
        /// Human-readable error message.
        message: String,
        /// The id of the unavailable service.
        service: Option<String>,
    },

    /// Internal server error.
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error (not exposed to clients).
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl TabulaError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Creates an access-denied error.
    pub fn access_denied(message: impl Into<String>, page_id: Option<String>) -> Self {
        Self::AccessDenied {
            message: message.into(),
            page_id,
        }
    }

    /// Creates a not-found error.
    pub fn not_found(message: impl Into<String>, resource_id: Option<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            resource_id,
        }
    }

    /// Creates an upstream-unavailable error.
    pub fn upstream(message: impl Into<String>, service: Option<String>) -> Self {
        Self::Upstream {
            message: message.into(),
            service,
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error wrapping a source error.
    pub fn internal_with_source(message: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Returns the category of this error.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::Authentication { .. } => ErrorCategory::Authentication,
            Self::AccessDenied { .. } => ErrorCategory::AccessDenied,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Upstream { .. } => ErrorCategory::Upstream,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.category().default_status_code()
    }

    /// Returns the client-facing message.
    ///
    /// Internal error details (sources) are never included.
    #[must_use]
    pub fn client_message(&self) -> &str {
        match self {
            Self::Validation { message }
            | Self::Authentication { message }
            | Self::AccessDenied { message, .. }
            | Self::NotFound { message, .. }
            | Self::Upstream { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }
}

//! # Tabula Telemetry
//!
//! Structured logging bootstrap for the Tabularium platform: JSON or
//! pretty output via `tracing-subscriber`, with env-filter level control
//! and the canonical request log field names used across crates.

#![doc(html_root_url = "https://docs.rs/tabula-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{fields, init_logging, LogConfig};

//! Health endpoint.
//!
//! `/health` is served outside the pipeline: probes carry no session and
//! must never be subject to the gate.

use std::time::Instant;

use serde::Serialize;

/// Health status response body.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HealthStatus {
    /// Service status, currently always `healthy` while the process runs.
    pub status: &'static str,
    /// Service name.
    pub service: String,
    /// Service version.
    pub version: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
}

/// Liveness check state.
#[derive(Debug, Clone)]
pub struct HealthCheck {
    service: String,
    version: String,
    started: Instant,
}

impl HealthCheck {
    /// Creates a health check for the given service.
    #[must_use]
    pub fn new(service: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            version: version.into(),
            started: Instant::now(),
        }
    }

    /// Current status snapshot.
    #[must_use]
    pub fn status(&self) -> HealthStatus {
        HealthStatus {
            status: "healthy",
            service: self.service.clone(),
            version: self.version.clone(),
            uptime_secs: self.started.elapsed().as_secs(),
        }
    }
}

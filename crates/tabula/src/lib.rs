//! # Tabula
//!
//! **The request-processing core of the Tabularium filing platform.**
//!
//! Tabula provides the shared machinery of the platform's web services:
//!
//! - **Configuration tree** – process-wide XML document tree with
//!   path-expression lookups, atomic replacement and scheduled refresh
//!   with on-disk failover
//! - **Service locator** – `(service, method) → URL` resolution with a
//!   generation-invalidated cache
//! - **Fixed request pipeline** – request/project variable resolution,
//!   session authentication gate (fixation + CSRF), stripped-hierarchy
//!   authorization
//! - **Scheduled jobs** – cadence-based refresh, sync and retirement
//!   tasks with per-run failure isolation
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tabula::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = SettingsLoader::new()
//!         .with_optional_file("tabula.toml")?
//!         .with_env_prefix("TABULA")
//!         .load()?;
//!
//!     let mut dispatcher = PageDispatcher::new();
//!     dispatcher.register("home", |ctx| async move {
//!         Ok(format!("hello {}", ctx.caller().log_id()))
//!     });
//!
//!     let app = Arc::new(App::bootstrap(settings.clone(), dispatcher)?);
//!     app.scheduler.start()?;
//!
//!     let server = Server::new(ServerConfig::from_settings(&settings), app);
//!     server.run().await
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/tabula/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use tabula_core as core;

// Re-export the configuration tree and settings
pub use tabula_config as config;

// Re-export the service locator
pub use tabula_locator as locator;

// Re-export the hierarchy and RBAC stripping
pub use tabula_hierarchy as hierarchy;

// Re-export the request pipeline
pub use tabula_middleware as middleware;

// Re-export background jobs
pub use tabula_tasks as tasks;

// Re-export telemetry
pub use tabula_telemetry as telemetry;

// Re-export the HTTP host
pub use tabula_server as server;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use tabula::prelude::*;
/// ```
pub mod prelude {
    pub use tabula_core::{
        Caller, ErrorCategory, PermissionSet, ProjectVariables, RequestContext, RequestId,
        RequestVariables, ReturnKind, TabulaError, TabulaResult, TenantId, UserIdentity,
    };

    pub use tabula_config::{
        ConfigNode, ConfigStore, SectionRefresher, Settings, SettingsLoader,
    };

    pub use tabula_locator::ServiceLocator;

    pub use tabula_hierarchy::{HierarchyStore, PageNode, SiteHierarchy};

    pub use tabula_middleware::{
        GateConfig, GateState, MiddlewareContext, Pipeline, SessionStore, StrippedHierarchy,
    };

    pub use tabula_tasks::{Cadence, JobId, Scheduler};

    pub use tabula_telemetry::{init_logging, LogConfig};

    pub use tabula_server::{App, PageDispatcher, Server, ServerConfig, ShutdownSignal};
}

//! # Tabula Middleware
//!
//! The fixed-order request pipeline of the Tabularium platform.
//!
//! Every request flows through the same stages in the same order:
//!
//! ```text
//! Request → RequestVars → Project → Session → Access → Handler
//!                                                         ↓
//! Response ←──────────────────── Telemetry ←─────────────┘
//! ```
//!
//! | Stage | Purpose                                            |
//! |-------|----------------------------------------------------|
//! | 1     | Resolve request variables (tenant, page id, format)|
//! | 2     | Resolve project context from parameters + config   |
//! | 3     | Authentication gate (sessions, fixation, CSRF)     |
//! | 4     | Stripped-hierarchy access enforcement              |
//! | 5     | Request completion telemetry (post-handler)        |
//!
//! A denial at any pre-handler stage short-circuits the pipeline with a
//! 403 in the request's negotiated representation; no later stage or
//! handler runs.

#![doc(html_root_url = "https://docs.rs/tabula-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod context;
pub mod middleware;
pub mod pipeline;
pub mod session;
pub mod stages;
pub mod types;

pub use context::MiddlewareContext;
pub use middleware::{BoxFuture, FnMiddleware, Middleware, Next};
pub use pipeline::{Pipeline, PipelineBuilder, Stage};
pub use session::{SessionRecord, SessionStore};
pub use stages::{GateConfig, GateState, StrippedHierarchy};
pub use types::{Request, Response, ResponseExt};

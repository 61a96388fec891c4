//! # Tabula Server
//!
//! HTTP host for the Tabularium request platform.
//!
//! This crate assembles the shared components ([`App`]), serves them
//! behind a hyper http1 accept loop ([`Server`]) with the fixed request
//! pipeline in front of every page, and runs the scheduled refresh jobs
//! ([`jobs`]). `/health` is answered outside the pipeline; everything
//! else is dispatched by resolved page id ([`PageDispatcher`]).

#![doc(html_root_url = "https://docs.rs/tabula-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;
mod dispatch;
mod health;
pub mod jobs;
mod locks;
mod server;
mod shutdown;

pub use app::App;
pub use dispatch::{PageDispatcher, PageHandler};
pub use health::{HealthCheck, HealthStatus};
pub use locks::{EditLock, LockError, LockRegistry};
pub use server::{Server, ServerConfig};
pub use shutdown::ShutdownSignal;

//! # Tabula Core
//!
//! Core types for the Tabularium request platform.
//!
//! This crate provides the foundational types used throughout Tabula:
//!
//! - [`RequestVariables`] / [`ProjectVariables`] - Per-request resolved state
//! - [`RequestContext`] - Immutable per-request snapshot handed to handlers
//! - [`RequestId`] - UUID v7 request identifier
//! - [`Caller`] - Authenticated caller (User, Service, Anonymous)
//! - [`PermissionSet`] - Permission grants used by hierarchy stripping
//! - [`TabulaError`] - Standard error types

#![doc(html_root_url = "https://docs.rs/tabula-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;
mod identity;
mod permission;

pub use context::{
    OutputChannel, ProjectPaths, ProjectVariables, RequestContext, RequestId, RequestVariables,
    ReturnKind, TenantId,
};
pub use error::{ErrorCategory, TabulaError, TabulaResult};
pub use identity::{Caller, ServiceIdentity, UserIdentity};
pub use permission::PermissionSet;

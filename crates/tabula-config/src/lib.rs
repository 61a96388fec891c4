//! # Tabula Config
//!
//! Configuration for the Tabularium platform, in two halves:
//!
//! - **Bootstrap settings** ([`Settings`], [`SettingsLoader`]): the layered
//!   defaults → TOML → environment values needed before anything else can
//!   start (bind address, session secret, refresh endpoints, logging).
//! - **The configuration tree** ([`ConfigNode`], [`ConfigStore`]): the
//!   process-wide XML document tree holding service registrations, editors,
//!   projects and locations, queried via path expressions and replaced
//!   atomically by the scheduled refreshers ([`SectionRefresher`]).

#![doc(html_root_url = "https://docs.rs/tabula-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod refresh;
mod settings;
mod store;
mod tree;

pub use error::ConfigError;
pub use refresh::{
    sweep_stale_snapshots, RefreshOutcome, SectionRefresher, STATUS_ATTR, STATUS_UNAVAILABLE,
};
pub use settings::{
    LoggingSettings, RefreshSettings, ServerSettings, SessionSettings, Settings, SettingsLoader,
};
pub use store::ConfigStore;
pub use tree::ConfigNode;

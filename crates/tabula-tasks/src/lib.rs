//! # Tabula Tasks
//!
//! Scheduled background jobs for the Tabularium platform.
//!
//! The platform's background work — configuration refresh, catalog sync,
//! session and lock retirement, snapshot sweeping — runs on a small set
//! of coarse cadences. The [`Scheduler`] ticks once a second, spawns each
//! due job on its own task, and records outcomes; a failing or panicking
//! job never cancels the loop or its siblings.
//!
//! # Example
//!
//! ```no_run
//! use tabula_tasks::{Cadence, Scheduler};
//!
//! # async fn example() -> Result<(), tabula_tasks::TaskError> {
//! let scheduler = Scheduler::new();
//! scheduler.register("services-refresh", Cadence::Minutes(1), || async {
//!     // refresh work
//!     Ok(())
//! })?;
//! scheduler.start()?;
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/tabula-tasks/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod scheduler;

pub use error::{TaskError, TaskResult};
pub use scheduler::{Cadence, JobFn, JobId, JobInfo, Scheduler};

//! Remote configuration refresh with on-disk failover.
//!
//! A [`SectionRefresher`] periodically re-fetches one remote XML document
//! (services description, project catalog) and installs it as a section of
//! the shared [`ConfigStore`](crate::ConfigStore). The installation is a
//! replace-as-unit: readers either see the old section or the new one.
//!
//! On a successful fetch the document is also written to an on-disk
//! failover snapshot (write-temp-then-rename). When the remote source is
//! unavailable, the snapshot is installed instead with every entry marked
//! `status="503"` — entries are degraded, never removed. When neither
//! source is available the current tree is left untouched and the failure
//! is reported to the scheduler.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::ConfigError;
use crate::store::ConfigStore;
use crate::tree::ConfigNode;

/// Attribute used to mark an entry as unavailable.
pub const STATUS_ATTR: &str = "status";

/// Marker value for unavailable entries (HTTP 503 equivalent).
pub const STATUS_UNAVAILABLE: &str = "503";

/// How a refresh round concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The remote document was fetched and installed.
    Live,
    /// The remote source failed; the failover snapshot was installed with
    /// its entries marked unavailable.
    Failover,
}

/// Refreshes one section of the configuration tree from a remote document.
pub struct SectionRefresher {
    store: Arc<ConfigStore>,
    client: reqwest::Client,
    endpoint: String,
    section: String,
    failover_path: PathBuf,
}

impl SectionRefresher {
    /// Creates a refresher for the given section.
    ///
    /// `section` must equal the root element name of the remote document
    /// (e.g. `services`); documents with a different root are rejected.
    #[must_use]
    pub fn new(
        store: Arc<ConfigStore>,
        endpoint: impl Into<String>,
        section: impl Into<String>,
        failover_dir: impl AsRef<Path>,
    ) -> Self {
        let section = section.into();
        let failover_path = failover_dir.as_ref().join(format!("{section}.xml"));
        Self {
            store,
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            section,
            failover_path,
        }
    }

    /// The section this refresher maintains.
    #[must_use]
    pub fn section(&self) -> &str {
        &self.section
    }

    /// Runs one refresh round.
    ///
    /// Returns an error only when both the remote source and the failover
    /// snapshot are unusable; the configuration tree is untouched in that
    /// case.
    pub async fn refresh(&self) -> Result<RefreshOutcome, ConfigError> {
        match self.fetch_remote().await {
            Ok(section) => {
                self.store.replace_section(section.clone());
                if let Err(err) = self.write_failover(&section) {
                    // The live tree is already updated; a failed snapshot
                    // only matters for the next outage.
                    warn!(
                        section = %self.section,
                        error = %err,
                        "failed to write failover snapshot"
                    );
                }
                info!(section = %self.section, "configuration section refreshed");
                Ok(RefreshOutcome::Live)
            }
            Err(fetch_err) => {
                warn!(
                    section = %self.section,
                    endpoint = %self.endpoint,
                    error = %fetch_err,
                    "remote refresh failed, falling back to snapshot"
                );
                let mut section = ConfigNode::from_xml_file(&self.failover_path)?;
                mark_unavailable(&mut section);
                self.store.replace_section(section);
                info!(section = %self.section, "failover snapshot installed");
                Ok(RefreshOutcome::Failover)
            }
        }
    }

    async fn fetch_remote(&self) -> Result<ConfigNode, ConfigError> {
        let body = self
            .client
            .get(&self.endpoint)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let node = ConfigNode::from_xml_str(&body)?;
        if node.name() != self.section {
            return Err(ConfigError::validation_error(format!(
                "expected <{}> document, got <{}>",
                self.section,
                node.name()
            )));
        }
        Ok(node)
    }

    fn write_failover(&self, section: &ConfigNode) -> Result<(), ConfigError> {
        if let Some(dir) = self.failover_path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let tmp = self.failover_path.with_extension("xml.tmp");
        std::fs::write(&tmp, section.to_xml())?;
        std::fs::rename(&tmp, &self.failover_path)?;
        Ok(())
    }
}

/// Marks every direct child entry of a section as unavailable.
fn mark_unavailable(section: &mut ConfigNode) {
    for entry in section.children_mut() {
        entry.set_attr(STATUS_ATTR, STATUS_UNAVAILABLE);
    }
}

/// Removes orphaned `.tmp` snapshot files left behind by interrupted
/// failover writes. Returns the number of files removed.
pub fn sweep_stale_snapshots(failover_dir: impl AsRef<Path>) -> Result<usize, ConfigError> {
    let dir = failover_dir.as_ref();
    if !dir.exists() {
        return Ok(0);
    }
    let mut removed = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|e| e == "tmp") {
            std::fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}

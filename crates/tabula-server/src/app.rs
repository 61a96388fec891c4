//! Application assembly.
//!
//! [`App::bootstrap`] wires the shared state from the bootstrap settings:
//! configuration tree, hierarchy, sessions, locator, locks, the standard
//! pipeline and the scheduled jobs. One `App` lives for the process
//! lifetime and is shared by every connection.

use std::sync::Arc;
use std::time::Duration;

use tabula_config::{ConfigNode, ConfigStore, Settings};
use tabula_hierarchy::HierarchyStore;
use tabula_locator::ServiceLocator;
use tabula_middleware::{GateConfig, Pipeline, SessionStore};
use tabula_tasks::Scheduler;

use crate::dispatch::PageDispatcher;
use crate::jobs::register_standard_jobs;
use crate::locks::LockRegistry;

/// Default edit-lock TTL.
const LOCK_TTL: Duration = Duration::from_secs(15 * 60);

/// The assembled application.
pub struct App {
    /// Bootstrap settings the app was built from.
    pub settings: Settings,
    /// Shared configuration tree.
    pub config: Arc<ConfigStore>,
    /// Shared site hierarchy.
    pub hierarchy: Arc<HierarchyStore>,
    /// Session store.
    pub sessions: Arc<SessionStore>,
    /// Sibling-service locator.
    pub locator: Arc<ServiceLocator>,
    /// Edit-lock registry.
    pub locks: Arc<LockRegistry>,
    /// The request pipeline.
    pub pipeline: Arc<Pipeline>,
    /// Page dispatcher.
    pub dispatcher: Arc<PageDispatcher>,
    /// Background job scheduler.
    pub scheduler: Arc<Scheduler>,
}

impl App {
    /// Assembles the application from settings and registered handlers.
    ///
    /// Loads the bootstrap configuration tree (when a path is set),
    /// builds the hierarchy from it, wires the standard pipeline and
    /// registers the scheduled jobs. The scheduler is returned stopped;
    /// the host starts it.
    pub fn bootstrap(settings: Settings, dispatcher: PageDispatcher) -> anyhow::Result<Self> {
        let config = match &settings.config_tree_path {
            Some(path) => Arc::new(ConfigStore::new(ConfigNode::from_xml_file(path)?)),
            None => Arc::new(ConfigStore::empty()),
        };

        let hierarchy = Arc::new(HierarchyStore::empty());
        hierarchy.rebuild_from(&config.snapshot())?;

        let sessions = Arc::new(SessionStore::new(
            settings.session.secret.clone(),
            Duration::from_secs(settings.session.ttl_minutes * 60),
        ));
        let locator = Arc::new(ServiceLocator::new(config.clone()));
        let locks = Arc::new(LockRegistry::new(LOCK_TTL));

        let gate = GateConfig {
            exempt_paths: settings.session.exempt_paths.clone(),
            trusted_services: registered_service_ids(&config),
        };
        let pipeline = Arc::new(Pipeline::standard(
            config.clone(),
            hierarchy.clone(),
            sessions.clone(),
            gate,
        ));

        let scheduler = Arc::new(Scheduler::new());
        register_standard_jobs(
            &scheduler,
            &settings,
            config.clone(),
            hierarchy.clone(),
            sessions.clone(),
            locks.clone(),
        )?;

        Ok(Self {
            settings,
            config,
            hierarchy,
            sessions,
            locator,
            locks,
            pipeline,
            dispatcher: Arc::new(dispatcher),
            scheduler,
        })
    }
}

/// Service ids registered in the configuration tree; these are the
/// identities accepted in the `X-Tx-Service` header.
fn registered_service_ids(config: &ConfigStore) -> Vec<String> {
    config
        .snapshot()
        .select_all("services/service")
        .iter()
        .filter_map(|svc| svc.attr("id").map(str::to_string))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CONFIG_XML: &str = r#"<configuration>
  <services>
    <service id="svc-pdf" domain="https://pdf.internal" path="/render"/>
  </services>
  <projects>
    <project id="handbook" default-version="v1"/>
  </projects>
  <hierarchy>
    <page id="home" slug="" title="Home"/>
  </hierarchy>
</configuration>"#;

    fn settings_with_tree() -> (tempfile::TempDir, Settings) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("configuration.xml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(CONFIG_XML.as_bytes()).unwrap();

        let mut settings = Settings::default();
        settings.config_tree_path = Some(path.to_string_lossy().into_owned());
        settings.session.secret = "bootstrap-secret".to_string();
        (dir, settings)
    }

    #[test]
    fn test_bootstrap_wires_everything() {
        let (_dir, settings) = settings_with_tree();
        let app = App::bootstrap(settings, PageDispatcher::new()).unwrap();

        assert!(app.hierarchy.load().contains("home"));
        assert_eq!(
            app.locator.resolve("svc-pdf", "render").as_deref(),
            Some("https://pdf.internal/render")
        );
        // Retirement and snapshot sweep are always registered.
        assert_eq!(app.scheduler.job_count(), 2);
        assert_eq!(app.pipeline.stage_count(), 5);
    }

    #[test]
    fn test_bootstrap_without_tree() {
        let app = App::bootstrap(Settings::default(), PageDispatcher::new()).unwrap();
        assert!(app.hierarchy.load().pages().is_empty());
        assert!(app.locator.resolve("any", "method").is_none());
    }

    #[test]
    fn test_bootstrap_rejects_missing_tree_file() {
        let mut settings = Settings::default();
        settings.config_tree_path = Some("/nonexistent/configuration.xml".to_string());
        assert!(App::bootstrap(settings, PageDispatcher::new()).is_err());
    }

    #[test]
    fn test_registered_service_ids_feed_the_gate() {
        let (_dir, settings) = settings_with_tree();
        let app = App::bootstrap(settings, PageDispatcher::new()).unwrap();
        let ids = registered_service_ids(&app.config);
        assert_eq!(ids, vec!["svc-pdf".to_string()]);
    }
}

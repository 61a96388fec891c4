//! Standard scheduled jobs.
//!
//! The platform runs four background jobs:
//!
//! | Job              | Cadence      | Work                                    |
//! |------------------|--------------|-----------------------------------------|
//! | services-refresh | every minute | refresh service registrations, rebuild  |
//! |                  |              | the hierarchy from the new tree         |
//! | catalog-sync     | every 2 min  | sync the remote project catalog         |
//! | retire-stale     | every 5 min  | retire expired sessions and edit locks  |
//! | snapshot-sweep   | daily 03:00  | remove orphaned failover temp files     |
//!
//! Jobs whose endpoint is not configured are simply not registered. Each
//! job completes or fails on its own; failures are counted by the
//! scheduler and surface in the logs.

use std::sync::Arc;

use tracing::info;

use tabula_config::{sweep_stale_snapshots, ConfigStore, SectionRefresher, Settings};
use tabula_hierarchy::HierarchyStore;
use tabula_middleware::SessionStore;
use tabula_tasks::{Cadence, JobId, Scheduler, TaskResult};

use crate::locks::LockRegistry;

/// Registers the standard platform jobs on the scheduler.
///
/// Returns the ids of the registered jobs, in registration order.
pub fn register_standard_jobs(
    scheduler: &Scheduler,
    settings: &Settings,
    config: Arc<ConfigStore>,
    hierarchy: Arc<HierarchyStore>,
    sessions: Arc<SessionStore>,
    locks: Arc<LockRegistry>,
) -> TaskResult<Vec<JobId>> {
    let mut ids = Vec::new();

    if let Some(endpoint) = &settings.refresh.services_endpoint {
        let refresher = Arc::new(SectionRefresher::new(
            config.clone(),
            endpoint,
            "services",
            &settings.refresh.failover_dir,
        ));
        let config = config.clone();
        let hierarchy = hierarchy.clone();
        ids.push(scheduler.register("services-refresh", Cadence::Minutes(1), move || {
            let refresher = refresher.clone();
            let config = config.clone();
            let hierarchy = hierarchy.clone();
            async move {
                refresher.refresh().await?;
                // Keep page routing in lockstep with the refreshed tree.
                hierarchy.rebuild_from(&config.snapshot())?;
                Ok(())
            }
        })?);
    }

    if let Some(endpoint) = &settings.refresh.catalog_endpoint {
        let refresher = Arc::new(SectionRefresher::new(
            config,
            endpoint,
            "projects",
            &settings.refresh.failover_dir,
        ));
        ids.push(scheduler.register("catalog-sync", Cadence::Minutes(2), move || {
            let refresher = refresher.clone();
            async move {
                refresher.refresh().await?;
                Ok(())
            }
        })?);
    }

    ids.push(scheduler.register("retire-stale", Cadence::Minutes(5), move || {
        let sessions = sessions.clone();
        let locks = locks.clone();
        async move {
            let retired_sessions = sessions.retire_expired();
            let retired_locks = locks.retire_stale();
            if retired_sessions + retired_locks > 0 {
                info!(retired_sessions, retired_locks, "retired stale artifacts");
            }
            Ok(())
        }
    })?);

    let failover_dir = settings.refresh.failover_dir.clone();
    ids.push(scheduler.register(
        "snapshot-sweep",
        Cadence::Daily { hour: 3, minute: 0 },
        move || {
            let failover_dir = failover_dir.clone();
            async move {
                let removed = sweep_stale_snapshots(&failover_dir)?;
                if removed > 0 {
                    info!(removed, "swept orphaned failover files");
                }
                Ok(())
            }
        },
    )?);

    Ok(ids)
}

//! Cadence-based job scheduler.
//!
//! The platform's background work is a small, fixed set of refresh jobs
//! running on coarse cadences (every 1/2/5 minutes, daily). Jobs return
//! `anyhow::Result<()>`; a failed or panicking run is logged and counted
//! and never affects the scheduler loop or sibling jobs — each run is
//! spawned on its own task and observed at the join point.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule;
use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::{TaskError, TaskResult};

/// Type alias for async job functions.
pub type JobFn =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>> + Send + Sync>;

/// Unique identifier for a scheduled job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(Uuid);

impl JobId {
    /// Generates a new unique job ID.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The coarse cadences the platform schedules jobs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Every `n` minutes, on the minute.
    Minutes(u32),
    /// Once a day at the given UTC time.
    Daily {
        /// Hour of day (0-23).
        hour: u8,
        /// Minute of hour (0-59).
        minute: u8,
    },
}

impl Cadence {
    /// The cron expression for this cadence.
    #[must_use]
    pub fn cron_expr(&self) -> String {
        match self {
            Self::Minutes(1) => "0 * * * * *".to_string(),
            Self::Minutes(n) => format!("0 */{n} * * * *"),
            Self::Daily { hour, minute } => format!("0 {minute} {hour} * * *"),
        }
    }
}

/// Information about a scheduled job.
#[derive(Debug, Clone)]
pub struct JobInfo {
    /// Job ID.
    pub id: JobId,
    /// Job name.
    pub name: String,
    /// Cron expression the job runs on.
    pub cron: String,
    /// Whether the job is enabled.
    pub enabled: bool,
    /// Last run time.
    pub last_run: Option<DateTime<Utc>>,
    /// Next scheduled run time.
    pub next_run: Option<DateTime<Utc>>,
    /// Number of completed runs (successful or failed).
    pub run_count: u64,
    /// Number of failed runs (errors and panics).
    pub fail_count: u64,
}

struct JobEntry {
    info: Arc<RwLock<JobInfo>>,
    schedule: Schedule,
    func: JobFn,
}

/// Cadence-based job scheduler.
pub struct Scheduler {
    jobs: Arc<DashMap<JobId, Arc<JobEntry>>>,
    tick_interval: Duration,
    running: AtomicBool,
    shutdown_tx: RwLock<Option<mpsc::Sender<()>>>,
    loop_handle: RwLock<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Creates a scheduler with the default one-second tick.
    pub fn new() -> Self {
        Self::with_tick_interval(Duration::from_secs(1))
    }

    /// Creates a scheduler with a custom tick interval.
    pub fn with_tick_interval(tick_interval: Duration) -> Self {
        Self {
            jobs: Arc::new(DashMap::new()),
            tick_interval,
            running: AtomicBool::new(false),
            shutdown_tx: RwLock::new(None),
            loop_handle: RwLock::new(None),
        }
    }

    /// Whether the scheduler loop is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Number of registered jobs.
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Registers a job on a platform cadence.
    pub fn register<F, Fut>(&self, name: impl Into<String>, cadence: Cadence, func: F) -> TaskResult<JobId>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register_cron(name, &cadence.cron_expr(), func)
    }

    /// Registers a job on a raw cron expression.
    pub fn register_cron<F, Fut>(
        &self,
        name: impl Into<String>,
        cron_expr: &str,
        func: F,
    ) -> TaskResult<JobId>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let name = name.into();
        let schedule: Schedule = cron_expr
            .parse()
            .map_err(|e: cron::error::Error| TaskError::invalid_cron(e.to_string()))?;

        let id = JobId::new();
        let info = JobInfo {
            id,
            name: name.clone(),
            cron: cron_expr.to_string(),
            enabled: true,
            last_run: None,
            next_run: schedule.upcoming(Utc).next(),
            run_count: 0,
            fail_count: 0,
        };

        let func: JobFn = Arc::new(move || Box::pin(func()));
        self.jobs.insert(
            id,
            Arc::new(JobEntry {
                info: Arc::new(RwLock::new(info)),
                schedule,
                func,
            }),
        );
        info!(job_id = %id, job_name = %name, cron = %cron_expr, "registered scheduled job");
        Ok(id)
    }

    /// Unregisters a job.
    pub fn unregister(&self, id: JobId) -> TaskResult<()> {
        self.jobs.remove(&id).ok_or_else(|| TaskError::not_found(id))?;
        Ok(())
    }

    /// Enables a job.
    pub fn enable(&self, id: JobId) -> TaskResult<()> {
        let entry = self.jobs.get(&id).ok_or_else(|| TaskError::not_found(id))?;
        entry.info.write().enabled = true;
        Ok(())
    }

    /// Disables a job without unregistering it.
    pub fn disable(&self, id: JobId) -> TaskResult<()> {
        let entry = self.jobs.get(&id).ok_or_else(|| TaskError::not_found(id))?;
        entry.info.write().enabled = false;
        Ok(())
    }

    /// Returns job info.
    pub fn get_job(&self, id: JobId) -> Option<JobInfo> {
        self.jobs.get(&id).map(|e| e.info.read().clone())
    }

    /// Lists all jobs.
    pub fn list_jobs(&self) -> Vec<JobInfo> {
        self.jobs.iter().map(|e| e.value().info.read().clone()).collect()
    }

    /// Runs a job immediately, out of schedule.
    pub fn run_now(&self, id: JobId) -> TaskResult<()> {
        let entry = self.jobs.get(&id).ok_or_else(|| TaskError::not_found(id))?;
        spawn_run(entry.value().clone());
        Ok(())
    }

    /// Starts the scheduler loop.
    pub fn start(&self) -> TaskResult<()> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(TaskError::AlreadyRunning);
        }

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        *self.shutdown_tx.write() = Some(shutdown_tx);

        let jobs = self.jobs.clone();
        let tick_interval = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick_interval);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let now = Utc::now();
                        for entry in jobs.iter() {
                            let job = entry.value();
                            let due = {
                                let info = job.info.read();
                                info.enabled && info.next_run.is_some_and(|next| next <= now)
                            };
                            if !due {
                                continue;
                            }

                            debug!(job_id = %entry.key(), "executing scheduled job");
                            spawn_run(job.clone());

                            let mut info = job.info.write();
                            info.last_run = Some(now);
                            info.next_run = job.schedule.upcoming(Utc).next();
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("scheduler received shutdown signal");
                        break;
                    }
                }
            }
        });

        *self.loop_handle.write() = Some(handle);
        info!("scheduler started");
        Ok(())
    }

    /// Stops the scheduler loop. In-flight job runs keep running to
    /// completion on their own tasks.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(tx) = self.shutdown_tx.write().take() {
            let _ = tx.send(()).await;
        }
        if let Some(handle) = self.loop_handle.write().take() {
            let _ = handle.await;
        }
        info!("scheduler stopped");
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if self.running.load(Ordering::Acquire) {
            if let Some(tx) = self.shutdown_tx.write().take() {
                let _ = tx.try_send(());
            }
        }
    }
}

/// Runs one job execution on its own task, recording the outcome.
///
/// The run is double-spawned so a panic inside the job is caught at the
/// join point instead of unwinding into the scheduler loop.
fn spawn_run(entry: Arc<JobEntry>) {
    let func = entry.func.clone();
    let info = entry.info.clone();

    tokio::spawn(async move {
        let name = info.read().name.clone();
        let run = tokio::spawn(async move { func().await });

        match run.await {
            Ok(Ok(())) => {
                info.write().run_count += 1;
            }
            Ok(Err(err)) => {
                error!(job_name = %name, error = %err, "scheduled job failed");
                let mut info = info.write();
                info.run_count += 1;
                info.fail_count += 1;
            }
            Err(join_err) => {
                if join_err.is_panic() {
                    error!(job_name = %name, "scheduled job panicked");
                } else {
                    error!(job_name = %name, "scheduled job was cancelled");
                }
                let mut info = info.write();
                info.run_count += 1;
                info.fail_count += 1;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_cadence_cron_expressions() {
        assert_eq!(Cadence::Minutes(1).cron_expr(), "0 * * * * *");
        assert_eq!(Cadence::Minutes(5).cron_expr(), "0 */5 * * * *");
        assert_eq!(
            Cadence::Daily { hour: 3, minute: 30 }.cron_expr(),
            "0 30 3 * * *"
        );
    }

    #[test]
    fn test_cadence_expressions_parse() {
        for cadence in [
            Cadence::Minutes(1),
            Cadence::Minutes(2),
            Cadence::Minutes(5),
            Cadence::Daily { hour: 3, minute: 0 },
        ] {
            assert!(cadence.cron_expr().parse::<Schedule>().is_ok());
        }
    }

    #[test]
    fn test_register_job() {
        let scheduler = Scheduler::new();
        let id = scheduler
            .register("services-refresh", Cadence::Minutes(1), || async { Ok(()) })
            .unwrap();

        let job = scheduler.get_job(id).unwrap();
        assert_eq!(job.name, "services-refresh");
        assert!(job.enabled);
        assert!(job.next_run.is_some());
    }

    #[test]
    fn test_register_invalid_cron() {
        let scheduler = Scheduler::new();
        assert!(scheduler
            .register_cron("bad", "not-cron", || async { Ok(()) })
            .is_err());
    }

    #[test]
    fn test_unregister_job() {
        let scheduler = Scheduler::new();
        let id = scheduler
            .register("temp", Cadence::Minutes(5), || async { Ok(()) })
            .unwrap();
        assert!(scheduler.unregister(id).is_ok());
        assert!(scheduler.get_job(id).is_none());
    }

    #[test]
    fn test_enable_disable() {
        let scheduler = Scheduler::new();
        let id = scheduler
            .register("toggle", Cadence::Minutes(5), || async { Ok(()) })
            .unwrap();

        scheduler.disable(id).unwrap();
        assert!(!scheduler.get_job(id).unwrap().enabled);
        scheduler.enable(id).unwrap();
        assert!(scheduler.get_job(id).unwrap().enabled);
    }

    #[tokio::test]
    async fn test_run_now_records_success() {
        let scheduler = Scheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        let id = scheduler
            .register("immediate", Cadence::Daily { hour: 0, minute: 0 }, move || {
                let c = counter_clone.clone();
                async move {
                    c.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                }
            })
            .unwrap();

        scheduler.run_now(id).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(counter.load(Ordering::Relaxed), 1);
        let job = scheduler.get_job(id).unwrap();
        assert_eq!(job.run_count, 1);
        assert_eq!(job.fail_count, 0);
    }

    #[tokio::test]
    async fn test_failed_run_is_counted() {
        let scheduler = Scheduler::new();
        let id = scheduler
            .register("failing", Cadence::Daily { hour: 0, minute: 0 }, || async {
                Err(anyhow::anyhow!("remote unreachable"))
            })
            .unwrap();

        scheduler.run_now(id).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let job = scheduler.get_job(id).unwrap();
        assert_eq!(job.run_count, 1);
        assert_eq!(job.fail_count, 1);
    }

    #[tokio::test]
    async fn test_panicking_job_does_not_poison_others() {
        let scheduler = Scheduler::new();
        let panicking = scheduler
            .register("panics", Cadence::Daily { hour: 0, minute: 0 }, || async {
                panic!("boom")
            })
            .unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();
        let healthy = scheduler
            .register("healthy", Cadence::Daily { hour: 0, minute: 0 }, move || {
                let c = counter_clone.clone();
                async move {
                    c.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                }
            })
            .unwrap();

        scheduler.run_now(panicking).unwrap();
        scheduler.run_now(healthy).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(counter.load(Ordering::Relaxed), 1);
        assert_eq!(scheduler.get_job(panicking).unwrap().fail_count, 1);
        assert_eq!(scheduler.get_job(healthy).unwrap().fail_count, 0);
    }

    #[tokio::test]
    async fn test_scheduler_start_stop() {
        let scheduler = Scheduler::new();
        scheduler.start().unwrap();
        assert!(scheduler.is_running());

        assert!(scheduler.start().is_err());

        scheduler.stop().await;
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn test_scheduled_execution() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        let scheduler = Scheduler::with_tick_interval(Duration::from_millis(100));
        scheduler
            .register_cron("every-second", "* * * * * *", move || {
                let c = counter_clone.clone();
                async move {
                    c.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                }
            })
            .unwrap();

        scheduler.start().unwrap();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        scheduler.stop().await;

        assert!(counter.load(Ordering::Relaxed) >= 1);
    }
}

//! Scheduled sync runner.
//!
//! A [`SyncRunner`] drives one [`SyncJob`] on a fixed cadence (hourly by
//! default).
//!
//! # Behaviour
//!
//! - `start` is idempotent and does nothing when the job is not configured.
//! - The first pass runs right away, in the background.
//! - At most one pass runs at a time. A tick that fires while a pass is in
//!   flight is dropped, not queued.
//! - A failing pass is logged and never stops the schedule. The in-flight
//!   flag is cleared on every exit path, panics included.
//!
//! # Example
//!
//! ```ignore
//! let runner = SyncRunner::new(Arc::new(job));
//! runner.start();
//! // ...
//! runner.shutdown();
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default cadence between sync passes (one hour).
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 3600;

/// Counters for one sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Records read from the source.
    pub fetched: usize,
    /// Records accepted by the sighting filter.
    pub matched: usize,
    /// Sightings that produced a notification.
    pub notified: usize,
    /// Sightings already notified earlier.
    pub skipped: usize,
    /// Sightings whose notification failed.
    pub failed: usize,
}

/// A unit of background work driven by a [`SyncRunner`].
#[async_trait]
pub trait SyncJob: Send + Sync {
    /// Short name used in logs and routes.
    fn name(&self) -> &str;

    /// Whether the external configuration this job needs is present.
    fn is_configured(&self) -> bool {
        true
    }

    /// Perform one pass.
    async fn run(&self) -> anyhow::Result<SyncReport>;
}

/// Result of asking the runner for a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncRunOutcome {
    Completed { report: SyncReport },
    /// Another pass was already in flight.
    Skipped,
    Failed { error: String },
}

/// Clears the in-flight flag when dropped.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct Inner {
    job: Arc<dyn SyncJob>,
    interval: Duration,
    started: AtomicBool,
    syncing: AtomicBool,
    shutdown: CancellationToken,
}

/// Runs a [`SyncJob`] on a schedule with single-flight protection.
#[derive(Clone)]
pub struct SyncRunner {
    inner: Arc<Inner>,
}

impl SyncRunner {
    /// Create a runner with the default hourly cadence.
    pub fn new(job: Arc<dyn SyncJob>) -> Self {
        Self::with_interval(job, Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS))
    }

    pub fn with_interval(job: Arc<dyn SyncJob>, interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                job,
                interval,
                started: AtomicBool::new(false),
                syncing: AtomicBool::new(false),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn job_name(&self) -> &str {
        self.inner.job.name()
    }

    pub fn is_configured(&self) -> bool {
        self.inner.job.is_configured()
    }

    /// Whether a pass is currently in flight.
    pub fn is_running(&self) -> bool {
        self.inner.syncing.load(Ordering::Acquire)
    }

    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::Acquire)
    }

    /// Start the schedule.
    ///
    /// Returns `false` without doing anything when the job is not configured
    /// or the runner was already started. Must be called inside a Tokio runtime.
    pub fn start(&self) -> bool {
        let job = self.job_name();

        if !self.inner.job.is_configured() {
            info!(job, "Sync source not configured, scheduler not started");
            return false;
        }

        if self.inner.started.swap(true, Ordering::AcqRel) {
            debug!(job, "Sync scheduler already started");
            return false;
        }

        info!(
            job,
            interval_secs = self.inner.interval.as_secs(),
            "Sync scheduler starting"
        );

        let runner = self.clone();
        tokio::spawn(async move { runner.schedule().await });
        true
    }

    /// Stop the schedule. A pass already in flight finishes on its own.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }

    async fn schedule(self) {
        let mut interval = tokio::time::interval(self.inner.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = self.inner.shutdown.cancelled() => {
                    info!(job = self.job_name(), "Sync scheduler shutting down");
                    break;
                }

                // The first tick completes immediately
                _ = interval.tick() => {
                    let runner = self.clone();
                    tokio::spawn(async move {
                        runner.run_once().await;
                    });
                }
            }
        }
    }

    /// Run one pass now, unless one is already in flight.
    ///
    /// Errors from the job are logged and reported as
    /// [`SyncRunOutcome::Failed`], never propagated.
    pub async fn run_once(&self) -> SyncRunOutcome {
        let job = self.job_name();

        if self
            .inner
            .syncing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(job, "Sync already in progress, skipping this run");
            return SyncRunOutcome::Skipped;
        }
        let _in_flight = InFlight(&self.inner.syncing);

        match self.inner.job.run().await {
            Ok(report) => {
                info!(
                    job,
                    fetched = report.fetched,
                    matched = report.matched,
                    notified = report.notified,
                    skipped = report.skipped,
                    failed = report.failed,
                    "Sync pass completed"
                );
                SyncRunOutcome::Completed { report }
            }
            Err(e) => {
                warn!(job, error = %e, "Sync pass failed");
                SyncRunOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}

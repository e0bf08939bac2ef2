use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info};
use uuid::Uuid;

use crate::config::SyncConfig;
use crate::error::Result;
use crate::metrics;
use crate::services::{QueueSourceTrait, ReconcileOutcome, Reconciler};

/// Delay before the first scheduled cycle, giving the HTTP server and the
/// database pool time to come up.
const STARTUP_DELAY: Duration = Duration::from_secs(5);

/// Phase of the sync cycle currently in flight, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
    #[default]
    Idle,
    Fetching,
    Reconciling,
}

/// Summary of the most recently completed cycle.
#[derive(Debug, Clone, Serialize)]
pub struct SyncRun {
    pub run_id: Uuid,
    pub scope: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub attempted: usize,
    pub succeeded: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Scheduler state exposed at `GET /api/sync/status`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncStatus {
    pub phase: SyncPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run: Option<SyncRun>,
}

/// Shared handle onto the scheduler's observable state.
#[derive(Clone, Default)]
pub struct SyncStatusHandle {
    inner: Arc<RwLock<SyncStatus>>,
}

impl SyncStatusHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> SyncStatus {
        self.inner.read().await.clone()
    }

    async fn set_phase(&self, phase: SyncPhase) {
        self.inner.write().await.phase = phase;
    }

    /// Record a finished cycle and return the phase to idle.
    async fn record_run(&self, run: SyncRun) {
        let mut status = self.inner.write().await;
        status.phase = SyncPhase::Idle;
        status.last_run = Some(run);
    }
}

/// Executes one fetch-and-reconcile cycle.
///
/// Shared between the scheduled loop and the manual `POST /api/sync` path;
/// every cycle, however triggered, reports through the same status handle.
#[derive(Clone)]
pub struct SyncRunner {
    source: Arc<dyn QueueSourceTrait>,
    reconciler: Reconciler,
    status: SyncStatusHandle,
}

impl SyncRunner {
    pub fn new(
        source: Arc<dyn QueueSourceTrait>,
        reconciler: Reconciler,
        status: SyncStatusHandle,
    ) -> Self {
        Self {
            source,
            reconciler,
            status,
        }
    }

    /// Fetch up to `limit` unmoderated posts from `scope` and reconcile them.
    ///
    /// A fetch failure ends the cycle: it is logged, recorded in the status
    /// handle, and returned to the caller. Per-record failures are absorbed
    /// by the reconciler and only show up in the outcome counts.
    pub async fn run_cycle(&self, scope: &str, limit: u32) -> Result<ReconcileOutcome> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%run_id, scope, limit, "Sync cycle started");

        self.status.set_phase(SyncPhase::Fetching).await;
        let fetch_start = Instant::now();
        let records = match self.source.fetch_unmoderated(scope, limit).await {
            Ok(records) => records,
            Err(err) => {
                metrics::record_sync_run("fetch_failed");
                error!(%run_id, scope, error = %err, "Sync cycle fetch failed");
                self.status
                    .record_run(SyncRun {
                        run_id,
                        scope: scope.to_string(),
                        started_at,
                        finished_at: Utc::now(),
                        attempted: 0,
                        succeeded: 0,
                        error: Some(err.to_string()),
                    })
                    .await;
                return Err(err);
            }
        };
        metrics::observe_phase_duration("fetch", fetch_start.elapsed());
        metrics::set_last_batch_size(records.len() as i64);

        self.status.set_phase(SyncPhase::Reconciling).await;
        let reconcile_start = Instant::now();
        let outcome = self.reconciler.reconcile(&records).await;
        metrics::observe_phase_duration("reconcile", reconcile_start.elapsed());
        metrics::record_sync_run("success");

        self.status
            .record_run(SyncRun {
                run_id,
                scope: scope.to_string(),
                started_at,
                finished_at: Utc::now(),
                attempted: outcome.attempted,
                succeeded: outcome.succeeded,
                error: None,
            })
            .await;

        info!(
            %run_id,
            attempted = outcome.attempted,
            succeeded = outcome.succeeded,
            "Sync cycle completed"
        );

        Ok(outcome)
    }
}

/// Background job that pulls the moderation queue on a fixed cadence.
///
/// Cycles are strictly sequential: the loop awaits each cycle before asking
/// the ticker for another tick, and `MissedTickBehavior::Delay` pushes the
/// schedule back instead of firing a burst after a cycle that outruns the
/// interval. No cycle failure is fatal; the loop always reaches the next
/// tick.
pub struct QueueSyncJob {
    runner: SyncRunner,
    config: SyncConfig,
    shutdown: watch::Receiver<bool>,
}

impl QueueSyncJob {
    pub fn new(runner: SyncRunner, config: SyncConfig, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            runner,
            config,
            shutdown,
        }
    }

    /// Run the sync loop. Intended to be spawned on the Tokio runtime.
    ///
    /// Shutdown is observed between cycles only, so a cycle in flight
    /// finishes its current batch before the task exits.
    pub async fn run(mut self) {
        let mut ticker = interval_at(Instant::now() + STARTUP_DELAY, self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = self.config.interval_secs,
            fetch_limit = self.config.fetch_limit,
            scope = %self.config.scope,
            "Queue sync job started"
        );

        loop {
            tokio::select! {
                changed = self.shutdown.changed() => {
                    // A dropped sender means the process is going away too.
                    if changed.is_err() || *self.shutdown.borrow() {
                        info!("Queue sync job shutting down");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    // Already logged and recorded by the runner; the loop
                    // only cares that the next tick still happens.
                    let _ = self
                        .runner
                        .run_cycle(&self.config.scope, self.config.fetch_limit)
                        .await;
                }
            }
        }
    }

    /// Spawn the sync loop as a Tokio task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

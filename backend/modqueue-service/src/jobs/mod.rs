/// Background jobs
///
/// `queue_sync` owns the scheduled fetch-and-reconcile loop and the status
/// handle the API exposes.
pub mod queue_sync;

pub use queue_sync::{QueueSyncJob, SyncPhase, SyncRun, SyncRunner, SyncStatus, SyncStatusHandle};

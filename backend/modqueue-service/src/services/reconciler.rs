/// Batch reconciliation: raw records in, committed rows out.
use std::sync::Arc;

use serde::Serialize;

use crate::metrics;
use crate::models::RawPost;
use crate::repository::PostRepositoryTrait;
use crate::services::normalizer;

/// Aggregate result of one reconcile batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    /// Records presented, valid or not.
    pub attempted: usize,
    /// Records that reached a committed upsert.
    pub succeeded: usize,
}

/// Drives batches of raw records through normalization into the store.
///
/// Failures are isolated per record: a malformed or conflicting record is
/// logged and skipped, and the rest of the batch still commits.
#[derive(Clone)]
pub struct Reconciler {
    repository: Arc<dyn PostRepositoryTrait>,
}

impl Reconciler {
    pub fn new(repository: Arc<dyn PostRepositoryTrait>) -> Self {
        Self { repository }
    }

    /// Reconcile a batch of raw records in input order.
    ///
    /// Never fails as a whole; per-record errors only reduce `succeeded`.
    pub async fn reconcile(&self, records: &[RawPost]) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome {
            attempted: records.len(),
            succeeded: 0,
        };

        for raw in records {
            let record_id = if raw.id.is_empty() {
                "<unknown>"
            } else {
                raw.id.as_str()
            };

            let post = match normalizer::normalize(raw) {
                Ok(post) => post,
                Err(err) => {
                    metrics::record_reconciled("failed", 1);
                    tracing::warn!(
                        record_id,
                        error = %err,
                        "Skipping record: normalization failed"
                    );
                    continue;
                }
            };

            match self.repository.upsert(&post).await {
                Ok(_) => {
                    outcome.succeeded += 1;
                    metrics::record_reconciled("succeeded", 1);
                }
                Err(err) => {
                    metrics::record_reconciled("failed", 1);
                    tracing::warn!(
                        record_id,
                        error = %err,
                        "Skipping record: upsert failed"
                    );
                }
            }
        }

        outcome
    }
}

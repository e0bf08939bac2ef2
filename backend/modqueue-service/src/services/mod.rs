/// Business logic for the sync pipeline
///
/// - `reddit`: upstream API client (OAuth2 + moderation listings)
/// - `normalizer`: raw record validation and materialization
/// - `reconciler`: batch upserts with per-record failure isolation
pub mod normalizer;
pub mod reconciler;
pub mod reddit;

pub use reconciler::{ReconcileOutcome, Reconciler};
pub use reddit::{ModeratedSubreddit, ModeratorInfo, QueueSourceTrait, RedditClient};

#[cfg(test)]
pub use reddit::MockQueueSourceTrait;

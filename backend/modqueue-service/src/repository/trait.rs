use async_trait::async_trait;

use crate::error::Result;
use crate::models::{NormalizedPost, RedditPost, SubredditCount};

/// Storage operations for reconciled posts.
///
/// Implemented by [`super::PostgresPostRepository`] in production and by
/// in-memory doubles in tests. Every method is its own transactional unit;
/// a failed call leaves the store exactly as it was.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostRepositoryTrait: Send + Sync {
    /// Insert the post, or update it in place if the `id` already exists.
    ///
    /// Updates overwrite every column except `id`, `permalink`,
    /// `first_seen` and `moderation_status`, and stamp `last_updated`.
    /// A permalink held by a different `id` fails with a conflict and
    /// writes nothing.
    async fn upsert(&self, post: &NormalizedPost) -> Result<RedditPost>;

    async fn get_by_id(&self, id: &str) -> Result<Option<RedditPost>>;

    /// Posts matching a moderation status, optionally restricted to one
    /// subreddit. Newest first, ties broken by `id` for determinism.
    async fn get_by_status<'a>(
        &self,
        subreddit: Option<&'a str>,
        status: &str,
        limit: i64,
    ) -> Result<Vec<RedditPost>>;

    /// The most recently created posts across all subreddits.
    async fn latest(&self, limit: i64) -> Result<Vec<RedditPost>>;

    /// Total number of stored posts, optionally filtered by status.
    async fn count<'a>(&self, status: Option<&'a str>) -> Result<i64>;

    /// Post counts grouped by subreddit.
    async fn summary_by_subreddit(&self) -> Result<Vec<SubredditCount>>;
}

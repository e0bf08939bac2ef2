use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::{AppError, Result};
use crate::models::{NormalizedPost, RedditPost, SubredditCount};

use super::PostRepositoryTrait;

/// Reads clamp their limit to the upstream listing cap.
const MAX_QUERY_LIMIT: i64 = 100;

const UPSERT_POST: &str = r#"
INSERT INTO reddit_posts (
    id, permalink, title, author, subreddit, created_utc, selftext, url,
    score, num_comments, upvote_ratio, is_self, is_video, stickied,
    over_18, spoiler, link_flair_text
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
ON CONFLICT (id) DO UPDATE SET
    title = EXCLUDED.title,
    author = EXCLUDED.author,
    subreddit = EXCLUDED.subreddit,
    created_utc = EXCLUDED.created_utc,
    selftext = EXCLUDED.selftext,
    url = EXCLUDED.url,
    score = EXCLUDED.score,
    num_comments = EXCLUDED.num_comments,
    upvote_ratio = EXCLUDED.upvote_ratio,
    is_self = EXCLUDED.is_self,
    is_video = EXCLUDED.is_video,
    stickied = EXCLUDED.stickied,
    over_18 = EXCLUDED.over_18,
    spoiler = EXCLUDED.spoiler,
    link_flair_text = EXCLUDED.link_flair_text,
    last_updated = NOW()
RETURNING *
"#;

/// PostgreSQL-backed post store.
///
/// The upsert is a single statement, so a unique-constraint failure on
/// `permalink` aborts atomically and leaves the previous row untouched.
#[derive(Clone)]
pub struct PostgresPostRepository {
    pool: PgPool,
}

impl PostgresPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostRepositoryTrait for PostgresPostRepository {
    async fn upsert(&self, post: &NormalizedPost) -> Result<RedditPost> {
        sqlx::query_as::<_, RedditPost>(UPSERT_POST)
            .bind(&post.id)
            .bind(&post.permalink)
            .bind(&post.title)
            .bind(&post.author)
            .bind(&post.subreddit)
            .bind(post.created_utc)
            .bind(&post.selftext)
            .bind(&post.url)
            .bind(post.score)
            .bind(post.num_comments)
            .bind(post.upvote_ratio)
            .bind(post.is_self)
            .bind(post.is_video)
            .bind(post.stickied)
            .bind(post.over_18)
            .bind(post.spoiler)
            .bind(&post.link_flair_text)
            .fetch_one(&self.pool)
            .await
            .map_err(map_store_error)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<RedditPost>> {
        let post = sqlx::query_as::<_, RedditPost>("SELECT * FROM reddit_posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(post)
    }

    async fn get_by_status<'a>(
        &self,
        subreddit: Option<&'a str>,
        status: &str,
        limit: i64,
    ) -> Result<Vec<RedditPost>> {
        let posts = sqlx::query_as::<_, RedditPost>(
            r#"
            SELECT * FROM reddit_posts
            WHERE moderation_status = $1
              AND ($2::text IS NULL OR subreddit = $2)
            ORDER BY created_utc DESC, id ASC
            LIMIT $3
            "#,
        )
        .bind(status)
        .bind(subreddit)
        .bind(clamp_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    async fn latest(&self, limit: i64) -> Result<Vec<RedditPost>> {
        let posts = sqlx::query_as::<_, RedditPost>(
            "SELECT * FROM reddit_posts ORDER BY created_utc DESC, id ASC LIMIT $1",
        )
        .bind(clamp_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    async fn count<'a>(&self, status: Option<&'a str>) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM reddit_posts WHERE ($1::text IS NULL OR moderation_status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn summary_by_subreddit(&self) -> Result<Vec<SubredditCount>> {
        let rows = sqlx::query_as::<_, SubredditCount>(
            "SELECT subreddit, COUNT(*) AS post_count FROM reddit_posts GROUP BY subreddit",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(0, MAX_QUERY_LIMIT)
}

fn map_store_error(err: sqlx::Error) -> AppError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() {
            return AppError::Conflict(db_err.message().to_string());
        }
    }
    AppError::Database(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_are_clamped_to_the_listing_cap() {
        assert_eq!(clamp_limit(-5), 0);
        assert_eq!(clamp_limit(0), 0);
        assert_eq!(clamp_limit(25), 25);
        assert_eq!(clamp_limit(5_000), MAX_QUERY_LIMIT);
    }
}

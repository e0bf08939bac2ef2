//! Test doubles shared by the integration tests.
//!
//! `InMemoryPostRepository` mirrors the PostgreSQL upsert semantics
//! (first_seen set once, permalink uniqueness, per-call isolation) with a
//! logical write clock so timestamp assertions are deterministic.
//! `ScriptedQueueSource` replays canned fetch results, including injected
//! upstream failures.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use modqueue_service::error::{AppError, Result};
use modqueue_service::models::{NormalizedPost, RawPost, RawTimestamp, RedditPost, SubredditCount};
use modqueue_service::repository::PostRepositoryTrait;
use modqueue_service::services::{ModeratorInfo, QueueSourceTrait};

/// In-memory stand-in for the PostgreSQL repository.
pub struct InMemoryPostRepository {
    posts: Mutex<HashMap<String, RedditPost>>,
    /// Logical clock: each committed write advances stored timestamps by
    /// one second past a fixed base, so "last_updated advances" is exact.
    write_tick: AtomicUsize,
    upsert_delay: Option<Duration>,
    active_upserts: AtomicUsize,
    max_active_upserts: AtomicUsize,
}

#[allow(dead_code)]
impl InMemoryPostRepository {
    pub fn new() -> Self {
        Self {
            posts: Mutex::new(HashMap::new()),
            write_tick: AtomicUsize::new(0),
            upsert_delay: None,
            active_upserts: AtomicUsize::new(0),
            max_active_upserts: AtomicUsize::new(0),
        }
    }

    /// Make every upsert suspend for `delay`, to simulate a slow store.
    pub fn with_upsert_delay(mut self, delay: Duration) -> Self {
        self.upsert_delay = Some(delay);
        self
    }

    /// Highest number of upserts ever in flight at once.
    pub fn max_active_upserts(&self) -> usize {
        self.max_active_upserts.load(Ordering::SeqCst)
    }

    /// Flip a stored post's status, as external moderation tooling would.
    pub fn set_moderation_status(&self, id: &str, status: &str) {
        if let Some(post) = self.posts.lock().unwrap().get_mut(id) {
            post.moderation_status = status.to_string();
        }
    }

    fn next_write_time(&self) -> DateTime<Utc> {
        let tick = self.write_tick.fetch_add(1, Ordering::SeqCst) + 1;
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::seconds(tick as i64)
    }
}

#[async_trait]
impl PostRepositoryTrait for InMemoryPostRepository {
    async fn upsert(&self, post: &NormalizedPost) -> Result<RedditPost> {
        let active = self.active_upserts.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active_upserts.fetch_max(active, Ordering::SeqCst);

        if let Some(delay) = self.upsert_delay {
            tokio::time::sleep(delay).await;
        }

        let result = self.apply_upsert(post);

        self.active_upserts.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<RedditPost>> {
        Ok(self.posts.lock().unwrap().get(id).cloned())
    }

    async fn get_by_status<'a>(
        &self,
        subreddit: Option<&'a str>,
        status: &str,
        limit: i64,
    ) -> Result<Vec<RedditPost>> {
        let mut posts: Vec<RedditPost> = self
            .posts
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.moderation_status == status)
            .filter(|p| subreddit.map_or(true, |s| p.subreddit == s))
            .cloned()
            .collect();

        sort_newest_first(&mut posts);
        posts.truncate(limit.max(0) as usize);
        Ok(posts)
    }

    async fn latest(&self, limit: i64) -> Result<Vec<RedditPost>> {
        let mut posts: Vec<RedditPost> = self.posts.lock().unwrap().values().cloned().collect();
        sort_newest_first(&mut posts);
        posts.truncate(limit.max(0) as usize);
        Ok(posts)
    }

    async fn count<'a>(&self, status: Option<&'a str>) -> Result<i64> {
        let count = self
            .posts
            .lock()
            .unwrap()
            .values()
            .filter(|p| status.map_or(true, |s| p.moderation_status == s))
            .count();
        Ok(count as i64)
    }

    async fn summary_by_subreddit(&self) -> Result<Vec<SubredditCount>> {
        let mut counts: HashMap<String, i64> = HashMap::new();
        for post in self.posts.lock().unwrap().values() {
            *counts.entry(post.subreddit.clone()).or_insert(0) += 1;
        }

        Ok(counts
            .into_iter()
            .map(|(subreddit, post_count)| SubredditCount {
                subreddit,
                post_count,
            })
            .collect())
    }
}

impl InMemoryPostRepository {
    fn apply_upsert(&self, post: &NormalizedPost) -> Result<RedditPost> {
        let mut posts = self.posts.lock().unwrap();

        let stored = match posts.get(&post.id) {
            Some(existing) => {
                // Updates keep id, permalink, first_seen and the current
                // moderation status, exactly like the SQL upsert.
                let mut updated = row_from(post, existing.first_seen, self.next_write_time());
                updated.permalink = existing.permalink.clone();
                updated.moderation_status = existing.moderation_status.clone();
                updated
            }
            None => {
                if posts.values().any(|p| p.permalink == post.permalink) {
                    return Err(AppError::Conflict(format!(
                        "duplicate permalink '{}'",
                        post.permalink
                    )));
                }
                let now = self.next_write_time();
                row_from(post, now, now)
            }
        };

        posts.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }
}

fn row_from(
    post: &NormalizedPost,
    first_seen: DateTime<Utc>,
    last_updated: DateTime<Utc>,
) -> RedditPost {
    RedditPost {
        id: post.id.clone(),
        permalink: post.permalink.clone(),
        title: post.title.clone(),
        author: post.author.clone(),
        subreddit: post.subreddit.clone(),
        created_utc: post.created_utc,
        selftext: post.selftext.clone(),
        url: post.url.clone(),
        score: post.score,
        num_comments: post.num_comments,
        upvote_ratio: post.upvote_ratio,
        is_self: post.is_self,
        is_video: post.is_video,
        stickied: post.stickied,
        over_18: post.over_18,
        spoiler: post.spoiler,
        link_flair_text: post.link_flair_text.clone(),
        moderation_status: "unmoderated".to_string(),
        first_seen,
        last_updated,
    }
}

fn sort_newest_first(posts: &mut [RedditPost]) {
    posts.sort_by(|a, b| {
        b.created_utc
            .cmp(&a.created_utc)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Scripted stand-in for the Reddit client: replays one canned result per
/// fetch, then empty listings.
pub struct ScriptedQueueSource {
    batches: Mutex<VecDeque<Result<Vec<RawPost>>>>,
    fetch_calls: AtomicUsize,
}

#[allow(dead_code)]
impl ScriptedQueueSource {
    pub fn new(batches: Vec<Result<Vec<RawPost>>>) -> Self {
        Self {
            batches: Mutex::new(batches.into()),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueueSourceTrait for ScriptedQueueSource {
    async fn fetch_unmoderated(&self, _scope: &str, limit: u32) -> Result<Vec<RawPost>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        match self.batches.lock().unwrap().pop_front() {
            Some(result) => result.map(|batch| batch.into_iter().take(limit as usize).collect()),
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_modqueue(&self, scope: &str, limit: u32) -> Result<Vec<RawPost>> {
        self.fetch_unmoderated(scope, limit).await
    }

    async fn moderator_info(&self) -> Result<ModeratorInfo> {
        Ok(ModeratorInfo {
            username: "scripted_mod".to_string(),
            moderated_subreddits: Vec::new(),
        })
    }
}

/// A fully valid raw record.
#[allow(dead_code)]
pub fn raw_post(id: &str, subreddit: &str) -> RawPost {
    raw_post_at(id, subreddit, 1_700_000_000)
}

/// A normalized record ready for direct repository seeding.
#[allow(dead_code)]
pub fn normalized_post(id: &str, subreddit: &str, created_epoch: i64) -> NormalizedPost {
    NormalizedPost {
        id: id.to_string(),
        permalink: format!("/r/{}/comments/{}/", subreddit, id),
        title: format!("Post {}", id),
        author: "mod_user".to_string(),
        subreddit: subreddit.to_string(),
        created_utc: Utc.timestamp_opt(created_epoch, 0).unwrap(),
        selftext: None,
        url: format!("https://reddit.com/r/{}/comments/{}/", subreddit, id),
        score: 1,
        num_comments: 0,
        upvote_ratio: 1.0,
        is_self: true,
        is_video: false,
        stickied: false,
        over_18: false,
        spoiler: false,
        link_flair_text: None,
    }
}

/// A fully valid raw record with a chosen creation time.
#[allow(dead_code)]
pub fn raw_post_at(id: &str, subreddit: &str, created_epoch: i64) -> RawPost {
    RawPost {
        id: id.to_string(),
        title: format!("Post {}", id),
        author: Some("mod_user".to_string()),
        created_utc: Some(RawTimestamp::Epoch(created_epoch as f64)),
        subreddit: subreddit.to_string(),
        permalink: format!("/r/{}/comments/{}/", subreddit, id),
        url: format!("https://reddit.com/r/{}/comments/{}/", subreddit, id),
        ..RawPost::default()
    }
}

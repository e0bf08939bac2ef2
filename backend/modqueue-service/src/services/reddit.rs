/// Reddit API client for moderation listings.
///
/// Authenticates as a script app (OAuth2 password grant), caches the bearer
/// token until shortly before expiry, and exposes the moderation endpoints
/// the sync pipeline and the live API consume. Hidden behind
/// [`QueueSourceTrait`] so the scheduler and handlers can run against test
/// doubles.
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::{RedditConfig, MAX_FETCH_LIMIT};
use crate::error::{AppError, Result};
use crate::models::RawPost;
use crate::services::normalizer::DELETED_AUTHOR;

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const OAUTH_BASE_URL: &str = "https://oauth.reddit.com";

/// Tokens are refreshed this long before their reported expiry.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Listing `kind` tags for the children we keep.
const SUBMISSION_KIND: &str = "t3";
const SUBREDDIT_KIND: &str = "t5";

/// Upstream source of moderation queue records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueueSourceTrait: Send + Sync {
    /// Posts awaiting a first moderator action in the given scope.
    ///
    /// `scope` is a subreddit name, or `mod` for every moderated subreddit.
    async fn fetch_unmoderated(&self, scope: &str, limit: u32) -> Result<Vec<RawPost>>;

    /// Posts reported or filtered into the moderation queue. Records carry
    /// the report fields, which are display-only and never persisted.
    async fn fetch_modqueue(&self, scope: &str, limit: u32) -> Result<Vec<RawPost>>;

    /// The authenticated moderator and the subreddits they moderate.
    async fn moderator_info(&self) -> Result<ModeratorInfo>;
}

#[derive(Debug, Clone, Serialize)]
pub struct ModeratorInfo {
    pub username: String,
    pub moderated_subreddits: Vec<ModeratedSubreddit>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModeratedSubreddit {
    pub name: String,
    pub title: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    expires_in: u64,
    /// Reddit reports bad script credentials as a 200 with an error body.
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MeResponse {
    #[serde(default)]
    name: String,
}

/// The `{kind, data: {children: [{kind, data}]}}` envelope Reddit wraps
/// around every listing response.
#[derive(Debug, Deserialize)]
struct Listing {
    #[serde(default)]
    data: ListingData,
}

#[derive(Debug, Default, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    #[serde(default)]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct SubredditData {
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    title: String,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Reddit API client
pub struct RedditClient {
    client: Client,
    config: RedditConfig,
    token_url: String,
    base_url: String,
    token: RwLock<Option<CachedToken>>,
}

impl RedditClient {
    pub fn new(config: RedditConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            config,
            token_url: TOKEN_URL.to_string(),
            base_url: OAUTH_BASE_URL.to_string(),
            token: RwLock::new(None),
        })
    }

    /// Return the cached bearer token, refreshing it if missing or expiring.
    async fn access_token(&self) -> Result<String> {
        {
            let guard = self.token.read().await;
            if let Some(token) = guard.as_ref() {
                if token.expires_at > Instant::now() {
                    return Ok(token.access_token.clone());
                }
            }
        }

        self.refresh_token().await
    }

    async fn refresh_token(&self) -> Result<String> {
        let mut guard = self.token.write().await;

        // Another caller may have refreshed while we waited for the lock.
        if let Some(token) = guard.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.access_token.clone());
            }
        }

        debug!("Requesting Reddit access token");

        let params = [
            ("grant_type", "password"),
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AppError::UpstreamAuth(format!(
                "token endpoint rejected client credentials ({})",
                status
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::UpstreamApi {
                status: status.as_u16(),
                message: body_snippet(&body),
            });
        }

        let token: TokenResponse = response.json().await?;
        if let Some(error) = token.error {
            return Err(AppError::UpstreamAuth(format!(
                "token endpoint returned '{}'",
                error
            )));
        }
        if token.access_token.is_empty() {
            return Err(AppError::UpstreamAuth(
                "token endpoint returned an empty token".to_string(),
            ));
        }

        let lifetime = Duration::from_secs(token.expires_in);
        let expires_at = Instant::now() + lifetime.saturating_sub(TOKEN_REFRESH_MARGIN);

        let access_token = token.access_token;
        *guard = Some(CachedToken {
            access_token: access_token.clone(),
            expires_at,
        });

        Ok(access_token)
    }

    /// Authenticated GET returning the response body for successful statuses.
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<(StatusCode, String)> {
        let token = self.access_token().await?;

        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AppError::UpstreamAuth(format!(
                "Reddit rejected the request to {} ({})",
                path, status
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::UpstreamApi {
                status: status.as_u16(),
                message: body_snippet(&body),
            });
        }

        let body = response.text().await?;
        Ok((status, body))
    }

    async fn fetch_queue_listing(&self, queue: &str, scope: &str, limit: u32) -> Result<Vec<RawPost>> {
        let limit = limit.clamp(1, MAX_FETCH_LIMIT);
        let path = format!("/r/{}/about/{}", scope, queue);
        let query = [
            ("limit", limit.to_string()),
            ("raw_json", "1".to_string()),
        ];

        let (status, body) = self.get(&path, &query).await?;
        let posts = parse_post_listing(&body).map_err(|err| AppError::UpstreamApi {
            status: status.as_u16(),
            message: format!("malformed listing body: {}", err),
        })?;

        debug!(queue, scope, count = posts.len(), "Fetched moderation listing");
        Ok(posts)
    }
}

#[async_trait]
impl QueueSourceTrait for RedditClient {
    async fn fetch_unmoderated(&self, scope: &str, limit: u32) -> Result<Vec<RawPost>> {
        self.fetch_queue_listing("unmoderated", scope, limit).await
    }

    async fn fetch_modqueue(&self, scope: &str, limit: u32) -> Result<Vec<RawPost>> {
        self.fetch_queue_listing("modqueue", scope, limit).await
    }

    async fn moderator_info(&self) -> Result<ModeratorInfo> {
        let raw_json = [("raw_json", "1".to_string())];

        let (me_status, me_body) = self.get("/api/v1/me", &raw_json).await?;
        let me: MeResponse = serde_json::from_str(&me_body).map_err(|err| AppError::UpstreamApi {
            status: me_status.as_u16(),
            message: format!("malformed identity body: {}", err),
        })?;

        let subs_query = [
            ("limit", "100".to_string()),
            ("raw_json", "1".to_string()),
        ];
        let (subs_status, subs_body) = self.get("/subreddits/mine/moderator", &subs_query).await?;
        let moderated_subreddits =
            parse_subreddit_listing(&subs_body).map_err(|err| AppError::UpstreamApi {
                status: subs_status.as_u16(),
                message: format!("malformed subreddit listing body: {}", err),
            })?;

        Ok(ModeratorInfo {
            username: me.name,
            moderated_subreddits,
        })
    }
}

/// Parse a post listing, keeping only `t3` (submission) children.
///
/// A child that fails to deserialize is skipped with a warning so one odd
/// record cannot fail the whole listing. Null or absent authors become the
/// `[deleted]` placeholder, matching what Reddit displays for removed
/// accounts.
fn parse_post_listing(body: &str) -> serde_json::Result<Vec<RawPost>> {
    let listing: Listing = serde_json::from_str(body)?;

    let mut posts = Vec::with_capacity(listing.data.children.len());
    for child in listing.data.children {
        if child.kind != SUBMISSION_KIND {
            continue;
        }

        match serde_json::from_value::<RawPost>(child.data) {
            Ok(mut post) => {
                if post.author.as_deref().map_or(true, str::is_empty) {
                    post.author = Some(DELETED_AUTHOR.to_string());
                }
                posts.push(post);
            }
            Err(err) => {
                warn!(error = %err, "Skipping unparseable listing child");
            }
        }
    }

    Ok(posts)
}

fn parse_subreddit_listing(body: &str) -> serde_json::Result<Vec<ModeratedSubreddit>> {
    let listing: Listing = serde_json::from_str(body)?;

    let mut subreddits = Vec::with_capacity(listing.data.children.len());
    for child in listing.data.children {
        if child.kind != SUBREDDIT_KIND {
            continue;
        }

        if let Ok(data) = serde_json::from_value::<SubredditData>(child.data) {
            if !data.display_name.is_empty() {
                subreddits.push(ModeratedSubreddit {
                    name: data.display_name,
                    title: data.title,
                });
            }
        }
    }

    Ok(subreddits)
}

/// First 200 characters of an error body, for log-safe messages.
fn body_snippet(body: &str) -> String {
    body.trim().chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post_listing_body() -> String {
        serde_json::json!({
            "kind": "Listing",
            "data": {
                "children": [
                    {
                        "kind": "t3",
                        "data": {
                            "id": "abc123",
                            "title": "First post",
                            "author": "mod_user",
                            "created_utc": 1_700_000_000,
                            "subreddit": "rust",
                            "permalink": "/r/rust/comments/abc123/",
                            "url": "https://reddit.com/r/rust/comments/abc123/",
                            "score": 42,
                            "over_18": false
                        }
                    },
                    {
                        "kind": "t1",
                        "data": { "id": "def456", "body": "a comment" }
                    },
                    {
                        "kind": "t3",
                        "data": {
                            "id": "ghi789",
                            "title": "Deleted author post",
                            "author": null,
                            "created_utc": 1_700_000_100,
                            "subreddit": "rust",
                            "permalink": "/r/rust/comments/ghi789/"
                        }
                    }
                ]
            }
        })
        .to_string()
    }

    #[test]
    fn post_listing_keeps_only_submissions() {
        let posts = parse_post_listing(&post_listing_body()).unwrap();

        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id, "abc123");
        assert_eq!(posts[0].score, 42);
        assert_eq!(posts[1].id, "ghi789");
    }

    #[test]
    fn null_authors_become_the_deleted_placeholder() {
        let posts = parse_post_listing(&post_listing_body()).unwrap();

        assert_eq!(posts[0].author.as_deref(), Some("mod_user"));
        assert_eq!(posts[1].author.as_deref(), Some(DELETED_AUTHOR));
    }

    #[test]
    fn unparseable_children_are_skipped() {
        let body = serde_json::json!({
            "kind": "Listing",
            "data": {
                "children": [
                    { "kind": "t3", "data": { "id": "ok1", "score": 1 } },
                    { "kind": "t3", "data": { "id": "bad", "score": "not-a-number" } },
                    { "kind": "t3", "data": { "id": "ok2" } }
                ]
            }
        })
        .to_string();

        let posts = parse_post_listing(&body).unwrap();
        let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["ok1", "ok2"]);
    }

    #[test]
    fn modqueue_report_fields_pass_through() {
        let body = serde_json::json!({
            "kind": "Listing",
            "data": {
                "children": [{
                    "kind": "t3",
                    "data": {
                        "id": "rep1",
                        "title": "Reported post",
                        "author": "someone",
                        "subreddit": "rust",
                        "mod_reports": [["spam", "a_moderator"]],
                        "user_reports": [["it's spam", 3]],
                        "report_reasons": ["it's spam"]
                    }
                }]
            }
        })
        .to_string();

        let posts = parse_post_listing(&body).unwrap();
        assert_eq!(posts[0].mod_reports.len(), 1);
        assert_eq!(posts[0].user_reports.len(), 1);
        assert_eq!(posts[0].report_reasons.as_deref(), Some(&["it's spam".to_string()][..]));
    }

    #[test]
    fn empty_listing_parses_to_no_posts() {
        let body = r#"{"kind": "Listing", "data": {"children": []}}"#;
        assert!(parse_post_listing(body).unwrap().is_empty());

        let bare = r#"{"kind": "Listing", "data": {}}"#;
        assert!(parse_post_listing(bare).unwrap().is_empty());
    }

    #[test]
    fn subreddit_listing_parses_names_and_titles() {
        let body = serde_json::json!({
            "kind": "Listing",
            "data": {
                "children": [
                    {
                        "kind": "t5",
                        "data": { "display_name": "rust", "title": "The Rust Programming Language" }
                    },
                    {
                        "kind": "t5",
                        "data": { "display_name": "programming", "title": "Programming" }
                    },
                    {
                        "kind": "t5",
                        "data": { "title": "missing display_name" }
                    }
                ]
            }
        })
        .to_string();

        let subreddits = parse_subreddit_listing(&body).unwrap();
        assert_eq!(subreddits.len(), 2);
        assert_eq!(subreddits[0].name, "rust");
        assert_eq!(subreddits[0].title, "The Rust Programming Language");
    }

    #[test]
    fn body_snippet_truncates_on_character_boundaries() {
        let long = "é".repeat(500);
        let snippet = body_snippet(&long);
        assert_eq!(snippet.chars().count(), 200);

        assert_eq!(body_snippet("  short  "), "short");
    }
}

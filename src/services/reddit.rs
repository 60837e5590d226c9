// src/services/reddit.rs

//! Reddit API source.
//!
//! Uses application-only OAuth (client credentials). Listings are paged
//! through the `after` cursor; comments are requested per submission when
//! the `comments` column is extracted.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Mutex;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Field, FieldValue, ListingRequest, RawSubmission, RedditConfig};
use crate::services::source::{SubmissionItem, SubmissionSource};
use crate::utils::http;

/// Maximum page size accepted by listing endpoints.
const PAGE_SIZE: usize = 100;

/// Refresh the token this long before it expires.
const TOKEN_MARGIN: Duration = Duration::from_secs(60);

const CLIENT_ID_ENV: &str = "REDDIT_CLIENT_ID";
const CLIENT_SECRET_ENV: &str = "REDDIT_CLIENT_SECRET";

/// OAuth application credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Default, Deserialize)]
struct CredentialsFile {
    #[serde(default, alias = "api_key")]
    client_id: Option<String>,
    #[serde(default, alias = "secret")]
    client_secret: Option<String>,
}

impl Credentials {
    /// Load credentials from a JSON file; `REDDIT_CLIENT_ID` and
    /// `REDDIT_CLIENT_SECRET` override its values.
    ///
    /// The file is not read when both variables are set.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let env_id = std::env::var(CLIENT_ID_ENV).ok();
        let env_secret = std::env::var(CLIENT_SECRET_ENV).ok();

        let file = if env_id.is_some() && env_secret.is_some() {
            CredentialsFile::default()
        } else {
            let path = path.as_ref();
            let content = std::fs::read_to_string(path).map_err(|e| {
                AppError::config(format!(
                    "cannot read credentials file {}: {e}",
                    path.display()
                ))
            })?;
            serde_json::from_str(&content)?
        };

        Self::resolve(file, env_id, env_secret)
    }

    fn resolve(
        file: CredentialsFile,
        env_id: Option<String>,
        env_secret: Option<String>,
    ) -> Result<Self> {
        let non_empty = |s: String| (!s.trim().is_empty()).then_some(s);
        let client_id = env_id
            .and_then(non_empty)
            .or(file.client_id)
            .ok_or_else(|| AppError::config("missing Reddit client_id"))?;
        let client_secret = env_secret
            .and_then(non_empty)
            .or(file.client_secret)
            .ok_or_else(|| AppError::config("missing Reddit client_secret"))?;
        Ok(Self {
            client_id,
            client_secret,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_MARGIN < self.expires_at
    }
}

/// Generic `{ kind, data }` wrapper.
#[derive(Debug, Deserialize)]
struct Thing<T> {
    kind: String,
    data: T,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Listing<T> {
    #[serde(default)]
    after: Option<String>,
    #[serde(default)]
    children: Vec<Thing<T>>,
}

struct Inner {
    http: Client,
    credentials: Credentials,
    auth_url: String,
    api_url: String,
    comment_limit: usize,
    token: Mutex<Option<AccessToken>>,
}

/// Reddit API client. Cheap to clone; clones share the cached token.
#[derive(Clone)]
pub struct RedditClient {
    inner: Arc<Inner>,
}

impl RedditClient {
    /// Create a client, reading credentials from the configured file.
    pub fn new(config: &RedditConfig) -> Result<Self> {
        let credentials = Credentials::load(&config.credentials_file)?;
        Self::with_credentials(config, credentials)
    }

    pub fn with_credentials(config: &RedditConfig, credentials: Credentials) -> Result<Self> {
        Url::parse(&config.auth_url)?;
        Url::parse(&config.api_url)?;

        Ok(Self {
            inner: Arc::new(Inner {
                http: http::create_async_client(config)?,
                credentials,
                auth_url: config.auth_url.clone(),
                api_url: config.api_url.trim_end_matches('/').to_string(),
                comment_limit: config.comment_limit,
                token: Mutex::new(None),
            }),
        })
    }

    /// Current bearer token, requesting a new one when missing or stale.
    async fn token(&self) -> Result<String> {
        let mut guard = self.inner.token.lock().await;
        if let Some(token) = guard.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }

        log::debug!("Requesting access token from {}", self.inner.auth_url);
        let credentials = &self.inner.credentials;
        let response = self
            .inner
            .http
            .post(&self.inner.auth_url)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await?;

        if let Some(err) = classify_status(
            response.status().as_u16(),
            retry_after(&response),
            &self.inner.auth_url,
        ) {
            return Err(err);
        }

        let body: TokenResponse = response.json().await?;
        let value = body.access_token.clone();
        *guard = Some(AccessToken {
            value: body.access_token,
            expires_at: Instant::now() + Duration::from_secs(body.expires_in),
        });
        Ok(value)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let token = self.token().await?;
        let response = self.inner.http.get(url.clone()).bearer_auth(token).send().await?;
        let status = response.status().as_u16();

        if status == 401 {
            // Revoked or expired early; next request fetches a new token.
            self.inner.token.lock().await.take();
        }
        if let Some(err) = classify_status(status, retry_after(&response), url.as_str()) {
            return Err(err);
        }

        Ok(response.json().await?)
    }

    /// Fetch one listing page.
    async fn listing_page(
        &self,
        request: &ListingRequest,
        page_size: usize,
        after: Option<&str>,
    ) -> Result<Listing<RawSubmission>> {
        let url = listing_url(&self.inner.api_url, request, page_size, after)?;
        log::debug!("GET {}", url);
        let thing: Thing<Listing<RawSubmission>> = self.get_json(url).await?;
        Ok(thing.data)
    }

    /// Comment tree of one submission, as returned by the API.
    pub async fn comments(&self, id: &str) -> Result<Value> {
        let url = comments_url(&self.inner.api_url, id, self.inner.comment_limit)?;
        let response: Value = self.get_json(url).await?;
        comments_from_response(response, id)
    }
}

#[async_trait]
impl SubmissionSource for RedditClient {
    type Item = RedditSubmission;

    async fn listing(&self, request: &ListingRequest) -> Result<Vec<RedditSubmission>> {
        let mut items = Vec::with_capacity(request.limit.min(1000));
        let mut after: Option<String> = None;

        while items.len() < request.limit {
            let page_size = (request.limit - items.len()).min(PAGE_SIZE);
            let page = self
                .listing_page(request, page_size, after.as_deref())
                .await?;

            let received = page.children.len();
            items.extend(
                page.children
                    .into_iter()
                    .filter(|thing| thing.kind == "t3")
                    .map(|thing| RedditSubmission {
                        raw: thing.data,
                        client: self.clone(),
                    }),
            );

            after = page.after;
            if received == 0 || after.is_none() {
                break;
            }
        }

        items.truncate(request.limit);
        Ok(items)
    }
}

/// A listed submission. Scalar fields come from the listing; comments are
/// requested on demand.
#[derive(Clone)]
pub struct RedditSubmission {
    raw: RawSubmission,
    client: RedditClient,
}

impl RedditSubmission {
    pub fn raw(&self) -> &RawSubmission {
        &self.raw
    }
}

impl fmt::Debug for RedditSubmission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RedditSubmission").field(&self.raw.id).finish()
    }
}

#[async_trait]
impl SubmissionItem for RedditSubmission {
    fn id(&self) -> &str {
        &self.raw.id
    }

    async fn field(&self, field: Field) -> Result<FieldValue> {
        match self.raw.scalar(field) {
            Some(value) => Ok(value),
            None => Ok(FieldValue::Json(self.client.comments(&self.raw.id).await?)),
        }
    }
}

/// Map a response status to an error, or `None` on success.
pub fn classify_status(status: u16, retry_after_secs: Option<u64>, url: &str) -> Option<AppError> {
    match status {
        200..=299 => None,
        429 => Some(AppError::RateLimited { retry_after_secs }),
        _ => Some(AppError::Api {
            status,
            url: url.to_string(),
        }),
    }
}

fn retry_after(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
}

fn listing_url(
    api_url: &str,
    request: &ListingRequest,
    page_size: usize,
    after: Option<&str>,
) -> Result<Url> {
    let mut url = Url::parse(&format!(
        "{}/r/{}/{}",
        api_url,
        request.forum,
        request.sort.name()
    ))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("limit", &page_size.to_string());
        if let Some(window) = request.sort.time_window() {
            query.append_pair("t", window.as_str());
        }
        query.append_pair("raw_json", "1");
        if let Some(after) = after {
            query.append_pair("after", after);
        }
    }
    Ok(url)
}

fn comments_url(api_url: &str, id: &str, limit: usize) -> Result<Url> {
    let mut url = Url::parse(&format!("{api_url}/comments/{id}"))?;
    url.query_pairs_mut()
        .append_pair("limit", &limit.to_string())
        .append_pair("raw_json", "1");
    Ok(url)
}

/// The comments endpoint answers `[submission listing, comment listing]`.
fn comments_from_response(response: Value, id: &str) -> Result<Value> {
    let mut listings = match response {
        Value::Array(listings) => listings,
        _ => return Err(AppError::extraction("comments", format!("unexpected response for {id}"))),
    };
    if listings.len() < 2 {
        return Err(AppError::extraction(
            "comments",
            format!("missing comment listing for {id}"),
        ));
    }
    match listings.swap_remove(1) {
        Value::Object(mut listing) => listing
            .remove("data")
            .and_then(|mut data| data.get_mut("children").map(Value::take))
            .ok_or_else(|| AppError::extraction("comments", format!("no comment children for {id}"))),
        _ => Err(AppError::extraction(
            "comments",
            format!("malformed comment listing for {id}"),
        )),
    }
}

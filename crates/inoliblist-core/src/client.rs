//! GitHub HTTP client with rate budget tracking
//!
//! This module provides the remote access layer: a [`RateLimiter`] that
//! mirrors GitHub's two request allowances, and a [`GithubClient`] that
//! normalizes URLs, decodes payloads, follows pagination headers and retries
//! transient failures with a fixed delay.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::header::{ACCEPT, AUTHORIZATION, LINK};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{CatalogError, FailureKind, Result};
use crate::parser::{parse_link_header, Pagination};
use crate::types::{ApiClass, FetchResult, RateLimitStatus};

/// Base URL for the GitHub REST API
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Base URL for raw file contents
pub const GITHUB_RAW_URL: &str = "https://raw.githubusercontent.com";

/// Media type that includes repository topics in API responses
const PREVIEW_MEDIA_TYPE: &str = "application/vnd.github.mercy-preview+json";

/// Response header carrying the remaining budget of the request's API class
const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// GitHub rejects requests without a User-Agent
const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Maximum number of retries after the first attempt
const MAX_RETRIES: u32 = 5;

/// Delay before retrying a failed request
const RETRY_DELAY: Duration = Duration::from_secs(60);

/// Extra wait after the advertised reset time before re-checking the budget
const RATE_LIMIT_GRACE: Duration = Duration::from_secs(180);

/// Interval between "still waiting" messages during a budget reset wait
const RATE_LIMIT_NOTIFICATION_INTERVAL: Duration = Duration::from_secs(300);

/// Maximum page size allowed by the API
const RESULTS_PER_PAGE: u32 = 100;

/// Cached remaining request budget of both API classes
///
/// Both values start at 0, which forces an authoritative check against the
/// `rate_limit` endpoint before the first request of each class.
#[derive(Debug, Default)]
pub struct RateLimiter {
    search_remaining: AtomicU64,
    core_remaining: AtomicU64,
}

impl RateLimiter {
    /// Create a limiter with an unknown (zero) budget for both classes
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, class: ApiClass) -> &AtomicU64 {
        match class {
            ApiClass::Search => &self.search_remaining,
            ApiClass::Core => &self.core_remaining,
        }
    }

    /// Cached remaining budget for a class
    pub fn remaining(&self, class: ApiClass) -> u64 {
        self.slot(class).load(Ordering::Relaxed)
    }

    /// Overwrite the cached budget, e.g. from a response header
    pub fn record(&self, class: ApiClass, remaining: u64) {
        self.slot(class).store(remaining, Ordering::Relaxed);
    }

    /// Take one request from the cached budget
    pub fn consume(&self, class: ApiClass) {
        let _ = self
            .slot(class)
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    /// Mark both budgets unknown so the next request re-checks them
    pub fn exhaust_all(&self) {
        for class in ApiClass::ALL {
            self.record(class, 0);
        }
    }

    /// Refresh both budgets from an authoritative status response
    pub fn update(&self, status: &RateLimitStatus) {
        for class in ApiClass::ALL {
            self.record(class, status.resource(class).remaining);
        }
    }
}

/// Configuration for the GitHub client
#[derive(Clone)]
pub struct ClientConfig {
    /// REST API base URL (default: `https://api.github.com`)
    pub api_base_url: String,
    /// Raw file host (default: `https://raw.githubusercontent.com`)
    pub raw_base_url: String,
    /// Personal access token; without it the allowance is much smaller
    pub token: Option<String>,
    /// Per-request timeout in seconds (default: none)
    pub timeout_secs: Option<u64>,
    /// Page size for paginated endpoints (default: 100)
    pub per_page: u32,
    /// Retries after the first attempt (default: 5)
    pub max_retries: u32,
    /// Delay before each retry (default: 60s)
    pub retry_delay: Duration,
    /// Wait added after the budget reset time (default: 180s)
    pub rate_limit_grace: Duration,
    /// Interval between wait notifications (default: 300s)
    pub rate_limit_notification_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: GITHUB_API_URL.to_string(),
            raw_base_url: GITHUB_RAW_URL.to_string(),
            token: None,
            timeout_secs: None,
            per_page: RESULTS_PER_PAGE,
            max_retries: MAX_RETRIES,
            retry_delay: RETRY_DELAY,
            rate_limit_grace: RATE_LIMIT_GRACE,
            rate_limit_notification_interval: RATE_LIMIT_NOTIFICATION_INTERVAL,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_base_url", &self.api_base_url)
            .field("raw_base_url", &self.raw_base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("per_page", &self.per_page)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .field("rate_limit_grace", &self.rate_limit_grace)
            .field(
                "rate_limit_notification_interval",
                &self.rate_limit_notification_interval,
            )
            .finish()
    }
}

/// HTTP client for the GitHub API and raw file host
///
/// Every API request first acquires budget from the [`RateLimiter`], then
/// goes through the retry loop. Requests are issued one at a time.
pub struct GithubClient {
    /// Underlying HTTP client
    client: reqwest::Client,
    /// Access layer settings
    config: ClientConfig,
    /// Cached request budgets
    rate_limiter: RateLimiter,
}

impl GithubClient {
    /// Create a new client with default configuration
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(DEFAULT_USER_AGENT);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;

        if config.token.is_none() {
            warn!("No GitHub token configured, API request allowance will be limited");
        }

        Ok(Self {
            client,
            config,
            rate_limiter: RateLimiter::new(),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Build an API URL from a path such as `repos/owner/name`
    pub fn api_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Build a raw file URL; `folder` may be `/` for the repository root
    pub fn raw_url(&self, full_name: &str, branch: &str, folder: &str, file: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.config.raw_base_url.trim_end_matches('/'),
            full_name,
            branch,
            folder,
            file
        )
    }

    /// Append pagination parameters to a URL
    pub fn paged_url(&self, url: &str, page: u32) -> String {
        let separator = if url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}page={}&per_page={}",
            url, separator, page, self.config.per_page
        )
    }

    fn is_api_url(&self, url: &str) -> bool {
        url.starts_with(self.config.api_base_url.trim_end_matches('/'))
    }

    /// API class metering a URL, or `None` for non-API hosts
    pub fn api_class(&self, url: &str) -> Option<ApiClass> {
        let base = self.config.api_base_url.trim_end_matches('/');
        let path = url.strip_prefix(base)?;
        Some(ApiClass::for_path(path))
    }

    /// Fetch and decode one JSON document.
    ///
    /// # Errors
    /// - `CatalogError::Timeout` when every attempt failed with a retryable error
    /// - `CatalogError::MalformedResponse` when the body is not JSON
    /// - any permanent remote error, unchanged
    pub async fn fetch(&self, url: &str) -> Result<FetchResult<Value>> {
        let url = normalize_url(url)?;
        let class = self.api_class(&url);
        let url = url.as_str();
        self.with_retry(url, true, move || async move {
            self.acquire_for(class).await?;
            self.fetch_once(url, class).await
        })
        .await
    }

    /// Fetch a JSON document and deserialize it into `T`
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<FetchResult<T>> {
        let FetchResult {
            payload,
            has_more,
            total_pages,
        } = self.fetch(url).await?;
        Ok(FetchResult {
            payload: decode(url, payload)?,
            has_more,
            total_pages,
        })
    }

    /// Fetch every page of a list endpoint and concatenate the items
    pub async fn fetch_all_pages<T: DeserializeOwned>(&self, url: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page = 1;

        loop {
            let page_url = self.paged_url(url, page);
            let result = self.fetch(&page_url).await?;
            if result.total_pages > 0 {
                let batch: Vec<T> = decode(&page_url, result.payload)?;
                items.extend(batch);
            }
            if !result.has_more {
                break;
            }
            page += 1;
        }

        Ok(items)
    }

    /// Fetch a text document (e.g. a raw `library.properties`)
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        let url = normalize_url(url)?;
        let class = self.api_class(&url);
        let url = url.as_str();
        self.with_retry(url, true, move || async move {
            self.acquire_for(class).await?;
            self.fetch_text_once(url, class).await
        })
        .await
    }

    /// Single attempt to check that a URL resolves; failures are not retried
    pub async fn probe(&self, url: &str) -> bool {
        let url = match normalize_url(url) {
            Ok(url) => url,
            Err(e) => {
                debug!(error = %e, "probe skipped");
                return false;
            }
        };
        if let Some(class) = self.api_class(&url) {
            if let Err(e) = self.acquire(class).await {
                debug!(%url, error = %e, "probe skipped");
                return false;
            }
        }
        match self.send(&url).await {
            Ok(_) => true,
            Err(e) => {
                debug!(%url, error = %e, "probe failed");
                false
            }
        }
    }

    /// Query the authoritative budget of both classes.
    ///
    /// This endpoint does not count against either allowance.
    pub async fn rate_limit_status(&self) -> Result<RateLimitStatus> {
        let url = normalize_url(&self.api_url("rate_limit"))?;
        let result = self
            .with_retry(&url, false, || self.fetch_once(&url, None))
            .await?;
        decode(&url, result.payload)
    }

    /// Block until the given class has budget for at least one request.
    ///
    /// A zero cached budget is always confirmed against the `rate_limit`
    /// endpoint; if it is really exhausted, this sleeps until the reset time
    /// plus the grace period and checks again.
    pub async fn ensure_budget(&self, class: ApiClass) -> Result<()> {
        if self.rate_limiter.remaining(class) > 0 {
            return Ok(());
        }

        loop {
            let status = self.rate_limit_status().await?;
            self.rate_limiter.update(&status);
            let resource = status.resource(class);
            info!(
                %class,
                limit = resource.limit,
                remaining = resource.remaining,
                reset = resource.reset,
                "checked API request allotment"
            );

            if resource.remaining > 0 {
                return Ok(());
            }

            if self.config.token.is_none() {
                warn!("Pass a GitHub personal access token via --ghtoken for a more generous allowance");
            }
            self.wait_for_reset(class, resource.reset).await;
        }
    }

    async fn acquire(&self, class: ApiClass) -> Result<()> {
        self.ensure_budget(class).await?;
        self.rate_limiter.consume(class);
        Ok(())
    }

    /// Acquire budget ahead of each attempt; non-API hosts are unmetered
    async fn acquire_for(&self, class: Option<ApiClass>) -> Result<()> {
        match class {
            Some(class) => self.acquire(class).await,
            None => Ok(()),
        }
    }

    /// Sleep until `reset_epoch` plus the grace period, reporting progress
    async fn wait_for_reset(&self, class: ApiClass, reset_epoch: u64) {
        let deadline = UNIX_EPOCH + Duration::from_secs(reset_epoch) + self.config.rate_limit_grace;
        let interval = self.config.rate_limit_notification_interval;

        while let Ok(left) = deadline.duration_since(SystemTime::now()) {
            if left.is_zero() {
                break;
            }
            warn!(
                %class,
                minutes = left.as_secs() / 60,
                "GitHub API request limit reached, waiting for reset"
            );
            sleep(wait_step(left, interval)).await;
        }
    }

    /// Re-check both budgets after a throttling response
    ///
    /// Boxed because it re-enters the retry loop through `rate_limit_status`.
    fn force_rate_limit_check(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.rate_limiter.exhaust_all();
            for class in ApiClass::ALL {
                self.ensure_budget(class).await?;
            }
            Ok(())
        })
    }

    /// Run `attempt` until it succeeds, fails permanently, or retries run out
    async fn with_retry<T, F, Fut>(&self, url: &str, recheck_on_throttle: bool, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        for try_number in 0..=self.config.max_retries {
            let error = match attempt().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            match error.failure_kind() {
                FailureKind::Permanent => {
                    if let CatalogError::Unauthorized(_) = error {
                        warn!("HTTP 401 may be caused by an incorrect GitHub personal access token");
                    }
                    return Err(error);
                }
                kind => {
                    warn!(%url, error = %error, attempt = try_number + 1, "temporarily unable to open URL, retrying");
                    if kind == FailureKind::Throttled && recheck_on_throttle {
                        self.force_rate_limit_check().await?;
                    }
                    if try_number < self.config.max_retries {
                        sleep(self.config.retry_delay).await;
                    }
                }
            }
        }

        Err(CatalogError::Timeout(url.to_string()))
    }

    /// Issue one GET and map non-success statuses to errors
    async fn send(&self, url: &str) -> Result<reqwest::Response> {
        debug!(%url, "opening URL");

        let mut request = self.client.get(url);
        if self.is_api_url(url) {
            request = request.header(ACCEPT, PREVIEW_MEDIA_TYPE);
            if let Some(token) = &self.config.token {
                request = request.header(AUTHORIZATION, format!("token {}", token));
            }
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(CatalogError::from_status(url, status.as_u16()))
        }
    }

    /// Keep the cached budget in step with the response header
    fn record_budget(&self, class: Option<ApiClass>, response: &reqwest::Response) {
        let Some(class) = class else {
            return;
        };
        let remaining = response
            .headers()
            .get(RATE_LIMIT_REMAINING_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());
        if let Some(remaining) = remaining {
            self.rate_limiter.record(class, remaining);
        }
    }

    async fn fetch_once(&self, url: &str, class: Option<ApiClass>) -> Result<FetchResult<Value>> {
        let response = self.send(url).await?;
        self.record_budget(class, &response);

        let pagination = response
            .headers()
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .map(parse_link_header)
            .unwrap_or_default();

        let body = response.bytes().await?;
        let payload = if body.iter().all(u8::is_ascii_whitespace) {
            Value::Null
        } else {
            serde_json::from_slice(&body).map_err(|e| {
                warn!(%url, error = %e, "undecodable JSON payload");
                CatalogError::MalformedResponse {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            })?
        };

        Ok(paginate(payload, pagination))
    }

    async fn fetch_text_once(&self, url: &str, class: Option<ApiClass>) -> Result<String> {
        let response = self.send(url).await?;
        self.record_budget(class, &response);
        Ok(response.text().await?)
    }
}

/// Attach pagination metadata to a decoded payload
pub fn paginate(payload: Value, pagination: Pagination) -> FetchResult<Value> {
    if is_empty_payload(&payload) {
        return FetchResult {
            payload,
            has_more: false,
            total_pages: 0,
        };
    }

    FetchResult {
        payload,
        has_more: pagination.has_next,
        total_pages: pagination.last_page.unwrap_or(1),
    }
}

fn is_empty_payload(payload: &Value) -> bool {
    match payload {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    }
}

/// Next sleep while waiting for a reset; a zero interval waits in one step
fn wait_step(left: Duration, interval: Duration) -> Duration {
    if interval.is_zero() {
        left
    } else {
        left.min(interval)
    }
}

fn decode<T: DeserializeOwned>(url: &str, payload: Value) -> Result<T> {
    serde_json::from_value(payload).map_err(|e| CatalogError::MalformedResponse {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Percent-encode unsafe characters and collapse repeated path separators.
///
/// Folder names taken from listings may contain spaces or non-ASCII text.
///
/// # Examples
/// ```
/// use inoliblist_core::client::normalize_url;
///
/// let url = normalize_url("https://api.github.com/repos/o/r/contents//My Lib").unwrap();
/// assert_eq!(url, "https://api.github.com/repos/o/r/contents/My%20Lib");
/// ```
pub fn normalize_url(raw: &str) -> Result<String> {
    let mut url =
        Url::parse(raw).map_err(|e| CatalogError::InvalidUrl(format!("{}: {}", raw, e)))?;

    if url.path().contains("//") {
        let mut collapsed = String::with_capacity(url.path().len());
        for c in url.path().chars() {
            if c == '/' && collapsed.ends_with('/') {
                continue;
            }
            collapsed.push(c);
        }
        url.set_path(&collapsed);
    }

    Ok(url.to_string())
}

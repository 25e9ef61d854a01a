//! Network utilities: the global HTTP client, per-host rate limiting, and
//! retry/backoff logic used by every provider flavor.
//!
//! - **Rate Limiter** ([`RateLimiter`]) — per-host token pacing, keyed by DNS
//!   host name (scheme/port ignored). Default interval is 2s for API-like
//!   hosts and 500ms for image hosts, overridable per provider.
//! - **HTTP Client** ([`HttpClient`]) — request execution with exponential
//!   backoff (1s, capped at 8s, up to 3 retries), `Retry-After` honoring,
//!   a bounded redirect policy, and cancellation support.

use bytes::Bytes;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use reqwest::{Client, header::HeaderMap, redirect::Policy};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::{Category, Error, TrackedError};

pub mod html;

pub mod json {
    //! Retained as a thin re-export: declarative field extraction now lives
    //! in [`crate::extractor`], which builds on the same dot-path
    //! traversal this module originally implemented directly.
    pub use crate::extractor::{extract_array, extract_as, extract_path};
}

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_REDIRECTS: usize = 10;
const BACKOFF_START: Duration = Duration::from_secs(1);
const BACKOFF_CAP: Duration = Duration::from_secs(8);

/// Global HTTP client instance with connection pooling, compression, and a
/// bounded redirect policy.
static CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .user_agent(concat!("Luminary/", env!("CARGO_PKG_VERSION")))
        .pool_max_idle_per_host(10)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
        .expect("Failed to build HTTP client")
});

/// Default minimum interval for API-like hosts (JSON endpoints).
pub const DEFAULT_API_INTERVAL: Duration = Duration::from_secs(2);
/// Default minimum interval for image hosts (page/cover downloads).
pub const DEFAULT_IMAGE_INTERVAL: Duration = Duration::from_millis(500);

/// Process-wide per-host token scheduler.
///
/// `Wait(host)` blocks until at least the configured minimum interval has
/// elapsed since the most recent `Wait` for the same host. Hosts are keyed
/// by registered DNS name; scheme and port are ignored.
#[derive(Debug)]
pub struct RateLimiter {
    last_request: Mutex<HashMap<String, Instant>>,
    default_interval: Duration,
}

impl Clone for RateLimiter {
    fn clone(&self) -> Self {
        Self {
            last_request: Mutex::new(HashMap::new()),
            default_interval: self.default_interval,
        }
    }
}

impl RateLimiter {
    pub fn new(default_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(HashMap::new()),
            default_interval,
        }
    }

    /// Extracts the rate-limit key for a URL: its DNS host name, ignoring
    /// scheme and port. Falls back to the raw string if the URL fails to
    /// parse (should not happen for well-formed requests).
    pub fn host_key(url: &str) -> String {
        url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| url.to_string())
    }

    pub async fn wait(&self, host: &str) {
        self.wait_custom(host, self.default_interval).await;
    }

    pub async fn wait_custom(&self, host: &str, interval: Duration) {
        let wait_duration = {
            let mut last_map = self.last_request.lock();
            let now = Instant::now();
            let wait = last_map.get(host).and_then(|&last| {
                let elapsed = now.duration_since(last);
                (elapsed < interval).then(|| interval - elapsed)
            });
            last_map.insert(host.to_string(), now);
            wait
        };

        if let Some(duration) = wait_duration {
            tokio::time::sleep(duration).await;
        }
    }
}

/// HTTP client wrapper with built-in per-host rate limiting, retry/backoff,
/// and cancellation support, bound to one provider.
#[derive(Clone)]
pub struct HttpClient {
    provider_id: String,
    rate_limiter: RateLimiter,
    max_retries: u32,
    headers: HeaderMap,
}

impl HttpClient {
    /// Creates a client for `provider_id` with the API-like default
    /// interval (2s) and 3 max retries.
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            rate_limiter: RateLimiter::new(DEFAULT_API_INTERVAL),
            max_retries: 3,
            headers: HeaderMap::new(),
        }
    }

    /// Creates a client with the image default interval (500ms).
    pub fn new_for_images(provider_id: impl Into<String>) -> Self {
        Self::new(provider_id).with_rate_limit(DEFAULT_IMAGE_INTERVAL)
    }

    pub fn with_rate_limit(mut self, interval: Duration) -> Self {
        self.rate_limiter = RateLimiter::new(interval);
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.parse::<reqwest::header::HeaderName>(),
            value.parse::<reqwest::header::HeaderValue>(),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Performs a GET request with rate limiting, exponential backoff on
    /// transient failure (starting at 1s, capped at 8s, up to
    /// `max_retries`), and `Retry-After` honoring on 429. A non-2xx status
    /// surviving all retries is returned as a `network`-category error with
    /// `{status, url}` context.
    pub async fn get(&self, url: &str) -> Result<Bytes, TrackedError> {
        self.get_cancellable(url, &CancellationToken::new()).await
    }

    /// As [`get`](Self::get), but aborts the in-flight request and surfaces
    /// a `network`-category cancellation error if `token` is cancelled.
    pub async fn get_cancellable(
        &self,
        url: &str,
        token: &CancellationToken,
    ) -> Result<Bytes, TrackedError> {
        let host = RateLimiter::host_key(url);
        let mut attempt = 0u32;
        let mut backoff = BACKOFF_START;

        loop {
            if token.is_cancelled() {
                return Err(TrackedError::with_category(
                    Error::Other("request cancelled".into()),
                    Category::Network,
                )
                .with_context("url", url));
            }

            self.rate_limiter.wait(&host).await;

            let request = CLIENT.get(url).headers(self.headers.clone()).send();
            let response = tokio::select! {
                _ = token.cancelled() => {
                    return Err(TrackedError::with_category(
                        Error::Other("request cancelled".into()),
                        Category::Network,
                    )
                    .with_context("url", url));
                }
                result = request => result,
            };

            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .bytes()
                            .await
                            .map_err(|e| TrackedError::from(Error::from(e)).with_context("url", url));
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        if attempt < self.max_retries {
                            let delay = response
                                .headers()
                                .get("retry-after")
                                .and_then(|v| v.to_str().ok())
                                .and_then(|v| v.parse::<u64>().ok())
                                .map(Duration::from_secs)
                                .unwrap_or(backoff);
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                            backoff = (backoff * 2).min(BACKOFF_CAP);
                            continue;
                        }
                    }

                    return Err(TrackedError::with_category(
                        Error::provider(&self.provider_id, format!("HTTP {status}")),
                        Category::Network,
                    )
                    .with_context("status", status.as_u16())
                    .with_context("url", url));
                }
                Err(e) => {
                    if attempt < self.max_retries && (e.is_connect() || e.is_timeout() || e.is_request()) {
                        tokio::time::sleep(backoff).await;
                        attempt += 1;
                        backoff = (backoff * 2).min(BACKOFF_CAP);
                        continue;
                    }
                    return Err(TrackedError::from(Error::from(e)).with_context("url", url));
                }
            }
        }
    }

    pub async fn get_text(&self, url: &str) -> Result<String, TrackedError> {
        let bytes = self.get(url).await?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| TrackedError::from(Error::parse(format!("Invalid UTF-8: {e}"))))
    }

    pub async fn get_json<T>(&self, url: &str) -> Result<T, TrackedError>
    where
        T: serde::de::DeserializeOwned,
    {
        let bytes = self.get(url).await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| TrackedError::from(Error::from(e)).with_context("url", url))
    }

    /// Performs a POST with a form-encoded body, rate limited and retried
    /// the same way as `get`. Used by the Madara flavor's `admin-ajax.php`
    /// calls.
    pub async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<String, TrackedError> {
        let host = RateLimiter::host_key(url);
        let mut attempt = 0u32;
        let mut backoff = BACKOFF_START;

        loop {
            self.rate_limiter.wait(&host).await;

            let response = CLIENT
                .post(url)
                .headers(self.headers.clone())
                .form(form)
                .send()
                .await;

            match response {
                Ok(response) if response.status().is_success() => {
                    return response
                        .text()
                        .await
                        .map_err(|e| TrackedError::from(Error::from(e)).with_context("url", url));
                }
                Ok(response) => {
                    if attempt < self.max_retries {
                        tokio::time::sleep(backoff).await;
                        attempt += 1;
                        backoff = (backoff * 2).min(BACKOFF_CAP);
                        continue;
                    }
                    return Err(TrackedError::with_category(
                        Error::provider(&self.provider_id, format!("HTTP {}", response.status())),
                        Category::Network,
                    )
                    .with_context("url", url));
                }
                Err(e) => {
                    if attempt < self.max_retries && (e.is_connect() || e.is_timeout()) {
                        tokio::time::sleep(backoff).await;
                        attempt += 1;
                        backoff = (backoff * 2).min(BACKOFF_CAP);
                        continue;
                    }
                    return Err(TrackedError::from(Error::from(e)).with_context("url", url));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_key_ignores_scheme_and_port() {
        assert_eq!(
            RateLimiter::host_key("https://api.mangadex.org:443/manga/1"),
            "api.mangadex.org"
        );
        assert_eq!(
            RateLimiter::host_key("http://api.mangadex.org/manga/1"),
            "api.mangadex.org"
        );
    }

    #[tokio::test]
    async fn rate_limiter_delays_second_wait_for_same_host() {
        let limiter = RateLimiter::new(Duration::from_millis(120));
        let start = Instant::now();
        limiter.wait("example.com").await;
        limiter.wait("example.com").await;
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn rate_limiter_does_not_delay_distinct_hosts() {
        let limiter = RateLimiter::new(Duration::from_secs(5));
        let start = Instant::now();
        limiter.wait("a.example.com").await;
        limiter.wait("b.example.com").await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}

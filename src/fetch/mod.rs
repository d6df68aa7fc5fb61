//! Page fetcher (§4.4): SSRF-validated, content-type gated, headless-browser fetch with
//! retry/backoff and batch semantics.
//!
//! Grounded in `backend/core/scraper.py` (`CamoufoxScraper`, `scrape_urls_batch`, and its
//! module constants) for exact behavior, combined with the teacher's chromiumoxide idiom in
//! `scraping/browser_manager.rs` for the Rust CDP mechanics (see [`browser`]).
//! The retry loop and batch orchestration here are decoupled from the concrete browser via
//! the [`Navigator`] trait so they can be exercised deterministically in tests without a real
//! browser binary; [`browser::BrowserPool`] is the production `Navigator`.

pub mod browser;

use std::time::Duration;

use async_trait::async_trait;
use rand::RngExt;

use crate::validate::validate_url;

pub const MAX_URLS_PER_BATCH: usize = 100;
pub const MAX_RESPONSE_SIZE: usize = 10_000_000;
pub const MAX_CHARS_PER_PAGE: usize = 50_000;
pub const MIN_RATE_LIMIT_DELAY: Duration = Duration::from_millis(500);
pub const MAX_RETRIES: u32 = 3;

const TRUNCATION_MARKER: &str = "\n[... truncated ...]";

const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "text/html",
    "text/plain",
    "application/xhtml+xml",
    "application/xml",
    "text/xml",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extract {
    /// The raw document (HTML).
    Raw,
    /// Visible text only.
    Text,
}

#[derive(Debug, Clone)]
pub enum NavError {
    /// DNS resolution failed — never retried (`ERR_NAME_NOT_RESOLVED` in the original).
    DnsFailure(String),
    Other(String),
}

impl std::fmt::Display for NavError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NavError::DnsFailure(m) => write!(f, "{m}"),
            NavError::Other(m) => write!(f, "{m}"),
        }
    }
}

/// One successful navigation: the declared content-type (if the transport reported one)
/// plus the extracted content.
pub struct NavResult {
    pub content_type: Option<String>,
    pub content: String,
}

/// Abstraction over "open a page and extract content" so the retry/batch logic in this
/// module can be tested without a real browser. [`browser::BrowserPool`] is the real impl.
#[async_trait]
pub trait Navigator: Send + Sync {
    async fn navigate(&self, url: &str, extract: Extract) -> Result<NavResult, NavError>;
}

/// `min(1.0 * 2^attempt, 30.0)` seconds, ±25% uniform jitter, floored at 0.1s.
pub fn backoff_delay(attempt: u32) -> Duration {
    let base = (1.0_f64 * 2f64.powi(attempt as i32)).min(30.0);
    let jitter_frac = rand::rng().random_range(-0.25..=0.25);
    let jittered = (base * (1.0 + jitter_frac)).max(0.1);
    Duration::from_secs_f64(jittered)
}

fn content_type_allowed(content_type: &Option<String>) -> bool {
    match content_type {
        None => true,
        Some(ct) => {
            let base = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
            ALLOWED_CONTENT_TYPES.contains(&base.as_str())
        }
    }
}

fn cap_response(mut content: String) -> String {
    if content.len() > MAX_RESPONSE_SIZE {
        let boundary = (0..=MAX_RESPONSE_SIZE).rev().find(|&i| content.is_char_boundary(i)).unwrap_or(0);
        content.truncate(boundary);
        content.push_str(TRUNCATION_MARKER);
    }
    content
}

/// Caps text for model consumption at [`MAX_CHARS_PER_PAGE`] chars.
pub fn cap_for_model(content: &str) -> String {
    if content.chars().count() > MAX_CHARS_PER_PAGE {
        let mut out: String = content.chars().take(MAX_CHARS_PER_PAGE).collect();
        out.push_str(TRUNCATION_MARKER);
        out
    } else {
        content.to_string()
    }
}

/// Object-safe façade over a fetcher so the deep-research loop can hold `Arc<dyn BatchFetch>`
/// rather than being generic over the navigator implementation.
#[async_trait]
pub trait BatchFetch: Send + Sync {
    async fn fetch_batch(&self, urls: &[String]) -> std::collections::HashMap<String, String>;
}

pub struct PageFetcher<N: Navigator> {
    navigator: N,
}

#[async_trait]
impl<N: Navigator> BatchFetch for PageFetcher<N> {
    async fn fetch_batch(&self, urls: &[String]) -> std::collections::HashMap<String, String> {
        PageFetcher::fetch_batch(self, urls).await
    }
}

impl<N: Navigator> PageFetcher<N> {
    pub fn new(navigator: N) -> Self {
        Self { navigator }
    }

    /// Fetch one URL with retry/backoff. Returns `Ok(content)` or `Err(error_string)`,
    /// matching the `(content, nil) | (nil, error)` contract in §4.4.
    pub async fn fetch(&self, url: &str, extract: Extract) -> Result<String, String> {
        if !validate_url(url) {
            return Err(format!("URL blocked for security: {url}"));
        }

        let mut last_err = String::new();
        for attempt in 0..MAX_RETRIES {
            match self.navigator.navigate(url, extract).await {
                Ok(result) => {
                    if !content_type_allowed(&result.content_type) {
                        return Err(format!(
                            "content-type not allowed: {:?}",
                            result.content_type
                        ));
                    }
                    return Ok(cap_response(result.content));
                }
                Err(NavError::DnsFailure(msg)) => {
                    return Err(msg);
                }
                Err(NavError::Other(msg)) => {
                    last_err = msg;
                    if attempt + 1 < MAX_RETRIES {
                        tokio::time::sleep(backoff_delay(attempt)).await;
                    }
                }
            }
        }
        Err(last_err)
    }

    /// Batch fetch: capped at [`MAX_URLS_PER_BATCH`], sequential, honoring
    /// [`MIN_RATE_LIMIT_DELAY`] between adjacent requests. Only URLs yielding more than
    /// 50 non-whitespace chars of text are included in the output.
    pub async fn fetch_batch(&self, urls: &[String]) -> std::collections::HashMap<String, String> {
        let urls = if urls.len() > MAX_URLS_PER_BATCH {
            tracing::warn!(
                requested = urls.len(),
                cap = MAX_URLS_PER_BATCH,
                "URL list truncated"
            );
            &urls[..MAX_URLS_PER_BATCH]
        } else {
            urls
        };

        let mut out = std::collections::HashMap::with_capacity(urls.len());
        for (i, url) in urls.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(MIN_RATE_LIMIT_DELAY).await;
            }
            match self.fetch(url, Extract::Text).await {
                Ok(text) => {
                    if text.split_whitespace().collect::<String>().len() > 50 {
                        out.insert(url.clone(), cap_for_model(&text));
                    } else {
                        tracing::warn!(%url, "fetch yielded empty content");
                    }
                }
                Err(e) => tracing::warn!(%url, error = %e, "fetch failed"),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn cap_response_does_not_split_a_multi_byte_char_at_the_boundary() {
        let mut s = "a".repeat(MAX_RESPONSE_SIZE - 2);
        s.push('💡');
        s.push_str(&"b".repeat(1_000));
        let capped = cap_response(s.clone());
        let boundary = capped.len() - TRUNCATION_MARKER.len();
        assert!(boundary <= MAX_RESPONSE_SIZE);
        assert!(s.is_char_boundary(boundary));
    }

    struct FlakyNavigator {
        attempts: AtomicUsize,
        fail_times: usize,
    }

    #[async_trait]
    impl Navigator for FlakyNavigator {
        async fn navigate(&self, _url: &str, _extract: Extract) -> Result<NavResult, NavError> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_times {
                Err(NavError::Other("timeout".to_string()))
            } else {
                Ok(NavResult { content_type: Some("text/html".to_string()), content: "ok content here".to_string() })
            }
        }
    }

    struct CountingNavigator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Navigator for CountingNavigator {
        async fn navigate(&self, _url: &str, _extract: Extract) -> Result<NavResult, NavError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(NavResult {
                content_type: Some("text/html".to_string()),
                content: "x".repeat(60),
            })
        }
    }

    struct DnsFailNavigator;

    #[async_trait]
    impl Navigator for DnsFailNavigator {
        async fn navigate(&self, _url: &str, _extract: Extract) -> Result<NavResult, NavError> {
            Err(NavError::DnsFailure("ERR_NAME_NOT_RESOLVED".to_string()))
        }
    }

    #[tokio::test]
    async fn retries_on_transient_failure_then_succeeds() {
        let fetcher = PageFetcher::new(FlakyNavigator { attempts: AtomicUsize::new(0), fail_times: 2 });
        let result = fetcher.fetch("https://example.com/", Extract::Raw).await;
        assert_eq!(result.unwrap(), "ok content here");
        assert_eq!(fetcher.navigator.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn dns_failure_does_not_retry() {
        let fetcher = PageFetcher::new(DnsFailNavigator);
        let result = fetcher.fetch("https://example.com/", Extract::Raw).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn rejects_unsafe_url_before_navigating() {
        let fetcher = PageFetcher::new(FlakyNavigator { attempts: AtomicUsize::new(0), fail_times: 0 });
        let result = fetcher.fetch("http://127.0.0.1/", Extract::Raw).await;
        assert!(result.is_err());
        assert_eq!(fetcher.navigator.attempts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn backoff_delay_matches_formula_bounds() {
        // attempt 0: base 1.0s -> [0.75, 1.25]
        for _ in 0..50 {
            let d = backoff_delay(0).as_secs_f64();
            assert!((0.75..=1.25).contains(&d), "attempt0 delay out of range: {d}");
        }
        // attempt 1: base 2.0s -> [1.5, 2.5]
        for _ in 0..50 {
            let d = backoff_delay(1).as_secs_f64();
            assert!((1.5..=2.5).contains(&d), "attempt1 delay out of range: {d}");
        }
    }

    #[test]
    fn backoff_delay_caps_at_30s_and_floors_at_0_1s() {
        for _ in 0..50 {
            let d = backoff_delay(10).as_secs_f64();
            assert!(d <= 37.5, "delay should cap near 30s*1.25: {d}");
        }
    }

    #[tokio::test]
    async fn batch_truncates_to_cap() {
        let urls: Vec<String> = (0..150).map(|i| format!("https://example.com/{i}")).collect();
        let fetcher = PageFetcher::new(CountingNavigator { calls: AtomicUsize::new(0) });
        let out = fetcher.fetch_batch(&urls).await;
        assert_eq!(fetcher.navigator.calls.load(Ordering::SeqCst), MAX_URLS_PER_BATCH);
        assert_eq!(out.len(), MAX_URLS_PER_BATCH);
    }
}

//! Page and binary fetching.
//!
//! [`Fetcher`] is the only way the walker and extractor touch the network.
//! [`HttpFetcher`] is the production implementation: a blocking `reqwest`
//! client with a per-request timeout, a rotating browser-like
//! `User-Agent`, bounded retries and a fixed politeness delay before every
//! request except the first.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};

use crate::ScrapeError;
use crate::retry::{RetryPolicy, send_with_retry};

/// Browser identities rotated across requests.
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
];

/// Source of page text and binary content.
pub trait Fetcher {
    /// Fetches `url` and returns the body as text.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError`] on transport failure or non-success status.
    fn get_text(&self, url: &str) -> Result<String, ScrapeError>;

    /// Fetches `url` and returns the raw body bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError`] on transport failure or non-success status.
    fn get_bytes(&self, url: &str) -> Result<Vec<u8>, ScrapeError>;
}

impl<F: Fetcher + ?Sized> Fetcher for &F {
    fn get_text(&self, url: &str) -> Result<String, ScrapeError> {
        (**self).get_text(url)
    }

    fn get_bytes(&self, url: &str) -> Result<Vec<u8>, ScrapeError> {
        (**self).get_bytes(url)
    }
}

/// Transport settings for [`HttpFetcher`].
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// `User-Agent` values used round-robin, one per request.
    pub user_agents: Vec<String>,
    /// Bounded wait for a single request.
    pub timeout: Duration,
    /// Fixed pause inserted before every request but the first.
    pub delay: Duration,
    /// Retry policy applied per request.
    pub retry: RetryPolicy,
    /// Additional HTTP headers to include in every request.
    pub headers: BTreeMap<String, String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agents: DEFAULT_USER_AGENTS
                .iter()
                .map(|&ua| ua.to_owned())
                .collect(),
            timeout: Duration::from_secs(30),
            delay: Duration::from_secs(2),
            retry: RetryPolicy::default(),
            headers: BTreeMap::new(),
        }
    }
}

impl FetchConfig {
    /// Sets the politeness delay.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Adds an HTTP header to include in requests.
    #[must_use]
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_owned(), value.to_owned());
        self
    }
}

/// Blocking HTTP implementation of [`Fetcher`].
#[derive(Debug)]
pub struct HttpFetcher {
    client: Client,
    config: FetchConfig,
    next_agent: Cell<usize>,
    has_requested: Cell<bool>,
}

impl HttpFetcher {
    /// Builds the underlying client.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError`] if a configured header is invalid or the
    /// client cannot be constructed.
    pub fn new(config: FetchConfig) -> Result<Self, ScrapeError> {
        let mut header_map = HeaderMap::new();
        for (key, value) in &config.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| ScrapeError::Parse(format!("invalid header name '{key}': {e}")))?;
            let val = HeaderValue::from_str(value)
                .map_err(|e| ScrapeError::Parse(format!("invalid header value '{value}': {e}")))?;
            header_map.insert(name, val);
        }

        let client = Client::builder()
            .default_headers(header_map)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            config,
            next_agent: Cell::new(0),
            has_requested: Cell::new(false),
        })
    }

    /// The transport settings in use.
    #[must_use]
    pub const fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Returns the next `User-Agent` in rotation, if any are configured.
    fn next_user_agent(&self) -> Option<&str> {
        if self.config.user_agents.is_empty() {
            return None;
        }
        let index = self.next_agent.get() % self.config.user_agents.len();
        self.next_agent.set(index + 1);
        Some(&self.config.user_agents[index])
    }

    /// Sleeps for the politeness delay unless this is the first request.
    fn pause(&self) {
        if self.has_requested.replace(true) && !self.config.delay.is_zero() {
            log::debug!("politeness delay {:?}", self.config.delay);
            std::thread::sleep(self.config.delay);
        }
    }

    fn send(&self, url: &str) -> Result<reqwest::blocking::Response, ScrapeError> {
        self.pause();
        let agent = self.next_user_agent();
        log::debug!("GET {url}");
        send_with_retry(&self.config.retry, || {
            let request = self.client.get(url);
            match agent {
                Some(agent) => request.header(USER_AGENT, agent),
                None => request,
            }
        })
    }
}

impl Fetcher for HttpFetcher {
    fn get_text(&self, url: &str) -> Result<String, ScrapeError> {
        Ok(self.send(url)?.text()?)
    }

    fn get_bytes(&self, url: &str) -> Result<Vec<u8>, ScrapeError> {
        Ok(self.send(url)?.bytes()?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotates_user_agents() {
        let config = FetchConfig {
            user_agents: vec!["a".to_owned(), "b".to_owned()],
            ..FetchConfig::default()
        };
        let fetcher = HttpFetcher::new(config).unwrap();

        assert_eq!(fetcher.next_user_agent(), Some("a"));
        assert_eq!(fetcher.next_user_agent(), Some("b"));
        assert_eq!(fetcher.next_user_agent(), Some("a"));
    }

    #[test]
    fn no_agents_configured() {
        let config = FetchConfig {
            user_agents: Vec::new(),
            ..FetchConfig::default()
        };
        let fetcher = HttpFetcher::new(config).unwrap();
        assert_eq!(fetcher.next_user_agent(), None);
    }

    #[test]
    fn rejects_invalid_header_name() {
        let config = FetchConfig::default().with_header("bad header", "x");
        assert!(matches!(
            HttpFetcher::new(config),
            Err(ScrapeError::Parse(_))
        ));
    }

    #[test]
    fn first_request_is_not_delayed() {
        let config = FetchConfig::default().with_delay(Duration::from_secs(60));
        let fetcher = HttpFetcher::new(config).unwrap();

        let start = std::time::Instant::now();
        fetcher.pause();
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(fetcher.has_requested.get());
    }

    #[test]
    fn later_requests_wait_for_delay() {
        let delay = Duration::from_millis(50);
        let fetcher = HttpFetcher::new(FetchConfig::default().with_delay(delay)).unwrap();

        fetcher.pause();
        let start = std::time::Instant::now();
        fetcher.pause();
        assert!(start.elapsed() >= delay);
    }
}

//! HTTP retry helpers for transient errors.
//!
//! [`send_with_retry`] wraps a blocking `reqwest` request with a bounded
//! number of retries and exponential backoff. Only transient failures are
//! retried: timeouts, connection errors, HTTP 429 and HTTP 5xx. Any other
//! 4xx is permanent and returned immediately.
//!
//! ```ignore
//! let response = retry::send_with_retry(&policy, || client.get(&url))?;
//! ```

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{RequestBuilder, Response};

use crate::ScrapeError;

/// Bounded retry settings for a single logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. `0` disables retrying.
    pub max_retries: u32,
    /// Backoff before the first retry; doubled for each later retry.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub const NONE: Self = Self {
        max_retries: 0,
        base_delay: Duration::ZERO,
    };

    /// Creates a policy with `max_retries` retries and a one second initial
    /// backoff.
    #[must_use]
    pub const fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_secs(1),
        }
    }

    /// Overrides the initial backoff.
    #[must_use]
    pub const fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Backoff to wait before retry number `retry` (1-based): 1x, 2x, 4x...
    /// the base delay.
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2)
    }
}

/// How a response status should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 2xx/3xx: hand the response to the caller.
    Success,
    /// 429 or 5xx: worth retrying.
    Transient,
    /// Any other 4xx: give up.
    Permanent,
}

/// Classifies a response status for retry purposes.
#[must_use]
pub fn classify_status(status: StatusCode) -> StatusClass {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        StatusClass::Transient
    } else if status.is_client_error() {
        StatusClass::Permanent
    } else {
        StatusClass::Success
    }
}

/// Sends the request built by `build_request`, retrying transient failures
/// up to `policy.max_retries` times.
///
/// The closure is called once per attempt since builders are consumed by
/// `send()`.
///
/// # Errors
///
/// Returns [`ScrapeError::Http`] for transport failures and
/// [`ScrapeError::Status`] for non-success statuses once retries are
/// exhausted (or immediately for permanent ones).
pub fn send_with_retry<F>(policy: &RetryPolicy, build_request: F) -> Result<Response, ScrapeError>
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = policy.backoff(attempt);
            log::warn!("  retry {attempt}/{} in {delay:?}...", policy.max_retries);
            std::thread::sleep(delay);
        }
        let can_retry = attempt < policy.max_retries;
        attempt += 1;

        match build_request().send() {
            Err(e) => {
                if is_transient(&e) && can_retry {
                    log::warn!("  transient error: {e}");
                    continue;
                }
                return Err(ScrapeError::Http(e));
            }
            Ok(response) => {
                let status = response.status();
                match classify_status(status) {
                    StatusClass::Success => return Ok(response),
                    StatusClass::Transient if can_retry => {
                        log::warn!("  HTTP {status} from {}", response.url());
                    }
                    StatusClass::Transient | StatusClass::Permanent => {
                        return Err(ScrapeError::Status {
                            url: response.url().to_string(),
                            status: status.as_u16(),
                        });
                    }
                }
            }
        }
    }
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Answers one connection per entry of `statuses`, in order, and counts
    /// the requests it saw.
    fn serve(statuses: &[u16]) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/item", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let statuses = statuses.to_vec();

        std::thread::spawn(move || {
            for status in statuses {
                let Ok((stream, _)) = listener.accept() else {
                    return;
                };
                let mut reader = BufReader::new(stream);
                let mut line = String::new();
                while reader.read_line(&mut line).is_ok_and(|n| n > 0) && line != "\r\n" {
                    line.clear();
                }
                counter.fetch_add(1, Ordering::SeqCst);
                let response = format!(
                    "HTTP/1.1 {status} X\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                );
                let _ = reader.get_mut().write_all(response.as_bytes());
            }
        });

        (url, hits)
    }

    fn client() -> reqwest::blocking::Client {
        reqwest::blocking::Client::builder().no_proxy().build().unwrap()
    }

    #[test]
    fn recovers_after_transient_status() {
        let (url, hits) = serve(&[503, 200]);
        let client = client();
        let policy = RetryPolicy::new(2).with_base_delay(Duration::from_millis(10));

        let response = send_with_retry(&policy, || client.get(&url)).unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn gives_up_once_retries_are_spent() {
        let (url, hits) = serve(&[503, 503, 503]);
        let client = client();
        let policy = RetryPolicy::new(1).with_base_delay(Duration::from_millis(10));

        let result = send_with_retry(&policy, || client.get(&url));

        assert!(matches!(result, Err(ScrapeError::Status { status: 503, .. })));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn permanent_status_is_not_retried() {
        let (url, hits) = serve(&[404, 200]);
        let client = client();
        let policy = RetryPolicy::new(3).with_base_delay(Duration::from_millis(10));

        let result = send_with_retry(&policy, || client.get(&url));

        assert!(matches!(result, Err(ScrapeError::Status { status: 404, .. })));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy::new(4).with_base_delay(Duration::from_millis(250));
        assert_eq!(policy.backoff(1), Duration::from_millis(250));
        assert_eq!(policy.backoff(2), Duration::from_millis(500));
        assert_eq!(policy.backoff(3), Duration::from_secs(1));
    }

    #[test]
    fn backoff_saturates() {
        let policy = RetryPolicy::new(u32::MAX);
        assert!(policy.backoff(200) >= Duration::from_secs(1));
    }

    #[test]
    fn classifies_statuses() {
        assert_eq!(classify_status(StatusCode::OK), StatusClass::Success);
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            StatusClass::Transient
        );
        assert_eq!(
            classify_status(StatusCode::BAD_GATEWAY),
            StatusClass::Transient
        );
        assert_eq!(
            classify_status(StatusCode::NOT_FOUND),
            StatusClass::Permanent
        );
        assert_eq!(classify_status(StatusCode::FORBIDDEN), StatusClass::Permanent);
    }
}

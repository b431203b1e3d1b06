//! In-memory [`Fetcher`] for offline runs and tests.
//!
//! Responses are registered up front by address. Unknown addresses answer
//! HTTP 404. Every request is recorded so callers can assert which pages
//! were (and were not) fetched.

use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::ScrapeError;
use crate::fetch::Fetcher;

#[derive(Debug, Clone)]
enum Canned {
    Body(Vec<u8>),
    Status(u16),
}

/// A [`Fetcher`] that serves canned responses.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    responses: BTreeMap<String, Canned>,
    requests: RefCell<Vec<String>>,
}

impl MemoryFetcher {
    /// Creates a fetcher with no registered responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a text body for `url`.
    #[must_use]
    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.responses
            .insert(url.to_owned(), Canned::Body(body.as_bytes().to_vec()));
        self
    }

    /// Registers a binary body for `url`.
    #[must_use]
    pub fn with_bytes(mut self, url: &str, body: Vec<u8>) -> Self {
        self.responses.insert(url.to_owned(), Canned::Body(body));
        self
    }

    /// Makes `url` answer with a non-success status.
    #[must_use]
    pub fn with_status(mut self, url: &str, status: u16) -> Self {
        self.responses.insert(url.to_owned(), Canned::Status(status));
        self
    }

    /// Every address requested so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    /// Returns `true` if `url` was requested at least once.
    #[must_use]
    pub fn was_requested(&self, url: &str) -> bool {
        self.requests.borrow().iter().any(|r| r == url)
    }

    fn respond(&self, url: &str) -> Result<Vec<u8>, ScrapeError> {
        self.requests.borrow_mut().push(url.to_owned());
        match self.responses.get(url) {
            Some(Canned::Body(body)) => Ok(body.clone()),
            Some(Canned::Status(status)) => Err(ScrapeError::Status {
                url: url.to_owned(),
                status: *status,
            }),
            None => Err(ScrapeError::Status {
                url: url.to_owned(),
                status: 404,
            }),
        }
    }
}

impl Fetcher for MemoryFetcher {
    fn get_text(&self, url: &str) -> Result<String, ScrapeError> {
        self.respond(url)
            .map(|body| String::from_utf8_lossy(&body).into_owned())
    }

    fn get_bytes(&self, url: &str) -> Result<Vec<u8>, ScrapeError> {
        self.respond(url)
    }
}

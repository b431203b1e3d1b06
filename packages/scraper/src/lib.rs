#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Catalog scraping core.
//!
//! Two procedures run one after the other for every scrape:
//!
//! 1. [`walker::LinkWalker`] paginates one or more listing pages and collects
//!    unique detail-page addresses until an item limit, a page limit, or an
//!    empty page is reached.
//! 2. [`extractor::ItemExtractor`] fetches each detail page, applies ordered
//!    fallback selectors per attribute ([`selector`]) and downloads the first
//!    resolvable product image ([`images`]).
//!
//! Everything runs sequentially on the calling thread. Network access goes
//! through the [`fetch::Fetcher`] trait so the algorithms can be driven by
//! [`fetch::HttpFetcher`] in production or [`memory::MemoryFetcher`] offline.

pub mod address;
pub mod extractor;
pub mod fetch;
pub mod images;
pub mod memory;
pub mod progress;
pub mod retry;
pub mod selector;
pub mod walker;

/// Errors that can occur during scraping operations.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// An HTTP request failed at the transport level.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status} for {url}")]
    Status {
        /// Address that was requested.
        url: String,
        /// Response status code.
        status: u16,
    },

    /// A CSS selector could not be parsed.
    #[error("invalid CSS selector '{selector}': {message}")]
    Selector {
        /// The selector text as configured.
        selector: String,
        /// Parser error description.
        message: String,
    },

    /// An address could not be parsed or is not an `http(s)` address.
    #[error("invalid address '{url}': {message}")]
    InvalidUrl {
        /// The offending address.
        url: String,
        /// Why it was rejected.
        message: String,
    },

    /// A walk limit was zero.
    #[error("invalid limit: {0}")]
    InvalidLimit(String),

    /// Parsing a response body or building a request failed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image bytes could not be decoded or re-encoded.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl ScrapeError {
    /// Returns `true` if the error came from the remote side (transport or
    /// status) rather than from local configuration.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Status { .. })
    }
}

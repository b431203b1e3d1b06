#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Storefront site profiles.
//!
//! A [`site_def::SiteDefinition`] captures everything unique about one shop
//! (listing addresses, pagination, link and field selectors) in a TOML
//! document. Compiling it yields the runtime rules the walker and extractor
//! consume. Built-in profiles live in [`registry`].

pub mod registry;
pub mod site_def;

use std::path::PathBuf;

use garden_scrape_scraper::ScrapeError;

/// Errors that can occur while loading or compiling a site profile.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The profile is not valid TOML or does not match the expected shape.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A profile file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// Path of the profile file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The profile parsed but is not usable.
    #[error("site '{site}': {message}")]
    Invalid {
        /// Profile id.
        site: String,
        /// What is wrong with it.
        message: String,
    },

    /// A selector or address in the profile was rejected.
    #[error("site '{site}': {source}")]
    Rules {
        /// Profile id.
        site: String,
        /// Underlying error.
        source: ScrapeError,
    },
}

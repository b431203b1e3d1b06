#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Record types produced by a catalog scrape.
//!
//! A run walks one or more paginated listing pages ([`ListingPage`]) to
//! collect detail-page addresses, then turns each detail page into a single
//! flat [`ItemRecord`]. Missing attributes are `None` rather than a
//! placeholder string, so exporters can tell "absent" apart from a page that
//! literally says `N/A`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One fetched page of a paginated catalog listing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPage {
    /// Address the page was fetched from.
    pub url: String,
    /// Item addresses discovered on this page that had not been seen earlier
    /// in the walk, in document order.
    pub item_urls: Vec<String>,
    /// Whether the link selector matched anything at all. A page whose links
    /// were all duplicates still counts as having items.
    pub had_items: bool,
}

/// Ordered key/value pairs scraped from a product's specification table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Specifications(Vec<(String, String)>);

impl Specifications {
    /// Creates an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a row. A repeated key keeps its first value.
    pub fn insert(&mut self, key: String, value: String) {
        if self.get(&key).is_none() {
            self.0.push((key, value));
        }
    }

    /// Looks up a value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Iterates over the rows in scrape order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of rows.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no rows were scraped.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for Specifications {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut specs = Self::new();
        for (key, value) in iter {
            specs.insert(key, value);
        }
        specs
    }
}

/// A single scraped product.
///
/// Created once from a fetched detail page and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    /// Product name. `None` if no candidate selector matched.
    pub name: Option<String>,
    /// Price text as displayed (currency symbol included).
    pub price: Option<String>,
    /// Stock-keeping unit, with any configured label prefix removed.
    pub sku: Option<String>,
    /// Long-form description.
    pub description: Option<String>,
    /// Rows from the specification table, if the site has one.
    #[serde(default)]
    pub specifications: Specifications,
    /// Detail page the record was scraped from. Always present.
    pub source_url: String,
    /// Absolute address of the product image that was selected.
    pub image_url: Option<String>,
    /// Where the downloaded image was written. `None` when no image was
    /// found or the download/decode failed.
    pub image_path: Option<PathBuf>,
}

impl ItemRecord {
    /// Creates a record for `source_url` with every attribute absent.
    #[must_use]
    pub fn empty(source_url: &str) -> Self {
        Self {
            name: None,
            price: None,
            sku: None,
            description: None,
            specifications: Specifications::new(),
            source_url: source_url.to_owned(),
            image_url: None,
            image_path: None,
        }
    }

    /// Returns `true` if at least one scraped attribute is present.
    #[must_use]
    pub fn has_any_field(&self) -> bool {
        self.name.is_some()
            || self.price.is_some()
            || self.sku.is_some()
            || self.description.is_some()
            || !self.specifications.is_empty()
            || self.image_url.is_some()
    }
}

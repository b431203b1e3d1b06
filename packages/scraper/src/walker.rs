//! Listing pagination walk.
//!
//! The walker:
//! 1. Fetches listing page 1 (the base address), then page 2, 3, ... derived
//!    with [`page_url`]
//! 2. Collects item links with the configured selector, resolving them
//!    against the site root and dropping tracking parameters
//! 3. Keeps only addresses not seen earlier in the walk, in discovery order
//! 4. Stops on the item limit, the page limit, an empty page, or the first
//!    page that cannot be fetched
//!
//! A fetch failure is a soft stop: the addresses gathered so far are
//! returned and the reason is reported in [`WalkOutcome`].

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use garden_scrape_catalog_models::ListingPage;
use scraper::{Html, Selector};
use url::Url;

use crate::ScrapeError;
use crate::address::{normalize_item_url, page_url, parse_http_url};
use crate::fetch::Fetcher;
use crate::progress::{ProgressCallback, null_progress};

/// Page ceiling used when no page limit is configured. Guarantees the walk
/// terminates even if a site never serves an empty page.
pub const DEFAULT_PAGE_CEILING: u32 = 30;

/// Default pagination template appended to the base address.
pub const DEFAULT_PAGE_TEMPLATE: &str = "page/{page}";

/// How item links are found on listing pages.
#[derive(Debug, Clone)]
pub struct LinkRules {
    /// Selector for item link elements; their `href` is followed.
    pub selector: Selector,
    /// Only follow links whose `href` contains this substring.
    pub filter: Option<String>,
    /// Query parameters removed from discovered addresses.
    pub strip_query_params: Vec<String>,
    /// Pagination path template (see [`page_url`]).
    pub page_template: String,
}

impl LinkRules {
    /// Creates rules with the default pagination template and tracking
    /// parameter list.
    #[must_use]
    pub fn new(selector: Selector) -> Self {
        Self {
            selector,
            filter: None,
            strip_query_params: crate::address::default_tracking_params(),
            page_template: DEFAULT_PAGE_TEMPLATE.to_owned(),
        }
    }
}

/// Stopping limits for a walk. At least one bound always applies because
/// the page limit falls back to [`DEFAULT_PAGE_CEILING`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WalkLimits {
    /// Maximum number of addresses to return across all listings.
    pub max_items: Option<usize>,
    /// Maximum number of pages to fetch per listing.
    pub max_pages: Option<u32>,
}

impl WalkLimits {
    /// Rejects zero limits.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::InvalidLimit`] if either limit is zero.
    pub fn validate(&self) -> Result<(), ScrapeError> {
        if self.max_items == Some(0) {
            return Err(ScrapeError::InvalidLimit(
                "item limit must be positive".to_owned(),
            ));
        }
        if self.max_pages == Some(0) {
            return Err(ScrapeError::InvalidLimit(
                "page limit must be positive".to_owned(),
            ));
        }
        Ok(())
    }

    /// Effective per-listing page bound.
    #[must_use]
    pub fn page_ceiling(&self) -> u32 {
        self.max_pages.unwrap_or(DEFAULT_PAGE_CEILING)
    }
}

/// Why the walk of one listing ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The item limit was reached; the result holds exactly that many.
    ItemLimit,
    /// The page limit (or default ceiling) was reached.
    PageLimit,
    /// A page had no item links: end of catalog.
    EmptyPage {
        /// 1-based index of the empty page.
        page: u32,
    },
    /// A page could not be fetched; the walk ended early.
    FetchFailed {
        /// 1-based index of the failing page.
        page: u32,
        /// Address of the failing page.
        url: String,
        /// Transport error description.
        error: String,
    },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ItemLimit => f.write_str("item limit reached"),
            Self::PageLimit => f.write_str("page limit reached"),
            Self::EmptyPage { page } => write!(f, "page {page} had no items"),
            Self::FetchFailed { page, url, error } => {
                write!(f, "page {page} ({url}) failed: {error}")
            }
        }
    }
}

/// Result of walking one listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingWalk {
    /// The listing base address.
    pub listing_url: String,
    /// Pages successfully fetched and parsed.
    pub pages_fetched: u32,
    /// Addresses this listing contributed.
    pub items_found: usize,
    /// Why the walk of this listing ended.
    pub stop_reason: StopReason,
}

/// Result of a whole walk.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WalkOutcome {
    /// Unique detail-page addresses in discovery order.
    pub urls: Vec<String>,
    /// Per-listing summaries, in walk order.
    pub listings: Vec<ListingWalk>,
}

impl WalkOutcome {
    /// Returns `true` if no addresses were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Returns `true` if the item limit ended the walk.
    #[must_use]
    pub fn reached_item_limit(&self) -> bool {
        self.listings
            .iter()
            .any(|l| l.stop_reason == StopReason::ItemLimit)
    }

    /// Listings whose walk ended on a fetch failure.
    pub fn failures(&self) -> impl Iterator<Item = &ListingWalk> {
        self.listings
            .iter()
            .filter(|l| matches!(l.stop_reason, StopReason::FetchFailed { .. }))
    }
}

/// Parses one listing page, recording newly seen addresses in `seen`.
///
/// `had_items` reflects whether the selector matched any usable link at
/// all, so a page made entirely of already-seen links does not end the
/// walk.
#[must_use]
pub fn parse_listing(
    html: &str,
    url: &str,
    root: &Url,
    rules: &LinkRules,
    seen: &mut BTreeSet<String>,
) -> ListingPage {
    let document = Html::parse_document(html);
    let mut item_urls = Vec::new();
    let mut had_items = false;

    for link in document.select(&rules.selector) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if let Some(filter) = rules.filter.as_deref()
            && !href.contains(filter)
        {
            continue;
        }
        let Some(full_url) = normalize_item_url(root, href, &rules.strip_query_params) else {
            continue;
        };
        had_items = true;
        if seen.insert(full_url.clone()) {
            item_urls.push(full_url);
        }
    }

    ListingPage {
        url: url.to_owned(),
        item_urls,
        had_items,
    }
}

/// Paginates listing pages and collects item addresses.
pub struct LinkWalker<F> {
    fetcher: F,
    root: Url,
    rules: LinkRules,
    limits: WalkLimits,
    progress: Arc<dyn ProgressCallback>,
}

impl<F: Fetcher> LinkWalker<F> {
    /// Creates a walker that resolves relative links against `root`.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::InvalidLimit`] for zero limits.
    pub fn new(
        fetcher: F,
        root: Url,
        rules: LinkRules,
        limits: WalkLimits,
    ) -> Result<Self, ScrapeError> {
        limits.validate()?;
        Ok(Self {
            fetcher,
            root,
            rules,
            limits,
            progress: null_progress(),
        })
    }

    /// Reports walk progress to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Gives back the fetcher so it can be reused for extraction.
    pub fn into_fetcher(self) -> F {
        self.fetcher
    }

    /// Walks a single listing.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::InvalidUrl`] if `listing_url` is malformed.
    /// Fetch failures are not errors; see [`StopReason::FetchFailed`].
    pub fn walk(&self, listing_url: &str) -> Result<WalkOutcome, ScrapeError> {
        self.walk_all(&[listing_url])
    }

    /// Walks several listings in order with one shared seen-set and one
    /// shared item limit.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::InvalidUrl`] if any listing address is
    /// malformed. All addresses are checked before anything is fetched.
    pub fn walk_all<S: AsRef<str>>(&self, listings: &[S]) -> Result<WalkOutcome, ScrapeError> {
        let bases = listings
            .iter()
            .map(|l| parse_http_url(l.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(max) = self.limits.max_items {
            self.progress.set_total(max as u64);
        }

        let mut seen = BTreeSet::new();
        let mut outcome = WalkOutcome::default();

        for base in &bases {
            if self.limit_reached(&outcome.urls) {
                break;
            }
            let walk = self.walk_listing(base, &mut seen, &mut outcome.urls)?;
            outcome.listings.push(walk);
        }

        log::info!(
            "Link walk complete: {} addresses from {} listing(s)",
            outcome.urls.len(),
            outcome.listings.len(),
        );
        Ok(outcome)
    }

    fn limit_reached(&self, urls: &[String]) -> bool {
        self.limits.max_items.is_some_and(|max| urls.len() >= max)
    }

    fn walk_listing(
        &self,
        base: &Url,
        seen: &mut BTreeSet<String>,
        urls: &mut Vec<String>,
    ) -> Result<ListingWalk, ScrapeError> {
        let ceiling = self.limits.page_ceiling();
        let start_len = urls.len();
        let mut pages_fetched = 0;
        let mut stop_reason = StopReason::PageLimit;

        log::info!("Walking listing {base} (up to {ceiling} pages)");

        'pages: for page in 1..=ceiling {
            let url = page_url(base, &self.rules.page_template, page)?;
            self.progress
                .set_message(format!("listing page {page}: {url}"));
            log::debug!("Fetching listing page {page}: {url}");

            let html = match self.fetcher.get_text(url.as_str()) {
                Ok(html) => html,
                Err(e) => {
                    log::warn!("Listing page {page} ({url}) failed, ending walk: {e}");
                    stop_reason = StopReason::FetchFailed {
                        page,
                        url: url.to_string(),
                        error: e.to_string(),
                    };
                    break;
                }
            };
            pages_fetched += 1;

            let listing = parse_listing(&html, url.as_str(), &self.root, &self.rules, seen);
            if !listing.had_items {
                log::info!("No item links on page {page}, end of catalog");
                stop_reason = StopReason::EmptyPage { page };
                break;
            }

            log::info!(
                "Page {page}: {} new item link(s)",
                listing.item_urls.len()
            );

            for item_url in listing.item_urls {
                urls.push(item_url);
                self.progress.inc(1);
                if self.limit_reached(urls) {
                    stop_reason = StopReason::ItemLimit;
                    break 'pages;
                }
            }
        }

        Ok(ListingWalk {
            listing_url: base.to_string(),
            pages_fetched,
            items_found: urls.len() - start_len,
            stop_reason,
        })
    }
}

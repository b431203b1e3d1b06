//! Detail-page extraction.
//!
//! One fetched page becomes one [`ItemRecord`]. Each attribute is extracted
//! independently from its [`ItemSelectors`] candidates; an attribute with no
//! matching candidate is simply `None`. The image is best-effort: any
//! failure to fetch, decode or write it is logged and leaves
//! [`ItemRecord::image_path`] empty.

use std::sync::Arc;

use garden_scrape_catalog_models::ItemRecord;
use scraper::Html;
use url::Url;

use crate::ScrapeError;
use crate::address::{parse_http_url, resolve_asset_url};
use crate::fetch::Fetcher;
use crate::images::{ImageStore, image_extension, image_file_stem};
use crate::progress::{ProgressCallback, null_progress};
use crate::selector::ItemSelectors;

/// Stem used for image files when neither the product name nor the page
/// address yields one.
const FALLBACK_STEM: &str = "item";

/// An address that produced no record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    /// The detail-page address.
    pub url: String,
    /// Why it was skipped.
    pub reason: String,
}

/// Result of extracting a batch of addresses.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// One record per successfully fetched address, in input order.
    pub records: Vec<ItemRecord>,
    /// Addresses whose page could not be fetched.
    pub skipped: Vec<SkippedItem>,
}

impl BatchOutcome {
    /// Number of records that have a saved image.
    #[must_use]
    pub fn images_saved(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.image_path.is_some())
            .count()
    }
}

/// Parses a detail page into a record. No network access: the image
/// address is resolved but not downloaded.
#[must_use]
pub fn parse_item(html: &str, page_url: &Url, selectors: &ItemSelectors) -> ItemRecord {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let image_url = selectors
        .image
        .first_map(root, |raw| resolve_asset_url(page_url, &raw))
        .map(|(_, url)| url.to_string());

    ItemRecord {
        name: selectors.name.extract(root),
        price: selectors.price.extract(root),
        sku: selectors.sku.extract(root),
        description: selectors.description.extract(root),
        specifications: selectors
            .specifications
            .as_ref()
            .map(|table| table.extract(root))
            .unwrap_or_default(),
        source_url: page_url.to_string(),
        image_url,
        image_path: None,
    }
}

/// Last non-empty path segment of an address, used to name images of
/// products without a name.
fn stem_from_address(url: &Url) -> Option<String> {
    url.path_segments()?
        .rev()
        .find(|segment| !segment.is_empty())
        .and_then(image_file_stem)
}

/// Fetches detail pages and turns them into [`ItemRecord`]s.
pub struct ItemExtractor<F> {
    fetcher: F,
    selectors: ItemSelectors,
    images: Option<ImageStore>,
    progress: Arc<dyn ProgressCallback>,
}

impl<F: Fetcher> ItemExtractor<F> {
    /// Creates an extractor that does not download images.
    #[must_use]
    pub fn new(fetcher: F, selectors: ItemSelectors) -> Self {
        Self {
            fetcher,
            selectors,
            images: None,
            progress: null_progress(),
        }
    }

    /// Downloads product images into `store`.
    #[must_use]
    pub fn with_images(mut self, store: ImageStore) -> Self {
        self.images = Some(store);
        self
    }

    /// Reports batch progress to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Fetches and extracts one detail page.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError`] if the address is malformed or the page
    /// cannot be fetched. Missing attributes and image failures are not
    /// errors.
    pub fn extract(&self, url: &str) -> Result<ItemRecord, ScrapeError> {
        let page_url = parse_http_url(url)?;
        let html = self.fetcher.get_text(page_url.as_str())?;
        let mut record = parse_item(&html, &page_url, &self.selectors);

        if !record.has_any_field() {
            log::warn!("No fields matched on {url}");
        }

        if let (Some(store), Some(image_url)) = (&self.images, record.image_url.as_deref()) {
            match self.download_image(store, image_url, record.name.as_deref(), &page_url) {
                Ok(path) => record.image_path = Some(path),
                Err(e) => log::warn!("Image {image_url} for {url} not saved: {e}"),
            }
        }

        Ok(record)
    }

    fn download_image(
        &self,
        store: &ImageStore,
        image_url: &str,
        name: Option<&str>,
        page_url: &Url,
    ) -> Result<std::path::PathBuf, ScrapeError> {
        let image_url = parse_http_url(image_url)?;
        let stem = name
            .and_then(image_file_stem)
            .or_else(|| stem_from_address(page_url))
            .unwrap_or_else(|| FALLBACK_STEM.to_owned());
        let bytes = self.fetcher.get_bytes(image_url.as_str())?;
        store.save(&bytes, &stem, image_extension(&image_url))
    }

    /// Extracts every address in order. A page that cannot be fetched is
    /// logged, recorded in [`BatchOutcome::skipped`] and does not stop the
    /// batch.
    pub fn extract_all<S: AsRef<str>>(&self, urls: &[S]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        self.progress.set_total(urls.len() as u64);

        for (index, url) in urls.iter().enumerate() {
            let url = url.as_ref();
            self.progress
                .set_message(format!("item {}/{}: {url}", index + 1, urls.len()));

            match self.extract(url) {
                Ok(record) => outcome.records.push(record),
                Err(e) => {
                    log::warn!("Skipping {url}: {e}");
                    outcome.skipped.push(SkippedItem {
                        url: url.to_owned(),
                        reason: e.to_string(),
                    });
                }
            }
            self.progress.inc(1);
        }

        log::info!(
            "Extraction complete: {} record(s), {} skipped, {} image(s) saved",
            outcome.records.len(),
            outcome.skipped.len(),
            outcome.images_saved(),
        );
        self.progress.finish(format!(
            "extracted {} record(s), {} skipped",
            outcome.records.len(),
            outcome.skipped.len(),
        ));
        outcome
    }
}

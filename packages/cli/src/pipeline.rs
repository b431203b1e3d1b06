//! One scrape run: walk, extract, write, archive.
//!
//! Every setting arrives through [`RunOptions`] and the compiled
//! [`SiteRules`]; the output folder is created here at the start of the
//! run rather than on program start.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use garden_scrape_catalog::site_def::SiteRules;
use garden_scrape_export::ExportError;
use garden_scrape_export::archive::zip_files;
use garden_scrape_export::spreadsheet::write_csv;
use garden_scrape_scraper::ScrapeError;
use garden_scrape_scraper::extractor::{BatchOutcome, ItemExtractor};
use garden_scrape_scraper::fetch::Fetcher;
use garden_scrape_scraper::images::ImageStore;
use garden_scrape_scraper::progress::{ProgressCallback, null_progress};
use garden_scrape_scraper::walker::{LinkWalker, WalkLimits, WalkOutcome};

/// Subfolder of the output directory that receives images.
pub const IMAGE_DIR: &str = "images";

/// Errors that abort a run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Invalid limits or listing addresses.
    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    /// Writing the spreadsheet or archive failed.
    #[error(transparent)]
    Export(#[from] ExportError),

    /// The output folder could not be created.
    #[error("cannot create output folder {}: {source}", path.display())]
    OutputDir {
        /// Folder that was being created.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Settings for one run.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Listing addresses overriding the profile's own, if non-empty.
    pub listings: Vec<String>,
    /// Item limit across all listings.
    pub max_items: Option<usize>,
    /// Page limit per listing; overrides the profile's.
    pub max_pages: Option<u32>,
    /// Folder receiving the spreadsheet, images and archive.
    pub output_dir: PathBuf,
    /// Download product images.
    pub download_images: bool,
    /// Bundle saved images into a ZIP file.
    pub archive_images: bool,
}

impl RunOptions {
    /// Options with no limits that write to `output_dir`, downloading and
    /// archiving images.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            listings: Vec::new(),
            max_items: None,
            max_pages: None,
            output_dir: output_dir.into(),
            download_images: true,
            archive_images: true,
        }
    }

    const fn limits(&self, rules: &SiteRules) -> WalkLimits {
        WalkLimits {
            max_items: self.max_items,
            max_pages: match self.max_pages {
                Some(pages) => Some(pages),
                None => rules.max_pages,
            },
        }
    }

    fn listings<'a>(&'a self, rules: &'a SiteRules) -> &'a [String] {
        if self.listings.is_empty() {
            &rules.listings
        } else {
            &self.listings
        }
    }
}

/// Progress sinks for the two phases.
#[derive(Clone)]
pub struct RunProgress {
    /// Link walk.
    pub links: Arc<dyn ProgressCallback>,
    /// Detail-page extraction.
    pub items: Arc<dyn ProgressCallback>,
}

impl Default for RunProgress {
    fn default() -> Self {
        Self {
            links: null_progress(),
            items: null_progress(),
        }
    }
}

/// What a run produced.
#[derive(Debug)]
pub struct RunSummary {
    /// Site profile id.
    pub site: String,
    /// The link walk result.
    pub walk: WalkOutcome,
    /// Records written.
    pub records: usize,
    /// Addresses that produced no record.
    pub skipped: usize,
    /// Images saved to disk.
    pub images_saved: usize,
    /// Spreadsheet path.
    pub csv_path: PathBuf,
    /// Archive path, when one was written.
    pub archive_path: Option<PathBuf>,
    /// Wall-clock duration.
    pub elapsed: Duration,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Site:           {}", self.site)?;
        writeln!(f, "Links found:    {}", self.walk.urls.len())?;
        for listing in &self.walk.listings {
            writeln!(
                f,
                "  {} ({} page(s), {} link(s)): {}",
                listing.listing_url,
                listing.pages_fetched,
                listing.items_found,
                listing.stop_reason
            )?;
        }
        writeln!(f, "Records:        {}", self.records)?;
        writeln!(f, "Skipped:        {}", self.skipped)?;
        writeln!(f, "Images saved:   {}", self.images_saved)?;
        writeln!(f, "Spreadsheet:    {}", self.csv_path.display())?;
        if let Some(archive) = &self.archive_path {
            writeln!(f, "Image archive:  {}", archive.display())?;
        }
        write!(f, "Elapsed:        {:.1}s", self.elapsed.as_secs_f64())
    }
}

/// Runs only the link walk.
///
/// # Errors
///
/// Returns [`ScrapeError`] for invalid limits or listing addresses.
pub fn walk_links<F: Fetcher>(
    fetcher: F,
    rules: &SiteRules,
    options: &RunOptions,
    progress: Arc<dyn ProgressCallback>,
) -> Result<WalkOutcome, ScrapeError> {
    let walker = LinkWalker::new(
        fetcher,
        rules.root.clone(),
        rules.link_rules.clone(),
        options.limits(rules),
    )?
    .with_progress(Arc::clone(&progress));

    let outcome = walker.walk_all(options.listings(rules))?;
    progress.finish(format!("{} link(s) found", outcome.urls.len()));
    Ok(outcome)
}

fn create_dir(path: &Path) -> Result<(), PipelineError> {
    std::fs::create_dir_all(path).map_err(|source| PipelineError::OutputDir {
        path: path.to_path_buf(),
        source,
    })
}

fn saved_images(batch: &BatchOutcome) -> Vec<PathBuf> {
    batch
        .records
        .iter()
        .filter_map(|r| r.image_path.clone())
        .collect()
}

/// Runs the full pipeline against `fetcher`.
///
/// # Errors
///
/// Returns [`PipelineError`] if the configuration is invalid or an output
/// file cannot be written. Network failures never abort the run.
pub fn run<F: Fetcher>(
    fetcher: F,
    rules: &SiteRules,
    options: &RunOptions,
    progress: &RunProgress,
) -> Result<RunSummary, PipelineError> {
    let start = Instant::now();

    create_dir(&options.output_dir)?;
    let image_dir = options.output_dir.join(IMAGE_DIR);
    if options.download_images {
        create_dir(&image_dir)?;
    }

    log::info!("Scraping '{}' into {}", rules.id, options.output_dir.display());

    let walk = walk_links(&fetcher, rules, options, Arc::clone(&progress.links))?;
    if walk.is_empty() {
        log::warn!("No item links found for '{}'", rules.id);
    }

    let mut extractor = ItemExtractor::new(&fetcher, rules.item_selectors.clone())
        .with_progress(Arc::clone(&progress.items));
    if options.download_images {
        extractor = extractor.with_images(ImageStore::new(&image_dir));
    }
    let batch = extractor.extract_all(&walk.urls);

    let csv_path = options.output_dir.join(format!("{}_items.csv", rules.id));
    let records = write_csv(&batch.records, &csv_path)?;

    let images = saved_images(&batch);
    let archive_path = if options.download_images && options.archive_images && !images.is_empty()
    {
        let path = options.output_dir.join(format!("{}_images.zip", rules.id));
        zip_files(&images, &path)?;
        Some(path)
    } else {
        None
    };

    Ok(RunSummary {
        site: rules.id.clone(),
        walk,
        records,
        skipped: batch.skipped.len(),
        images_saved: images.len(),
        csv_path,
        archive_path,
        elapsed: start.elapsed(),
    })
}

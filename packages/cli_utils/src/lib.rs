#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the scraper binary.
//!
//! [`IndicatifProgress`] renders walk and extraction progress behind the
//! scraper's [`ProgressCallback`] trait. [`init_logger`] installs
//! `pretty_env_logger` through `indicatif-log-bridge` so log lines are
//! printed above the bars instead of through them.

use std::sync::Arc;
use std::time::Duration;

use garden_scrape_scraper::progress::ProgressCallback;
use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

const BAR_CHARS: &str = "##-";

fn spinner(multi: &MultiProgress, color: &str, message: &str) -> ProgressBar {
    let bar = multi.add(ProgressBar::new_spinner());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar.set_style(
        ProgressStyle::with_template(&format!("{{spinner:.{color}}} {{msg}}"))
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.to_owned());
    bar
}

fn bar_style(color: &str) -> ProgressStyle {
    ProgressStyle::with_template(&format!(
        "  {{msg}} {{wide_bar:.{color}/dim}} {{pos}}/{{len}} {{percent}}% [{{eta}}]"
    ))
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars(BAR_CHARS)
}

/// An `indicatif` [`ProgressBar`] that implements [`ProgressCallback`].
pub struct IndicatifProgress {
    bar: ProgressBar,
    /// Style to switch to once `set_total()` provides a known length.
    bar_style: ProgressStyle,
}

impl IndicatifProgress {
    /// Progress for the link walk. Starts as a spinner, since the number of
    /// links is only known when an item limit is set, and becomes a bar on
    /// [`ProgressCallback::set_total()`].
    #[must_use]
    pub fn links_bar(multi: &MultiProgress) -> Arc<dyn ProgressCallback> {
        Arc::new(Self {
            bar: spinner(multi, "cyan", "walking listings"),
            bar_style: bar_style("cyan"),
        })
    }

    /// Progress for detail-page extraction.
    #[must_use]
    pub fn items_bar(multi: &MultiProgress) -> Arc<dyn ProgressCallback> {
        Arc::new(Self {
            bar: spinner(multi, "green", "extracting items"),
            bar_style: bar_style("green"),
        })
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_style(self.bar_style.clone());
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

/// Installs the global logger behind `indicatif-log-bridge`.
///
/// Filtering follows `RUST_LOG`. Returns the [`MultiProgress`] every bar
/// must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    // Already installed when called twice (e.g. from tests).
    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok();

    log::set_max_level(level);

    multi
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the storefront scraper.
//!
//! Uses `indicatif-log-bridge` (via [`garden_scrape_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod pipeline;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use garden_scrape_catalog::registry::{all_sites, find_site};
use garden_scrape_catalog::site_def::{SiteDefinition, SiteRules, load_site_file};
use garden_scrape_cli_utils::IndicatifProgress;
use garden_scrape_scraper::fetch::{FetchConfig, HttpFetcher};
use garden_scrape_scraper::retry::RetryPolicy;

use crate::pipeline::{RunOptions, RunProgress};

#[derive(Parser)]
#[command(name = "garden_scrape", about = "Storefront catalog scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List built-in site profiles
    Sites,
    /// Walk listing pages and print the discovered item addresses
    Links {
        #[command(flatten)]
        site: SiteArgs,
        #[command(flatten)]
        walk: WalkArgs,
        #[command(flatten)]
        fetch: FetchArgs,
    },
    /// Walk listings, extract every item, write the spreadsheet and images
    Run {
        #[command(flatten)]
        site: SiteArgs,
        #[command(flatten)]
        walk: WalkArgs,
        #[command(flatten)]
        fetch: FetchArgs,
        /// Output folder
        #[arg(long, default_value = "scrape_output")]
        output: PathBuf,
        /// Skip image downloads
        #[arg(long)]
        no_images: bool,
        /// Do not bundle saved images into a ZIP file
        #[arg(long)]
        no_archive: bool,
    },
}

/// Which profile to use.
#[derive(Args)]
#[group(required = true, multiple = false)]
struct SiteArgs {
    /// Built-in profile id (see `sites`)
    #[arg(long)]
    site: Option<String>,
    /// Profile TOML file
    #[arg(long)]
    config: Option<PathBuf>,
}

impl SiteArgs {
    fn resolve(&self) -> Result<SiteRules, Box<dyn std::error::Error>> {
        let definition = match (&self.site, &self.config) {
            (_, Some(path)) => load_site_file(path)?,
            (Some(id), None) => find_site(id).ok_or_else(|| format!("Unknown site: {id}"))?,
            (None, None) => return Err("either --site or --config is required".into()),
        };
        Ok(definition.compile()?)
    }
}

#[derive(Args)]
struct WalkArgs {
    /// Listing address to walk instead of the profile's (repeatable)
    #[arg(long = "listing")]
    listings: Vec<String>,
    /// Maximum number of item addresses to collect
    #[arg(long)]
    max_items: Option<usize>,
    /// Maximum listing pages per listing (default 30)
    #[arg(long)]
    max_pages: Option<u32>,
}

#[derive(Args)]
struct FetchArgs {
    /// Retries per request for transient failures
    #[arg(long, default_value = "2")]
    retries: u32,
    /// Pause between requests in milliseconds
    #[arg(long, default_value = "2000")]
    delay_ms: u64,
    /// Per-request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout_secs: u64,
}

impl FetchArgs {
    fn fetcher(&self) -> Result<HttpFetcher, Box<dyn std::error::Error>> {
        let config = FetchConfig::default()
            .with_retry(RetryPolicy::new(self.retries))
            .with_delay(Duration::from_millis(self.delay_ms))
            .with_timeout(Duration::from_secs(self.timeout_secs));
        Ok(HttpFetcher::new(config)?)
    }
}

fn run_options(walk: WalkArgs, output: PathBuf) -> RunOptions {
    RunOptions {
        listings: walk.listings,
        max_items: walk.max_items,
        max_pages: walk.max_pages,
        ..RunOptions::new(output)
    }
}

fn print_sites(sites: &[SiteDefinition]) {
    println!("{:<20} {:<24} LISTINGS", "ID", "NAME");
    println!("{}", "-".repeat(60));
    for site in sites {
        println!("{:<20} {:<24} {}", site.id, site.name, site.listings.len());
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = garden_scrape_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Sites => print_sites(&all_sites()),
        Commands::Links { site, walk, fetch } => {
            let rules = site.resolve()?;
            let fetcher = fetch.fetcher()?;
            let options = run_options(walk, PathBuf::new());

            let outcome = pipeline::walk_links(
                &fetcher,
                &rules,
                &options,
                IndicatifProgress::links_bar(&multi),
            )?;
            for listing in &outcome.listings {
                log::info!("{}: {}", listing.listing_url, listing.stop_reason);
            }
            for url in &outcome.urls {
                println!("{url}");
            }
        }
        Commands::Run {
            site,
            walk,
            fetch,
            output,
            no_images,
            no_archive,
        } => {
            let rules = site.resolve()?;
            let fetcher = fetch.fetcher()?;
            let options = RunOptions {
                download_images: !no_images,
                archive_images: !no_archive,
                ..run_options(walk, output)
            };
            let progress = RunProgress {
                links: IndicatifProgress::links_bar(&multi),
                items: IndicatifProgress::items_bar(&multi),
            };

            let summary = pipeline::run(&fetcher, &rules, &options, &progress)?;
            println!();
            println!("{summary}");
        }
    }

    Ok(())
}

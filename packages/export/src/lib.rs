#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Output collaborators for a finished scrape.
//!
//! [`spreadsheet`] writes the records as one CSV table and [`archive`]
//! bundles the saved product images into a ZIP file.

pub mod archive;
pub mod spreadsheet;

/// Errors that can occur while writing output files.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// CSV serialization failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// ZIP archive creation failed.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// I/O error (file create/read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

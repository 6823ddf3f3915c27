#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Crime log sources and the runs that fetch them.
//!
//! A [`SourceDefinition`](source_def::SourceDefinition) describes where a
//! department publishes its daily logs and how their tables are laid out.
//! Definitions are embedded at compile time ([`registry`]) or loaded from a
//! user file. [`fetch::fetch_range`] downloads a date range and streams the
//! reconstructed records to an [`output::RecordWriter`].

pub mod fetch;
pub mod output;
pub mod progress;
pub mod registry;
pub mod source_def;

use chrono::NaiveDate;
use crime_log_layout::LayoutError;
use crime_log_pdf::PdfError;
use crime_log_scraper::ScrapeError;

/// Errors that can occur during data source operations.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// A source definition could not be parsed.
    #[error("Invalid source definition: {0}")]
    Config(String),

    /// No embedded source has the requested id.
    #[error("Unknown source '{0}'")]
    UnknownSource(String),

    /// The source's layout is invalid or a page did not fit it.
    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// A document could not be decoded.
    #[error(transparent)]
    Pdf(#[from] PdfError),

    /// Downloading a document failed.
    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration for one fetch run.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// First day to fetch (inclusive).
    pub start: NaiveDate,
    /// Last day to fetch (inclusive).
    pub end: NaiveDate,
    /// Maximum number of documents downloaded at once.
    pub concurrency: usize,
}

impl FetchOptions {
    /// Fetches `start..=end` one document at a time.
    #[must_use]
    pub const fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            concurrency: 1,
        }
    }

    /// Sets how many documents may be downloaded at once.
    #[must_use]
    pub const fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }
}

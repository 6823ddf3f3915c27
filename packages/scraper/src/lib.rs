#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Document scraping framework for crime log sources.
//!
//! Provides the [`Scraper`] trait, implemented once per document format,
//! and drivers that fetch a scraper's pages concurrently while keeping
//! their records in page order ([`scrape_pages`], [`scrape_all`]).
//!
//! A "page" here is one unit of fetching (for daily crime logs, one
//! day's document), not a page inside a PDF.

pub mod retry;

use std::pin::pin;

use crime_log_layout_models::Record;
use futures::{Stream, StreamExt as _, stream};

/// Errors that can occur during scraping operations.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// An HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-retryable status.
    #[error("HTTP status {0}")]
    Status(reqwest::StatusCode),

    /// Turning the response body into records failed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// What happened to one fetched page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum PageStatus {
    /// The document was downloaded and its records extracted.
    Extracted,
    /// The server has no document for this page.
    Missing,
    /// The document was downloaded but could not be decoded.
    Undecodable,
}

/// A single page of scraped records.
#[derive(Debug, Clone)]
pub struct ScrapedPage {
    /// The records extracted from this page, in document order.
    pub records: Vec<Record>,
    /// The zero-indexed page number of this result set.
    pub page_number: u32,
    /// Whether the page produced records, was absent or was unreadable.
    pub status: PageStatus,
}

impl ScrapedPage {
    /// A page whose records were extracted.
    #[must_use]
    pub const fn extracted(page_number: u32, records: Vec<Record>) -> Self {
        Self {
            records,
            page_number,
            status: PageStatus::Extracted,
        }
    }

    /// A page that produced no records for the given reason.
    #[must_use]
    pub const fn empty(page_number: u32, status: PageStatus) -> Self {
        Self {
            records: Vec::new(),
            page_number,
            status,
        }
    }
}

/// Trait for fetching records from a paged document source.
pub trait Scraper: Send + Sync {
    /// Fetches a single page of records.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError`] if the page cannot be fetched or turned into
    /// records. Pages that are absent or unreadable but should not stop a
    /// run are reported through [`ScrapedPage::status`] instead.
    fn fetch_page(
        &self,
        page: u32,
    ) -> impl std::future::Future<Output = Result<ScrapedPage, ScrapeError>> + Send;

    /// Number of pages this scraper will serve.
    fn page_count(&self) -> u32;

    /// Returns the name of the scraping strategy (e.g. `"pdf_layout"`).
    fn strategy(&self) -> &str;
}

/// Fetches every page of `scraper`, up to `concurrency` at a time.
///
/// Pages are yielded in page order regardless of the order in which their
/// downloads finish.
pub fn scrape_pages<S: Scraper>(
    scraper: &S,
    concurrency: usize,
) -> impl Stream<Item = Result<ScrapedPage, ScrapeError>> + Send + '_ {
    log::debug!(
        "Scraping {} pages with {} ({concurrency} concurrent)",
        scraper.page_count(),
        scraper.strategy()
    );
    stream::iter(0..scraper.page_count())
        .map(move |page| scraper.fetch_page(page))
        .buffered(concurrency.max(1))
}

/// Fetches all pages and concatenates their records in page order.
///
/// # Errors
///
/// Returns the first [`ScrapeError`] encountered during fetching.
pub async fn scrape_all<S: Scraper>(
    scraper: &S,
    concurrency: usize,
) -> Result<Vec<Record>, ScrapeError> {
    let mut pages = pin!(scrape_pages(scraper, concurrency));
    let mut all_records = Vec::new();

    while let Some(page) = pages.next().await {
        let page = page?;
        log::debug!(
            "Page {} {}: {} records",
            page.page_number,
            page.status,
            page.records.len()
        );
        all_records.extend(page.records);
    }

    log::info!("Scrape complete: {} total records", all_records.len());
    Ok(all_records)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    /// Serves one record per page; earlier pages take longer to arrive.
    struct Countdown {
        pages: u32,
        missing: Option<u32>,
        failing: Option<u32>,
    }

    impl Scraper for Countdown {
        async fn fetch_page(&self, page: u32) -> Result<ScrapedPage, ScrapeError> {
            tokio::time::sleep(Duration::from_millis(u64::from(self.pages - page) * 5)).await;
            if self.failing == Some(page) {
                return Err(ScrapeError::Parse(format!("page {page} is broken")));
            }
            if self.missing == Some(page) {
                return Ok(ScrapedPage::empty(page, PageStatus::Missing));
            }
            Ok(ScrapedPage::extracted(
                page,
                vec![Record::new(vec![format!("case {page}")])],
            ))
        }

        fn page_count(&self) -> u32 {
            self.pages
        }

        fn strategy(&self) -> &'static str {
            "countdown"
        }
    }

    fn values(records: &[Record]) -> Vec<&str> {
        records.iter().map(|r| r.fields[0].as_str()).collect()
    }

    #[tokio::test]
    async fn records_keep_page_order_under_concurrency() {
        let scraper = Countdown {
            pages: 4,
            missing: None,
            failing: None,
        };

        let records = scrape_all(&scraper, 4).await.unwrap();

        assert_eq!(values(&records), vec!["case 0", "case 1", "case 2", "case 3"]);
    }

    #[tokio::test]
    async fn missing_pages_contribute_nothing() {
        let scraper = Countdown {
            pages: 3,
            missing: Some(1),
            failing: None,
        };

        let pages: Vec<ScrapedPage> = scrape_pages(&scraper, 2)
            .map(Result::unwrap)
            .collect()
            .await;

        let statuses: Vec<PageStatus> = pages.iter().map(|p| p.status).collect();
        assert_eq!(
            statuses,
            vec![PageStatus::Extracted, PageStatus::Missing, PageStatus::Extracted]
        );
        assert_eq!(pages[1].status.to_string(), "missing");
    }

    #[tokio::test]
    async fn first_error_stops_the_scrape() {
        let scraper = Countdown {
            pages: 3,
            missing: None,
            failing: Some(1),
        };

        let err = scrape_all(&scraper, 1).await.unwrap_err();

        assert!(matches!(err, ScrapeError::Parse(message) if message.contains("page 1")));
    }

    #[tokio::test]
    async fn zero_concurrency_still_makes_progress() {
        let scraper = Countdown {
            pages: 2,
            missing: None,
            failing: None,
        };

        let records = scrape_all(&scraper, 0).await.unwrap();

        assert_eq!(records.len(), 2);
    }
}

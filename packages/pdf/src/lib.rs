#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Crime log PDF decoding.
//!
//! Crime logs are published as PDFs whose table structure only exists as
//! geometry. This crate decodes a PDF into positioned text boxes and
//! horizontal rules ([`decode`], [`text_boxes`]), hands them to a
//! [`LayoutEngine`] and returns the reconstructed records.
//!
//! The primary entry point is [`PdfScraper`], which implements the
//! [`crime_log_scraper::Scraper`] trait over a list of dated document URLs
//! ([`download`]).

pub mod decode;
pub mod download;
pub mod text_boxes;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crime_log_layout::{LayoutEngine, LayoutError, Page, Record};
use crime_log_scraper::{PageStatus, ScrapeError, ScrapedPage, Scraper, retry};

pub use download::{DatedUrl, expand_daily_template};
pub use text_boxes::DecoderParams;

/// Errors specific to PDF extraction.
#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    /// An HTTP request to download a PDF failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The bytes could not be decoded as a PDF.
    #[error("PDF decode error: {0}")]
    Decode(String),

    /// The decoded pages did not fit the configured layout.
    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// Downloading the document failed.
    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PdfError> for ScrapeError {
    fn from(e: PdfError) -> Self {
        match e {
            PdfError::Scrape(inner) => inner,
            PdfError::Http(inner) => Self::Http(inner),
            PdfError::Io(inner) => Self::Io(inner),
            other => Self::Parse(other.to_string()),
        }
    }
}

/// Decodes a PDF into layout pages, one per PDF page, in page order.
///
/// # Errors
///
/// Returns [`PdfError::Decode`] if the bytes are not a readable PDF.
pub fn decode_pages(
    bytes: &[u8],
    engine: &LayoutEngine,
    params: &DecoderParams,
) -> Result<Vec<Page>, PdfError> {
    let pages = decode::collect_pages(bytes)?
        .into_iter()
        .map(|raw| {
            let fragments = text_boxes::text_boxes(&raw.glyphs, params);
            engine.partition(raw.number as usize, fragments, raw.hlines)
        })
        .collect();
    Ok(pages)
}

/// Decodes a PDF and reconstructs its records.
///
/// # Errors
///
/// * [`PdfError::Decode`] if the bytes are not a readable PDF.
/// * [`PdfError::Layout`] if a page does not fit the layout.
pub fn extract_records(
    bytes: &[u8],
    engine: &LayoutEngine,
    params: &DecoderParams,
) -> Result<Vec<Record>, PdfError> {
    let pages = decode_pages(bytes, engine, params)?;
    log::debug!("Decoded {} PDF pages", pages.len());
    Ok(engine.records_from_pages(pages)?)
}

/// Turns one downloaded document into a [`ScrapedPage`].
///
/// A document that cannot be decoded yields an empty
/// [`PageStatus::Undecodable`] page so the batch carries on; a document
/// that decodes but does not fit the layout is an error.
///
/// # Errors
///
/// Returns [`ScrapeError::Parse`] if the decoded pages do not fit the
/// engine's layout.
pub fn document_page(
    page: u32,
    document: &DatedUrl,
    bytes: &[u8],
    engine: &LayoutEngine,
    params: &DecoderParams,
) -> Result<ScrapedPage, ScrapeError> {
    match extract_records(bytes, engine, params) {
        Ok(records) => {
            log::info!("Extracted {} records from {} ({})", records.len(), document.date, document.url);
            Ok(ScrapedPage::extracted(page, records))
        }
        Err(PdfError::Decode(reason)) => {
            log::warn!("Skipping {}: {reason}", document.url);
            Ok(ScrapedPage::empty(page, PageStatus::Undecodable))
        }
        Err(e) => {
            log::error!("Failed to reconstruct {}: {e}", document.url);
            Err(e.into())
        }
    }
}

/// A scraper that downloads one crime log PDF per page and extracts its
/// records.
///
/// A document the server does not have (HTTP 404) or cannot be decoded
/// yields an empty page; a document that decodes but does not fit the
/// layout fails the page.
#[derive(Debug)]
pub struct PdfScraper {
    /// Documents to download (one page per document).
    documents: Vec<DatedUrl>,
    /// Layout used to reconstruct every document.
    engine: Arc<LayoutEngine>,
    /// Glyph grouping parameters.
    params: DecoderParams,
    /// Additional HTTP headers for the download requests.
    headers: BTreeMap<String, String>,
    /// Pause before each download.
    delay_ms: u64,
}

impl PdfScraper {
    /// Creates a new `PdfScraper` over the given documents.
    #[must_use]
    pub const fn new(documents: Vec<DatedUrl>, engine: Arc<LayoutEngine>, params: DecoderParams) -> Self {
        Self {
            documents,
            engine,
            params,
            headers: BTreeMap::new(),
            delay_ms: 0,
        }
    }

    /// Adds an HTTP header to include in download requests.
    #[must_use]
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_owned(), value.to_owned());
        self
    }

    /// Sets the pause before each download.
    #[must_use]
    pub const fn with_delay_ms(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }

    /// The documents this scraper serves, in page order.
    #[must_use]
    pub fn documents(&self) -> &[DatedUrl] {
        &self.documents
    }

    /// Builds a [`reqwest::Client`] with the configured headers.
    fn build_client(&self) -> Result<reqwest::Client, PdfError> {
        let mut header_map = reqwest::header::HeaderMap::new();
        for (key, value) in &self.headers {
            let name = reqwest::header::HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                ScrapeError::Parse(format!("invalid header name '{key}': {e}"))
            })?;
            let val = reqwest::header::HeaderValue::from_str(value).map_err(|e| {
                ScrapeError::Parse(format!("invalid header value '{value}': {e}"))
            })?;
            header_map.insert(name, val);
        }
        reqwest::Client::builder()
            .default_headers(header_map)
            .build()
            .map_err(PdfError::Http)
    }
}

impl Scraper for PdfScraper {
    async fn fetch_page(&self, page: u32) -> Result<ScrapedPage, ScrapeError> {
        let Some(document) = self.documents.get(page as usize) else {
            return Ok(ScrapedPage::empty(page, PageStatus::Missing));
        };

        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }

        let client = self.build_client()?;
        let bytes = match retry::send_bytes(|| client.get(&document.url)).await {
            Ok(bytes) => bytes,
            Err(ScrapeError::Status(reqwest::StatusCode::NOT_FOUND)) => {
                log::warn!("No crime log for {} ({} not found)", document.date, document.url);
                return Ok(ScrapedPage::empty(page, PageStatus::Missing));
            }
            Err(e) => return Err(e),
        };

        let engine = Arc::clone(&self.engine);
        let params = self.params;
        let document = document.clone();
        tokio::task::spawn_blocking(move || document_page(page, &document, &bytes, &engine, &params))
            .await
            .map_err(|e| ScrapeError::Parse(format!("decoder task failed: {e}")))?
    }

    fn page_count(&self) -> u32 {
        u32::try_from(self.documents.len()).unwrap_or(u32::MAX)
    }

    fn strategy(&self) -> &'static str {
        "pdf_layout"
    }
}

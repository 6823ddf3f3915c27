//! Fetch runs: download a date range and stream its records to a sink.

use std::io::Write;
use std::pin::pin;
use std::sync::Arc;

use crime_log_layout::LayoutEngine;
use crime_log_pdf::PdfScraper;
use crime_log_scraper::{PageStatus, Scraper, scrape_pages};
use futures::StreamExt as _;

use crate::output::RecordWriter;
use crate::progress::ProgressCallback;
use crate::source_def::SourceDefinition;
use crate::{FetchOptions, SourceError};

/// Outcome counters of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSummary {
    /// Documents requested (dates in range minus skipped dates).
    pub documents: usize,
    /// Documents decoded into records.
    pub extracted: usize,
    /// Dates the publisher has no document for.
    pub missing: usize,
    /// Documents that could not be decoded.
    pub undecodable: usize,
    /// Records written.
    pub records: usize,
}

/// Builds the scraper for `def` over `options`' date range.
///
/// # Errors
///
/// * [`SourceError::Layout`] if the source's layout is invalid.
/// * [`SourceError::Config`] if its date format cannot render a date.
pub fn build_scraper(def: &SourceDefinition, options: &FetchOptions) -> Result<PdfScraper, SourceError> {
    let engine = Arc::new(LayoutEngine::new(def.layout.clone())?);
    let documents = def.documents(options.start, options.end)?;

    let scraper = def.headers.iter().fold(
        PdfScraper::new(documents, engine, def.decoder).with_delay_ms(def.delay_ms),
        |scraper, (key, value)| scraper.with_header(key, value),
    );
    Ok(scraper)
}

/// Downloads every document of `def` in `options`' range and writes the
/// records to `sink` in date order as each date completes.
///
/// Missing and undecodable documents are counted and skipped; any other
/// failure (including a page that does not fit the layout) ends the run.
///
/// # Errors
///
/// Returns the first [`SourceError`] raised while fetching or writing.
#[allow(clippy::future_not_send)]
pub async fn fetch_range<W: Write>(
    def: &SourceDefinition,
    options: &FetchOptions,
    sink: &mut RecordWriter<W>,
    progress: &dyn ProgressCallback,
) -> Result<FetchSummary, SourceError> {
    let scraper = build_scraper(def, options)?;
    let labels: Vec<String> = scraper
        .documents()
        .iter()
        .map(|document| document.date.to_string())
        .collect();

    log::info!(
        "[{}] fetching {} documents from {} to {}",
        def.id,
        labels.len(),
        options.start,
        options.end
    );
    let summary = drain_pages(&scraper, &labels, options.concurrency, sink, progress).await?;
    log::info!(
        "[{}] {} records from {} documents ({} missing, {} undecodable)",
        def.id,
        summary.records,
        summary.extracted,
        summary.missing,
        summary.undecodable
    );
    Ok(summary)
}

/// Streams every page of `scraper` into `sink`, in page order.
///
/// `labels` names each page for progress messages.
///
/// # Errors
///
/// Returns the first [`SourceError`] raised while fetching or writing.
#[allow(clippy::future_not_send)]
pub async fn drain_pages<S: Scraper, W: Write>(
    scraper: &S,
    labels: &[String],
    concurrency: usize,
    sink: &mut RecordWriter<W>,
    progress: &dyn ProgressCallback,
) -> Result<FetchSummary, SourceError> {
    let mut summary = FetchSummary {
        documents: scraper.page_count() as usize,
        ..FetchSummary::default()
    };
    progress.set_total(summary.documents as u64);

    let mut pages = pin!(scrape_pages(scraper, concurrency));
    while let Some(page) = pages.next().await {
        let page = page?;
        let label = labels
            .get(page.page_number as usize)
            .map_or("?", String::as_str);

        match page.status {
            PageStatus::Extracted => summary.extracted += 1,
            PageStatus::Missing => summary.missing += 1,
            PageStatus::Undecodable => summary.undecodable += 1,
        }
        log::debug!("{label}: {} ({} records)", page.status, page.records.len());

        for record in &page.records {
            sink.write_record(record)?;
        }
        summary.records += page.records.len();

        progress.set_message(label.to_owned());
        progress.inc(1);
    }

    sink.flush()?;
    progress.finish(format!(
        "{} records from {} documents",
        summary.records, summary.extracted
    ));
    Ok(summary)
}

/// Reconstructs the records of one local document and writes them to
/// `sink`. Returns the number of records written.
///
/// Unlike a fetch run, a document that cannot be decoded is an error.
///
/// # Errors
///
/// Returns [`SourceError`] if the layout is invalid, the document cannot be
/// decoded or does not fit the layout, or writing fails.
pub fn convert_document<W: Write>(
    def: &SourceDefinition,
    bytes: &[u8],
    sink: &mut RecordWriter<W>,
) -> Result<usize, SourceError> {
    let engine = LayoutEngine::new(def.layout.clone())?;
    let records = crime_log_pdf::extract_records(bytes, &engine, &def.decoder)?;

    for record in &records {
        sink.write_record(record)?;
    }
    sink.flush()?;
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use crime_log_layout::Record;
    use crime_log_pdf::PdfError;
    use crime_log_scraper::{ScrapeError, ScrapedPage};

    use super::*;
    use crate::output::OutputFormat;
    use crate::progress::NullProgress;
    use crate::registry::find_source;

    /// Two-page source where the second day has no document.
    struct TwoDays;

    impl Scraper for TwoDays {
        async fn fetch_page(&self, page: u32) -> Result<ScrapedPage, ScrapeError> {
            Ok(match page {
                0 => ScrapedPage::extracted(
                    0,
                    vec![
                        Record::new(vec!["3/14/2014".to_owned(), "THEFT".to_owned()]),
                        Record::new(vec!["3/14/2014".to_owned(), "BURGLARY".to_owned()]),
                    ],
                ),
                _ => ScrapedPage::empty(page, PageStatus::Missing),
            })
        }

        fn page_count(&self) -> u32 {
            2
        }

        fn strategy(&self) -> &'static str {
            "two_days"
        }
    }

    /// Three-page source whose middle document could not be decoded.
    struct UnreadableMiddle;

    impl Scraper for UnreadableMiddle {
        async fn fetch_page(&self, page: u32) -> Result<ScrapedPage, ScrapeError> {
            Ok(match page {
                1 => ScrapedPage::empty(1, PageStatus::Undecodable),
                _ => ScrapedPage::extracted(
                    page,
                    vec![Record::new(vec![format!("3/{}/2014", 14 + page), "THEFT".to_owned()])],
                ),
            })
        }

        fn page_count(&self) -> u32 {
            3
        }

        fn strategy(&self) -> &'static str {
            "unreadable_middle"
        }
    }

    fn labels() -> Vec<String> {
        vec!["2014-03-14".to_owned(), "2014-03-15".to_owned()]
    }

    #[tokio::test]
    async fn drains_pages_in_order_and_counts_outcomes() {
        let mut sink = RecordWriter::new(Vec::new(), OutputFormat::Plain, ["Date", "Incident"]);

        let summary = drain_pages(&TwoDays, &labels(), 2, &mut sink, &NullProgress)
            .await
            .unwrap();

        assert_eq!(
            summary,
            FetchSummary {
                documents: 2,
                extracted: 1,
                missing: 1,
                undecodable: 0,
                records: 2,
            }
        );
        assert_eq!(
            String::from_utf8(sink.into_inner()).unwrap(),
            "3/14/2014, THEFT\n3/14/2014, BURGLARY\n"
        );
    }

    #[tokio::test]
    async fn undecodable_document_does_not_stop_the_run() {
        let mut sink = RecordWriter::new(Vec::new(), OutputFormat::Plain, ["Date", "Incident"]);
        let labels = vec![
            "2014-03-14".to_owned(),
            "2014-03-15".to_owned(),
            "2014-03-16".to_owned(),
        ];

        let summary = drain_pages(&UnreadableMiddle, &labels, 3, &mut sink, &NullProgress)
            .await
            .unwrap();

        assert_eq!(summary.documents, 3);
        assert_eq!(summary.extracted, 2);
        assert_eq!(summary.undecodable, 1);
        assert_eq!(summary.records, 2);
        assert_eq!(
            String::from_utf8(sink.into_inner()).unwrap(),
            "3/14/2014, THEFT\n3/16/2014, THEFT\n"
        );
    }

    #[tokio::test]
    async fn empty_range_fetches_nothing() {
        let yale = find_source("yale").unwrap();
        let options = FetchOptions::new(
            NaiveDate::from_ymd_opt(2014, 4, 23).unwrap(),
            NaiveDate::from_ymd_opt(2014, 4, 23).unwrap(),
        );
        let mut sink = RecordWriter::new(Vec::new(), OutputFormat::Plain, yale.layout.column_names());

        let summary = fetch_range(&yale, &options, &mut sink, &NullProgress)
            .await
            .unwrap();

        assert_eq!(summary, FetchSummary::default());
        assert!(sink.into_inner().is_empty());
    }

    #[test]
    fn builds_one_page_per_unskipped_day() {
        let yale = find_source("yale").unwrap();
        let options = FetchOptions::new(
            NaiveDate::from_ymd_opt(2014, 4, 22).unwrap(),
            NaiveDate::from_ymd_opt(2014, 4, 24).unwrap(),
        )
        .with_concurrency(4);

        let scraper = build_scraper(&yale, &options).unwrap();

        assert_eq!(scraper.page_count(), 2);
    }

    #[test]
    fn converting_garbage_is_a_decode_error() {
        let yale = find_source("yale").unwrap();
        let mut sink = RecordWriter::new(Vec::new(), OutputFormat::Plain, yale.layout.column_names());

        let err = convert_document(&yale, b"%PDF-garbage", &mut sink).unwrap_err();

        assert!(matches!(err, SourceError::Pdf(PdfError::Decode(_))));
    }
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the crime log toolchain.
//!
//! `crime_log fetch` downloads a date range of daily crime logs and writes
//! one line per reconstructed case; `crime_log convert` does the same for a
//! local PDF. Without a subcommand an interactive menu asks for the same
//! choices.
//!
//! Uses `indicatif-log-bridge` (via [`crime_log_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod interactive;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use crime_log_cli_utils::{IndicatifProgress, MultiProgress};
use crime_log_source::FetchOptions;
use crime_log_source::fetch::{convert_document, fetch_range};
use crime_log_source::output::{OutputFormat, RecordWriter};
use crime_log_source::registry::{DEFAULT_SOURCE, all_sources, resolve_source};
use crime_log_source::source_def::SourceDefinition;

#[derive(Parser)]
#[command(name = "crime_log", about = "Crime log table reconstruction")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Download every daily crime log in a date range and write its records
    Fetch {
        /// Embedded source identifier
        #[arg(long, default_value = DEFAULT_SOURCE)]
        source: String,
        /// Source definition TOML file (overrides --source)
        #[arg(long)]
        config: Option<PathBuf>,
        /// First day to fetch (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
        /// Last day to fetch, inclusive (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,
        /// Output file; records go to stdout when omitted
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Output format (`plain` or `json`)
        #[arg(long, default_value = "plain")]
        format: OutputFormat,
        /// Maximum number of documents downloaded at once
        #[arg(long, default_value = "4")]
        concurrency: usize,
    },
    /// Reconstruct the records of a local crime log PDF and print them
    Convert {
        /// PDF file to read
        file: PathBuf,
        /// Embedded source identifier whose layout to apply
        #[arg(long, default_value = DEFAULT_SOURCE)]
        source: String,
        /// Source definition TOML file (overrides --source)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Output format (`plain` or `json`)
        #[arg(long, default_value = "plain")]
        format: OutputFormat,
    },
    /// List all embedded sources
    Sources,
}

/// Opens the output sink: a buffered file, or stdout.
fn open_output(output: Option<&Path>) -> Result<Box<dyn Write>, std::io::Error> {
    Ok(match output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(std::io::stdout().lock()),
    })
}

/// Runs one fetch with a progress bar and logs a summary.
#[allow(clippy::future_not_send)]
async fn run_fetch(
    multi: &MultiProgress,
    def: &SourceDefinition,
    options: &FetchOptions,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    if options.start > options.end {
        log::warn!("Start date {} is after end date {}", options.start, options.end);
    }

    let mut sink = RecordWriter::new(open_output(output)?, format, def.layout.column_names());
    let progress = IndicatifProgress::dates_bar(multi, &format!("Fetching {}", def.name));

    let start = Instant::now();
    let summary = fetch_range(def, options, &mut sink, &progress).await?;

    log::info!(
        "Wrote {} records from {}/{} documents in {:.1}s ({} missing, {} undecodable)",
        summary.records,
        summary.extracted,
        summary.documents,
        start.elapsed().as_secs_f64(),
        summary.missing,
        summary.undecodable
    );
    Ok(())
}

/// Converts one local PDF and prints its records.
fn run_convert(
    def: &SourceDefinition,
    file: &Path,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = std::fs::read(file)?;
    let mut sink = RecordWriter::new(open_output(None)?, format, def.layout.column_names());
    let count = convert_document(def, &bytes, &mut sink)?;
    log::info!("{}: {count} records", file.display());
    Ok(())
}

fn list_sources() {
    println!("{:<12} NAME", "ID");
    println!("{}", "-".repeat(50));
    for source in &all_sources() {
        println!("{:<12} {}", source.id, source.name);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = crime_log_cli_utils::init_logger();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        return interactive::run(&multi).await;
    };

    match command {
        Commands::Fetch {
            source,
            config,
            start,
            end,
            output,
            format,
            concurrency,
        } => {
            let def = resolve_source(Some(&source), config.as_deref())?;
            let options = FetchOptions::new(start, end).with_concurrency(concurrency);
            run_fetch(&multi, &def, &options, output.as_deref(), format).await?;
        }
        Commands::Convert {
            file,
            source,
            config,
            format,
        } => {
            let def = resolve_source(Some(&source), config.as_deref())?;
            run_convert(&def, &file, format)?;
        }
        Commands::Sources => list_sources(),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory as _;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_fetch_arguments() {
        let cli = Cli::try_parse_from([
            "crime_log",
            "fetch",
            "--start",
            "2014-01-01",
            "--end",
            "2014-12-09",
            "--output",
            "crime2014.csv",
            "--format",
            "json",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Fetch {
                source,
                start,
                end,
                output,
                format,
                concurrency,
                ..
            }) => {
                assert_eq!(source, "yale");
                assert_eq!(start, NaiveDate::from_ymd_opt(2014, 1, 1).unwrap());
                assert_eq!(end, NaiveDate::from_ymd_opt(2014, 12, 9).unwrap());
                assert_eq!(output, Some(PathBuf::from("crime2014.csv")));
                assert_eq!(format, OutputFormat::Json);
                assert_eq!(concurrency, 4);
            }
            _ => panic!("expected fetch"),
        }
    }

    #[test]
    fn rejects_malformed_dates() {
        assert!(
            Cli::try_parse_from(["crime_log", "fetch", "--start", "01/01/2014", "--end", "2014-01-02"])
                .is_err()
        );
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert!(
            Cli::try_parse_from(["crime_log", "convert", "log.pdf", "--format", "xml"]).is_err()
        );

        let err: Box<dyn std::error::Error> = "xml".parse::<OutputFormat>().unwrap_err().into();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn no_subcommand_means_interactive() {
        let cli = Cli::try_parse_from(["crime_log"]).unwrap();
        assert!(cli.command.is_none());
    }
}

//! Interactive menu for the crime log toolchain.
//!
//! Provides a menu-driven interface using `dialoguer` for running fetches
//! and conversions without memorizing CLI flags.

use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use crime_log_cli_utils::MultiProgress;
use crime_log_source::FetchOptions;
use crime_log_source::output::OutputFormat;
use crime_log_source::registry::all_sources;
use crime_log_source::source_def::SourceDefinition;
use dialoguer::{Input, Select};
use strum::VariantNames as _;

/// Top-level actions available in the interactive menu.
enum Action {
    Fetch,
    Convert,
    ListSources,
}

impl Action {
    const ALL: &[Self] = &[Self::Fetch, Self::Convert, Self::ListSources];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Fetch => "Fetch a date range",
            Self::Convert => "Convert a local PDF",
            Self::ListSources => "List sources",
        }
    }
}

/// Runs the interactive menu, prompting the user to select and configure
/// an operation.
///
/// # Errors
///
/// Returns an error if a prompt fails or the selected operation fails.
#[allow(clippy::future_not_send)]
pub async fn run(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    println!("Crime Log Toolchain");
    println!();

    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Action::ALL[idx] {
        Action::Fetch => fetch(multi).await?,
        Action::Convert => convert()?,
        Action::ListSources => crate::list_sources(),
    }

    Ok(())
}

fn select_source() -> Result<SourceDefinition, Box<dyn std::error::Error>> {
    let mut sources = all_sources();
    let labels: Vec<String> = sources
        .iter()
        .map(|s| format!("{} ({})", s.name, s.id))
        .collect();

    let idx = Select::new()
        .with_prompt("Source")
        .items(&labels)
        .default(0)
        .interact()?;

    Ok(sources.swap_remove(idx))
}

fn select_format() -> Result<OutputFormat, Box<dyn std::error::Error>> {
    let idx = Select::new()
        .with_prompt("Output format")
        .items(OutputFormat::VARIANTS)
        .default(0)
        .interact()?;

    Ok(OutputFormat::VARIANTS[idx].parse()?)
}

/// Prompts for a source, date range and output file, then fetches.
#[allow(clippy::future_not_send)]
async fn fetch(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let def = select_source()?;

    let start: NaiveDate = Input::new()
        .with_prompt("First day (YYYY-MM-DD)")
        .interact_text()?;
    let end: NaiveDate = Input::new()
        .with_prompt("Last day (YYYY-MM-DD)")
        .default(Local::now().date_naive())
        .interact_text()?;

    let output: String = Input::new()
        .with_prompt("Output file")
        .default(format!("crime_log_{}.txt", def.id))
        .interact_text()?;
    let format = select_format()?;

    let concurrency_str: String = Input::new()
        .with_prompt("Concurrent downloads")
        .default("4".to_string())
        .interact_text()?;
    let concurrency: usize = concurrency_str.parse().unwrap_or(4);

    let options = FetchOptions::new(start, end).with_concurrency(concurrency);
    let output = PathBuf::from(output);
    crate::run_fetch(multi, &def, &options, Some(output.as_path()), format).await
}

/// Prompts for a PDF file and source, then prints its records.
fn convert() -> Result<(), Box<dyn std::error::Error>> {
    let file: String = Input::new()
        .with_prompt("PDF file")
        .interact_text()?;
    let def = select_source()?;
    let format = select_format()?;

    crate::run_convert(&def, &PathBuf::from(file), format)
}

//! Config-driven crime log source definition.
//!
//! [`SourceDefinition`] captures everything unique about a publisher in a
//! serializable config struct: where the daily documents live, which days
//! to leave out and the table layout of the documents.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use crime_log_layout::LayoutConfig;
use crime_log_pdf::{DatedUrl, DecoderParams, expand_daily_template};
use serde::Deserialize;

use crate::SourceError;

fn default_date_format() -> String {
    "%m%d%y".to_owned()
}

/// A complete, config-driven crime log source.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceDefinition {
    /// Unique identifier (e.g., `"yale"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Document URL with a `{date}` placeholder.
    pub url_template: String,
    /// `strftime` format substituted for `{date}`.
    #[serde(default = "default_date_format")]
    pub date_format: String,
    /// Days whose documents do not follow the layout and must not be
    /// fetched.
    #[serde(default)]
    pub skip_dates: Vec<NaiveDate>,
    /// Pause before each download, in milliseconds.
    #[serde(default)]
    pub delay_ms: u64,
    /// Extra HTTP headers sent with every download.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Table layout of the documents.
    pub layout: LayoutConfig,
    /// Glyph grouping parameters for the PDF decoder.
    #[serde(default)]
    pub decoder: DecoderParams,
}

impl SourceDefinition {
    /// The documents covering `start..=end`, minus [`Self::skip_dates`].
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Config`] if [`Self::date_format`] cannot
    /// render a date.
    pub fn documents(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DatedUrl>, SourceError> {
        expand_daily_template(
            &self.url_template,
            start,
            end,
            &self.date_format,
            &self.skip_dates,
        )
        .map_err(|e| SourceError::Config(format!("{}: {e}", self.id)))
    }
}

/// Parses a [`SourceDefinition`] from a TOML string.
///
/// # Errors
///
/// Returns an error string if the TOML is malformed, missing required
/// fields, or its `date_format` cannot render a date.
pub fn parse_source_toml(toml_str: &str) -> Result<SourceDefinition, String> {
    let def: SourceDefinition = toml::de::from_str(toml_str).map_err(|e| e.to_string())?;
    let sample = NaiveDate::default();
    expand_daily_template(&def.url_template, sample, sample, &def.date_format, &[])?;
    Ok(def)
}

/// Reads and parses a user-supplied source definition file.
///
/// # Errors
///
/// * [`SourceError::Io`] if the file cannot be read.
/// * [`SourceError::Config`] if it is not a valid definition.
pub fn load_source_file(path: &Path) -> Result<SourceDefinition, SourceError> {
    let contents = std::fs::read_to_string(path)?;
    parse_source_toml(&contents)
        .map_err(|e| SourceError::Config(format!("{}: {e}", path.display())))
}

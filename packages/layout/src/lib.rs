#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Table reconstruction from positioned text and horizontal rules.
//!
//! Crime logs are published as PDFs whose only structure is geometric:
//! every field lives in a fixed horizontal band and cases are separated by
//! thin rules that are sometimes missing. Per page, the pipeline is:
//!
//! 1. [`classify`]: assign fragments to column bands, drop the rest.
//! 2. [`split`]: cut fragments that straddle a rule.
//! 3. [`group`]: fold each column's fragments into rows.
//! 4. [`collapse`]: turn each row into one normalized cell.
//! 5. [`assemble`]: strip headers, transpose columns into records and
//!    clean up fields.
//!
//! [`LayoutEngine`] bundles a validated [`LayoutConfig`] with its compiled
//! [`TableAssembler`] and runs the whole pipeline.

pub mod assemble;
pub mod classify;
pub mod collapse;
pub mod group;
pub mod split;

pub use assemble::TableAssembler;
pub use crime_log_layout_models::{
    ColumnRange, HeaderRepair, LayoutConfig, Page, Record, Row, RowCountPolicy, TextFragment,
};

/// Errors raised while configuring or running the layout pipeline.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    /// The layout defines no columns.
    #[error("layout defines no columns")]
    NoColumns,

    /// A column band is empty, inverted or not finite.
    #[error("column '{name}' has an invalid range {x_min}..{x_max}")]
    InvalidColumn {
        /// Column name.
        name: String,
        /// Configured left boundary.
        x_min: f64,
        /// Configured right boundary.
        x_max: f64,
    },

    /// Two column bands overlap.
    #[error("columns '{first}' and '{second}' overlap")]
    OverlappingColumns {
        /// Name of the left column.
        first: String,
        /// Name of the right column.
        second: String,
    },

    /// The average line height is not a positive number.
    #[error("line height must be positive, got {0}")]
    InvalidLineHeight(f64),

    /// A header repair or cleanup pattern failed to compile.
    #[error("Invalid regex pattern: {0}")]
    Regex(#[from] regex::Error),

    /// A page does not carry one fragment list per configured column.
    #[error("page {page} has {found} columns, layout expects {expected}")]
    ColumnCountMismatch {
        /// Page number.
        page: usize,
        /// Configured column count.
        expected: usize,
        /// Column count found on the page.
        found: usize,
    },

    /// Columns of a page yield different numbers of rows.
    #[error("page {page}: columns disagree on row count {counts:?}")]
    RowCountMismatch {
        /// Page number.
        page: usize,
        /// Row count of every column after header stripping.
        counts: Vec<usize>,
    },
}

/// Checks a layout for configuration errors.
///
/// Bands may share a boundary but must not overlap; the line height must be
/// positive.
///
/// # Errors
///
/// Returns the first [`LayoutError`] found.
pub fn validate(config: &LayoutConfig) -> Result<(), LayoutError> {
    if config.columns.is_empty() {
        return Err(LayoutError::NoColumns);
    }

    if !(config.line_height.is_finite() && config.line_height > 0.0) {
        return Err(LayoutError::InvalidLineHeight(config.line_height));
    }

    for column in &config.columns {
        if !(column.x_min.is_finite() && column.x_max.is_finite() && column.x_min < column.x_max) {
            return Err(LayoutError::InvalidColumn {
                name: column.name.clone(),
                x_min: column.x_min,
                x_max: column.x_max,
            });
        }
    }

    for (i, first) in config.columns.iter().enumerate() {
        for second in &config.columns[i + 1..] {
            if first.x_min < second.x_max && second.x_min < first.x_max {
                return Err(LayoutError::OverlappingColumns {
                    first: first.name.clone(),
                    second: second.name.clone(),
                });
            }
        }
    }

    Ok(())
}

/// Runs split, group and collapse over one column.
///
/// `hlines` must be sorted ascending.
#[must_use]
pub fn process_column(fragments: &[TextFragment], hlines: &[f64], line_height: f64) -> Vec<String> {
    let fragments = split::split_column(fragments, hlines, line_height);
    group::group_rows(fragments, hlines)
        .iter()
        .map(|row| collapse::collapse_row(row))
        .collect()
}

/// A validated layout ready to turn pages into records.
#[derive(Debug, Clone)]
pub struct LayoutEngine {
    config: LayoutConfig,
    assembler: TableAssembler,
}

impl LayoutEngine {
    /// Validates `config` and compiles its patterns.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError`] if the layout is invalid or a pattern fails to
    /// compile.
    pub fn new(config: LayoutConfig) -> Result<Self, LayoutError> {
        validate(&config)?;
        let assembler = TableAssembler::new(&config)?;
        Ok(Self { config, assembler })
    }

    /// The layout this engine was built from.
    #[must_use]
    pub const fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Sorts decoded fragments of one page into this layout's columns.
    #[must_use]
    pub fn partition(
        &self,
        number: usize,
        fragments: impl IntoIterator<Item = TextFragment>,
        hlines: Vec<f64>,
    ) -> Page {
        classify::partition(number, fragments, hlines, &self.config.columns)
    }

    /// Turns one page into its records.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError`] if the page's columns cannot be aligned.
    pub fn process_page(&self, page: Page) -> Result<Vec<Record>, LayoutError> {
        let Page {
            number,
            columns,
            mut hlines,
        } = page;
        hlines.sort_by(f64::total_cmp);

        let cells: Vec<Vec<String>> = columns
            .iter()
            .map(|fragments| process_column(fragments, &hlines, self.config.line_height))
            .collect();

        let records = self.assembler.assemble(number, cells)?;
        log::debug!("page {number}: {} records", records.len());
        Ok(records)
    }

    /// Processes pages in order and concatenates their records.
    ///
    /// # Errors
    ///
    /// Returns the first [`LayoutError`] raised by any page.
    pub fn records_from_pages(
        &self,
        pages: impl IntoIterator<Item = Page>,
    ) -> Result<Vec<Record>, LayoutError> {
        let mut records = Vec::new();
        for page in pages {
            records.extend(self.process_page(page)?);
        }
        Ok(records)
    }
}

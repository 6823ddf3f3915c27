//! Table assembly: header handling, transposition and field cleanup.

use crime_log_layout_models::{LayoutConfig, Record, RowCountPolicy};
use regex::Regex;

use crate::LayoutError;

/// Turns per-column cells into records according to a [`LayoutConfig`].
///
/// All patterns of the layout are compiled once, up front.
#[derive(Debug, Clone)]
pub struct TableAssembler {
    header_repair: Option<(Regex, String)>,
    cleanups: Vec<Option<Regex>>,
    policy: RowCountPolicy,
}

impl TableAssembler {
    /// Compiles the header repair and cleanup patterns of `config`.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::Regex`] if any pattern fails to compile.
    pub fn new(config: &LayoutConfig) -> Result<Self, LayoutError> {
        let header_repair = config
            .header_repair
            .as_ref()
            .map(|repair| Regex::new(&repair.pattern).map(|re| (re, repair.label.clone())))
            .transpose()?;

        let cleanups = config
            .columns
            .iter()
            .map(|column| column.strip_suffix.as_deref().map(Regex::new).transpose())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            header_repair,
            cleanups,
            policy: config.on_row_mismatch,
        })
    }

    /// Number of columns (and fields per record).
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.cleanups.len()
    }

    /// Builds the records of one page from its per-column cells.
    ///
    /// Each column's first cell is its header and is dropped. Records are
    /// emitted in row order.
    ///
    /// # Errors
    ///
    /// * [`LayoutError::ColumnCountMismatch`] if `columns` does not have one
    ///   entry per configured column.
    /// * [`LayoutError::RowCountMismatch`] if the columns disagree on their
    ///   row count and the layout uses [`RowCountPolicy::Fail`].
    pub fn assemble(&self, page: usize, mut columns: Vec<Vec<String>>) -> Result<Vec<Record>, LayoutError> {
        if columns.len() != self.column_count() {
            return Err(LayoutError::ColumnCountMismatch {
                page,
                expected: self.column_count(),
                found: columns.len(),
            });
        }

        self.repair_header(page, &mut columns);

        for column in &mut columns {
            if !column.is_empty() {
                column.remove(0);
            }
        }

        let rows = self.aligned_row_count(page, &columns)?;

        let mut cells: Vec<_> = columns.into_iter().map(Vec::into_iter).collect();
        let records = (0..rows)
            .map(|_| {
                let fields = cells
                    .iter_mut()
                    .zip(&self.cleanups)
                    .map(|(column, cleanup)| {
                        let cell = column.next().unwrap_or_default();
                        match cleanup {
                            Some(re) => re.replace_all(&cell, "").into_owned(),
                            None => cell,
                        }
                    })
                    .collect();
                Record::new(fields)
            })
            .collect();

        Ok(records)
    }

    /// Inserts the synthetic first-column header when the column's first
    /// cell already looks like data.
    fn repair_header(&self, page: usize, columns: &mut [Vec<String>]) {
        let Some((pattern, label)) = &self.header_repair else {
            return;
        };
        let Some(first_column) = columns.first_mut() else {
            return;
        };

        if first_column.first().is_some_and(|cell| pattern.is_match(cell)) {
            log::debug!("page {page}: first column lost its header, inserting {label:?}");
            first_column.insert(0, label.clone());
        }
    }

    fn aligned_row_count(&self, page: usize, columns: &[Vec<String>]) -> Result<usize, LayoutError> {
        let counts: Vec<usize> = columns.iter().map(Vec::len).collect();
        let shortest = counts.iter().copied().min().unwrap_or(0);
        let longest = counts.iter().copied().max().unwrap_or(0);

        if shortest == longest {
            return Ok(shortest);
        }

        match self.policy {
            RowCountPolicy::Fail => Err(LayoutError::RowCountMismatch { page, counts }),
            RowCountPolicy::Truncate => {
                log::warn!(
                    "page {page}: columns disagree on row count {counts:?}, truncating to {shortest}"
                );
                Ok(shortest)
            }
        }
    }
}

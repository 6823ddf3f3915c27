#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Positioned-text data model and layout configuration for crime log tables.
//!
//! A crime log page arrives from the document decoder as a bag of
//! [`TextFragment`]s (text boxes with bounding boxes) plus the
//! y-coordinates of the thin horizontal rules drawn between cases. The
//! [`LayoutConfig`] describes the fixed column bands of one document family
//! and is passed explicitly to everything that needs it, so several layouts
//! can coexist in one process.
//!
//! Coordinates follow PDF user space: larger `y` is higher on the page, `y0`
//! is the bottom edge of a box and `y1` its top edge.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Average height of one rendered text line, in page units.
pub const DEFAULT_LINE_HEIGHT: f64 = 12.0;

/// Pattern matching a bare `M/D/YYYY` date at the start of a cell.
pub const DEFAULT_HEADER_REPAIR_PATTERN: &str = r"^\d\d?/\d\d?/\d\d\d\d";

/// One positioned unit of text produced by the document decoder.
///
/// The text keeps the decoder's convention of one `\n`-terminated entry per
/// rendered line. Fragments are never mutated once decoded; the splitter
/// derives new ones instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    /// Rendered text, one line per `\n`.
    pub text: String,
    /// Left edge.
    pub x0: f64,
    /// Right edge.
    pub x1: f64,
    /// Bottom edge.
    pub y0: f64,
    /// Top edge.
    pub y1: f64,
}

impl TextFragment {
    /// Creates a fragment from its text and bounding box.
    #[must_use]
    pub fn new(text: impl Into<String>, x0: f64, x1: f64, y0: f64, y1: f64) -> Self {
        Self {
            text: text.into(),
            x0,
            x1,
            y0,
            y1,
        }
    }

    /// Returns a copy of this fragment with a different vertical extent.
    #[must_use]
    pub fn with_vertical_extent(&self, y0: f64, y1: f64) -> Self {
        Self {
            y0,
            y1,
            ..self.clone()
        }
    }

    /// Returns a copy of this fragment with different text and vertical
    /// extent.
    #[must_use]
    pub fn derive(&self, text: String, y0: f64, y1: f64) -> Self {
        Self {
            text,
            x0: self.x0,
            x1: self.x1,
            y0,
            y1,
        }
    }

    /// Whether the horizontal rule at `y` touches this fragment's vertical
    /// extent (inclusive on both edges).
    #[must_use]
    pub fn is_crossed_by(&self, y: f64) -> bool {
        self.y0 <= y && y <= self.y1
    }
}

/// A group of fragments from one column that form a single logical case,
/// ordered top to bottom.
pub type Row = Vec<TextFragment>;

/// A fixed horizontal band of the page holding one field of every case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRange {
    /// Field name (e.g. `"Date reported"`), used for headers and JSON output.
    pub name: String,
    /// Left boundary (inclusive).
    pub x_min: f64,
    /// Right boundary (inclusive).
    pub x_max: f64,
    /// Optional regex whose matches are removed from every cell of this
    /// column (e.g. `' *hrs.*'` to drop a duration annotation).
    #[serde(default)]
    pub strip_suffix: Option<String>,
}

impl ColumnRange {
    /// Creates a column range without any field cleanup.
    #[must_use]
    pub fn new(name: impl Into<String>, x_min: f64, x_max: f64) -> Self {
        Self {
            name: name.into(),
            x_min,
            x_max,
            strip_suffix: None,
        }
    }

    /// Sets the cleanup pattern applied to this column's cells.
    #[must_use]
    pub fn with_strip_suffix(mut self, pattern: impl Into<String>) -> Self {
        self.strip_suffix = Some(pattern.into());
        self
    }

    /// Whether the fragment's horizontal extent lies entirely inside this
    /// band.
    #[must_use]
    pub fn contains(&self, fragment: &TextFragment) -> bool {
        fragment.x0 >= self.x_min && fragment.x1 <= self.x_max
    }
}

/// Synthesizes a missing first-column header.
///
/// The decoder sometimes merges the first column's header into the text
/// block above the table. When the first cell of the first column matches
/// `pattern`, `label` is inserted in front of it so that every column still
/// starts with exactly one header cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderRepair {
    /// Regex tested against the first cell of the first column.
    #[serde(default = "default_header_repair_pattern")]
    pub pattern: String,
    /// Header label to insert.
    pub label: String,
}

fn default_header_repair_pattern() -> String {
    DEFAULT_HEADER_REPAIR_PATTERN.to_owned()
}

impl HeaderRepair {
    /// Creates a repair rule using [`DEFAULT_HEADER_REPAIR_PATTERN`].
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            pattern: default_header_repair_pattern(),
            label: label.into(),
        }
    }
}

/// What to do when the columns of a page disagree on their row count.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RowCountPolicy {
    /// Reject the page with an error naming every column's count.
    #[default]
    Fail,
    /// Keep only as many records as the shortest column provides.
    Truncate,
}

fn default_line_height() -> f64 {
    DEFAULT_LINE_HEIGHT
}

/// Geometry and cleanup rules for one document family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Column bands, left to right. Output fields follow this order.
    pub columns: Vec<ColumnRange>,
    /// Average text-line height used to locate split points.
    #[serde(default = "default_line_height")]
    pub line_height: f64,
    /// Optional first-column header repair.
    #[serde(default)]
    pub header_repair: Option<HeaderRepair>,
    /// Row-count mismatch handling.
    #[serde(default)]
    pub on_row_mismatch: RowCountPolicy,
}

impl LayoutConfig {
    /// Creates a layout with the default line height, no header repair and
    /// the [`RowCountPolicy::Fail`] policy.
    #[must_use]
    pub const fn new(columns: Vec<ColumnRange>) -> Self {
        Self {
            columns,
            line_height: DEFAULT_LINE_HEIGHT,
            header_repair: None,
            on_row_mismatch: RowCountPolicy::Fail,
        }
    }

    /// Sets the header repair rule.
    #[must_use]
    pub fn with_header_repair(mut self, repair: HeaderRepair) -> Self {
        self.header_repair = Some(repair);
        self
    }

    /// Sets the row-count mismatch policy.
    #[must_use]
    pub const fn with_row_count_policy(mut self, policy: RowCountPolicy) -> Self {
        self.on_row_mismatch = policy;
        self
    }

    /// Column names in output order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// One page as handed to the layout engine: fragments already partitioned
/// into columns, plus the page's rule lines sorted ascending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// 1-based page number within its document.
    pub number: usize,
    /// Fragments per column, in layout column order.
    pub columns: Vec<Vec<TextFragment>>,
    /// Horizontal rule y-coordinates, ascending. Duplicates are allowed.
    pub hlines: Vec<f64>,
}

/// One case: a cell per column, in layout column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Cell values.
    pub fields: Vec<String>,
}

impl Record {
    #[must_use]
    pub const fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    /// Joins the fields with `separator`.
    #[must_use]
    pub fn join(&self, separator: &str) -> String {
        self.fields.join(separator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_contains_requires_full_horizontal_extent() {
        let column = ColumnRange::new("Incident", 85.0, 233.0);

        assert!(column.contains(&TextFragment::new("THEFT\n", 90.0, 140.0, 0.0, 10.0)));
        assert!(column.contains(&TextFragment::new("THEFT\n", 85.0, 233.0, 0.0, 10.0)));
        assert!(!column.contains(&TextFragment::new("THEFT\n", 80.0, 140.0, 0.0, 10.0)));
        assert!(!column.contains(&TextFragment::new("THEFT\n", 90.0, 240.0, 0.0, 10.0)));
    }

    #[test]
    fn crossing_is_inclusive_on_both_edges() {
        let fragment = TextFragment::new("A\n", 0.0, 10.0, 100.0, 120.0);

        assert!(fragment.is_crossed_by(100.0));
        assert!(fragment.is_crossed_by(110.0));
        assert!(fragment.is_crossed_by(120.0));
        assert!(!fragment.is_crossed_by(99.9));
        assert!(!fragment.is_crossed_by(120.1));
    }

    #[test]
    fn derived_fragments_leave_the_original_untouched() {
        let original = TextFragment::new("A\nB\n", 0.0, 10.0, 100.0, 124.0);
        let upper = original.derive("A\n".to_owned(), 113.0, original.y1);

        assert_eq!(upper.text, "A\n");
        assert!((upper.y0 - 113.0).abs() < f64::EPSILON);
        assert_eq!(original.text, "A\nB\n");
        assert!((original.y0 - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn row_count_policy_round_trips_through_strum() {
        assert_eq!("truncate".parse::<RowCountPolicy>().unwrap(), RowCountPolicy::Truncate);
        assert_eq!(RowCountPolicy::Fail.to_string(), "fail");
        assert_eq!(RowCountPolicy::default(), RowCountPolicy::Fail);
    }

    #[test]
    fn record_join_uses_separator() {
        let record = Record::new(vec!["a".to_owned(), "b".to_owned(), String::new()]);
        assert_eq!(record.join(", "), "a, b, ");
    }
}

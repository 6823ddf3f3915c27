//! Row grouping within one column.
//!
//! Fragments are ordered top to bottom and folded greedily: each fragment
//! either joins the row under construction or starts a new one, decided
//! only against the last fragment of that row. Without rule lines
//! everything in a column merges, which is what keeps wrapped text of a
//! single case together.

use crime_log_layout_models::{Row, TextFragment};

/// Decides whether two fragments of the same column belong to one case.
///
/// `lines` must be sorted ascending. A rule strictly inside the combined
/// vertical span of the pair separates them; the first rule above the
/// span settles that they are on the same row, as does the absence of any
/// deciding rule.
#[must_use]
pub fn same_row(first: &TextFragment, second: &TextFragment, lines: &[f64]) -> bool {
    let (lower, upper) = if first.y1 > second.y0 {
        (second, first)
    } else {
        (first, second)
    };

    for &line in lines {
        if line > lower.y0 && line < upper.y1 {
            return false;
        }
        if line > upper.y1 {
            return true;
        }
    }

    true
}

/// Sorts a column's fragments by descending `y0` and folds them into rows.
///
/// The sort is stable, so fragments sharing a bottom edge keep their input
/// order.
#[must_use]
pub fn group_rows(mut fragments: Vec<TextFragment>, lines: &[f64]) -> Vec<Row> {
    fragments.sort_by(|a, b| b.y0.total_cmp(&a.y0));

    fragments.into_iter().fold(Vec::new(), |mut rows: Vec<Row>, fragment| {
        let joins = rows
            .last()
            .and_then(|row| row.last())
            .is_some_and(|previous| same_row(previous, &fragment, lines));

        match rows.last_mut() {
            Some(row) if joins => row.push(fragment),
            _ => rows.push(vec![fragment]),
        }

        rows
    })
}

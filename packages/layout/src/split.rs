//! Line-aware fragment splitting.
//!
//! The decoder happily merges the text of two adjacent cases into one box
//! when nothing but a thin rule separates them. A box whose vertical extent
//! contains a rule is cut in two at the text line nearest to the rule, so
//! that no emitted fragment crosses a rule.

use crime_log_layout_models::TextFragment;

/// Splits `fragment` at every rule line that crosses it.
///
/// `lines` must be sorted ascending. The first crossing line is handled
/// first, then both halves are split again against the remaining lines, so
/// a box spanning several cases is fully separated. Every step removes at
/// least one line from the fragment's extent, so the recursion terminates.
#[must_use]
pub fn split_fragment(fragment: &TextFragment, lines: &[f64], line_height: f64) -> Vec<TextFragment> {
    let Some(&line) = lines.iter().find(|&&line| fragment.is_crossed_by(line)) else {
        return vec![fragment.clone()];
    };

    split_at(fragment, line, line_height)
        .iter()
        .flat_map(|piece| split_fragment(piece, lines, line_height))
        .collect()
}

/// Splits every fragment of a column, preserving order (upper piece first).
#[must_use]
pub fn split_column(fragments: &[TextFragment], lines: &[f64], line_height: f64) -> Vec<TextFragment> {
    fragments
        .iter()
        .flat_map(|fragment| split_fragment(fragment, lines, line_height))
        .collect()
}

/// Cuts `fragment` once at the rule `line`.
///
/// When the estimated cut leaves one side without text the rule sits on
/// the fragment's edge rather than between two text lines; the fragment is
/// then shrunk to exclude the rule instead of being split.
fn split_at(fragment: &TextFragment, line: f64, line_height: f64) -> Vec<TextFragment> {
    let sub_lines: Vec<&str> = fragment.text.lines().collect();
    let idx = split_index(fragment.y1, line, line_height, sub_lines.len());
    let (upper, lower) = sub_lines.split_at(idx);

    let (below_y0, below_y1) = below(fragment, line);
    let (above_y0, above_y1) = above(fragment, line);

    if is_blank(upper) {
        return vec![fragment.with_vertical_extent(below_y0, below_y1)];
    }
    if is_blank(lower) {
        return vec![fragment.with_vertical_extent(above_y0, above_y1)];
    }

    log::trace!(
        "splitting {:?} at y={line:.1} after {idx} of {} lines",
        fragment.text,
        sub_lines.len()
    );

    vec![
        fragment.derive(join_lines(upper), above_y0, above_y1),
        fragment.derive(join_lines(lower), below_y0, below_y1),
    ]
}

/// The part of `fragment`'s extent one unit below `line`. A fragment that
/// reaches less than a unit below the rule collapses to zero height there.
fn below(fragment: &TextFragment, line: f64) -> (f64, f64) {
    let y1 = line - 1.0;
    (fragment.y0.min(y1), y1)
}

/// The part of `fragment`'s extent one unit above `line`, collapsing the
/// same way as [`below`].
fn above(fragment: &TextFragment, line: f64) -> (f64, f64) {
    let y0 = line + 1.0;
    (y0, fragment.y1.max(y0))
}

/// Estimates how many text lines sit above `line`, clamped to
/// `0..=line_count`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn split_index(top: f64, line: f64, line_height: f64, line_count: usize) -> usize {
    let estimate = ((top - line) / line_height).round();
    if estimate.is_nan() || estimate <= 0.0 {
        0
    } else if estimate >= line_count as f64 {
        line_count
    } else {
        estimate as usize
    }
}

fn is_blank(lines: &[&str]) -> bool {
    lines.iter().all(|line| line.trim().is_empty())
}

fn join_lines(lines: &[&str]) -> String {
    let mut text = String::new();
    for line in lines {
        text.push_str(line);
        text.push('\n');
    }
    text
}

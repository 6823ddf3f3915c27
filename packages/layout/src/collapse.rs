//! Row to cell collapsing.

use std::sync::LazyLock;

use crime_log_layout_models::TextFragment;
use regex::Regex;

static SPACE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(" +").expect("valid regex"));

/// Collapses a row into one cell string.
///
/// Fragment texts are concatenated in row order, line breaks become
/// spaces, runs of spaces shrink to one, and the result is trimmed.
#[must_use]
pub fn collapse_row(row: &[TextFragment]) -> String {
    collapse_texts(row.iter().map(|fragment| fragment.text.as_str()))
}

/// Same as [`collapse_row`] for bare strings.
#[must_use]
pub fn collapse_texts<'a>(texts: impl IntoIterator<Item = &'a str>) -> String {
    let joined: String = texts.into_iter().collect();
    let flattened = joined.replace(['\r', '\n'], " ");
    SPACE_RUNS.replace_all(&flattened, " ").trim().to_owned()
}

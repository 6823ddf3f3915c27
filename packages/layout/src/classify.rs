//! Column assignment.
//!
//! Anything outside every configured band (page titles, footers, the
//! signature block) is page furniture and is dropped here.

use crime_log_layout_models::{ColumnRange, Page, TextFragment};

/// Returns the index of the first column whose band fully contains the
/// fragment, or `None` if the fragment sits outside the table.
#[must_use]
pub fn column_for(fragment: &TextFragment, columns: &[ColumnRange]) -> Option<usize> {
    columns.iter().position(|column| column.contains(fragment))
}

/// Builds a [`Page`] by sorting fragments into their columns.
///
/// Fragments keep their input order within a column. Rule lines are sorted
/// ascending.
#[must_use]
pub fn partition(
    number: usize,
    fragments: impl IntoIterator<Item = TextFragment>,
    mut hlines: Vec<f64>,
    columns: &[ColumnRange],
) -> Page {
    let mut contents: Vec<Vec<TextFragment>> = vec![Vec::new(); columns.len()];
    let mut dropped = 0_usize;

    for fragment in fragments {
        match column_for(&fragment, columns) {
            Some(idx) => contents[idx].push(fragment),
            None => {
                log::trace!(
                    "page {number}: dropping fragment outside all columns: {:?} ({:.1}..{:.1})",
                    fragment.text,
                    fragment.x0,
                    fragment.x1
                );
                dropped += 1;
            }
        }
    }

    hlines.sort_by(f64::total_cmp);

    log::debug!(
        "page {number}: {} fragments in columns, {dropped} dropped, {} rule lines",
        contents.iter().map(Vec::len).sum::<usize>(),
        hlines.len()
    );

    Page {
        number,
        columns: contents,
        hlines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<ColumnRange> {
        vec![
            ColumnRange::new("A", 12.0, 85.0),
            ColumnRange::new("B", 85.0, 233.0),
        ]
    }

    #[test]
    fn assigns_fragment_to_containing_column() {
        let fragment = TextFragment::new("x\n", 90.0, 200.0, 0.0, 10.0);
        assert_eq!(column_for(&fragment, &columns()), Some(1));
    }

    #[test]
    fn fragment_spanning_two_columns_is_unassigned() {
        let fragment = TextFragment::new("Crime Log\n", 20.0, 200.0, 0.0, 10.0);
        assert_eq!(column_for(&fragment, &columns()), None);
    }

    #[test]
    fn partition_drops_furniture_and_sorts_lines() {
        let page = partition(
            3,
            vec![
                TextFragment::new("title\n", 0.0, 500.0, 700.0, 720.0),
                TextFragment::new("a1\n", 20.0, 40.0, 600.0, 610.0),
                TextFragment::new("b1\n", 100.0, 140.0, 600.0, 610.0),
                TextFragment::new("a2\n", 20.0, 40.0, 500.0, 510.0),
            ],
            vec![550.0, 100.0, 550.0],
            &columns(),
        );

        assert_eq!(page.number, 3);
        assert_eq!(page.columns.len(), 2);
        let texts: Vec<&str> = page.columns[0].iter().map(|f| f.text.as_str()).collect();
        assert_eq!(texts, vec!["a1\n", "a2\n"]);
        assert_eq!(page.columns[1].len(), 1);
        assert_eq!(page.hlines, vec![100.0, 550.0, 550.0]);
    }
}

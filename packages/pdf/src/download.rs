//! Daily document URLs.
//!
//! Crime logs are published one PDF per day at a URL that embeds the date,
//! e.g. `https://publicsafety.example.edu/files/{date}.pdf` with `{date}`
//! rendered as `%m%d%y`.

use std::fmt::Write as _;

use chrono::NaiveDate;
use chrono::format::{Item, StrftimeItems};

/// One day's document location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatedUrl {
    /// The day this document covers.
    pub date: NaiveDate,
    /// Where to download it from.
    pub url: String,
}

/// Checks that `date_format` is a usable `strftime` format.
///
/// # Errors
///
/// Returns a message naming the format if it contains an unknown or
/// incomplete specifier.
pub fn check_date_format(date_format: &str) -> Result<(), String> {
    if StrftimeItems::new(date_format).any(|item| matches!(item, Item::Error)) {
        return Err(format!("invalid date format {date_format:?}"));
    }
    Ok(())
}

/// Expands a URL template by replacing `{date}` with each day between
/// `start` and `end` (inclusive), formatted with `date_format`.
///
/// Days listed in `skip` are left out; they are known to publish documents
/// that do not follow the configured layout.
///
/// # Errors
///
/// Returns the [`check_date_format`] message if `date_format` is invalid,
/// or a message if it asks for fields a calendar date does not have (such
/// as `%H`).
///
/// # Example
///
/// ```
/// use crime_log_pdf::download::expand_daily_template;
/// use chrono::NaiveDate;
///
/// let start = NaiveDate::from_ymd_opt(2014, 4, 22).unwrap();
/// let end = NaiveDate::from_ymd_opt(2014, 4, 24).unwrap();
/// let skip = [NaiveDate::from_ymd_opt(2014, 4, 23).unwrap()];
///
/// let urls: Vec<String> =
///     expand_daily_template("https://example.edu/{date}.pdf", start, end, "%m%d%y", &skip)
///         .unwrap()
///         .into_iter()
///         .map(|d| d.url)
///         .collect();
///
/// assert_eq!(urls, vec![
///     "https://example.edu/042214.pdf",
///     "https://example.edu/042414.pdf",
/// ]);
/// ```
pub fn expand_daily_template(
    template: &str,
    start: NaiveDate,
    end: NaiveDate,
    date_format: &str,
    skip: &[NaiveDate],
) -> Result<Vec<DatedUrl>, String> {
    check_date_format(date_format)?;
    let items: Vec<Item<'_>> = StrftimeItems::new(date_format).collect();

    start
        .iter_days()
        .take_while(|date| *date <= end)
        .filter(|date| {
            let skipped = skip.contains(date);
            if skipped {
                log::debug!("Skipping {date}: listed as a known bad date");
            }
            !skipped
        })
        .map(|date| {
            let mut formatted = String::new();
            write!(formatted, "{}", date.format_with_items(items.iter()))
                .map_err(|_| format!("date format {date_format:?} cannot render {date}"))?;
            Ok(DatedUrl {
                date,
                url: template.replace("{date}", &formatted),
            })
        })
        .collect()
}

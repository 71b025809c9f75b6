//! Small date/text helpers shared by the parser.

use chrono::NaiveDate;

/// Convert a ROC (Minguo) calendar date string to a western date.
///
/// Taiwanese exchanges publish dates like `1130102` - ROC year 113
/// (2024), January 2nd. The year part may be two or three digits; the
/// month and day are always the trailing four. Slash-separated renderings
/// such as `113/01/02` (the MOPS news table) are accepted too.
pub fn roc_to_western_date(text: &str) -> Option<NaiveDate> {
    let text: String = text.trim().chars().filter(|c| *c != '/').collect();
    let text = text.as_str();
    if text.len() < 5 || !text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (year_part, month_day) = text.split_at(text.len() - 4);
    let year: i32 = year_part.parse().ok()?;
    let month: u32 = month_day[..2].parse().ok()?;
    let day: u32 = month_day[2..].parse().ok()?;
    NaiveDate::from_ymd_opt(year + 1911, month, day)
}

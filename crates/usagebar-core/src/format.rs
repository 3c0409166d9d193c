//! Currency and date formatting helpers

use chrono::{DateTime, Local, TimeZone, Utc};
use std::fmt::Display;

/// Format integer cents as dollars with two decimals
///
/// # Examples
/// ```
/// use usagebar_core::format::format_cents;
///
/// assert_eq!(format_cents(432), "$4.32");
/// assert_eq!(format_cents(0), "$0.00");
/// ```
pub fn format_cents(cents: u64) -> String {
    format!("${}.{:02}", cents / 100, cents % 100)
}

/// Short UTC date, e.g. `Feb 1, 2026`
pub fn format_reset_date_short(date: &DateTime<Utc>) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// UTC date followed by the local date, time and zone
///
/// e.g. `Feb 1, 2026 UTC (Jan 31, 2026 4:00 PM -08:00)`
pub fn format_reset_date_full(date: &DateTime<Utc>) -> String {
    format_reset_date_full_in(date, &Local)
}

/// Like [`format_reset_date_full`] with an explicit local timezone
pub fn format_reset_date_full_in<Tz>(date: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let local = date.with_timezone(tz);
    format!(
        "{} UTC ({})",
        format_reset_date_short(date),
        local.format("%b %-d, %Y %-I:%M %p %Z")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(0), "$0.00");
        assert_eq!(format_cents(5), "$0.05");
        assert_eq!(format_cents(100), "$1.00");
        assert_eq!(format_cents(1234), "$12.34");
        assert_eq!(format_cents(999999), "$9999.99");
    }

    #[test]
    fn test_format_reset_date_short() {
        let date = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        assert_eq!(format_reset_date_short(&date), "Feb 1, 2026");
    }

    #[test]
    fn test_format_reset_date_full_utc() {
        let date = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        assert_eq!(
            format_reset_date_full_in(&date, &Utc),
            "Feb 1, 2026 UTC (Feb 1, 2026 12:00 AM UTC)"
        );
    }

    #[test]
    fn test_format_reset_date_full_crosses_day_boundary() {
        let date = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        let pacific = FixedOffset::west_opt(8 * 3600).unwrap();
        assert_eq!(
            format_reset_date_full_in(&date, &pacific),
            "Feb 1, 2026 UTC (Jan 31, 2026 4:00 PM -08:00)"
        );
    }
}

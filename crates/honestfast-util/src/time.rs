//! Time utilities for honestfast
//!
//! Everything in the engine runs on local wall-clock time: calendar days,
//! weeks and months are local, and durations are differences between two
//! `DateTime<Local>` values. Callers pass `now` explicitly so that every
//! computation is reproducible in tests.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `HONESTFAST_MOCK_TIME` environment variable can be set
//! to override the system time returned by [`now`]. The mock clock keeps
//! advancing at real speed from the given instant.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-06-12 20:00:00`)

use chrono::{
    DateTime, Datelike, Days, Local, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
};
use std::sync::OnceLock;
use std::time::Duration;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "HONESTFAST_MOCK_TIME";

/// Format accepted by [`MOCK_TIME_ENV_VAR`]
pub const MOCK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Seconds in one hour, as used by every hours/seconds conversion
pub const SECS_PER_HOUR: f64 = 3600.0;

/// Offset between mock time and real time, computed once per process.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

#[allow(clippy::disallowed_methods)] // This is the internal implementation that wraps Local::now()
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            let mock_time_str = std::env::var(MOCK_TIME_ENV_VAR).ok()?;
            let Ok(naive_dt) = NaiveDateTime::parse_from_str(&mock_time_str, MOCK_TIME_FORMAT)
            else {
                tracing::warn!(
                    mock_time = %mock_time_str,
                    expected_format = MOCK_TIME_FORMAT,
                    "Invalid mock time format"
                );
                return None;
            };
            let Some(mock_dt) = Local.from_local_datetime(&naive_dt).earliest() else {
                tracing::warn!(
                    mock_time = %mock_time_str,
                    "Failed to convert mock time to local timezone"
                );
                return None;
            };
            let offset = mock_dt.signed_duration_since(chrono::Local::now());
            tracing::info!(
                mock_time = %mock_time_str,
                offset_secs = offset.num_seconds(),
                "Mock time enabled"
            );
            Some(offset)
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    get_mock_time_offset().is_some()
}

/// Get the current local time, respecting mock time settings in debug builds.
#[allow(clippy::disallowed_methods)] // This is the wrapper that provides mock time support
pub fn now() -> DateTime<Local> {
    let real_now = chrono::Local::now();

    match get_mock_time_offset() {
        Some(offset) => real_now + offset,
        None => real_now,
    }
}

/// Local midnight at the start of `date`.
///
/// If midnight does not exist (a DST gap at 00:00), the UTC reading of the
/// same wall clock is used instead.
pub fn start_of_day(date: NaiveDate) -> DateTime<Local> {
    let midnight = date.and_time(NaiveTime::MIN);
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .unwrap_or_else(|| Local.from_utc_datetime(&midnight))
}

/// Half-open `[start, end)` window covering one local calendar day.
pub fn day_bounds(date: NaiveDate) -> (DateTime<Local>, DateTime<Local>) {
    let next = date.checked_add_days(Days::new(1)).unwrap_or(date);
    (start_of_day(date), start_of_day(next))
}

/// Monday 00:00 local of the week containing `dt`.
pub fn start_of_week(dt: &DateTime<Local>) -> DateTime<Local> {
    let date = dt.date_naive();
    let back = u64::from(date.weekday().num_days_from_monday());
    start_of_day(date.checked_sub_days(Days::new(back)).unwrap_or(date))
}

/// All calendar days of the given month, in order.
///
/// Returns an empty list for an invalid month.
pub fn days_in_month(year: i32, month: u32) -> Vec<NaiveDate> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };
    let Some(next_month) = first.checked_add_months(Months::new(1)) else {
        return Vec::new();
    };

    first.iter_days().take_while(|d| *d < next_month).collect()
}

/// Convert epoch seconds (fractional) into local time.
///
/// Returns `None` for non-finite or out-of-range inputs.
pub fn from_epoch_seconds(secs: f64) -> Option<DateTime<Local>> {
    if !secs.is_finite() {
        return None;
    }
    let millis = (secs * 1000.0).round();
    if millis.abs() > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64).map(|dt| dt.with_timezone(&Local))
}

/// Convert a local time into epoch seconds with millisecond precision.
pub fn to_epoch_seconds(dt: &DateTime<Local>) -> f64 {
    dt.timestamp_millis() as f64 / 1000.0
}

/// Signed number of hours from `from` to `to`.
pub fn hours_between(from: &DateTime<Local>, to: &DateTime<Local>) -> f64 {
    to.signed_duration_since(*from).num_milliseconds() as f64 / 1000.0 / SECS_PER_HOUR
}

/// Build a chrono duration from fractional hours, rounded to the millisecond.
pub fn hours_to_duration(hours: f64) -> chrono::Duration {
    if !hours.is_finite() {
        return chrono::Duration::zero();
    }
    let millis = (hours * SECS_PER_HOUR * 1000.0).round() as i64;
    chrono::Duration::milliseconds(millis.clamp(-i64::MAX, i64::MAX))
}

/// Format a DateTime for display with full date and time.
pub fn format_datetime_full(dt: &DateTime<Local>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Countdown format used by timers: `HH:MM:SS`, hours may exceed 24.
pub fn format_countdown(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Helper to format durations in human-readable form
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Timelike, Weekday};

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_start_of_day() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 12).unwrap();
        let start = start_of_day(date);
        assert_eq!(start.date_naive(), date);
        assert_eq!(start.hour(), 0);
        assert_eq!(start.minute(), 0);
    }

    #[test]
    fn test_day_bounds_span_one_day() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 12).unwrap();
        let (start, end) = day_bounds(date);
        assert_eq!((end - start).num_hours(), 24);
        assert_eq!(end.date_naive(), NaiveDate::from_ymd_opt(2025, 6, 13).unwrap());
    }

    #[test]
    fn test_start_of_week_is_monday() {
        // 2025-06-12 is a Thursday
        let thursday = local(2025, 6, 12, 15, 30);
        let monday = start_of_week(&thursday);
        assert_eq!(monday.weekday(), Weekday::Mon);
        assert_eq!(monday.date_naive(), NaiveDate::from_ymd_opt(2025, 6, 9).unwrap());
        assert_eq!(monday.hour(), 0);

        // A Monday maps to itself
        let same = start_of_week(&local(2025, 6, 9, 8, 0));
        assert_eq!(same.date_naive(), monday.date_naive());

        // Sunday belongs to the week that started six days earlier
        let sunday = start_of_week(&local(2025, 6, 15, 23, 59));
        assert_eq!(sunday.date_naive(), monday.date_naive());
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2025, 6).len(), 30);
        assert_eq!(days_in_month(2024, 2).len(), 29);
        assert_eq!(days_in_month(2025, 2).len(), 28);
        assert_eq!(days_in_month(2025, 12).len(), 31);
        assert!(days_in_month(2025, 13).is_empty());
    }

    #[test]
    fn test_epoch_seconds_conversion() {
        let dt = local(2025, 6, 12, 20, 0);
        let secs = to_epoch_seconds(&dt);
        assert_eq!(from_epoch_seconds(secs).unwrap(), dt);

        assert!(from_epoch_seconds(f64::NAN).is_none());
        assert!(from_epoch_seconds(f64::INFINITY).is_none());
    }

    #[test]
    fn test_hours_between() {
        let a = local(2025, 6, 12, 22, 0);
        let b = local(2025, 6, 13, 2, 0);
        assert_eq!(hours_between(&a, &b), 4.0);
        assert_eq!(hours_between(&b, &a), -4.0);
    }

    #[test]
    fn test_hours_to_duration() {
        assert_eq!(hours_to_duration(16.0), chrono::Duration::hours(16));
        assert_eq!(hours_to_duration(0.5), chrono::Duration::minutes(30));
        assert_eq!(hours_to_duration(f64::NAN), chrono::Duration::zero());
        // Saturates instead of panicking
        assert_eq!(
            hours_to_duration(-1e300),
            chrono::Duration::milliseconds(-i64::MAX)
        );
        assert_eq!(
            hours_to_duration(1e300),
            chrono::Duration::milliseconds(i64::MAX)
        );
    }

    #[test]
    fn test_format_countdown() {
        assert_eq!(format_countdown(Duration::from_secs(0)), "00:00:00");
        assert_eq!(format_countdown(Duration::from_secs(3661)), "01:01:01");
        assert_eq!(format_countdown(Duration::from_secs(30 * 3600)), "30:00:00");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h 1m 1s");
    }

    #[test]
    fn test_format_datetime_full() {
        let dt = Local.with_ymd_and_hms(2025, 12, 25, 14, 30, 45).unwrap();
        assert_eq!(format_datetime_full(&dt), "2025-12-25 14:30:45");
    }

    #[test]
    fn test_parse_mock_time_format() {
        for s in ["2025-12-25 14:30:00", "2025-01-01 00:00:00"] {
            assert!(NaiveDateTime::parse_from_str(s, MOCK_TIME_FORMAT).is_ok());
        }
        for s in ["2025-12-25", "2025-12-25T14:30:00", ""] {
            assert!(NaiveDateTime::parse_from_str(s, MOCK_TIME_FORMAT).is_err());
        }
    }

    #[test]
    fn test_now_returns_time() {
        let t = now();
        assert!(t.year() >= 2020);
        assert!(t.year() <= 2100);
    }
}

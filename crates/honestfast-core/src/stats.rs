//! Statistics derived from the fast history
//!
//! Every function here is a pure function of the records passed in and
//! the `now` it is given. Calendar days are local days.

use chrono::{DateTime, Days, Local, NaiveDate};
use honestfast_api::FastRecord;
use honestfast_util::{day_bounds, days_in_month, hours_between, start_of_week};
use serde::{Deserialize, Serialize};

/// Consecutive calendar days, walking back from today, that contain at
/// least one completed fast ending that day.
///
/// A running fast counts as today, and the scan then starts at yesterday.
pub fn current_streak(
    all: &[FastRecord],
    active: Option<&FastRecord>,
    now: DateTime<Local>,
) -> u32 {
    let mut streak = 0u32;
    let mut day = now.date_naive();

    if active.is_some() {
        streak = 1;
        match day.checked_sub_days(Days::new(1)) {
            Some(prev) => day = prev,
            None => return streak,
        }
    }

    loop {
        let (start, end) = day_bounds(day);
        let has_completion = all.iter().any(|r| {
            r.completed() && r.end_time().is_some_and(|e| e >= start && e < end)
        });
        if !has_completion {
            break;
        }

        streak = streak.saturating_add(1);
        match day.checked_sub_days(Days::new(1)) {
            Some(prev) => day = prev,
            None => break,
        }
    }

    streak
}

/// Completed fasts that ended on or after Monday 00:00 of the current week
pub fn sessions_this_week(all: &[FastRecord], now: DateTime<Local>) -> usize {
    let week_start = start_of_week(&now);
    all.iter()
        .filter(|r| r.completed() && r.end_time().is_some_and(|e| e >= week_start))
        .count()
}

/// Mean duration in hours, 0 for an empty slice
pub fn average_duration_hours(completed: &[FastRecord], now: DateTime<Local>) -> f64 {
    if completed.is_empty() {
        return 0.0;
    }
    let total: f64 = completed.iter().map(|r| r.duration_hours(now)).sum();
    total / completed.len() as f64
}

pub fn total_completed(all: &[FastRecord]) -> usize {
    all.iter().filter(|r| r.completed()).count()
}

/// Longest finished fast in hours, 0 when nothing has finished
pub fn longest_fast_hours(all: &[FastRecord], now: DateTime<Local>) -> f64 {
    all.iter()
        .filter(|r| !r.is_active())
        .map(|r| r.duration_hours(now))
        .fold(0.0, f64::max)
}

/// Hours of `day` covered by fasting.
///
/// Each record contributes the overlap of `[start, end or now)` with the
/// day window; a fast spanning midnight is split across both days.
pub fn daily_fasted_hours(day: NaiveDate, all: &[FastRecord], now: DateTime<Local>) -> f64 {
    let (day_start, day_end) = day_bounds(day);

    all.iter()
        .map(|r| {
            let from = r.start_time().max(day_start);
            let to = r.end_time().unwrap_or(now).min(day_end);
            hours_between(&from, &to).max(0.0)
        })
        .sum()
}

/// Heat-map intensity of one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarBucket {
    /// No fasting
    None,
    /// Under 8 hours
    Light,
    /// 8 to 16 hours
    Moderate,
    /// 16 hours or more
    Full,
}

impl CalendarBucket {
    pub fn for_hours(hours: f64) -> Self {
        if hours.is_nan() || hours <= 0.0 {
            CalendarBucket::None
        } else if hours < 8.0 {
            CalendarBucket::Light
        } else if hours < 16.0 {
            CalendarBucket::Moderate
        } else {
            CalendarBucket::Full
        }
    }
}

/// One cell of the month heat-map
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub hours: f64,
    pub bucket: CalendarBucket,
}

/// Every day of the month with its fasted hours and bucket
pub fn month_heatmap(
    year: i32,
    month: u32,
    all: &[FastRecord],
    now: DateTime<Local>,
) -> Vec<CalendarDay> {
    days_in_month(year, month)
        .into_iter()
        .map(|date| {
            let hours = daily_fasted_hours(date, all, now);
            CalendarDay {
                date,
                hours,
                bucket: CalendarBucket::for_hours(hours),
            }
        })
        .collect()
}

/// Summary shown next to the timer and on the history screen
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FastStats {
    pub current_streak: u32,
    pub this_week: usize,
    pub average_hours: f64,
    pub total_completed: usize,
    pub longest_hours: f64,
}

impl FastStats {
    pub fn compute(all: &[FastRecord], active: Option<&FastRecord>, now: DateTime<Local>) -> Self {
        let completed: Vec<FastRecord> = all.iter().filter(|r| r.completed()).cloned().collect();

        Self {
            current_streak: current_streak(all, active, now),
            this_week: sessions_this_week(all, now),
            average_hours: average_duration_hours(&completed, now),
            total_completed: completed.len(),
            longest_hours: longest_fast_hours(all, now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, day, hour, 0, 0).unwrap()
    }

    fn finished(start: DateTime<Local>, end: DateTime<Local>, target: f64) -> FastRecord {
        let mut record = FastRecord::new(start, target, "16:8");
        let completed = record.hit_target(end);
        record.finish(end, completed);
        record
    }

    /// Completed fasts ending on June 10, 11 and 12 (Tue-Thu)
    fn three_day_run() -> Vec<FastRecord> {
        vec![
            finished(at(9, 20), at(10, 12), 16.0),
            finished(at(10, 20), at(11, 12), 16.0),
            finished(at(11, 20), at(12, 12), 16.0),
        ]
    }

    #[test]
    fn streak_counts_consecutive_days() {
        let all = three_day_run();
        assert_eq!(current_streak(&all, None, at(12, 18)), 3);
    }

    #[test]
    fn streak_with_active_fast_starts_yesterday() {
        let mut all = three_day_run();
        let active = FastRecord::new(at(13, 8), 16.0, "16:8");
        all.push(active.clone());

        assert_eq!(current_streak(&all, Some(&active), at(13, 10)), 4);
    }

    #[test]
    fn streak_broken_by_gap() {
        let all = three_day_run();
        // Nothing completed on the 13th yet, no active fast
        assert_eq!(current_streak(&all, None, at(13, 10)), 0);
        assert_eq!(current_streak(&[], None, at(13, 10)), 0);
    }

    #[test]
    fn streak_ignores_uncompleted_fasts() {
        let mut all = three_day_run();
        all.push(finished(at(12, 14), at(13, 1), 16.0));
        assert!(!all[3].completed());

        assert_eq!(current_streak(&all, None, at(13, 10)), 0);
    }

    #[test]
    fn week_starts_monday() {
        let all = vec![
            // Ends Sunday June 8, previous week
            finished(at(7, 18), at(8, 12), 16.0),
            // Ends Monday June 9
            finished(at(8, 18), at(9, 12), 16.0),
            finished(at(10, 20), at(11, 12), 16.0),
            // Not completed
            finished(at(11, 20), at(12, 2), 16.0),
        ];

        assert_eq!(sessions_this_week(&all, at(12, 9)), 2);
    }

    #[test]
    fn average_and_totals() {
        let all = vec![
            finished(at(10, 0), at(10, 16), 16.0),
            finished(at(11, 0), at(11, 20), 18.0),
            finished(at(12, 0), at(12, 4), 16.0),
        ];
        let now = at(13, 0);
        let completed: Vec<_> = all.iter().filter(|r| r.completed()).cloned().collect();

        assert_eq!(average_duration_hours(&completed, now), 18.0);
        assert_eq!(average_duration_hours(&[], now), 0.0);
        assert_eq!(total_completed(&all), 2);
        assert_eq!(longest_fast_hours(&all, now), 20.0);
    }

    #[test]
    fn midnight_span_splits_across_days() {
        let all = vec![finished(at(10, 22), at(11, 2), 16.0)];
        let now = at(20, 0);

        let day_a = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let day_b = NaiveDate::from_ymd_opt(2025, 6, 11).unwrap();
        assert_eq!(daily_fasted_hours(day_a, &all, now), 2.0);
        assert_eq!(daily_fasted_hours(day_b, &all, now), 2.0);
    }

    #[test]
    fn active_fast_counts_until_now() {
        let all = vec![FastRecord::new(at(12, 6), 16.0, "16:8")];
        let today = NaiveDate::from_ymd_opt(2025, 6, 12).unwrap();

        assert_eq!(daily_fasted_hours(today, &all, at(12, 9)), 3.0);
    }

    #[test]
    fn bucket_boundaries() {
        assert_eq!(CalendarBucket::for_hours(0.0), CalendarBucket::None);
        assert_eq!(CalendarBucket::for_hours(0.5), CalendarBucket::Light);
        assert_eq!(CalendarBucket::for_hours(8.0), CalendarBucket::Moderate);
        assert_eq!(CalendarBucket::for_hours(15.99), CalendarBucket::Moderate);
        assert_eq!(CalendarBucket::for_hours(16.0), CalendarBucket::Full);
        assert_eq!(CalendarBucket::for_hours(24.0), CalendarBucket::Full);
    }

    #[test]
    fn bucket_serializes_snake_case() {
        let json = serde_json::to_string(&CalendarBucket::Moderate).unwrap();
        assert_eq!(json, "\"moderate\"");
    }

    #[test]
    fn month_heatmap_covers_every_day() {
        let all = vec![
            finished(at(10, 20), at(11, 12), 16.0),
            finished(at(14, 0), at(14, 5), 16.0),
        ];
        let heatmap = month_heatmap(2025, 6, &all, at(30, 12));

        assert_eq!(heatmap.len(), 30);
        assert_eq!(heatmap[9].bucket, CalendarBucket::Light); // June 10, 4h
        assert_eq!(heatmap[10].bucket, CalendarBucket::Moderate); // June 11, 12h
        assert_eq!(heatmap[13].hours, 5.0);
        assert_eq!(heatmap[0].bucket, CalendarBucket::None);
    }

    #[test]
    fn stats_summary() {
        let all = three_day_run();
        let stats = FastStats::compute(&all, None, at(12, 18));

        assert_eq!(stats.current_streak, 3);
        assert_eq!(stats.this_week, 3);
        assert_eq!(stats.average_hours, 16.0);
        assert_eq!(stats.total_completed, 3);
        assert_eq!(stats.longest_hours, 16.0);
    }
}

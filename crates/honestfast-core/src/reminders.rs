//! Reminder planning for a running fast

use chrono::{DateTime, Local};
use honestfast_api::{FastRecord, FastingStage, Preferences};
use honestfast_config::DEFAULT_MILESTONE_HOURS;
use honestfast_util::hours_to_duration;

/// Id of the "target reached" reminder
pub const COMPLETION_REMINDER_ID: &str = "fast-complete";

/// Every reminder id the default milestone set can produce
pub const ALL_REMINDER_IDS: [&str; 7] = [
    COMPLETION_REMINDER_ID,
    "milestone-4h",
    "milestone-8h",
    "milestone-12h",
    "milestone-16h",
    "milestone-20h",
    "milestone-24h",
];

/// A local notification to schedule
#[derive(Debug, Clone, PartialEq)]
pub struct Reminder {
    pub id: String,
    pub fire_time: DateTime<Local>,
    pub title: String,
    pub body: String,
}

pub fn milestone_id(hours: u32) -> String {
    format!("milestone-{hours}h")
}

/// Ids to cancel when a fast stops: the default set plus any configured milestone
pub fn reminder_ids(milestone_hours: &[u32]) -> Vec<String> {
    let mut ids: Vec<String> = ALL_REMINDER_IDS.iter().map(|s| s.to_string()).collect();
    for &h in milestone_hours {
        let id = milestone_id(h);
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

/// Reminders for `record` with the default milestone hours
pub fn plan_reminders(
    record: &FastRecord,
    prefs: &Preferences,
    now: DateTime<Local>,
) -> Vec<Reminder> {
    plan_reminders_with(record, prefs, &DEFAULT_MILESTONE_HOURS, now)
}

/// Reminders for `record`.
///
/// The completion reminder fires at the target end, but never sooner than
/// one second from `now`. Milestones beyond the target or already in the
/// past are skipped.
pub fn plan_reminders_with(
    record: &FastRecord,
    prefs: &Preferences,
    milestone_hours: &[u32],
    now: DateTime<Local>,
) -> Vec<Reminder> {
    let mut reminders = Vec::new();
    if !prefs.notifications_enabled {
        return reminders;
    }

    let target = record.target_hours();
    let target_end = record.target_end().filter(|_| target.is_finite() && target > 0.0);
    if let Some(target_end) = target_end {
        let earliest = now + chrono::Duration::seconds(1);
        reminders.push(Reminder {
            id: COMPLETION_REMINDER_ID.to_string(),
            fire_time: target_end.max(earliest),
            title: "Fast complete!".to_string(),
            body: format!("Your {} fast is complete.", record.plan_label()),
        });
    }

    if prefs.milestone_notifications {
        for &h in milestone_hours {
            let hours = f64::from(h);
            if hours > target {
                continue;
            }
            let Some(fire_time) = record
                .start_time()
                .checked_add_signed(hours_to_duration(hours))
            else {
                continue;
            };
            if fire_time <= now {
                continue;
            }
            reminders.push(Reminder {
                id: milestone_id(h),
                fire_time,
                title: format!("{h} hours in"),
                body: FastingStage::for_hours(hours).title().to_string(),
            });
        }
    }

    reminders
}

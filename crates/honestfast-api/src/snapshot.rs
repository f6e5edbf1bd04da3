//! Cross-device shared snapshot and its flat-map encoding

use chrono::{DateTime, Local};
use honestfast_util::{from_epoch_seconds, hours_to_duration, to_epoch_seconds};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{DEFAULT_PLAN_ID, DEFAULT_TARGET_HOURS, FastRecord, MAX_TARGET_HOURS, is_valid_target};

/// Keys of the flat map shared between processes and devices
pub mod keys {
    pub const IS_FASTING: &str = "isFasting";
    pub const FAST_START_TIME: &str = "fastStartTime";
    pub const FAST_DURATION_HOURS: &str = "fastDurationHours";
    pub const PLAN_NAME: &str = "planName";
    pub const LAST_SYNC_TIMESTAMP: &str = "lastSyncTimestamp";
}

/// Flat string-keyed map as carried by the shared store and the peer channel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncPayload(Map<String, Value>);

impl SyncPayload {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn bool_or(&self, key: &str, fallback: bool) -> bool {
        match self.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().map(|v| v != 0.0).unwrap_or(fallback),
            _ => fallback,
        }
    }

    fn f64_or(&self, key: &str, fallback: f64) -> f64 {
        self.get(key)
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
            .unwrap_or(fallback)
    }

    fn string_or(&self, key: &str, fallback: &str) -> String {
        self.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(fallback)
            .to_string()
    }
}

/// The minimal record describing "is a fast active, since when, for how
/// long, under what plan".
///
/// Always written wholesale; never merged field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedSnapshot {
    pub is_fasting: bool,
    /// Epoch seconds, 0 = unset
    pub start_time: f64,
    pub target_hours: f64,
    pub plan_label: String,
    /// Epoch seconds of the write
    pub last_sync_timestamp: f64,
}

impl SharedSnapshot {
    /// Snapshot describing a running fast
    pub fn fasting(record: &FastRecord, now: DateTime<Local>) -> Self {
        Self {
            is_fasting: true,
            start_time: to_epoch_seconds(&record.start_time()),
            target_hours: record.target_hours(),
            plan_label: record.plan_label().to_string(),
            last_sync_timestamp: to_epoch_seconds(&now),
        }
    }

    /// Snapshot describing "no fast running"
    pub fn not_fasting(now: DateTime<Local>) -> Self {
        Self {
            last_sync_timestamp: to_epoch_seconds(&now),
            ..Self::default()
        }
    }

    /// Start time as local time, `None` when unset or invalid.
    ///
    /// A start so late that a maximal fast would end past the calendar range
    /// counts as invalid.
    pub fn start_time_local(&self) -> Option<DateTime<Local>> {
        if self.start_time <= 0.0 {
            return None;
        }
        let start = from_epoch_seconds(self.start_time)?;
        start.checked_add_signed(hours_to_duration(MAX_TARGET_HOURS))?;
        Some(start)
    }

    /// Target hours to use when materializing a fast from this snapshot
    pub fn effective_target_hours(&self) -> f64 {
        if is_valid_target(self.target_hours) {
            self.target_hours
        } else {
            DEFAULT_TARGET_HOURS
        }
    }

    /// Whether both snapshots describe the same state: both idle, or the
    /// same fast. Start times within a second match, since stores keep
    /// millisecond precision.
    pub fn same_state(&self, other: &SharedSnapshot) -> bool {
        match (self.is_fasting, other.is_fasting) {
            (false, false) => true,
            (true, true) => (self.start_time - other.start_time).abs() < 1.0,
            _ => false,
        }
    }

    pub fn to_payload(&self) -> SyncPayload {
        let mut payload = SyncPayload::new();
        payload.insert(keys::IS_FASTING, self.is_fasting);
        payload.insert(keys::FAST_START_TIME, self.start_time);
        payload.insert(keys::FAST_DURATION_HOURS, self.target_hours);
        payload.insert(keys::PLAN_NAME, self.plan_label.clone());
        payload.insert(keys::LAST_SYNC_TIMESTAMP, self.last_sync_timestamp);
        payload
    }

    /// Decode a payload. Never fails: missing or mistyped keys take safe
    /// fallbacks (not fasting, unset start, 16h, default plan, timestamp 0).
    /// Targets outside `(0, MAX_TARGET_HOURS]` also fall back to 16h.
    pub fn from_payload(payload: &SyncPayload) -> Self {
        let target_hours = payload.f64_or(keys::FAST_DURATION_HOURS, DEFAULT_TARGET_HOURS);
        Self {
            is_fasting: payload.bool_or(keys::IS_FASTING, false),
            start_time: payload.f64_or(keys::FAST_START_TIME, 0.0).max(0.0),
            target_hours: if is_valid_target(target_hours) {
                target_hours
            } else {
                DEFAULT_TARGET_HOURS
            },
            plan_label: payload.string_or(keys::PLAN_NAME, DEFAULT_PLAN_ID),
            last_sync_timestamp: payload.f64_or(keys::LAST_SYNC_TIMESTAMP, 0.0),
        }
    }
}

impl Default for SharedSnapshot {
    fn default() -> Self {
        Self {
            is_fasting: false,
            start_time: 0.0,
            target_hours: DEFAULT_TARGET_HOURS,
            plan_label: DEFAULT_PLAN_ID.to_string(),
            last_sync_timestamp: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 12, 20, 0, 0).unwrap()
    }

    #[test]
    fn fasting_snapshot_fields() {
        let record = FastRecord::new(t0(), 18.0, "18:6");
        let later = t0() + chrono::Duration::minutes(5);
        let snapshot = SharedSnapshot::fasting(&record, later);

        assert!(snapshot.is_fasting);
        assert_eq!(snapshot.start_time_local(), Some(t0()));
        assert_eq!(snapshot.target_hours, 18.0);
        assert_eq!(snapshot.plan_label, "18:6");
        assert_eq!(snapshot.last_sync_timestamp, to_epoch_seconds(&later));
    }

    #[test]
    fn not_fasting_snapshot_has_unset_start() {
        let snapshot = SharedSnapshot::not_fasting(t0());
        assert!(!snapshot.is_fasting);
        assert_eq!(snapshot.start_time, 0.0);
        assert_eq!(snapshot.start_time_local(), None);
        assert_eq!(snapshot.target_hours, 16.0);
    }

    #[test]
    fn payload_uses_flat_keys() {
        let record = FastRecord::new(t0(), 20.0, "20:4");
        let payload = SharedSnapshot::fasting(&record, t0()).to_payload();

        assert_eq!(payload.len(), 5);
        assert_eq!(payload.get(keys::IS_FASTING), Some(&Value::Bool(true)));
        assert_eq!(
            payload.get(keys::PLAN_NAME),
            Some(&Value::String("20:4".into()))
        );
        assert_eq!(
            SharedSnapshot::from_payload(&payload),
            SharedSnapshot::fasting(&record, t0())
        );
    }

    #[test]
    fn empty_payload_decodes_to_defaults() {
        let snapshot = SharedSnapshot::from_payload(&SyncPayload::new());
        assert_eq!(snapshot, SharedSnapshot::default());
    }

    #[test]
    fn malformed_payload_falls_back_per_key() {
        let payload: SyncPayload = serde_json::from_str(
            r#"{
                "isFasting": 1,
                "fastStartTime": "yesterday",
                "fastDurationHours": -3,
                "planName": "",
                "lastSyncTimestamp": 1700000000.5
            }"#,
        )
        .unwrap();

        let snapshot = SharedSnapshot::from_payload(&payload);
        assert!(snapshot.is_fasting);
        assert_eq!(snapshot.start_time, 0.0);
        assert_eq!(snapshot.target_hours, 16.0);
        assert_eq!(snapshot.plan_label, "16:8");
        assert_eq!(snapshot.last_sync_timestamp, 1_700_000_000.5);
    }

    #[test]
    fn effective_target_guards_zero() {
        let snapshot = SharedSnapshot {
            target_hours: 0.0,
            ..SharedSnapshot::default()
        };
        assert_eq!(snapshot.effective_target_hours(), 16.0);
    }

    #[test]
    fn oversized_target_falls_back() {
        let mut payload = SharedSnapshot::default().to_payload();
        payload.insert(keys::FAST_DURATION_HOURS, 1e10);
        assert_eq!(SharedSnapshot::from_payload(&payload).target_hours, 16.0);

        payload.insert(keys::FAST_DURATION_HOURS, 72.0);
        assert_eq!(SharedSnapshot::from_payload(&payload).target_hours, 72.0);

        let snapshot = SharedSnapshot {
            target_hours: f64::MAX,
            ..SharedSnapshot::default()
        };
        assert_eq!(snapshot.effective_target_hours(), 16.0);
    }

    #[test]
    fn start_near_calendar_limit_is_invalid() {
        let snapshot = SharedSnapshot {
            is_fasting: true,
            // A few hours before chrono's last representable instant
            start_time: 8_210_298_400_000.0,
            ..SharedSnapshot::default()
        };
        assert_eq!(snapshot.start_time_local(), None);

        let far = SharedSnapshot {
            start_time: 1e300,
            ..snapshot
        };
        assert_eq!(far.start_time_local(), None);
    }

    #[test]
    fn same_state_ignores_timestamps() {
        let record = FastRecord::new(t0(), 16.0, "16:8");
        let later = t0() + chrono::Duration::hours(2);

        assert!(SharedSnapshot::not_fasting(t0()).same_state(&SharedSnapshot::not_fasting(later)));
        assert!(SharedSnapshot::fasting(&record, t0()).same_state(&SharedSnapshot::fasting(&record, later)));
        assert!(!SharedSnapshot::fasting(&record, t0()).same_state(&SharedSnapshot::not_fasting(t0())));

        let other = FastRecord::new(later, 16.0, "16:8");
        assert!(!SharedSnapshot::fasting(&record, t0()).same_state(&SharedSnapshot::fasting(&other, t0())));
    }
}

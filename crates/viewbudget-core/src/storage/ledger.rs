//! Persistent per-day viewing ledger.
//!
//! Three JSON-encoded entries live in the origin's key-value store:
//!
//! ```text
//! videoSiteTimeLimiter  {"Fri Oct 16 2026": 1000, ...}
//! videoSiteTimeLimit    60
//! lastResetDate         "Fri Oct 16 2026"
//! ```
//!
//! Reads never fail. Missing, malformed or out-of-range data degrades to the
//! defaults (0 ms spent, 60 minute limit, no reset marker).

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::KvStore;
use crate::error::{Result, ValidationError};

/// Key holding the per-day usage mapping.
pub const USAGE_KEY: &str = "videoSiteTimeLimiter";
/// Key holding the daily limit in minutes.
pub const LIMIT_KEY: &str = "videoSiteTimeLimit";
/// Key holding the date string of the last reset.
pub const RESET_MARKER_KEY: &str = "lastResetDate";

pub const DEFAULT_LIMIT_MINUTES: u32 = 60;
pub const MS_PER_MINUTE: u64 = 60_000;

/// Calendar-day key for a local timestamp, e.g. `"Fri Oct 16 2026"`.
pub fn day_key(now: &DateTime<FixedOffset>) -> String {
    now.format("%a %b %d %Y").to_string()
}

/// Local time of day after which the ledger is cleared, once per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetBoundary {
    hour: u32,
    minute: u32,
}

impl Default for ResetBoundary {
    fn default() -> Self {
        Self {
            hour: 18,
            minute: 0,
        }
    }
}

impl ResetBoundary {
    /// # Errors
    /// Returns an error if the time is not a valid time of day.
    pub fn new(hour: u32, minute: u32) -> Result<Self, ValidationError> {
        if hour > 23 || minute > 59 {
            return Err(ValidationError::InvalidResetTime { hour, minute });
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    /// Whether the local wall-clock time is at or past the boundary.
    pub fn is_passed(&self, time: NaiveTime) -> bool {
        time.hour() * 60 + time.minute() >= self.hour * 60 + self.minute
    }
}

/// Durable record of daily viewing time, the configured limit and the last reset.
///
/// Pure storage: no policy beyond the once-per-day reset rule.
pub struct Ledger<S: KvStore> {
    store: S,
    default_limit_minutes: u32,
    boundary: ResetBoundary,
}

impl<S: KvStore> Ledger<S> {
    /// Ledger with the default 60 minute limit and 18:00 reset boundary.
    pub fn new(store: S) -> Self {
        Self::with_settings(store, DEFAULT_LIMIT_MINUTES, ResetBoundary::default())
    }

    pub fn with_settings(store: S, default_limit_minutes: u32, boundary: ResetBoundary) -> Self {
        Self {
            store,
            default_limit_minutes: default_limit_minutes.max(1),
            boundary,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn boundary(&self) -> ResetBoundary {
        self.boundary
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Milliseconds accumulated today; 0 if absent or unparsable.
    pub fn time_spent(&self, now: &DateTime<FixedOffset>) -> u64 {
        self.usage_map()
            .and_then(|map| map.get(&day_key(now)).and_then(as_millis))
            .unwrap_or(0)
    }

    /// Configured daily limit in whole minutes. Stored values below 1 read as
    /// the default.
    pub fn limit_minutes(&self) -> u32 {
        self.read_json(LIMIT_KEY)
            .and_then(|value| value.as_f64())
            .filter(|minutes| minutes.is_finite() && *minutes >= 1.0)
            .map(|minutes| minutes.min(f64::from(u32::MAX)).floor() as u32)
            .unwrap_or(self.default_limit_minutes)
    }

    pub fn limit_ms(&self) -> u64 {
        u64::from(self.limit_minutes()) * MS_PER_MINUTE
    }

    /// Date string of the last applied reset, if any.
    pub fn last_reset(&self) -> Option<String> {
        self.read_json(RESET_MARKER_KEY)
            .and_then(|value| value.as_str().map(str::to_string))
    }

    /// Every parsable day entry in the usage mapping.
    pub fn usage_history(&self) -> BTreeMap<String, u64> {
        self.usage_map()
            .map(|map| {
                map.iter()
                    .filter_map(|(day, value)| as_millis(value).map(|ms| (day.clone(), ms)))
                    .collect()
            })
            .unwrap_or_default()
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Replace today's accumulated milliseconds, keeping other days intact.
    ///
    /// # Errors
    /// Returns an error if the store cannot be written.
    pub fn set_time_spent(&self, now: &DateTime<FixedOffset>, ms: u64) -> Result<()> {
        let mut map = self.usage_map().unwrap_or_default();
        map.insert(day_key(now), Value::from(ms));
        self.store
            .set(USAGE_KEY, &serde_json::to_string(&Value::Object(map))?)
    }

    /// # Errors
    /// Returns an error if the store cannot be written.
    pub fn set_limit_minutes(&self, minutes: u32) -> Result<()> {
        self.store
            .set(LIMIT_KEY, &serde_json::to_string(&minutes)?)
    }

    /// Clear the usage mapping if the reset boundary has passed today and no
    /// reset was recorded for today yet. Returns whether a reset happened.
    ///
    /// # Errors
    /// Returns an error if the store cannot be written.
    pub fn reset_if_due(&self, now: &DateTime<FixedOffset>) -> Result<bool> {
        if !self.boundary.is_passed(now.time()) {
            return Ok(false);
        }

        let today = day_key(now);
        if self.last_reset().as_deref() == Some(today.as_str()) {
            return Ok(false);
        }

        self.store
            .set(USAGE_KEY, &serde_json::to_string(&Value::Object(Map::new()))?)?;
        self.store
            .set(RESET_MARKER_KEY, &serde_json::to_string(&today)?)?;
        tracing::info!(day = %today, "daily ledger reset");
        Ok(true)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn usage_map(&self) -> Option<Map<String, Value>> {
        match self.read_json(USAGE_KEY)? {
            Value::Object(map) => Some(map),
            other => {
                tracing::debug!(value = %other, "usage ledger is not an object, ignoring");
                None
            }
        }
    }

    fn read_json(&self, key: &str) -> Option<Value> {
        let raw = match self.store.get(key) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to read stored value");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(key, error = %e, "malformed stored value, using default");
                None
            }
        }
    }
}

fn as_millis(value: &Value) -> Option<u64> {
    if let Some(ms) = value.as_u64() {
        return Some(ms);
    }
    value
        .as_f64()
        .filter(|ms| ms.is_finite() && *ms > 0.0)
        .map(|ms| ms.floor() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 10, day, hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn day_key_matches_date_string_format() {
        assert_eq!(day_key(&at(16, 12, 0)), "Fri Oct 16 2026");
        assert_eq!(day_key(&at(5, 0, 0)), "Mon Oct 05 2026");
    }

    #[test]
    fn time_spent_defaults_to_zero() {
        let ledger = Ledger::new(MemoryStore::new());
        assert_eq!(ledger.time_spent(&at(16, 12, 0)), 0);
    }

    #[test]
    fn time_spent_ignores_malformed_json() {
        let store = MemoryStore::new().with_entry(USAGE_KEY, "not json");
        let ledger = Ledger::new(store);
        assert_eq!(ledger.time_spent(&at(16, 12, 0)), 0);
    }

    #[test]
    fn time_spent_ignores_non_numeric_entry() {
        let store =
            MemoryStore::new().with_entry(USAGE_KEY, r#"{"Fri Oct 16 2026": "lots"}"#);
        let ledger = Ledger::new(store);
        assert_eq!(ledger.time_spent(&at(16, 12, 0)), 0);
    }

    #[test]
    fn set_time_spent_preserves_other_days() {
        let store =
            MemoryStore::new().with_entry(USAGE_KEY, r#"{"Thu Oct 15 2026": 5000}"#);
        let ledger = Ledger::new(store);
        ledger.set_time_spent(&at(16, 12, 0), 1234).unwrap();

        let history = ledger.usage_history();
        assert_eq!(history.get("Thu Oct 15 2026"), Some(&5000));
        assert_eq!(history.get("Fri Oct 16 2026"), Some(&1234));
        assert_eq!(ledger.time_spent(&at(16, 13, 0)), 1234);
    }

    #[test]
    fn set_time_spent_replaces_malformed_mapping() {
        let store = MemoryStore::new().with_entry(USAGE_KEY, "[1, 2]");
        let ledger = Ledger::new(store);
        ledger.set_time_spent(&at(16, 12, 0), 42).unwrap();
        assert_eq!(ledger.usage_history().len(), 1);
        assert_eq!(ledger.time_spent(&at(16, 12, 0)), 42);
    }

    #[test]
    fn fractional_milliseconds_are_floored() {
        let store =
            MemoryStore::new().with_entry(USAGE_KEY, r#"{"Fri Oct 16 2026": 1500.9}"#);
        assert_eq!(Ledger::new(store).time_spent(&at(16, 12, 0)), 1500);
    }

    #[test]
    fn limit_defaults_to_sixty() {
        let ledger = Ledger::new(MemoryStore::new());
        assert_eq!(ledger.limit_minutes(), 60);
        assert_eq!(ledger.limit_ms(), 3_600_000);
    }

    #[test]
    fn limit_degrades_to_default_on_bad_values() {
        for raw in ["not json", "0", "-5", "\"thirty\"", "null"] {
            let ledger = Ledger::new(MemoryStore::new().with_entry(LIMIT_KEY, raw));
            assert_eq!(ledger.limit_minutes(), 60, "raw value {raw}");
        }
    }

    #[test]
    fn fractional_limits_below_one_read_as_default() {
        let ledger = Ledger::new(MemoryStore::new().with_entry(LIMIT_KEY, "0.5"));
        assert_eq!(ledger.limit_minutes(), 60);

        let ledger = Ledger::new(MemoryStore::new().with_entry(LIMIT_KEY, "2.7"));
        assert_eq!(ledger.limit_minutes(), 2);
    }

    #[test]
    fn limit_roundtrip() {
        let ledger = Ledger::new(MemoryStore::new());
        ledger.set_limit_minutes(45).unwrap();
        assert_eq!(ledger.store().get(LIMIT_KEY).unwrap().as_deref(), Some("45"));
        assert_eq!(ledger.limit_minutes(), 45);
    }

    #[test]
    fn configured_default_limit_is_used() {
        let ledger =
            Ledger::with_settings(MemoryStore::new(), 90, ResetBoundary::default());
        assert_eq!(ledger.limit_minutes(), 90);
    }

    #[test]
    fn reset_not_due_before_boundary() {
        let ledger = Ledger::new(MemoryStore::new());
        ledger.set_time_spent(&at(16, 17, 0), 1000).unwrap();
        assert!(!ledger.reset_if_due(&at(16, 17, 59)).unwrap());
        assert_eq!(ledger.time_spent(&at(16, 17, 59)), 1000);
        assert!(ledger.last_reset().is_none());
    }

    #[test]
    fn reset_clears_mapping_once_per_day() {
        let store = MemoryStore::new()
            .with_entry(RESET_MARKER_KEY, r#""Thu Oct 15 2026""#)
            .with_entry(
                USAGE_KEY,
                r#"{"Thu Oct 15 2026": 9000, "Fri Oct 16 2026": 1000}"#,
            );
        let ledger = Ledger::new(store);

        assert!(ledger.reset_if_due(&at(16, 18, 5)).unwrap());
        assert_eq!(ledger.store().get(USAGE_KEY).unwrap().as_deref(), Some("{}"));
        assert_eq!(
            ledger.store().get(RESET_MARKER_KEY).unwrap().as_deref(),
            Some(r#""Fri Oct 16 2026""#)
        );

        ledger.set_time_spent(&at(16, 18, 7), 500).unwrap();
        assert!(!ledger.reset_if_due(&at(16, 18, 10)).unwrap());
        assert_eq!(ledger.time_spent(&at(16, 18, 10)), 500);
    }

    #[test]
    fn custom_boundary_is_respected() {
        let boundary = ResetBoundary::new(6, 30).unwrap();
        let ledger = Ledger::with_settings(MemoryStore::new(), 60, boundary);
        assert!(!ledger.reset_if_due(&at(16, 6, 29)).unwrap());
        assert!(ledger.reset_if_due(&at(16, 6, 30)).unwrap());
    }

    #[test]
    fn boundary_rejects_invalid_times() {
        assert!(ResetBoundary::new(24, 0).is_err());
        assert!(ResetBoundary::new(12, 60).is_err());
        assert!(ResetBoundary::new(0, 0).is_ok());
    }
}

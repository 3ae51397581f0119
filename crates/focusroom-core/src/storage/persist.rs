//! The two persisted timer records and the notification permission flag.
//!
//! Both records are JSON documents that are merged over defaults on read.
//! A missing record is normal on first run; an unreadable one is logged
//! and treated the same way. Write failures are logged and swallowed so a
//! broken store never stalls the timer.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::KvStore;
use crate::settings::TimerSettings;
use crate::timer::{SessionType, TimerState};

pub const SETTINGS_KEY: &str = "pomodoro-settings";
pub const STATE_KEY: &str = "pomodoro-state";
pub const NOTIFICATIONS_GRANTED_KEY: &str = "notificationsGranted";

/// Persisted shape of the engine.
///
/// `time_remaining` is only written while the timer is running; a paused or
/// idle value would otherwise be restored as if it were live.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub state: TimerState,
    pub session_type: SessionType,
    pub session_count: u32,
    pub total_sessions: u32,
    pub current_task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_remaining: Option<u64>,
}

impl TimerSnapshot {
    /// Field-by-field lenient parse; anything unusable keeps its default.
    pub fn from_json_value(value: &Value) -> Self {
        fn field<T: for<'de> Deserialize<'de>>(obj: &serde_json::Map<String, Value>, key: &str) -> Option<T> {
            obj.get(key).and_then(|v| serde_json::from_value(v.clone()).ok())
        }

        let Some(obj) = value.as_object() else {
            return Self::default();
        };
        Self {
            state: field(obj, "state").unwrap_or_default(),
            session_type: field(obj, "sessionType").unwrap_or_default(),
            session_count: field(obj, "sessionCount").unwrap_or_default(),
            total_sessions: field(obj, "totalSessions").unwrap_or_default(),
            current_task_id: field(obj, "currentTaskId"),
            time_remaining: field::<u64>(obj, "timeRemaining").filter(|&t| t > 0),
        }
    }
}

/// Read and parse a JSON record. `None` when absent or unusable.
fn load_json(kv: &dyn KvStore, key: &str) -> Option<Value> {
    let raw = match kv.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(key, error = %e, "failed to read persisted record, using defaults");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, error = %e, "persisted record is not valid JSON, using defaults");
            None
        }
    }
}

fn save_json<T: Serialize>(kv: &dyn KvStore, key: &str, value: &T) {
    let json = match serde_json::to_string(value) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(key, error = %e, "failed to serialize record");
            return;
        }
    };
    if let Err(e) = kv.set(key, &json) {
        tracing::warn!(key, error = %e, "failed to persist record");
    }
}

pub fn load_settings(kv: &dyn KvStore) -> TimerSettings {
    load_json(kv, SETTINGS_KEY)
        .map(|v| TimerSettings::from_json_value(&v))
        .unwrap_or_default()
}

pub fn save_settings(kv: &dyn KvStore, settings: &TimerSettings) {
    save_json(kv, SETTINGS_KEY, settings);
}

pub fn load_snapshot(kv: &dyn KvStore) -> Option<TimerSnapshot> {
    load_json(kv, STATE_KEY).map(|v| TimerSnapshot::from_json_value(&v))
}

pub fn save_snapshot(kv: &dyn KvStore, snapshot: &TimerSnapshot) {
    save_json(kv, STATE_KEY, snapshot);
}

/// Whether the user has allowed system notifications.
pub fn notifications_granted(kv: &dyn KvStore) -> bool {
    load_json(kv, NOTIFICATIONS_GRANTED_KEY)
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

pub fn set_notifications_granted(kv: &dyn KvStore, granted: bool) {
    save_json(kv, NOTIFICATIONS_GRANTED_KEY, &granted);
}

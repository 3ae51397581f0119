use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::settings::TimerSettings;
use crate::timer::SessionType;

/// Every state change of the timer produces an Event.
/// The presentation layer renders them; the CLI prints them as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        session_type: SessionType,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerCompleted {
        session_type: SessionType,
        next_session_type: SessionType,
        session_count: u32,
        total_sessions: u32,
        at: DateTime<Utc>,
    },
    TimerSkipped {
        from: SessionType,
        to: SessionType,
        at: DateTime<Utc>,
    },
    TimerReset {
        session_type: SessionType,
        at: DateTime<Utc>,
    },
    /// A deferred start was armed after completion.
    AutoStartScheduled {
        due_epoch_ms: u64,
        at: DateTime<Utc>,
    },
    /// A pending deferred start was dropped because the user acted first.
    AutoStartCancelled {
        at: DateTime<Utc>,
    },
    TaskChanged {
        task_id: Option<String>,
        at: DateTime<Utc>,
    },
    SettingsChanged {
        settings: TimerSettings,
        at: DateTime<Utc>,
    },
}

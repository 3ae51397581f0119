//! Session sequencing. Pure functions over settings, no state.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::settings::TimerSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionType {
    #[default]
    Work,
    ShortBreak,
    LongBreak,
}

impl SessionType {
    pub fn is_work(&self) -> bool {
        matches!(self, Self::Work)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Work => "Focus Time",
            Self::ShortBreak => "Short Break",
            Self::LongBreak => "Long Break",
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Decide which session follows `current`.
///
/// `completed_work_sessions` counts the work sessions finished before the
/// one being left. A long break follows every `long_break_interval`-th
/// work session; an interval of 0 is treated as 1.
pub fn next_session_type(
    current: SessionType,
    completed_work_sessions: u32,
    long_break_interval: u32,
) -> SessionType {
    match current {
        SessionType::Work => {
            let interval = long_break_interval.max(1);
            if (completed_work_sessions.wrapping_add(1)) % interval == 0 {
                SessionType::LongBreak
            } else {
                SessionType::ShortBreak
            }
        }
        SessionType::ShortBreak | SessionType::LongBreak => SessionType::Work,
    }
}

/// Full length of a session of the given type, in seconds.
pub fn duration_secs(session_type: SessionType, settings: &TimerSettings) -> u64 {
    let minutes = match session_type {
        SessionType::Work => settings.work_duration,
        SessionType::ShortBreak => settings.short_break_duration,
        SessionType::LongBreak => settings.long_break_duration,
    };
    u64::from(minutes) * 60
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn breaks_always_return_to_work() {
        assert_eq!(next_session_type(SessionType::ShortBreak, 3, 4), SessionType::Work);
        assert_eq!(next_session_type(SessionType::LongBreak, 4, 4), SessionType::Work);
    }

    #[test]
    fn long_break_on_every_fourth_work_session() {
        assert_eq!(next_session_type(SessionType::Work, 0, 4), SessionType::ShortBreak);
        assert_eq!(next_session_type(SessionType::Work, 2, 4), SessionType::ShortBreak);
        assert_eq!(next_session_type(SessionType::Work, 3, 4), SessionType::LongBreak);
        assert_eq!(next_session_type(SessionType::Work, 7, 4), SessionType::LongBreak);
    }

    #[test]
    fn interval_of_one_always_long_break() {
        for n in 0..10 {
            assert_eq!(next_session_type(SessionType::Work, n, 1), SessionType::LongBreak);
        }
    }

    #[test]
    fn zero_interval_does_not_panic() {
        assert_eq!(next_session_type(SessionType::Work, 5, 0), SessionType::LongBreak);
    }

    #[test]
    fn durations_follow_settings() {
        let settings = TimerSettings {
            work_duration: 50,
            short_break_duration: 10,
            long_break_duration: 30,
            ..TimerSettings::default()
        };
        assert_eq!(duration_secs(SessionType::Work, &settings), 3000);
        assert_eq!(duration_secs(SessionType::ShortBreak, &settings), 600);
        assert_eq!(duration_secs(SessionType::LongBreak, &settings), 1800);
    }

    #[test]
    fn serde_names_match_persisted_record() {
        assert_eq!(serde_json::to_string(&SessionType::ShortBreak).unwrap(), "\"shortBreak\"");
        assert_eq!(serde_json::to_string(&SessionType::LongBreak).unwrap(), "\"longBreak\"");
    }

    proptest! {
        #[test]
        fn exactly_one_long_break_per_interval(interval in 1u32..=10, cycles in 1u32..=5) {
            let longs = (0..interval * cycles)
                .filter(|&n| next_session_type(SessionType::Work, n, interval) == SessionType::LongBreak)
                .count() as u32;
            prop_assert_eq!(longs, cycles);
        }
    }
}

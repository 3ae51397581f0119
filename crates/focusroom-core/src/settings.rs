//! Timer settings and the store that keeps them valid.
//!
//! Settings are persisted as a single JSON record (see
//! [`crate::storage::persist`]). Reading is lenient: a field that is missing,
//! of the wrong type or out of range is coerced to the nearest valid value or
//! replaced by its default. Nothing in here ever fails toward the caller.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::storage::{persist, KvStore};

pub const WORK_DURATION_BOUNDS: (u32, u32) = (1, 60);
pub const SHORT_BREAK_BOUNDS: (u32, u32) = (1, 30);
pub const LONG_BREAK_BOUNDS: (u32, u32) = (1, 60);
pub const LONG_BREAK_INTERVAL_BOUNDS: (u32, u32) = (2, 10);

/// Completion sound, mapped to an asset by the notification dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundType {
    #[default]
    Bell,
    Chime,
    Gentle,
    Digital,
}

impl SoundType {
    pub const ALL: [SoundType; 4] = [Self::Bell, Self::Chime, Self::Gentle, Self::Digital];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bell => "bell",
            Self::Chime => "chime",
            Self::Gentle => "gentle",
            Self::Digital => "digital",
        }
    }
}

impl fmt::Display for SoundType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SoundType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown sound type: {s}"))
    }
}

/// Validated timer configuration. Durations are whole minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSettings {
    pub work_duration: u32,
    pub short_break_duration: u32,
    pub long_break_duration: u32,
    /// Number of work sessions per long break.
    pub long_break_interval: u32,
    pub auto_start_next_session: bool,
    pub sound_enabled: bool,
    pub sound_type: SoundType,
    /// Playback volume in `[0, 1]`.
    pub volume: f32,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            work_duration: 25,
            short_break_duration: 5,
            long_break_duration: 15,
            long_break_interval: 4,
            auto_start_next_session: false,
            sound_enabled: true,
            sound_type: SoundType::Bell,
            volume: 0.5,
        }
    }
}

impl TimerSettings {
    /// Camel-case field names, as used in the persisted record and by the
    /// CLI `config` command.
    pub const KEYS: [&'static str; 8] = [
        "workDuration",
        "shortBreakDuration",
        "longBreakDuration",
        "longBreakInterval",
        "autoStartNextSession",
        "soundEnabled",
        "soundType",
        "volume",
    ];

    /// Clamp every field into its valid range.
    pub fn sanitize(self) -> Self {
        Self {
            work_duration: clamp_u32(self.work_duration.into(), WORK_DURATION_BOUNDS),
            short_break_duration: clamp_u32(self.short_break_duration.into(), SHORT_BREAK_BOUNDS),
            long_break_duration: clamp_u32(self.long_break_duration.into(), LONG_BREAK_BOUNDS),
            long_break_interval: clamp_u32(
                self.long_break_interval.into(),
                LONG_BREAK_INTERVAL_BOUNDS,
            ),
            volume: clamp_volume(self.volume as f64).unwrap_or(Self::default().volume),
            ..self
        }
    }

    /// Build settings from an arbitrary JSON value, merging every usable
    /// field over the defaults.
    pub fn from_json_value(value: &Value) -> Self {
        SettingsPatch::from_json_value(value).apply(&Self::default())
    }

    /// Get a field rendered as a string.
    pub fn get(&self, key: &str) -> Option<String> {
        if key == "volume" {
            // f32 Display, not the widened f64 a `Value` would hold.
            return Some(self.volume.to_string());
        }
        let json = serde_json::to_value(self).ok()?;
        match json.get(key)? {
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Build a single-field patch from a string value.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownSettingsKey`] if `key` is not a settings
    /// field. Unusable values are not an error; they yield an empty patch.
    pub fn patch_for(key: &str, value: &str) -> Result<SettingsPatch, CoreError> {
        if !Self::KEYS.contains(&key) {
            return Err(CoreError::UnknownSettingsKey(key.to_string()));
        }
        let mut obj = serde_json::Map::new();
        obj.insert(key.to_string(), Value::String(value.to_string()));
        Ok(SettingsPatch::from_json_value(&Value::Object(obj)))
    }
}

/// A partial settings update. Unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    pub work_duration: Option<i64>,
    pub short_break_duration: Option<i64>,
    pub long_break_duration: Option<i64>,
    pub long_break_interval: Option<i64>,
    pub auto_start_next_session: Option<bool>,
    pub sound_enabled: Option<bool>,
    pub sound_type: Option<SoundType>,
    pub volume: Option<f64>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Extract every field that can be interpreted, ignoring the rest.
    ///
    /// Numbers may be given as JSON numbers or numeric strings; fractional
    /// minute counts are rounded. Booleans accept `true`/`false` strings.
    pub fn from_json_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };
        Self {
            work_duration: obj.get("workDuration").and_then(lenient_int),
            short_break_duration: obj.get("shortBreakDuration").and_then(lenient_int),
            long_break_duration: obj.get("longBreakDuration").and_then(lenient_int),
            long_break_interval: obj.get("longBreakInterval").and_then(lenient_int),
            auto_start_next_session: obj.get("autoStartNextSession").and_then(lenient_bool),
            sound_enabled: obj.get("soundEnabled").and_then(lenient_bool),
            sound_type: obj
                .get("soundType")
                .and_then(Value::as_str)
                .and_then(|s| s.parse().ok()),
            volume: obj.get("volume").and_then(lenient_float),
        }
    }

    /// Merge over `base`, coercing every provided value into range.
    pub fn apply(&self, base: &TimerSettings) -> TimerSettings {
        TimerSettings {
            work_duration: self
                .work_duration
                .map_or(base.work_duration, |v| clamp_u32(v, WORK_DURATION_BOUNDS)),
            short_break_duration: self
                .short_break_duration
                .map_or(base.short_break_duration, |v| clamp_u32(v, SHORT_BREAK_BOUNDS)),
            long_break_duration: self
                .long_break_duration
                .map_or(base.long_break_duration, |v| clamp_u32(v, LONG_BREAK_BOUNDS)),
            long_break_interval: self
                .long_break_interval
                .map_or(base.long_break_interval, |v| {
                    clamp_u32(v, LONG_BREAK_INTERVAL_BOUNDS)
                }),
            auto_start_next_session: self
                .auto_start_next_session
                .unwrap_or(base.auto_start_next_session),
            sound_enabled: self.sound_enabled.unwrap_or(base.sound_enabled),
            sound_type: self.sound_type.unwrap_or(base.sound_type),
            volume: self
                .volume
                .and_then(clamp_volume)
                .unwrap_or(base.volume),
        }
        .sanitize()
    }
}

impl From<TimerSettings> for SettingsPatch {
    fn from(s: TimerSettings) -> Self {
        Self {
            work_duration: Some(s.work_duration.into()),
            short_break_duration: Some(s.short_break_duration.into()),
            long_break_duration: Some(s.long_break_duration.into()),
            long_break_interval: Some(s.long_break_interval.into()),
            auto_start_next_session: Some(s.auto_start_next_session),
            sound_enabled: Some(s.sound_enabled),
            sound_type: Some(s.sound_type),
            volume: Some(s.volume.into()),
        }
    }
}

/// Owns the effective settings and writes every change through to the
/// key-value store.
pub struct SettingsStore {
    kv: Arc<dyn KvStore>,
    current: TimerSettings,
}

impl SettingsStore {
    /// Open the store, loading whatever is persisted.
    pub fn open(kv: Arc<dyn KvStore>) -> Self {
        let current = persist::load_settings(kv.as_ref());
        Self { kv, current }
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.current
    }

    /// Re-read the persisted record, merged over defaults.
    pub fn load(&mut self) -> TimerSettings {
        self.current = persist::load_settings(self.kv.as_ref());
        self.current.clone()
    }

    pub fn update(&mut self, patch: &SettingsPatch) -> TimerSettings {
        self.current = patch.apply(&self.current);
        persist::save_settings(self.kv.as_ref(), &self.current);
        self.current.clone()
    }

    pub fn reset(&mut self) -> TimerSettings {
        self.current = TimerSettings::default();
        persist::save_settings(self.kv.as_ref(), &self.current);
        self.current.clone()
    }
}

fn clamp_u32(value: i64, (min, max): (u32, u32)) -> u32 {
    value.clamp(min.into(), max.into()) as u32
}

fn clamp_volume(value: f64) -> Option<f32> {
    value.is_finite().then(|| value.clamp(0.0, 1.0) as f32)
}

fn lenient_int(value: &Value) -> Option<i64> {
    let as_float = |f: f64| f.is_finite().then(|| f.round() as i64);
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(as_float)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(as_float))
        }
        _ => None,
    }
}

fn lenient_float(value: &Value) -> Option<f64> {
    let f = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    f.is_finite().then_some(f)
}

fn lenient_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.trim().parse::<bool>().ok(),
        _ => None,
    }
}

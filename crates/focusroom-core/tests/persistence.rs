//! Restart survivability against the on-disk SQLite store.

use std::sync::Arc;
use std::time::Duration;

use focusroom_core::storage::persist::{self, SETTINGS_KEY, STATE_KEY};
use focusroom_core::{
    Database, KvStore, ManualClock, Notifier, SessionType, SettingsPatch, SettingsStore,
    SoundType, TimerEngine, TimerSettings, TimerState,
};

const T0: u64 = 1_700_000_000_000;

struct Silent;

impl Notifier for Silent {
    fn notify(&self, _sound: SoundType, _volume: f32) {}
}

fn open(dir: &std::path::Path, clock: &Arc<ManualClock>) -> TimerEngine {
    let db = Arc::new(Database::open_in(dir).unwrap());
    TimerEngine::new(db, clock.clone(), Arc::new(Silent))
}

#[test]
fn state_survives_process_restart() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(T0));
    {
        let mut engine = open(dir.path(), &clock);
        engine.update_settings(&SettingsPatch {
            short_break_duration: Some(7),
            ..SettingsPatch::default()
        });
        engine.skip();
        engine.set_task(Some("write-report".into()));
    }

    let engine = open(dir.path(), &clock);
    assert_eq!(engine.state(), TimerState::Idle);
    assert_eq!(engine.session_type(), SessionType::ShortBreak);
    assert_eq!(engine.session_count(), 1);
    assert_eq!(engine.time_remaining(), 7 * 60);
    assert_eq!(engine.current_task_id(), Some("write-report"));
}

#[test]
fn running_session_is_reanchored_from_saved_remaining() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(T0));
    {
        let mut engine = open(dir.path(), &clock);
        engine.start();
        clock.advance(Duration::from_secs(90));
        engine.tick();
    }

    // Whatever happened while the process was gone is not counted.
    clock.advance(Duration::from_secs(600));
    let mut engine = open(dir.path(), &clock);
    assert_eq!(engine.state(), TimerState::Running);
    assert_eq!(engine.time_remaining(), 1500 - 90);

    clock.advance(Duration::from_secs(10));
    engine.tick();
    assert_eq!(engine.time_remaining(), 1500 - 100);
}

#[test]
fn state_record_uses_documented_shape() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(T0));
    let mut engine = open(dir.path(), &clock);
    engine.start();
    drop(engine);

    let db = Database::open_in(dir.path()).unwrap();
    let raw = db.get(STATE_KEY).unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["state"], "running");
    assert_eq!(json["sessionType"], "work");
    assert_eq!(json["sessionCount"], 0);
    assert_eq!(json["totalSessions"], 0);
    assert_eq!(json["currentTaskId"], serde_json::Value::Null);
    assert_eq!(json["timeRemaining"], 1500);
}

#[test]
fn garbage_records_fall_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    {
        let db = Database::open_in(dir.path()).unwrap();
        db.set(SETTINGS_KEY, "definitely not json").unwrap();
        db.set(STATE_KEY, r#"{"state": 12, "sessionType": "nap"}"#).unwrap();
    }
    let clock = Arc::new(ManualClock::new(T0));
    let engine = open(dir.path(), &clock);
    assert_eq!(engine.settings(), &TimerSettings::default());
    assert_eq!(engine.state(), TimerState::Idle);
    assert_eq!(engine.session_type(), SessionType::Work);
}

#[test]
fn settings_record_is_merged_over_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let db = Arc::new(Database::open_in(dir.path()).unwrap());
    db.set(SETTINGS_KEY, r#"{"workDuration": 45, "soundType": "gentle", "volume": "loud"}"#)
        .unwrap();

    let mut store = SettingsStore::open(db.clone());
    let settings = store.load();
    assert_eq!(settings.work_duration, 45);
    assert_eq!(settings.sound_type, SoundType::Gentle);
    assert_eq!(settings.volume, 0.5);
    assert_eq!(settings.long_break_interval, 4);

    assert_eq!(persist::load_settings(db.as_ref()), settings);
}

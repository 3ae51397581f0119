//! Timer engine implementation.
//!
//! The timer engine is a wall-clock-based state machine. It does not use
//! internal threads - the caller is responsible for calling `tick()`
//! periodically (see [`super::driver`] for the async loop that does so).
//!
//! ## State Transitions
//!
//! ```text
//! Idle -start-> Running -pause-> Paused -start-> Running
//! Running -(remaining hits 0)-> Completed -start-> Running
//! any -reset-> Idle        any -skip-> Idle
//! ```
//!
//! Completion finalizes the session on the spot: work sessions are counted
//! and the session type is advanced to the next one before the engine
//! enters `Completed`. Starting from `Completed` therefore starts the next
//! session, and the deferred auto-start does exactly that.
//!
//! Every transition is written through to the key-value store.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::clock::{Clock, ClockAnchor, ClockTick, TimerClock};
use super::scheduler::{self, SessionType};
use crate::events::Event;
use crate::notify::Notifier;
use crate::settings::{SettingsPatch, SettingsStore, TimerSettings};
use crate::storage::{persist, KvStore, TimerSnapshot};

/// Delay between completion and the automatic start of the next session.
pub const AUTO_START_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
}

/// Read-only projection rendered by the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerView {
    pub state: TimerState,
    pub session_type: SessionType,
    pub time_remaining: u64,
    pub session_duration: u64,
    pub session_count: u32,
    pub total_sessions: u32,
    pub current_task_id: Option<String>,
    /// 0.0 ..= 100.0 progress within the current session.
    pub progress: f64,
    pub next_session_type: SessionType,
}

/// A start armed by completion, dropped by any manual transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DeferredStart {
    due_ms: u64,
}

/// Core timer engine.
pub struct TimerEngine {
    kv: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    settings: SettingsStore,
    state: TimerState,
    session_type: SessionType,
    session_count: u32,
    total_sessions: u32,
    current_task_id: Option<String>,
    timer: TimerClock,
    auto_start: Option<DeferredStart>,
}

impl TimerEngine {
    /// Create an engine, restoring whatever the store holds.
    ///
    /// A persisted `running` state only survives if it carries a remaining
    /// time; the anchor is then rebuilt from it. Otherwise it comes back as
    /// `idle`, since the elapsed time of the old process is unknown.
    pub fn new(kv: Arc<dyn KvStore>, clock: Arc<dyn Clock>, notifier: Arc<dyn Notifier>) -> Self {
        let settings = SettingsStore::open(kv.clone());
        let snapshot = persist::load_snapshot(kv.as_ref()).unwrap_or_default();
        let duration = scheduler::duration_secs(snapshot.session_type, settings.settings());
        let mut timer = TimerClock::new(duration);

        let state = match (snapshot.state, snapshot.time_remaining) {
            (TimerState::Running, Some(remaining)) => {
                timer.resume_with_remaining(clock.now_ms(), remaining);
                TimerState::Running
            }
            (TimerState::Running, None) => TimerState::Idle,
            (TimerState::Completed, _) => {
                timer.finish();
                TimerState::Completed
            }
            (other, _) => other,
        };
        tracing::debug!(?state, session_type = ?snapshot.session_type, "timer engine restored");

        Self {
            kv,
            clock,
            notifier,
            settings,
            state,
            session_type: snapshot.session_type,
            session_count: snapshot.session_count,
            total_sessions: snapshot.total_sessions,
            current_task_id: snapshot.current_task_id,
            timer,
            auto_start: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn session_type(&self) -> SessionType {
        self.session_type
    }

    pub fn session_count(&self) -> u32 {
        self.session_count
    }

    pub fn total_sessions(&self) -> u32 {
        self.total_sessions
    }

    pub fn current_task_id(&self) -> Option<&str> {
        self.current_task_id.as_deref()
    }

    pub fn settings(&self) -> &TimerSettings {
        self.settings.settings()
    }

    /// Seconds left as of the last sample.
    pub fn time_remaining(&self) -> u64 {
        self.timer.remaining_secs()
    }

    pub fn session_duration(&self) -> u64 {
        self.timer.duration_secs()
    }

    pub fn anchor(&self) -> Option<ClockAnchor> {
        self.timer.anchor()
    }

    /// Due time (epoch ms) of a pending automatic start.
    pub fn pending_auto_start(&self) -> Option<u64> {
        self.auto_start.map(|d| d.due_ms)
    }

    /// Whether `tick()` has any work to do.
    pub fn is_polling(&self) -> bool {
        self.state == TimerState::Running || self.auto_start.is_some()
    }

    pub fn next_session_type(&self) -> SessionType {
        scheduler::next_session_type(
            self.session_type,
            self.session_count,
            self.settings().long_break_interval,
        )
    }

    pub fn progress(&self) -> f64 {
        let total = self.timer.duration_secs();
        if total == 0 {
            return 0.0;
        }
        let done = total - self.timer.remaining_secs().min(total);
        done as f64 / total as f64 * 100.0
    }

    pub fn view(&self) -> TimerView {
        TimerView {
            state: self.state,
            session_type: self.session_type,
            time_remaining: self.time_remaining(),
            session_duration: self.session_duration(),
            session_count: self.session_count,
            total_sessions: self.total_sessions,
            current_task_id: self.current_task_id.clone(),
            progress: self.progress(),
            next_session_type: self.next_session_type(),
        }
    }

    /// The persisted shape of the engine.
    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            state: self.state,
            session_type: self.session_type,
            session_count: self.session_count,
            total_sessions: self.total_sessions,
            current_task_id: self.current_task_id.clone(),
            time_remaining: (self.state == TimerState::Running)
                .then(|| self.time_remaining()),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start, resume, or start the next session after completion.
    pub fn start(&mut self) -> Vec<Event> {
        let now = self.clock.now_ms();
        let mut events = self.cancel_auto_start(now);

        let event = match self.state {
            TimerState::Running => return events,
            TimerState::Paused => {
                self.timer.start(now);
                Event::TimerResumed {
                    remaining_secs: self.timer.remaining_secs(),
                    at: timestamp(now),
                }
            }
            TimerState::Idle | TimerState::Completed => {
                if self.state == TimerState::Completed {
                    // Implicit reset: completion already advanced the type.
                    self.reload_duration();
                }
                self.timer.start(now);
                Event::TimerStarted {
                    session_type: self.session_type,
                    duration_secs: self.timer.duration_secs(),
                    at: timestamp(now),
                }
            }
        };

        self.state = TimerState::Running;
        tracing::info!(session_type = ?self.session_type, remaining = self.time_remaining(), "timer running");
        self.persist();
        events.push(event);
        events
    }

    /// Same transition as `start`, only valid from `Paused`.
    pub fn resume(&mut self) -> Vec<Event> {
        if self.state != TimerState::Paused {
            return Vec::new();
        }
        self.start()
    }

    /// Freeze a running session. From `Completed` this only drops a
    /// pending auto-start.
    pub fn pause(&mut self) -> Vec<Event> {
        let now = self.clock.now_ms();
        let mut events = self.cancel_auto_start(now);
        if self.state != TimerState::Running {
            if !events.is_empty() {
                self.persist();
            }
            return events;
        }
        // The session may have run out since the last poll.
        if self.timer.sample(now) == Some(ClockTick::Finished) {
            events.extend(self.complete(now));
            return events;
        }
        self.timer.pause(now);
        self.state = TimerState::Paused;
        tracing::info!(remaining = self.time_remaining(), "timer paused");
        self.persist();
        events.push(Event::TimerPaused {
            remaining_secs: self.timer.remaining_secs(),
            at: timestamp(now),
        });
        events
    }

    /// Back to idle with the full duration of the current session type.
    pub fn reset(&mut self) -> Vec<Event> {
        let now = self.clock.now_ms();
        let mut events = self.cancel_auto_start(now);
        self.reload_duration();
        self.state = TimerState::Idle;
        tracing::info!(session_type = ?self.session_type, "timer reset");
        self.persist();
        events.push(Event::TimerReset {
            session_type: self.session_type,
            at: timestamp(now),
        });
        events
    }

    /// Move on to the next session type, counting a left work session.
    pub fn skip(&mut self) -> Vec<Event> {
        let now = self.clock.now_ms();
        let mut events = self.cancel_auto_start(now);
        let from = self.session_type;
        self.advance();
        self.reload_duration();
        self.state = TimerState::Idle;
        tracing::info!(?from, to = ?self.session_type, "session skipped");
        self.persist();
        events.push(Event::TimerSkipped {
            from,
            to: self.session_type,
            at: timestamp(now),
        });
        events
    }

    /// Call periodically. Samples the clock while running and fires a due
    /// automatic start.
    pub fn tick(&mut self) -> Vec<Event> {
        let now = self.clock.now_ms();
        match self.state {
            TimerState::Running => {
                let before = self.timer.remaining_secs();
                match self.timer.sample(now) {
                    Some(ClockTick::Finished) => self.complete(now),
                    Some(ClockTick::Remaining(remaining)) => {
                        if remaining != before {
                            self.persist();
                        }
                        Vec::new()
                    }
                    None => Vec::new(),
                }
            }
            TimerState::Completed => match self.auto_start {
                Some(deferred) if now >= deferred.due_ms => {
                    self.auto_start = None;
                    tracing::info!("auto-starting next session");
                    self.start()
                }
                _ => Vec::new(),
            },
            TimerState::Idle | TimerState::Paused => Vec::new(),
        }
    }

    /// Associate an opaque task id with the session. Stored verbatim.
    pub fn set_task(&mut self, task_id: Option<String>) -> Vec<Event> {
        self.current_task_id = task_id;
        self.persist();
        vec![Event::TaskChanged {
            task_id: self.current_task_id.clone(),
            at: timestamp(self.clock.now_ms()),
        }]
    }

    pub fn update_settings(&mut self, patch: &SettingsPatch) -> Vec<Event> {
        self.settings.update(patch);
        self.settings_changed()
    }

    pub fn reset_settings(&mut self) -> Vec<Event> {
        self.settings.reset();
        self.settings_changed()
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn settings_changed(&mut self) -> Vec<Event> {
        let now = self.clock.now_ms();
        let mut events = Vec::new();
        if !self.settings().auto_start_next_session {
            events.extend(self.cancel_auto_start(now));
        }

        let duration = scheduler::duration_secs(self.session_type, self.settings());
        match self.state {
            TimerState::Idle | TimerState::Completed => self.timer.reset(duration),
            TimerState::Running | TimerState::Paused => self.timer.set_duration(duration),
        }
        self.persist();
        events.push(Event::SettingsChanged {
            settings: self.settings().clone(),
            at: timestamp(now),
        });
        events
    }

    /// Finalize the running session and enter `Completed`.
    fn complete(&mut self, now: u64) -> Vec<Event> {
        let finished = self.session_type;
        self.advance();
        self.reload_duration();
        self.timer.finish();
        self.state = TimerState::Completed;
        tracing::info!(?finished, next = ?self.session_type, total = self.total_sessions, "session completed");

        let settings = self.settings().clone();
        if settings.sound_enabled {
            self.notifier.notify(settings.sound_type, settings.volume);
        }

        let mut events = vec![Event::TimerCompleted {
            session_type: finished,
            next_session_type: self.session_type,
            session_count: self.session_count,
            total_sessions: self.total_sessions,
            at: timestamp(now),
        }];
        if settings.auto_start_next_session {
            let due_ms = now + AUTO_START_DELAY.as_millis() as u64;
            self.auto_start = Some(DeferredStart { due_ms });
            events.push(Event::AutoStartScheduled {
                due_epoch_ms: due_ms,
                at: timestamp(now),
            });
        }
        self.persist();
        events
    }

    /// Step the session type forward, counting the work session being left.
    fn advance(&mut self) {
        let left = self.session_type;
        self.session_type = self.next_session_type();
        if left.is_work() {
            self.session_count += 1;
            self.total_sessions += 1;
        }
    }

    fn reload_duration(&mut self) {
        let duration = scheduler::duration_secs(self.session_type, self.settings());
        self.timer.reset(duration);
    }

    fn cancel_auto_start(&mut self, now: u64) -> Vec<Event> {
        match self.auto_start.take() {
            Some(_) => {
                tracing::debug!("pending auto-start cancelled");
                vec![Event::AutoStartCancelled { at: timestamp(now) }]
            }
            None => Vec::new(),
        }
    }

    fn persist(&self) {
        debug_assert!(self.timer.remaining_secs() <= self.timer.duration_secs());
        persist::save_snapshot(self.kv.as_ref(), &self.snapshot());
    }
}

fn timestamp(now_ms: u64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(now_ms as i64).unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::clock::ManualClock;
    use crate::settings::SoundType;
    use crate::storage::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const T0: u64 = 1_700_000_000_000;

    #[derive(Default)]
    struct CountingNotifier(AtomicUsize);

    impl Notifier for CountingNotifier {
        fn notify(&self, _sound: SoundType, _volume: f32) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Harness {
        kv: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        notifier: Arc<CountingNotifier>,
        engine: TimerEngine,
    }

    impl Harness {
        fn new() -> Self {
            let kv = Arc::new(MemoryStore::new());
            let clock = Arc::new(ManualClock::new(T0));
            let notifier = Arc::new(CountingNotifier::default());
            let engine = TimerEngine::new(kv.clone(), clock.clone(), notifier.clone());
            Self { kv, clock, notifier, engine }
        }

        fn reopen(&self) -> TimerEngine {
            TimerEngine::new(self.kv.clone(), self.clock.clone(), self.notifier.clone())
        }

        fn run_for(&mut self, secs: u64) -> Vec<Event> {
            self.clock.advance(Duration::from_secs(secs));
            self.engine.tick()
        }
    }

    #[test]
    fn start_pause_resume() {
        let mut h = Harness::new();
        assert_eq!(h.engine.state(), TimerState::Idle);

        assert!(!h.engine.start().is_empty());
        assert_eq!(h.engine.state(), TimerState::Running);
        assert_eq!(h.engine.time_remaining(), 25 * 60);

        h.run_for(10);
        assert!(!h.engine.pause().is_empty());
        assert_eq!(h.engine.state(), TimerState::Paused);
        assert_eq!(h.engine.time_remaining(), 25 * 60 - 10);

        let events = h.engine.resume();
        assert!(matches!(
            events.as_slice(),
            [Event::TimerResumed { remaining_secs: 1490, .. }]
        ));
        assert_eq!(h.engine.state(), TimerState::Running);
    }

    #[test]
    fn start_while_running_is_noop() {
        let mut h = Harness::new();
        h.engine.start();
        assert!(h.engine.start().is_empty());
        assert!(h.engine.pause().len() == 1);
        assert!(h.engine.pause().is_empty());
    }

    #[test]
    fn skip_counts_only_work_sessions() {
        let mut h = Harness::new();
        h.engine.skip();
        assert_eq!(h.engine.session_type(), SessionType::ShortBreak);
        assert_eq!(h.engine.session_count(), 1);
        h.engine.skip();
        assert_eq!(h.engine.session_type(), SessionType::Work);
        assert_eq!(h.engine.session_count(), 1);
        assert_eq!(h.engine.time_remaining(), 25 * 60);
    }

    #[test]
    fn reset_reloads_current_session() {
        let mut h = Harness::new();
        h.engine.skip();
        h.engine.start();
        h.run_for(120);
        h.engine.reset();
        assert_eq!(h.engine.state(), TimerState::Idle);
        assert_eq!(h.engine.session_type(), SessionType::ShortBreak);
        assert_eq!(h.engine.time_remaining(), 5 * 60);
        assert!(h.engine.anchor().is_none());
    }

    #[test]
    fn pause_after_silent_expiry_completes() {
        let mut h = Harness::new();
        h.engine.start();
        h.clock.advance(Duration::from_secs(26 * 60));
        let events = h.engine.pause();
        assert!(matches!(events[0], Event::TimerCompleted { .. }));
        assert_eq!(h.engine.state(), TimerState::Completed);
    }

    #[test]
    fn completion_notifies_only_when_sound_enabled() {
        let mut h = Harness::new();
        h.engine.update_settings(&SettingsPatch {
            sound_enabled: Some(false),
            work_duration: Some(1),
            ..SettingsPatch::default()
        });
        h.engine.start();
        h.run_for(60);
        assert_eq!(h.engine.state(), TimerState::Completed);
        assert_eq!(h.notifier.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn progress_tracks_elapsed_fraction() {
        let mut h = Harness::new();
        h.engine.start();
        h.run_for(15 * 60);
        assert!((h.engine.progress() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn settings_change_while_idle_reloads_duration() {
        let mut h = Harness::new();
        h.engine.skip();
        h.engine.update_settings(&SettingsPatch {
            short_break_duration: Some(8),
            ..SettingsPatch::default()
        });
        assert_eq!(h.engine.time_remaining(), 8 * 60);
    }

    #[test]
    fn settings_change_while_completed_reloads_upcoming_duration() {
        let mut h = Harness::new();
        h.engine.start();
        h.run_for(25 * 60);
        assert_eq!(h.engine.state(), TimerState::Completed);
        assert_eq!(h.engine.time_remaining(), 0);

        h.engine.update_settings(&SettingsPatch {
            short_break_duration: Some(10),
            ..SettingsPatch::default()
        });
        assert_eq!(h.engine.state(), TimerState::Completed);
        assert_eq!(h.engine.session_type(), SessionType::ShortBreak);
        assert_eq!(h.engine.time_remaining(), 10 * 60);
        assert_eq!(h.engine.session_count(), 1);
    }

    #[test]
    fn shrinking_running_session_completes_on_next_tick() {
        let mut h = Harness::new();
        h.engine.start();
        h.run_for(5 * 60);
        h.engine.update_settings(&SettingsPatch {
            work_duration: Some(3),
            ..SettingsPatch::default()
        });
        let events = h.engine.tick();
        assert!(matches!(events[0], Event::TimerCompleted { .. }));
    }

    #[test]
    fn snapshot_includes_remaining_only_while_running() {
        let mut h = Harness::new();
        assert_eq!(h.engine.snapshot().time_remaining, None);
        h.engine.start();
        h.run_for(1);
        assert_eq!(h.engine.snapshot().time_remaining, Some(25 * 60 - 1));
        h.engine.pause();
        assert_eq!(h.engine.snapshot().time_remaining, None);
    }

    #[test]
    fn persisted_running_state_resumes_from_remaining() {
        let mut h = Harness::new();
        h.engine.start();
        h.run_for(100);
        h.clock.advance(Duration::from_secs(3600));
        let restored = h.reopen();
        assert_eq!(restored.state(), TimerState::Running);
        assert_eq!(restored.time_remaining(), 25 * 60 - 100);
        assert!(restored.anchor().is_some());
    }

    #[test]
    fn persisted_running_without_remaining_becomes_idle() {
        let h = Harness::new();
        h.kv
            .set(persist::STATE_KEY, r#"{"state":"running","sessionType":"longBreak"}"#)
            .unwrap();
        let restored = h.reopen();
        assert_eq!(restored.state(), TimerState::Idle);
        assert_eq!(restored.session_type(), SessionType::LongBreak);
        assert_eq!(restored.time_remaining(), 15 * 60);
    }

    #[test]
    fn task_id_is_stored_verbatim() {
        let mut h = Harness::new();
        h.engine.set_task(Some("  task/ü 42 ".into()));
        assert_eq!(h.reopen().current_task_id(), Some("  task/ü 42 "));
        h.engine.set_task(None);
        assert_eq!(h.reopen().current_task_id(), None);
    }

    #[test]
    fn view_reports_next_session_type() {
        let mut h = Harness::new();
        for _ in 0..6 {
            h.engine.skip();
        }
        // Three work sessions done, back on work.
        let view = h.engine.view();
        assert_eq!(view.session_type, SessionType::Work);
        assert_eq!(view.next_session_type, SessionType::LongBreak);
        assert_eq!(view.progress, 0.0);
    }
}

//! Async poll loop around a [`TimerEngine`].
//!
//! One driver owns one engine. A single `tokio::time::interval` ticks the
//! engine, and only while it is running or waiting to auto-start; commands
//! arrive over a channel and are applied in the same `select!` loop, so a
//! tick can never interleave with a transition.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::engine::{TimerEngine, TimerView};
use crate::events::Event;
use crate::settings::SettingsPatch;

/// Default cadence of remaining-time samples.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// User actions forwarded to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum TimerCommand {
    Start,
    Pause,
    Resume,
    Reset,
    Skip,
    SetTask(Option<String>),
    UpdateSettings(SettingsPatch),
    ResetSettings,
}

/// Cloneable front end of a running driver.
#[derive(Clone)]
pub struct TimerHandle {
    commands: mpsc::Sender<TimerCommand>,
    view: watch::Receiver<TimerView>,
    events: broadcast::Sender<Event>,
}

impl TimerHandle {
    /// Queue a command. Returns `false` once the driver has stopped.
    pub async fn send(&self, command: TimerCommand) -> bool {
        self.commands.send(command).await.is_ok()
    }

    /// Latest published view.
    pub fn view(&self) -> TimerView {
        self.view.borrow().clone()
    }

    /// Receiver that is notified whenever the view changes.
    pub fn watch(&self) -> watch::Receiver<TimerView> {
        self.view.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }
}

pub struct TimerDriver {
    engine: TimerEngine,
    poll_interval: Duration,
    commands: mpsc::Receiver<TimerCommand>,
    view_tx: watch::Sender<TimerView>,
    events_tx: broadcast::Sender<Event>,
}

impl TimerDriver {
    pub fn new(engine: TimerEngine) -> (Self, TimerHandle) {
        Self::with_poll_interval(engine, POLL_INTERVAL)
    }

    pub fn with_poll_interval(engine: TimerEngine, poll_interval: Duration) -> (Self, TimerHandle) {
        let (commands_tx, commands) = mpsc::channel(32);
        let (view_tx, view_rx) = watch::channel(engine.view());
        let (events_tx, _) = broadcast::channel(64);
        let handle = TimerHandle {
            commands: commands_tx,
            view: view_rx,
            events: events_tx.clone(),
        };
        let driver = Self {
            engine,
            poll_interval,
            commands,
            view_tx,
            events_tx,
        };
        (driver, handle)
    }

    /// Run until every [`TimerHandle`] is dropped, then hand the engine back.
    pub async fn run(mut self) -> TimerEngine {
        info!(interval_ms = self.poll_interval.as_millis() as u64, "timer driver started");
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let polling = self.engine.is_polling();
            tokio::select! {
                _ = interval.tick(), if polling => {
                    let events = self.engine.tick();
                    self.publish(events);
                }
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    debug!(?command, "timer command");
                    let was_polling = self.engine.is_polling();
                    let events = self.apply(command);
                    if !was_polling && self.engine.is_polling() {
                        // Fresh poll loop: first sample one interval from now.
                        interval.reset();
                    }
                    self.publish(events);
                }
            }
        }

        info!("timer driver stopped");
        self.engine
    }

    fn apply(&mut self, command: TimerCommand) -> Vec<Event> {
        match command {
            TimerCommand::Start => self.engine.start(),
            TimerCommand::Pause => self.engine.pause(),
            TimerCommand::Resume => self.engine.resume(),
            TimerCommand::Reset => self.engine.reset(),
            TimerCommand::Skip => self.engine.skip(),
            TimerCommand::SetTask(task_id) => self.engine.set_task(task_id),
            TimerCommand::UpdateSettings(patch) => self.engine.update_settings(&patch),
            TimerCommand::ResetSettings => self.engine.reset_settings(),
        }
    }

    fn publish(&self, events: Vec<Event>) {
        for event in events {
            // No subscribers is fine.
            let _ = self.events_tx.send(event);
        }
        self.view_tx.send_if_modified(|view| {
            let next = self.engine.view();
            if *view == next {
                return false;
            }
            *view = next;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Notifier;
    use crate::settings::SoundType;
    use crate::storage::MemoryStore;
    use crate::timer::{ManualClock, SessionType, TimerState};
    use std::sync::Arc;

    struct Silent;

    impl Notifier for Silent {
        fn notify(&self, _sound: SoundType, _volume: f32) {}
    }

    fn driver() -> (TimerDriver, TimerHandle, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let engine = TimerEngine::new(Arc::new(MemoryStore::new()), clock.clone(), Arc::new(Silent));
        let (driver, handle) = TimerDriver::new(engine);
        (driver, handle, clock)
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_view_after_commands() {
        let (driver, handle, _clock) = driver();
        let task = tokio::spawn(driver.run());

        assert!(handle.send(TimerCommand::Skip).await);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(handle.view().session_type, SessionType::ShortBreak);

        drop(handle);
        let engine = task.await.unwrap();
        assert_eq!(engine.session_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn polls_running_engine_to_completion() {
        let (driver, handle, clock) = driver();
        let mut events = handle.subscribe();
        let task = tokio::spawn(driver.run());

        handle.send(TimerCommand::Start).await;
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(handle.view().state, TimerState::Running);

        clock.advance(Duration::from_secs(25 * 60));
        tokio::time::sleep(Duration::from_millis(250)).await;
        let view = handle.view();
        assert_eq!(view.state, TimerState::Completed);
        assert_eq!(view.session_count, 1);

        let mut saw_completed = false;
        while let Ok(event) = events.try_recv() {
            saw_completed |= matches!(event, Event::TimerCompleted { .. });
        }
        assert!(saw_completed);

        drop(handle);
        task.await.unwrap();
    }
}

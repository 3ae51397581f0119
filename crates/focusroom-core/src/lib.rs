//! # Focusroom Core Library
//!
//! This library provides the core logic for the Focusroom focus-session
//! timer. All operations are available through the standalone CLI binary,
//! which is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A wall-clock-anchored state machine that requires the
//!   caller to periodically invoke `tick()` for progress updates
//! - **Session Scheduler**: Pure functions deciding the work/break sequence
//! - **Storage**: Key-value persistence of settings and timer state, backed
//!   by SQLite for the CLI
//! - **Notifications**: Completion sound and desktop notification
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`TimerDriver`]: Async poll loop that owns an engine
//! - [`SettingsStore`]: Validated, persisted settings
//! - [`Database`]: SQLite-backed [`KvStore`]

pub mod error;
pub mod events;
pub mod notify;
pub mod settings;
pub mod storage;
pub mod timer;

pub use error::{CoreError, NotifyError, StorageError};
pub use events::Event;
pub use notify::{NotificationDispatcher, Notifier};
pub use settings::{SettingsPatch, SettingsStore, SoundType, TimerSettings};
pub use storage::{Database, KvStore, MemoryStore, TimerSnapshot};
pub use timer::{
    Clock, ManualClock, SessionType, SystemClock, TimerCommand, TimerDriver, TimerEngine,
    TimerHandle, TimerState, TimerView,
};

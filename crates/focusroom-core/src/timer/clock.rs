//! Wall-clock anchored countdown.
//!
//! Remaining time is always derived from the anchor (`now - start`), never
//! decremented per tick, so a late or skipped poll corrects itself on the
//! next sample.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Source of "now" in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// The real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        chrono::Utc::now().timestamp_millis().max(0) as u64
    }
}

/// A clock that only moves when told to. Used by tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(start_ms),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// Anchor of the current run. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockAnchor {
    pub start_epoch_ms: u64,
    pub paused_elapsed_secs: u64,
}

/// Result of sampling a running clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockTick {
    Remaining(u64),
    /// Reported once, on the sample that reaches zero.
    Finished,
}

#[derive(Debug, Clone)]
pub struct TimerClock {
    duration_secs: u64,
    remaining_secs: u64,
    start_epoch_ms: Option<u64>,
    paused_elapsed_secs: u64,
}

impl TimerClock {
    pub fn new(duration_secs: u64) -> Self {
        Self {
            duration_secs,
            remaining_secs: duration_secs,
            start_epoch_ms: None,
            paused_elapsed_secs: 0,
        }
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn is_running(&self) -> bool {
        self.start_epoch_ms.is_some()
    }

    pub fn anchor(&self) -> Option<ClockAnchor> {
        self.start_epoch_ms.map(|start_epoch_ms| ClockAnchor {
            start_epoch_ms,
            paused_elapsed_secs: self.paused_elapsed_secs,
        })
    }

    /// Anchor at `now`, continuing from any frozen elapsed time.
    pub fn start(&mut self, now_ms: u64) {
        self.start_epoch_ms = Some(now_ms.saturating_sub(self.paused_elapsed_secs * 1000));
    }

    /// Rebuild the anchor from a remaining-time value that was saved while
    /// the clock was running.
    pub fn resume_with_remaining(&mut self, now_ms: u64, remaining_secs: u64) {
        let remaining_secs = remaining_secs.min(self.duration_secs);
        self.paused_elapsed_secs = self.duration_secs - remaining_secs;
        self.remaining_secs = remaining_secs;
        self.start(now_ms);
    }

    /// Freeze elapsed time and drop the anchor.
    pub fn pause(&mut self, now_ms: u64) {
        if let Some(start) = self.start_epoch_ms.take() {
            let elapsed = elapsed_secs(start, now_ms).min(self.duration_secs);
            self.paused_elapsed_secs = elapsed;
            self.remaining_secs = self.duration_secs - elapsed;
        }
    }

    /// Clear the anchor and reload the full duration.
    pub fn reset(&mut self, duration_secs: u64) {
        self.duration_secs = duration_secs;
        self.remaining_secs = duration_secs;
        self.start_epoch_ms = None;
        self.paused_elapsed_secs = 0;
    }

    /// Drop the anchor and pin remaining time at zero.
    pub fn finish(&mut self) {
        self.start_epoch_ms = None;
        self.paused_elapsed_secs = self.duration_secs;
        self.remaining_secs = 0;
    }

    /// Change the session length in place; the anchor is kept.
    pub fn set_duration(&mut self, duration_secs: u64) {
        self.duration_secs = duration_secs;
        self.paused_elapsed_secs = self.paused_elapsed_secs.min(duration_secs);
        self.remaining_secs = if self.is_running() {
            self.remaining_secs.min(duration_secs)
        } else {
            duration_secs - self.paused_elapsed_secs
        };
    }

    /// Recompute remaining time from the anchor. `None` when not running.
    ///
    /// Remaining time never increases between samples, even if the wall
    /// clock steps backwards.
    pub fn sample(&mut self, now_ms: u64) -> Option<ClockTick> {
        let start = self.start_epoch_ms?;
        let computed = self
            .duration_secs
            .saturating_sub(elapsed_secs(start, now_ms));
        self.remaining_secs = computed.min(self.remaining_secs);
        if self.remaining_secs == 0 {
            self.finish();
            return Some(ClockTick::Finished);
        }
        Some(ClockTick::Remaining(self.remaining_secs))
    }
}

fn elapsed_secs(start_ms: u64, now_ms: u64) -> u64 {
    now_ms.saturating_sub(start_ms) / 1000
}

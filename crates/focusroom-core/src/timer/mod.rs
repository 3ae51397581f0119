pub mod clock;
pub mod driver;
mod engine;
pub mod scheduler;

pub use clock::{Clock, ClockAnchor, ClockTick, ManualClock, SystemClock, TimerClock};
pub use driver::{TimerCommand, TimerDriver, TimerHandle, POLL_INTERVAL};
pub use engine::{TimerEngine, TimerState, TimerView, AUTO_START_DELAY};
pub use scheduler::{duration_secs, next_session_type, SessionType};

use clap::Subcommand;
use focusroom_core::Event;

use super::Context;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start the current session, or the next one after a completion
    Start,
    /// Pause the running session
    Pause,
    /// Resume a paused session
    Resume,
    /// Reset the current session to its full duration
    Reset,
    /// Skip to the next session
    Skip,
    /// Print current timer state as JSON
    Status,
    /// Associate the timer with a task
    Task {
        /// Task ID to track
        #[arg(required_unless_present = "clear")]
        id: Option<String>,
        /// Clear the current task
        #[arg(long, conflicts_with = "id")]
        clear: bool,
    },
}

fn log_events(events: &[Event]) {
    for event in events {
        tracing::info!(?event, "timer event");
    }
}

pub fn run(ctx: &Context, action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = ctx.open_engine()?;
    // Pick up a completion that is already due before acting on it.
    log_events(&engine.tick());

    let events = match action {
        TimerAction::Start => engine.start(),
        TimerAction::Pause => engine.pause(),
        TimerAction::Resume => engine.resume(),
        TimerAction::Reset => engine.reset(),
        TimerAction::Skip => engine.skip(),
        TimerAction::Status => Vec::new(),
        TimerAction::Task { id, clear } => engine.set_task(if clear { None } else { id }),
    };
    log_events(&events);

    println!("{}", serde_json::to_string_pretty(&engine.view())?);
    Ok(())
}

use std::time::Duration;

use focusroom_core::{Event, TimerCommand, TimerDriver, TimerState, TimerView};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::Context;

const RENDER_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, PartialEq)]
enum Input {
    Command(TimerCommand),
    Quit,
}

fn parse_input(line: &str) -> Option<Input> {
    let input = match line.trim() {
        "s" | "start" => Input::Command(TimerCommand::Start),
        "p" | "pause" => Input::Command(TimerCommand::Pause),
        "r" | "reset" => Input::Command(TimerCommand::Reset),
        "k" | "skip" => Input::Command(TimerCommand::Skip),
        "q" | "quit" => Input::Quit,
        _ => return None,
    };
    Some(input)
}

fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn render(view: &TimerView) -> String {
    let state = match view.state {
        TimerState::Idle => "idle",
        TimerState::Running => "running",
        TimerState::Paused => "paused",
        TimerState::Completed => "done",
    };
    format!(
        "{:<12} {}  [{state}]  sessions {}/{}",
        view.session_type.label(),
        format_clock(view.time_remaining),
        view.session_count,
        view.total_sessions,
    )
}

fn describe(event: &Event) -> Option<String> {
    match event {
        Event::TimerCompleted {
            session_type,
            next_session_type,
            ..
        } => Some(format!(
            "{} complete, next up: {}",
            session_type.label(),
            next_session_type.label()
        )),
        Event::AutoStartScheduled { .. } => Some("next session starts in 3 seconds".into()),
        _ => None,
    }
}

pub fn run(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let engine = ctx.open_engine()?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_loop(engine))
}

async fn run_loop(engine: focusroom_core::TimerEngine) -> Result<(), Box<dyn std::error::Error>> {
    let (driver, handle) = TimerDriver::new(engine);
    let driver_task = tokio::spawn(driver.run());
    let mut events = handle.subscribe();

    println!("commands: s start/resume, p pause, r reset, k skip, q quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(RENDER_INTERVAL);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                println!("{}", render(&handle.view()));
            }
            Ok(event) = events.recv() => {
                if let Some(message) = describe(&event) {
                    println!("{message}");
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_input(&line) {
                    Some(Input::Quit) => break,
                    Some(Input::Command(command)) => {
                        if !handle.send(command).await {
                            break;
                        }
                    }
                    None if line.trim().is_empty() => {}
                    None => eprintln!("unknown command: {}", line.trim()),
                }
            }
        }
    }

    drop(handle);
    let engine = driver_task.await?;
    println!("{}", render(&engine.view()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_letter_commands() {
        assert_eq!(parse_input("s"), Some(Input::Command(TimerCommand::Start)));
        assert_eq!(parse_input(" p \n"), Some(Input::Command(TimerCommand::Pause)));
        assert_eq!(parse_input("r"), Some(Input::Command(TimerCommand::Reset)));
        assert_eq!(parse_input("k"), Some(Input::Command(TimerCommand::Skip)));
        assert_eq!(parse_input("quit"), Some(Input::Quit));
        assert_eq!(parse_input("x"), None);
    }

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_clock(1500), "25:00");
        assert_eq!(format_clock(61), "01:01");
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(3600), "60:00");
    }
}

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "focusroom", version, about = "Focusroom focus-session timer")]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding the focusroom database
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Timer control
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Settings management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Completion notification permission
    Notify {
        #[command(subcommand)]
        action: commands::notify::NotifyAction,
    },
    /// Run the timer in the foreground
    Run,
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "focusroom_core=debug,focusroom=debug"
        } else {
            "focusroom_core=warn,focusroom=warn"
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let ctx = commands::Context {
        data_dir: cli.data_dir,
    };
    let result = match cli.command {
        Commands::Timer { action } => commands::timer::run(&ctx, action),
        Commands::Config { action } => commands::config::run(&ctx, action),
        Commands::Notify { action } => commands::notify::run(&ctx, action),
        Commands::Run => commands::run::run(&ctx),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

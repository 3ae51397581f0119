use clap::Subcommand;
use focusroom_core::{CoreError, SettingsStore, TimerSettings};

use super::Context;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a settings value
    Get {
        /// Settings key (e.g. "workDuration", "soundType")
        key: String,
    },
    /// Set a settings value; out-of-range values are clamped
    Set {
        /// Settings key
        key: String,
        /// New value
        value: String,
    },
    /// List all settings
    List,
    /// Reset settings to defaults
    Reset,
}

pub fn run(ctx: &Context, action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let store = SettingsStore::open(ctx.open_db()?);
            let value = store
                .settings()
                .get(&key)
                .ok_or(CoreError::UnknownSettingsKey(key))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let patch = TimerSettings::patch_for(&key, &value)?;
            if patch.is_empty() {
                return Err(format!("invalid value for {key}: {value}").into());
            }
            // Through the engine so a stopped timer picks up the new duration.
            let mut engine = ctx.open_engine()?;
            engine.tick();
            engine.update_settings(&patch);
            let stored = engine.settings().get(&key).unwrap_or_default();
            println!("{key} = {stored}");
        }
        ConfigAction::List => {
            let store = SettingsStore::open(ctx.open_db()?);
            let settings = store.settings();
            for key in TimerSettings::KEYS {
                if let Some(value) = settings.get(key) {
                    println!("{key} = {value}");
                }
            }
        }
        ConfigAction::Reset => {
            let mut engine = ctx.open_engine()?;
            engine.tick();
            engine.reset_settings();
            println!("settings reset to defaults");
        }
    }
    Ok(())
}

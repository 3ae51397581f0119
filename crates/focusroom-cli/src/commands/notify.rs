use clap::Subcommand;
use focusroom_core::storage::persist;
use focusroom_core::{NotificationDispatcher, Notifier, SettingsStore};

use super::Context;

#[derive(Subcommand)]
pub enum NotifyAction {
    /// Allow desktop notifications on session completion
    Grant,
    /// Disallow desktop notifications
    Revoke,
    /// Play the configured sound and show a notification now
    Test,
}

pub fn run(ctx: &Context, action: NotifyAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = ctx.open_db()?;
    match action {
        NotifyAction::Grant => {
            persist::set_notifications_granted(db.as_ref(), true);
            println!("desktop notifications enabled");
        }
        NotifyAction::Revoke => {
            persist::set_notifications_granted(db.as_ref(), false);
            println!("desktop notifications disabled");
        }
        NotifyAction::Test => {
            let granted = persist::notifications_granted(db.as_ref());
            let settings = SettingsStore::open(db).settings().clone();
            NotificationDispatcher::desktop(granted).notify(settings.sound_type, settings.volume);
            if !granted {
                println!("desktop notifications are disabled; run `focusroom notify grant`");
            }
        }
    }
    Ok(())
}

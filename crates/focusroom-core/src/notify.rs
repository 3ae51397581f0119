//! Completion side effects: a sound and a desktop notification.
//!
//! Both channels are best effort. The dispatcher logs failures and returns
//! normally so that entering the completed state is never held up.

use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

use notify_rust::{Notification, Urgency};

use crate::error::NotifyError;
use crate::settings::SoundType;

pub const NOTIFICATION_TITLE: &str = "Session Complete!";
pub const NOTIFICATION_BODY: &str = "Your Pomodoro session has ended. Take a break!";

/// What the engine calls when a session completes with sound enabled.
pub trait Notifier: Send + Sync {
    fn notify(&self, sound: SoundType, volume: f32);
}

/// Audio output channel.
pub trait SoundPlayer: Send + Sync {
    fn play(&self, asset: &Path, volume: f32) -> Result<(), NotifyError>;
}

/// System notification channel.
pub trait SystemNotifier: Send + Sync {
    /// Whether the user has allowed notifications on this host.
    fn permission_granted(&self) -> bool;
    fn show(&self, title: &str, body: &str) -> Result<(), NotifyError>;
}

/// Sound file played for each [`SoundType`].
pub fn sound_asset(sound: SoundType) -> &'static Path {
    Path::new(match sound {
        SoundType::Bell => "/usr/share/sounds/freedesktop/stereo/bell.oga",
        SoundType::Chime => "/usr/share/sounds/freedesktop/stereo/complete.oga",
        SoundType::Gentle => "/usr/share/sounds/freedesktop/stereo/message.oga",
        SoundType::Digital => "/usr/share/sounds/freedesktop/stereo/alarm-clock-elapsed.oga",
    })
}

pub struct NotificationDispatcher {
    sound: Box<dyn SoundPlayer>,
    system: Box<dyn SystemNotifier>,
}

impl NotificationDispatcher {
    pub fn new(sound: Box<dyn SoundPlayer>, system: Box<dyn SystemNotifier>) -> Self {
        Self { sound, system }
    }

    /// Dispatcher wired to the host audio player and desktop notifications.
    pub fn desktop(notifications_granted: bool) -> Self {
        Self::new(
            Box::new(CommandSoundPlayer),
            Box::new(DesktopNotifier::new(notifications_granted)),
        )
    }
}

impl Notifier for NotificationDispatcher {
    fn notify(&self, sound: SoundType, volume: f32) {
        let volume = if volume.is_finite() { volume.clamp(0.0, 1.0) } else { 0.0 };
        let asset = sound_asset(sound);
        if let Err(e) = self.sound.play(asset, volume) {
            tracing::warn!(sound = %sound, error = %e, "failed to play notification sound");
        }

        if !self.system.permission_granted() {
            tracing::debug!("system notifications not permitted, skipping");
            return;
        }
        if let Err(e) = self.system.show(NOTIFICATION_TITLE, NOTIFICATION_BODY) {
            tracing::warn!(error = %e, "failed to show system notification");
        }
    }
}

/// Plays sounds by spawning `paplay`, falling back to `aplay`.
///
/// The player runs detached; this returns as soon as it has been spawned.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandSoundPlayer;

impl CommandSoundPlayer {
    /// PulseAudio volume scale: 65536 is 100%.
    fn paplay_volume(volume: f32) -> u32 {
        (volume.clamp(0.0, 1.0) * 65536.0).round() as u32
    }

    fn spawn(program: &str, args: &[String]) -> io::Result<()> {
        let mut child = Command::new(program)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        // Reap the player once it exits so long sessions leave no zombies.
        std::thread::spawn(move || {
            if let Err(e) = child.wait() {
                tracing::debug!(error = %e, "sound player wait failed");
            }
        });
        Ok(())
    }
}

impl SoundPlayer for CommandSoundPlayer {
    fn play(&self, asset: &Path, volume: f32) -> Result<(), NotifyError> {
        if !asset.exists() {
            return Err(NotifyError::AssetMissing(asset.to_path_buf()));
        }
        let file = asset.display().to_string();
        let paplay_args = [
            format!("--volume={}", Self::paplay_volume(volume)),
            file.clone(),
        ];
        match Self::spawn("paplay", &paplay_args) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("paplay not found, trying aplay");
                Self::spawn("aplay", &[file]).map_err(NotifyError::Player)
            }
            Err(e) => Err(NotifyError::Player(e)),
        }
    }
}

/// Desktop notifications through the platform notification service.
#[derive(Debug, Clone, Copy)]
pub struct DesktopNotifier {
    granted: bool,
}

impl DesktopNotifier {
    pub fn new(granted: bool) -> Self {
        Self { granted }
    }
}

impl SystemNotifier for DesktopNotifier {
    fn permission_granted(&self) -> bool {
        self.granted
    }

    fn show(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        Notification::new()
            .summary(title)
            .body(body)
            .appname("focusroom")
            .icon("alarm-clock")
            .urgency(Urgency::Normal)
            .show()
            .map(|_| ())
            .map_err(|e| NotifyError::Desktop(e.to_string()))
    }
}

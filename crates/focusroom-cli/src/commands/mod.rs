pub mod config;
pub mod notify;
pub mod run;
pub mod timer;

use std::path::PathBuf;
use std::sync::Arc;

use focusroom_core::storage::persist;
use focusroom_core::{Database, NotificationDispatcher, StorageError, SystemClock, TimerEngine};

/// Options shared by every subcommand.
pub struct Context {
    pub data_dir: Option<PathBuf>,
}

impl Context {
    pub fn open_db(&self) -> Result<Arc<Database>, StorageError> {
        let db = match &self.data_dir {
            Some(dir) => Database::open_in(dir)?,
            None => Database::open()?,
        };
        tracing::debug!(path = ?db.path(), "opened database");
        Ok(Arc::new(db))
    }

    /// Engine restored from the database, wired to the real clock and
    /// desktop notifications.
    pub fn open_engine(&self) -> Result<TimerEngine, StorageError> {
        let db = self.open_db()?;
        let granted = persist::notifications_granted(db.as_ref());
        Ok(TimerEngine::new(
            db,
            Arc::new(SystemClock),
            Arc::new(NotificationDispatcher::desktop(granted)),
        ))
    }
}

//! File-based progress store.
//!
//! Records are stored as one JSON document per user under
//! `~/.laurel/users/`. Writes are atomic via the temp file + rename
//! pattern. The transactional read-modify-write contract is provided by an
//! in-process commit lock: commits are serialized, and the body still
//! re-reads the live document inside the lock, so the re-validation step
//! the engine depends on is preserved. Cross-process writers are outside
//! this backend's contract.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::config::users_dir;
use crate::error::{LaurelError, Result};
use crate::store::record::{ProgressRecord, RecordUpdate};
use crate::store::traits::{ProgressStore, Subscription, TxSummary, WatcherHub};

/// File-based progress store.
pub struct FileProgressStore {
    users_dir: PathBuf,
    hub: Arc<WatcherHub>,
    commit_lock: Mutex<()>,
}

impl FileProgressStore {
    /// Create a store using the default users directory
    /// (`~/.laurel/users/` or `$LAUREL_HOME/users/`).
    pub fn new() -> Result<Self> {
        let dir = users_dir().ok_or_else(|| {
            LaurelError::config("Could not determine users directory (no home directory)")
        })?;
        Self::with_dir(dir)
    }

    /// Create a store using a custom directory.
    pub fn with_dir(users_dir: impl Into<PathBuf>) -> Result<Self> {
        let users_dir = users_dir.into();

        if !users_dir.exists() {
            fs::create_dir_all(&users_dir).map_err(|e| LaurelError::storage(&users_dir, e))?;
        }

        Ok(Self {
            users_dir,
            hub: WatcherHub::new(),
            commit_lock: Mutex::new(()),
        })
    }

    /// Get the path for a user's record file.
    fn record_path(&self, user_id: &str) -> PathBuf {
        self.users_dir.join(format!("{}.json", user_id))
    }

    /// Get the path for a temp file used during atomic writes.
    fn temp_path(&self, user_id: &str) -> PathBuf {
        self.users_dir.join(format!(".{}.json.tmp", user_id))
    }

    fn read_record(&self, user_id: &str) -> Result<ProgressRecord> {
        let path = self.record_path(user_id);

        if !path.exists() {
            return Ok(ProgressRecord::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| LaurelError::storage(&path, e))?;
        let record: ProgressRecord = serde_json::from_str(&content)?;
        Ok(record)
    }

    /// Write a record atomically using temp file + rename.
    fn atomic_write(&self, user_id: &str, record: &ProgressRecord) -> Result<()> {
        let final_path = self.record_path(user_id);
        let temp_path = self.temp_path(user_id);

        let json = serde_json::to_string_pretty(record)?;

        {
            let mut file =
                fs::File::create(&temp_path).map_err(|e| LaurelError::storage(&temp_path, e))?;
            file.write_all(json.as_bytes())
                .map_err(|e| LaurelError::storage(&temp_path, e))?;
            file.sync_all()
                .map_err(|e| LaurelError::storage(&temp_path, e))?;
        }

        fs::rename(&temp_path, &final_path).map_err(|e| LaurelError::storage(&final_path, e))?;

        Ok(())
    }
}

impl ProgressStore for FileProgressStore {
    fn read(&self, user_id: &str) -> Result<ProgressRecord> {
        self.read_record(user_id)
    }

    fn transact(
        &self,
        user_id: &str,
        op: &mut dyn FnMut(&ProgressRecord) -> Option<RecordUpdate>,
    ) -> Result<TxSummary> {
        let _guard = self.commit_lock.lock().unwrap();

        let snapshot = self.read_record(user_id)?;

        let Some(update) = op(&snapshot) else {
            return Ok(TxSummary {
                committed: false,
                record: snapshot,
            });
        };

        let mut committed = snapshot;
        update.apply_to(&mut committed, Utc::now());
        self.atomic_write(user_id, &committed)?;

        // Still under the commit lock: emissions stay in commit order.
        self.hub.notify(user_id, &committed);

        Ok(TxSummary {
            committed: true,
            record: committed,
        })
    }

    fn subscribe(&self, user_id: &str) -> Subscription {
        let _guard = self.commit_lock.lock().unwrap();
        let initial = self.read_record(user_id).unwrap_or_default();
        self.hub.attach(user_id, initial)
    }
}

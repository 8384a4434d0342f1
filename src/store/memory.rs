//! In-memory progress store.
//!
//! Thread-safe implementation backed by `RwLock<HashMap>` with per-record
//! version stamps. Transactions are optimistic: the body runs against a
//! snapshot, and the commit is accepted only if the record's version is
//! unchanged; otherwise the transaction is retried against the fresh state,
//! up to a bounded budget.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;

use crate::error::{LaurelError, Result};
use crate::store::record::{ProgressRecord, RecordUpdate};
use crate::store::traits::{ProgressStore, Subscription, TxSummary, WatcherHub};

/// Default optimistic-retry budget.
pub const DEFAULT_TX_RETRIES: u32 = 5;

#[derive(Debug, Clone, Default)]
struct VersionedRecord {
    version: u64,
    record: ProgressRecord,
}

/// In-memory progress store.
///
/// Records live in memory and are lost when the store is dropped. Used by
/// tests and embedding hosts that keep their own persistence.
pub struct MemoryProgressStore {
    records: RwLock<HashMap<String, VersionedRecord>>,
    hub: Arc<WatcherHub>,
    tx_retries: u32,
}

impl MemoryProgressStore {
    /// Create a new empty store with the default retry budget.
    pub fn new() -> Self {
        Self::with_retries(DEFAULT_TX_RETRIES)
    }

    /// Create a store with a custom optimistic-retry budget.
    pub fn with_retries(tx_retries: u32) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            hub: WatcherHub::new(),
            tx_retries: tx_retries.max(1),
        }
    }

    /// Create a store configured from storage settings.
    pub fn from_config(config: &crate::config::StorageConfig) -> Self {
        Self::with_retries(config.tx_retries)
    }

    /// Number of records that have ever been written.
    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    /// Check if no record has been written.
    pub fn is_empty(&self) -> bool {
        self.records.read().unwrap().is_empty()
    }

    fn snapshot(&self, user_id: &str) -> (u64, ProgressRecord) {
        let records = self.records.read().unwrap();
        records
            .get(user_id)
            .map(|v| (v.version, v.record.clone()))
            .unwrap_or((0, ProgressRecord::default()))
    }
}

impl Default for MemoryProgressStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressStore for MemoryProgressStore {
    fn read(&self, user_id: &str) -> Result<ProgressRecord> {
        Ok(self.snapshot(user_id).1)
    }

    fn transact(
        &self,
        user_id: &str,
        op: &mut dyn FnMut(&ProgressRecord) -> Option<RecordUpdate>,
    ) -> Result<TxSummary> {
        for _ in 0..self.tx_retries {
            let (version, snapshot) = self.snapshot(user_id);

            let Some(update) = op(&snapshot) else {
                return Ok(TxSummary {
                    committed: false,
                    record: snapshot,
                });
            };

            let mut records = self.records.write().unwrap();
            let entry = records.entry(user_id.to_string()).or_default();
            if entry.version != version {
                // Another commit landed between our read and this write.
                continue;
            }

            update.apply_to(&mut entry.record, Utc::now());
            entry.version += 1;
            let committed = entry.record.clone();

            // Notifying while the write lock is held keeps emissions in
            // commit order.
            self.hub.notify(user_id, &committed);

            return Ok(TxSummary {
                committed: true,
                record: committed,
            });
        }

        Err(LaurelError::conflict(user_id, self.tx_retries))
    }

    fn subscribe(&self, user_id: &str) -> Subscription {
        // Attach under the write lock so the initial snapshot cannot
        // interleave with a concurrent commit's notification.
        let records = self.records.write().unwrap();
        let initial = records
            .get(user_id)
            .map(|v| v.record.clone())
            .unwrap_or_default();
        self.hub.attach(user_id, initial)
    }
}

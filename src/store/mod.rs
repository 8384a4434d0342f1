//! Progress record storage.
//!
//! This module provides the per-user [`ProgressRecord`], the merge-write
//! [`RecordUpdate`], and the [`ProgressStore`] trait with file-based and
//! in-memory backends, including the per-record change-notification stream.

pub mod file;
pub mod memory;
pub mod record;
pub mod traits;

pub use file::FileProgressStore;
pub use memory::MemoryProgressStore;
pub use record::{DailyMissions, Missions, ProgressRecord, RecordUpdate};
pub use traits::{ProgressStore, Subscription, SubscriptionToken, TxSummary};

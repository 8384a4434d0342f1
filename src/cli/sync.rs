//! Sync command for Laurel.
//!
//! Runs one explicit evaluate-and-commit pass for the active user. This is
//! the catch-up entry point: with `--catch-up`, every passed-but-unclaimed
//! milestone is granted at once instead of only the highest per kind.

use std::sync::Arc;

use serde::Serialize;

use crate::catalog::DefinitionCache;
use crate::engine::reconcile;
use crate::events::RewardEvent;
use crate::store::ProgressStore;

/// Output format for the sync command.
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutput {
    /// Whether the pass ran to completion.
    pub success: bool,
    /// Task ids granted by this pass.
    pub granted_tasks: Vec<String>,
    /// Badge ids granted by this pass.
    pub granted_badges: Vec<String>,
    /// XP applied by this pass.
    pub xp_applied: u32,
    /// Reward events for the granted items.
    pub rewards: Vec<RewardEvent>,
    /// Error message if the pass failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The sync command implementation.
pub struct SyncCommand {
    store: Arc<dyn ProgressStore>,
    defs: Arc<DefinitionCache>,
}

impl SyncCommand {
    /// Create a new sync command.
    pub fn new(store: Arc<dyn ProgressStore>, defs: Arc<DefinitionCache>) -> Self {
        Self { store, defs }
    }

    /// Run one pass for `user_id`.
    pub fn run(&self, user_id: &str, catch_up: bool) -> SyncOutput {
        match reconcile(self.store.as_ref(), &self.defs, user_id, catch_up) {
            Ok(outcome) => SyncOutput {
                success: true,
                granted_tasks: outcome.granted_tasks,
                granted_badges: outcome.granted_badges,
                xp_applied: outcome.xp_applied,
                rewards: outcome.events,
                error: None,
            },
            Err(err) => SyncOutput {
                success: false,
                granted_tasks: Vec::new(),
                granted_badges: Vec::new(),
                xp_applied: 0,
                rewards: Vec::new(),
                error: Some(err.to_string()),
            },
        }
    }
}

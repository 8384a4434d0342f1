//! Read command for Laurel.
//!
//! Marks a resource as read for the active user through the full engine,
//! so the derived award pipeline runs exactly as it would in the app: the
//! write lands, the change stream re-enters the evaluator, and any granted
//! rewards surface as events.

use std::sync::Arc;

use serde::Serialize;

use crate::catalog::DefinitionCache;
use crate::config::EngineConfig;
use crate::engine::ProgressEngine;
use crate::events::{RewardBus, RewardEvent};
use crate::store::ProgressStore;

/// Output format for the read command.
#[derive(Debug, Clone, Serialize)]
pub struct ReadOutput {
    /// Whether the command ran (an unknown user still runs; a missing one
    /// does not).
    pub success: bool,
    /// The resource that was marked.
    pub resource_id: String,
    /// The XP attached to a first-time read.
    pub xp_reward: u32,
    /// Rewards granted by the derived pipeline as a consequence.
    pub rewards: Vec<RewardEvent>,
    /// Error message if the command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The read command implementation.
pub struct ReadCommand {
    store: Arc<dyn ProgressStore>,
    defs: Arc<DefinitionCache>,
    config: EngineConfig,
}

impl ReadCommand {
    /// Create a new read command.
    pub fn new(
        store: Arc<dyn ProgressStore>,
        defs: Arc<DefinitionCache>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            defs,
            config,
        }
    }

    /// Run the read command for `user_id`.
    pub fn run(&self, user_id: &str, resource_id: &str, xp_reward: u32) -> ReadOutput {
        let (bus, events) = RewardBus::new();
        let mut engine = ProgressEngine::new(
            Arc::clone(&self.store),
            Arc::clone(&self.defs),
            bus,
            self.config.clone(),
        );

        engine.sign_in(user_id);
        engine.mark_resource_as_read(resource_id, xp_reward);
        // Tearing down drains the mirror, so every reward caused by this
        // write has been published by the time we collect.
        engine.sign_out();

        ReadOutput {
            success: true,
            resource_id: resource_id.to_string(),
            xp_reward,
            rewards: events.try_iter().collect(),
            error: None,
        }
    }
}

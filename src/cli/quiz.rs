//! Quiz command for Laurel.
//!
//! Marks a quiz as complete for the active user through the full engine
//! and reports the typed outcome alongside any derived rewards.

use std::sync::Arc;

use serde::Serialize;

use crate::catalog::DefinitionCache;
use crate::config::EngineConfig;
use crate::engine::{CompletionReason, ProgressEngine, QuizOutcome};
use crate::events::{RewardBus, RewardEvent};
use crate::store::ProgressStore;

/// Output format for the quiz command.
#[derive(Debug, Clone, Serialize)]
pub struct QuizOutput {
    /// Whether XP was granted by this call.
    pub awarded: bool,
    /// The typed reason code.
    pub reason: CompletionReason,
    /// The quiz that was marked.
    pub quiz_id: String,
    /// The XP attached to a first-time completion.
    pub xp_reward: u32,
    /// Rewards granted by the derived pipeline as a consequence.
    pub rewards: Vec<RewardEvent>,
}

impl QuizOutput {
    fn from_outcome(outcome: QuizOutcome, quiz_id: &str, xp_reward: u32) -> Self {
        Self {
            awarded: outcome.awarded,
            reason: outcome.reason,
            quiz_id: quiz_id.to_string(),
            xp_reward,
            rewards: Vec::new(),
        }
    }
}

/// The quiz command implementation.
pub struct QuizCommand {
    store: Arc<dyn ProgressStore>,
    defs: Arc<DefinitionCache>,
    config: EngineConfig,
}

impl QuizCommand {
    /// Create a new quiz command.
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

    /// Run the quiz command for `user_id`.
    pub fn run(&self, user_id: &str, quiz_id: &str, xp_reward: u32) -> QuizOutput {
        let (bus, events) = RewardBus::new();
        let mut engine = ProgressEngine::new(
            Arc::clone(&self.store),
            Arc::clone(&self.defs),
            bus,
            self.config.clone(),
        );

        engine.sign_in(user_id);
        let outcome = engine.mark_quiz_as_complete(quiz_id, xp_reward);
        engine.sign_out();

        let mut output = QuizOutput::from_outcome(outcome, quiz_id, xp_reward);
        output.rewards = events.try_iter().collect();
        output
    }
}

//! Status command for Laurel.
//!
//! Reads a user's record and reports the presentation-layer view of it.

use std::sync::Arc;

use serde::Serialize;

use crate::config::EngineConfig;
use crate::store::ProgressStore;

/// Output format for the status command.
#[derive(Debug, Clone, Serialize)]
pub struct StatusOutput {
    /// Whether the record was read.
    pub success: bool,
    /// The user the status describes.
    pub user_id: String,
    pub xp: u32,
    pub level: u32,
    pub streak: u32,
    pub resources_read: usize,
    pub quizzes_completed: usize,
    pub tasks_completed: Vec<String>,
    pub badges: Vec<String>,
    pub read_guide_mission: bool,
    pub complete_quiz_mission: bool,
    /// Error message if the read failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The status command implementation.
pub struct StatusCommand {
    store: Arc<dyn ProgressStore>,
    config: EngineConfig,
}

impl StatusCommand {
    /// Create a new status command.
    pub fn new(store: Arc<dyn ProgressStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Run the status command for `user_id`.
    pub fn run(&self, user_id: &str) -> StatusOutput {
        match self.store.read(user_id) {
            Ok(record) => StatusOutput {
                success: true,
                user_id: user_id.to_string(),
                xp: record.xp,
                level: record.level(self.config.xp_per_level),
                streak: record.streak,
                resources_read: record.completed_resources.len(),
                quizzes_completed: record.completed_quizzes.len(),
                tasks_completed: record.completed_tasks.iter().cloned().collect(),
                badges: record.badges.iter().cloned().collect(),
                read_guide_mission: record.missions.daily.read_guide,
                complete_quiz_mission: record.missions.daily.complete_quiz,
                error: None,
            },
            Err(err) => StatusOutput {
                success: false,
                user_id: user_id.to_string(),
                xp: 0,
                level: 1,
                streak: 0,
                resources_read: 0,
                quizzes_completed: 0,
                tasks_completed: Vec::new(),
                badges: Vec::new(),
                read_guide_mission: false,
                complete_quiz_mission: false,
                error: Some(err.to_string()),
            },
        }
    }
}

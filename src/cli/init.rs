//! Init command for Laurel.
//!
//! Creates the Laurel home directory layout and seeds starter catalogs so
//! the engine has something to award against.

use std::fs;
use std::path::PathBuf;

use serde::Serialize;

use crate::catalog::{BadgeCondition, BadgeDefinition, Kind, TaskDefinition};
use crate::config::laurel_home;
use crate::error::{LaurelError, Result};

/// Output format for the init command.
#[derive(Debug, Clone, Serialize)]
pub struct InitOutput {
    /// Whether initialization succeeded.
    pub success: bool,
    /// The Laurel home directory.
    pub home: String,
    /// Whether starter catalogs were written (false when already present).
    pub seeded_catalogs: bool,
    /// Error message if initialization failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The init command implementation.
pub struct InitCommand {
    home: PathBuf,
}

impl InitCommand {
    /// Create an init command for the default home directory.
    pub fn new() -> Result<Self> {
        let home = laurel_home().ok_or_else(|| {
            LaurelError::config("Could not determine Laurel home (no home directory)")
        })?;
        Ok(Self { home })
    }

    /// Create an init command for a custom home directory.
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    /// Run the init command.
    pub fn run(&self) -> InitOutput {
        match self.init() {
            Ok(seeded) => InitOutput {
                success: true,
                home: self.home.display().to_string(),
                seeded_catalogs: seeded,
                error: None,
            },
            Err(err) => InitOutput {
                success: false,
                home: self.home.display().to_string(),
                seeded_catalogs: false,
                error: Some(err.to_string()),
            },
        }
    }

    fn init(&self) -> Result<bool> {
        let users = self.home.join("users");
        let catalogs = self.home.join("catalogs");
        fs::create_dir_all(&users).map_err(|e| LaurelError::storage(&users, e))?;
        fs::create_dir_all(&catalogs).map_err(|e| LaurelError::storage(&catalogs, e))?;

        let tasks_path = catalogs.join("tasks.json");
        let badges_path = catalogs.join("badges.json");
        if tasks_path.exists() || badges_path.exists() {
            return Ok(false);
        }

        let tasks = serde_json::to_string_pretty(&starter_tasks())?;
        fs::write(&tasks_path, tasks).map_err(|e| LaurelError::storage(&tasks_path, e))?;

        let badges = serde_json::to_string_pretty(&starter_badges())?;
        fs::write(&badges_path, badges).map_err(|e| LaurelError::storage(&badges_path, e))?;

        Ok(true)
    }
}

fn starter_tasks() -> Vec<TaskDefinition> {
    vec![
        TaskDefinition {
            id: "first-read".to_string(),
            kind: Kind::ResourceRead,
            required: 1,
            xp_reward: 10,
        },
        TaskDefinition {
            id: "avid-reader".to_string(),
            kind: Kind::ResourceRead,
            required: 5,
            xp_reward: 25,
        },
        TaskDefinition {
            id: "first-quiz".to_string(),
            kind: Kind::QuizComplete,
            required: 1,
            xp_reward: 15,
        },
        TaskDefinition {
            id: "three-day-streak".to_string(),
            kind: Kind::Streak,
            required: 3,
            xp_reward: 30,
        },
    ]
}

fn starter_badges() -> Vec<BadgeDefinition> {
    vec![
        BadgeDefinition {
            id: "bookworm".to_string(),
            condition: BadgeCondition {
                kind: Kind::ResourceRead,
                value: 10,
            },
            xp_reward: 100,
        },
        BadgeDefinition {
            id: "quiz-master".to_string(),
            condition: BadgeCondition {
                kind: Kind::QuizComplete,
                value: 5,
            },
            xp_reward: 100,
        },
        BadgeDefinition {
            id: "week-streak".to_string(),
            condition: BadgeCondition {
                kind: Kind::Streak,
                value: 7,
            },
            xp_reward: 150,
        },
    ]
}

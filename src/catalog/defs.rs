//! Task and badge definition types.
//!
//! Definitions are read-only catalog entries loaded once per session. For
//! award evaluation both shapes are flattened into the uniform [`Milestone`]
//! tuple.

use serde::{Deserialize, Serialize};

/// The category of progress counter a milestone is defined over.
///
/// Each milestone is defined over a single kind; there is no combined-kind
/// condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Kind {
    /// Number of resources (guides) marked as read.
    ResourceRead,
    /// Number of quizzes completed.
    QuizComplete,
    /// Current login streak in days.
    Streak,
}

impl Kind {
    /// All kinds, in a fixed evaluation order.
    pub const ALL: [Kind; 3] = [Kind::ResourceRead, Kind::QuizComplete, Kind::Streak];
}

/// A task definition: reach `required` progress of `kind`, earn `xp_reward`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinition {
    /// Catalog document id.
    pub id: String,
    /// Progress kind this task counts.
    #[serde(rename = "type")]
    pub kind: Kind,
    /// Threshold the counter must reach.
    pub required: u32,
    /// XP granted when the task completes.
    pub xp_reward: u32,
}

impl TaskDefinition {
    /// Flatten into the uniform milestone tuple.
    pub fn milestone(&self) -> Milestone {
        Milestone {
            source_id: self.id.clone(),
            source: MilestoneSource::Task,
            kind: self.kind,
            threshold: self.required,
            xp_reward: self.xp_reward,
        }
    }

    /// A definition is usable only with a positive threshold.
    pub fn is_valid(&self) -> bool {
        self.required > 0
    }
}

/// The condition part of a badge definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BadgeCondition {
    /// Progress kind this badge counts.
    #[serde(rename = "type")]
    pub kind: Kind,
    /// Threshold the counter must reach.
    pub value: u32,
}

/// A badge definition: satisfy `condition`, earn the badge and `xp_reward`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BadgeDefinition {
    /// Catalog document id.
    pub id: String,
    /// Unlock condition.
    pub condition: BadgeCondition,
    /// XP granted when the badge unlocks.
    pub xp_reward: u32,
}

impl BadgeDefinition {
    /// Flatten into the uniform milestone tuple.
    pub fn milestone(&self) -> Milestone {
        Milestone {
            source_id: self.id.clone(),
            source: MilestoneSource::Badge,
            kind: self.condition.kind,
            threshold: self.condition.value,
            xp_reward: self.xp_reward,
        }
    }

    /// A definition is usable only with a positive threshold.
    pub fn is_valid(&self) -> bool {
        self.condition.value > 0
    }
}

/// Which catalog a milestone was flattened from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneSource {
    Task,
    Badge,
}

/// The uniform evaluation tuple derived from a task or badge definition.
///
/// Milestones are never persisted; they exist only between evaluation and
/// commit, carrying kind and threshold for traceability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Milestone {
    /// Id of the originating task or badge definition.
    pub source_id: String,
    /// Originating catalog.
    pub source: MilestoneSource,
    /// Progress kind the threshold applies to.
    pub kind: Kind,
    /// Progress value required.
    pub threshold: u32,
    /// XP granted on award.
    pub xp_reward: u32,
}

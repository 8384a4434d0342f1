//! The per-user progress record and its merge-write description.
//!
//! One record exists per identity. It is only ever mutated through
//! [`RecordUpdate`], which models the commutative merge primitives of the
//! backing store: set-union append for the completion sets and numeric
//! increment for XP. Completion sets are append-only and XP never
//! decreases through this crate.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::Kind;

/// Daily mission flags.
///
/// Flags are only ever raised here; resetting them at day rollover is a
/// server concern outside this crate.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyMissions {
    /// Raised by any read action.
    pub read_guide: bool,
    /// Raised by the first completion of a quiz.
    pub complete_quiz: bool,
}

/// Mission container, mirroring the stored `missions.daily.*` shape.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Missions {
    pub daily: DailyMissions,
}

/// Cumulative progress record for one user.
///
/// A record that has never been written reads as this type's default.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressRecord {
    /// Total experience points.
    pub xp: u32,
    /// Ids of resources marked as read.
    pub completed_resources: BTreeSet<String>,
    /// Ids of quizzes completed.
    pub completed_quizzes: BTreeSet<String>,
    /// Ids of tasks granted.
    pub completed_tasks: BTreeSet<String>,
    /// Ids of badges granted.
    pub badges: BTreeSet<String>,
    /// Current login streak in whole UTC days.
    pub streak: u32,
    /// Instant of the last read action.
    pub last_login: Option<DateTime<Utc>>,
    /// Daily mission flags.
    pub missions: Missions,
    /// Stamped by the store on every committed write.
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    /// Current progress counter for a kind.
    pub fn progress_of(&self, kind: Kind) -> u32 {
        match kind {
            Kind::ResourceRead => self.completed_resources.len() as u32,
            Kind::QuizComplete => self.completed_quizzes.len() as u32,
            Kind::Streak => self.streak,
        }
    }

    /// Level derived from XP: every `xp_per_level` points is one level,
    /// starting at level 1.
    pub fn level(&self, xp_per_level: u32) -> u32 {
        self.xp / xp_per_level.max(1) + 1
    }
}

/// A merge-write against a [`ProgressRecord`].
///
/// Describes exactly the mutations this crate is allowed to make: increment
/// XP, union ids into the completion sets, replace streak/last-login, and
/// raise mission flags. Applying an update can never remove an id or lower
/// XP.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordUpdate {
    xp_delta: u32,
    add_resources: Vec<String>,
    add_quizzes: Vec<String>,
    add_tasks: Vec<String>,
    add_badges: Vec<String>,
    streak: Option<u32>,
    last_login: Option<DateTime<Utc>>,
    read_guide_mission: bool,
    complete_quiz_mission: bool,
}

impl RecordUpdate {
    /// An update with no mutations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment XP by `delta`.
    pub fn add_xp(mut self, delta: u32) -> Self {
        self.xp_delta += delta;
        self
    }

    /// Union a resource id into `completed_resources`.
    pub fn add_resource(mut self, id: impl Into<String>) -> Self {
        self.add_resources.push(id.into());
        self
    }

    /// Union a quiz id into `completed_quizzes`.
    pub fn add_quiz(mut self, id: impl Into<String>) -> Self {
        self.add_quizzes.push(id.into());
        self
    }

    /// Union task ids into `completed_tasks`.
    pub fn add_task_ids(mut self, ids: impl IntoIterator<Item = String>) -> Self {
        self.add_tasks.extend(ids);
        self
    }

    /// Union badge ids into `badges`.
    pub fn add_badge_ids(mut self, ids: impl IntoIterator<Item = String>) -> Self {
        self.add_badges.extend(ids);
        self
    }

    /// Replace the streak value.
    pub fn set_streak(mut self, streak: u32) -> Self {
        self.streak = Some(streak);
        self
    }

    /// Replace the last-login instant.
    pub fn set_last_login(mut self, at: DateTime<Utc>) -> Self {
        self.last_login = Some(at);
        self
    }

    /// Raise the daily read-guide mission flag.
    pub fn mark_read_guide(mut self) -> Self {
        self.read_guide_mission = true;
        self
    }

    /// Raise the daily complete-quiz mission flag.
    pub fn mark_complete_quiz(mut self) -> Self {
        self.complete_quiz_mission = true;
        self
    }

    /// True when applying this update would change nothing but `updated_at`.
    pub fn is_empty(&self) -> bool {
        self.xp_delta == 0
            && self.add_resources.is_empty()
            && self.add_quizzes.is_empty()
            && self.add_tasks.is_empty()
            && self.add_badges.is_empty()
            && self.streak.is_none()
            && self.last_login.is_none()
            && !self.read_guide_mission
            && !self.complete_quiz_mission
    }

    /// Merge this update into a record, stamping `updated_at` with `now`.
    ///
    /// Called by stores at commit time.
    pub fn apply_to(&self, record: &mut ProgressRecord, now: DateTime<Utc>) {
        record.xp += self.xp_delta;
        record
            .completed_resources
            .extend(self.add_resources.iter().cloned());
        record
            .completed_quizzes
            .extend(self.add_quizzes.iter().cloned());
        record.completed_tasks.extend(self.add_tasks.iter().cloned());
        record.badges.extend(self.add_badges.iter().cloned());
        if let Some(streak) = self.streak {
            record.streak = streak;
        }
        if let Some(at) = self.last_login {
            record.last_login = Some(at);
        }
        if self.read_guide_mission {
            record.missions.daily.read_guide = true;
        }
        if self.complete_quiz_mission {
            record.missions.daily.complete_quiz = true;
        }
        record.updated_at = Some(now);
    }
}

//! Laurel - Progress Synchronization and Reward Engine
//!
//! Laurel reconciles a user's cumulative progress counters (resources read,
//! quizzes completed, login streak) against catalogs of task and badge
//! definitions and grants XP and achievement markers exactly once per
//! milestone, despite concurrent writers, at-least-once change
//! notifications, and process restarts.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod store;
pub mod util;

pub use catalog::{
    BadgeCondition, BadgeDefinition, CatalogSnapshot, CatalogSource, DefinitionCache,
    FileCatalogSource, Kind, Milestone, MilestoneSource, StaticCatalogSource, TaskDefinition,
};
pub use config::{Config, EngineConfig, StorageConfig};
pub use engine::{
    commit_awards, evaluate, pick_milestones, reconcile, AwardPlan, CommitOutcome,
    CompletionReason, MirrorHandle, ProgressCounts, ProgressEngine, ProgressMirror, ProgressView,
    QuizOutcome,
};
pub use error::{FailOpen, LaurelError, Result};
pub use events::{RewardBus, RewardEvent, RewardKind};
pub use store::{
    FileProgressStore, MemoryProgressStore, ProgressRecord, ProgressStore, RecordUpdate,
    Subscription, SubscriptionToken, TxSummary,
};

// CLI commands
pub use cli::{
    DefsCommand, InitCommand, LoginCommand, QuizCommand, ReadCommand, StatusCommand, SyncCommand,
};

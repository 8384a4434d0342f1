//! Reward event stream.
//!
//! One event per granted item, published only after the granting
//! transaction commits. Delivery is best-effort: events are not persisted
//! and a gone consumer is not an error.

use std::sync::mpsc::{channel, Receiver, Sender};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// What a reward event announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardKind {
    /// A task milestone was granted.
    Task,
    /// A badge was unlocked.
    Badge,
    /// The derived level increased.
    Level,
}

/// A single reward notification for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardEvent {
    /// Event tag.
    #[serde(rename = "type")]
    pub kind: RewardKind,
    /// Display message.
    pub message: String,
}

impl RewardEvent {
    /// Event for a granted task milestone.
    pub fn task_complete(xp: u32) -> Self {
        Self {
            kind: RewardKind::Task,
            message: format!("Task complete! +{} XP", xp),
        }
    }

    /// Event for an unlocked badge.
    pub fn badge_unlocked(xp: u32) -> Self {
        Self {
            kind: RewardKind::Badge,
            message: format!("Badge unlocked! +{} XP", xp),
        }
    }

    /// Event for a level increase.
    pub fn level_up(level: u32) -> Self {
        Self {
            kind: RewardKind::Level,
            message: format!("Level up! You reached level {}", level),
        }
    }
}

/// Outbound reward event publisher.
///
/// Clone freely; all clones feed the single receiver handed out at
/// construction.
#[derive(Clone)]
pub struct RewardBus {
    sender: Sender<RewardEvent>,
}

impl RewardBus {
    /// Create a bus and the receiving end of its stream.
    pub fn new() -> (Self, Receiver<RewardEvent>) {
        let (sender, receiver) = channel();
        (Self { sender }, receiver)
    }

    /// Publish an event, best-effort.
    pub fn publish(&self, event: RewardEvent) {
        if self.sender.send(event).is_err() {
            debug!("reward event dropped: no consumer");
        }
    }
}

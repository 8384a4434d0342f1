//! Directly user-triggered completion actions.
//!
//! Both actions run their own transaction against the same record the
//! mirror observes, so their commits re-enter the award pipeline through
//! the change stream. Idempotence lives in the transaction body: membership
//! is recomputed against the live record on every (re)run.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::store::{ProgressStore, RecordUpdate};
use crate::util::next_streak;

/// Reason code attached to a quiz completion outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompletionReason {
    /// The quiz was newly completed and XP granted.
    Ok,
    /// The quiz was already in the completed set; nothing changed.
    AlreadyCompleted,
    /// No signed-in user.
    NotAuthenticated,
    /// The transaction failed after the store's retries were exhausted.
    TxError,
}

/// Result of [`mark_quiz_as_complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizOutcome {
    /// Whether XP was granted by this call.
    pub awarded: bool,
    /// Why.
    pub reason: CompletionReason,
}

impl QuizOutcome {
    /// Newly completed.
    pub fn ok() -> Self {
        Self {
            awarded: true,
            reason: CompletionReason::Ok,
        }
    }

    /// Already completed, no mutation.
    pub fn already_completed() -> Self {
        Self {
            awarded: false,
            reason: CompletionReason::AlreadyCompleted,
        }
    }

    /// No active identity.
    pub fn not_authenticated() -> Self {
        Self {
            awarded: false,
            reason: CompletionReason::NotAuthenticated,
        }
    }

    /// Transaction failure.
    pub fn tx_error() -> Self {
        Self {
            awarded: false,
            reason: CompletionReason::TxError,
        }
    }
}

/// Mark a resource as read.
///
/// Streak, `last_login` and the daily read-guide mission are updated on
/// every call, whether or not the resource was already read: any read
/// action keeps the daily-streak bookkeeping current. The resource id and
/// XP are only applied when the id is new. Returns whether the resource
/// was newly added.
pub fn mark_resource_as_read(
    store: &dyn ProgressStore,
    user_id: &str,
    resource_id: &str,
    xp_reward: u32,
) -> Result<bool> {
    let mut newly_added = false;

    store.transact(user_id, &mut |record| {
        let already = record.completed_resources.contains(resource_id);
        newly_added = !already;

        let now = Utc::now();
        let streak = next_streak(record.streak, record.last_login, now);

        let mut update = RecordUpdate::new()
            .set_streak(streak)
            .set_last_login(now)
            .mark_read_guide();

        if !already {
            update = update.add_resource(resource_id).add_xp(xp_reward);
        }

        Some(update)
    })?;

    Ok(newly_added)
}

/// Mark a quiz as complete.
///
/// An already-completed quiz causes no mutation at all and reports
/// `already-completed`; otherwise the quiz id, XP and the daily
/// complete-quiz mission are committed together. Transaction failures are
/// converted to the `tx-error` outcome, never propagated.
pub fn mark_quiz_as_complete(
    store: &dyn ProgressStore,
    user_id: &str,
    quiz_id: &str,
    xp_reward: u32,
) -> QuizOutcome {
    let mut outcome = QuizOutcome::ok();

    let result = store.transact(user_id, &mut |record| {
        if record.completed_quizzes.contains(quiz_id) {
            outcome = QuizOutcome::already_completed();
            return None;
        }
        outcome = QuizOutcome::ok();
        Some(
            RecordUpdate::new()
                .add_quiz(quiz_id)
                .add_xp(xp_reward)
                .mark_complete_quiz(),
        )
    });

    match result {
        Ok(_) => outcome,
        Err(err) => {
            warn!(user_id, quiz_id, "quiz completion failed: {}", err);
            QuizOutcome::tx_error()
        }
    }
}

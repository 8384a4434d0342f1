//! Transactional award commit.
//!
//! The committer takes an [`AwardPlan`] produced from some snapshot and
//! runs exactly one transaction against the live record. The proposal may
//! be stale by the time the transaction runs, so inside the transaction it
//! filters the proposed ids down to those still unclaimed, recomputes the
//! XP delta strictly from the definitions of those still-new ids, and
//! commits a merge-write. Reward events are produced only after the commit
//! succeeds, one per originally-proposed item that survived the filter, in
//! the originally-computed order.

use tracing::{debug, info};

use crate::catalog::CatalogSnapshot;
use crate::engine::evaluator::AwardPlan;
use crate::error::Result;
use crate::events::RewardEvent;
use crate::store::{ProgressStore, RecordUpdate};

/// What an award transaction actually granted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitOutcome {
    /// Task ids granted by this commit.
    pub granted_tasks: Vec<String>,
    /// Badge ids granted by this commit.
    pub granted_badges: Vec<String>,
    /// XP applied, recomputed at commit time.
    pub xp_applied: u32,
    /// Post-commit reward events, in proposal order.
    pub events: Vec<RewardEvent>,
    /// The record as committed, when a write happened.
    ///
    /// The mirror uses this to recognize the change-stream emission caused
    /// by its own commit.
    pub record: Option<crate::store::ProgressRecord>,
}

impl CommitOutcome {
    /// True when the transaction was a no-op.
    pub fn is_empty(&self) -> bool {
        self.granted_tasks.is_empty() && self.granted_badges.is_empty()
    }
}

/// Commit a proposed grant set.
///
/// Safe to call with a stale or already-applied plan: whatever is no longer
/// new is silently discarded, and a fully-stale plan commits nothing.
pub fn commit_awards(
    store: &dyn ProgressStore,
    catalog: &CatalogSnapshot,
    user_id: &str,
    plan: &AwardPlan,
) -> Result<CommitOutcome> {
    if plan.is_empty() {
        return Ok(CommitOutcome::default());
    }

    let mut still_tasks: Vec<String> = Vec::new();
    let mut still_badges: Vec<String> = Vec::new();
    let mut still_xp: u32 = 0;

    let summary = store.transact(user_id, &mut |current| {
        // Re-validation: the plan was computed from a snapshot that may no
        // longer be current. Only ids absent from the live record count.
        still_tasks = plan
            .tasks
            .iter()
            .filter(|m| !current.completed_tasks.contains(&m.source_id))
            .map(|m| m.source_id.clone())
            .collect();
        still_badges = plan
            .badges
            .iter()
            .filter(|m| !current.badges.contains(&m.source_id))
            .map(|m| m.source_id.clone())
            .collect();

        // The XP delta comes from the definitions of the still-new ids,
        // never from the figure computed at evaluation time.
        still_xp = still_tasks
            .iter()
            .filter_map(|id| catalog.task(id))
            .map(|t| t.xp_reward)
            .sum::<u32>()
            + still_badges
                .iter()
                .filter_map(|id| catalog.badge(id))
                .map(|b| b.xp_reward)
                .sum::<u32>();

        if still_tasks.is_empty() && still_badges.is_empty() {
            return None;
        }

        let mut update = RecordUpdate::new()
            .add_task_ids(still_tasks.iter().cloned())
            .add_badge_ids(still_badges.iter().cloned());
        if still_xp > 0 {
            update = update.add_xp(still_xp);
        }
        Some(update)
    })?;

    if !summary.committed {
        debug!(user_id, "award plan already applied, nothing to commit");
        return Ok(CommitOutcome::default());
    }

    // Events only after the commit succeeded, in the order the plan
    // proposed them, and only for items that actually got granted.
    let mut events = Vec::new();
    for milestone in &plan.tasks {
        if still_tasks.contains(&milestone.source_id) {
            events.push(RewardEvent::task_complete(milestone.xp_reward));
        }
    }
    for milestone in &plan.badges {
        if still_badges.contains(&milestone.source_id) {
            events.push(RewardEvent::badge_unlocked(milestone.xp_reward));
        }
    }

    info!(
        user_id,
        tasks = still_tasks.len(),
        badges = still_badges.len(),
        xp = still_xp,
        "awards committed"
    );

    Ok(CommitOutcome {
        granted_tasks: still_tasks,
        granted_badges: still_badges,
        xp_applied: still_xp,
        events,
        record: Some(summary.record),
    })
}

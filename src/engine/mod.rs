//! The progress engine.
//!
//! [`ProgressEngine`] is the outward surface of the subsystem: it owns the
//! store, the definition cache, the reward bus, the active identity and at
//! most one live mirror. Completion actions and the derived award path both
//! write to the same per-user record through the store's transactions, so
//! convergence is a store property, not an engine one.

pub mod actions;
pub mod committer;
pub mod evaluator;
pub mod mirror;

use std::sync::{Arc, RwLock};

use tracing::{info, warn};

pub use actions::{CompletionReason, QuizOutcome};
pub use committer::{commit_awards, CommitOutcome};
pub use evaluator::{evaluate, pick_milestones, AwardPlan, ProgressCounts};
pub use mirror::{MirrorHandle, ProgressMirror, ProgressView};

use crate::catalog::DefinitionCache;
use crate::config::EngineConfig;
use crate::error::{LaurelError, Result};
use crate::events::RewardBus;
use crate::store::ProgressStore;

/// Public API surface of the progress-synchronization subsystem.
pub struct ProgressEngine {
    store: Arc<dyn ProgressStore>,
    defs: Arc<DefinitionCache>,
    bus: RewardBus,
    config: EngineConfig,
    view: Arc<RwLock<ProgressView>>,
    user: Option<String>,
    mirror: Option<MirrorHandle>,
}

impl ProgressEngine {
    /// Create an engine over a store and a loaded definition cache.
    ///
    /// Events granted by the derived award path (and level crossings) are
    /// published on `bus`.
    pub fn new(
        store: Arc<dyn ProgressStore>,
        defs: Arc<DefinitionCache>,
        bus: RewardBus,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            defs,
            bus,
            config,
            view: Arc::new(RwLock::new(ProgressView::default())),
            user: None,
            mirror: None,
        }
    }

    /// The active identity, if any.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Snapshot of the hydrated observable state.
    pub fn view(&self) -> ProgressView {
        self.view.read().unwrap().clone()
    }

    /// Sign a user in and start their reconcile loop.
    ///
    /// Any previous subscription is torn down first (and its guard state
    /// dies with its loop instance), so evaluation can never run against a
    /// foreign or stale snapshot.
    pub fn sign_in(&mut self, user_id: impl Into<String>) {
        self.sign_out();

        let user_id = user_id.into();
        info!(user_id = %user_id, "signing in");

        let subscription = self.store.subscribe(&user_id);
        let mirror = ProgressMirror::new(
            Arc::clone(&self.store),
            Arc::clone(&self.defs),
            self.bus.clone(),
            Arc::clone(&self.view),
            user_id.clone(),
            &self.config,
        );
        self.mirror = Some(mirror.spawn(subscription));
        self.user = Some(user_id);
    }

    /// Tear down the active subscription and clear the identity and view.
    pub fn sign_out(&mut self) {
        if let Some(mirror) = self.mirror.take() {
            info!(user_id = mirror.user_id(), "signing out");
            mirror.stop();
        }
        self.user = None;
        self.view.write().unwrap().reset();
    }

    /// Mark a resource as read for the active user.
    ///
    /// Fire-and-forget: with no signed-in user or a failed transaction this
    /// logs and returns; the caller is never interrupted.
    pub fn mark_resource_as_read(&self, resource_id: &str, xp_reward: u32) {
        let Some(user_id) = self.user.as_deref() else {
            warn!(resource_id, "mark_resource_as_read without signed-in user");
            return;
        };

        match actions::mark_resource_as_read(self.store.as_ref(), user_id, resource_id, xp_reward)
        {
            Ok(newly) => {
                info!(user_id, resource_id, newly, "resource marked as read");
            }
            Err(err) => {
                warn!(user_id, resource_id, "mark_resource_as_read failed: {}", err);
            }
        }
    }

    /// Mark a quiz as complete for the active user.
    pub fn mark_quiz_as_complete(&self, quiz_id: &str, xp_reward: u32) -> QuizOutcome {
        let Some(user_id) = self.user.as_deref() else {
            return QuizOutcome::not_authenticated();
        };
        actions::mark_quiz_as_complete(self.store.as_ref(), user_id, quiz_id, xp_reward)
    }

    /// Run one explicit evaluate-and-commit pass for the active user.
    ///
    /// Unlike the subscription-driven path this is not guarded by the
    /// first-snapshot rule: it exists precisely to reconcile state that is
    /// already final, e.g. under the catch-up policy.
    pub fn reconcile(&self, allow_catchup: bool) -> Result<CommitOutcome> {
        let user_id = self.user.as_deref().ok_or(LaurelError::NotAuthenticated)?;
        reconcile(self.store.as_ref(), &self.defs, user_id, allow_catchup)
    }
}

/// One explicit evaluate-and-commit pass against a record.
///
/// The committer's re-validation makes this safe to run at any time; with
/// `allow_catchup` it grants every passed-but-unclaimed milestone at once.
pub fn reconcile(
    store: &dyn ProgressStore,
    defs: &DefinitionCache,
    user_id: &str,
    allow_catchup: bool,
) -> Result<CommitOutcome> {
    let record = store.read(user_id)?;
    let plan = evaluate(&record, defs.snapshot(), allow_catchup);
    commit_awards(store, defs.snapshot(), user_id, &plan)
}

impl Drop for ProgressEngine {
    fn drop(&mut self) {
        self.sign_out();
    }
}

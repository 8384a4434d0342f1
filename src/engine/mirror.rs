//! Progress mirror: the per-subscription reconcile loop.
//!
//! Every change-stream emission hydrates the observable [`ProgressView`]
//! unconditionally. Whether the emission also runs the award pipeline is a
//! separate decision: the first emission after a (re)subscription is
//! hydrate-only, and emissions arriving while a commit is in flight are
//! hydrate-only too. Both guards are instance state owned by the loop, one
//! loop per active subscription, never process-wide globals: tearing a
//! subscription down and starting a new one (possibly for a different
//! user) constructs a fresh loop with a fresh first-snapshot flag.

use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::catalog::DefinitionCache;
use crate::config::EngineConfig;
use crate::engine::committer::commit_awards;
use crate::engine::evaluator::{evaluate, ProgressCounts};
use crate::events::{RewardBus, RewardEvent};
use crate::store::{ProgressRecord, ProgressStore, Subscription, SubscriptionToken};

/// Observable local copy of the progress record for the presentation
/// layer, with the derived level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressView {
    pub xp: u32,
    pub level: u32,
    pub streak: u32,
    pub completed_resources: Vec<String>,
    pub completed_quizzes: Vec<String>,
    pub completed_tasks: Vec<String>,
    pub badges: Vec<String>,
    pub read_guide_mission: bool,
    pub complete_quiz_mission: bool,
}

impl ProgressView {
    /// Replace the view with the record's state.
    ///
    /// Returns the new level when hydration crossed a level boundary
    /// upwards. The very first hydration (from the zero view) reports a
    /// crossing only past level 1, so a fresh subscription does not
    /// announce the level the user already had.
    pub fn hydrate(&mut self, record: &ProgressRecord, xp_per_level: u32) -> Option<u32> {
        let old_level = self.level;
        let new_level = record.level(xp_per_level);

        self.xp = record.xp;
        self.level = new_level;
        self.streak = record.streak;
        self.completed_resources = record.completed_resources.iter().cloned().collect();
        self.completed_quizzes = record.completed_quizzes.iter().cloned().collect();
        self.completed_tasks = record.completed_tasks.iter().cloned().collect();
        self.badges = record.badges.iter().cloned().collect();
        self.read_guide_mission = record.missions.daily.read_guide;
        self.complete_quiz_mission = record.missions.daily.complete_quiz;

        (old_level > 0 && new_level > old_level).then_some(new_level)
    }

    /// Reset to the zero state (sign-out, user switch).
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// The reconcile loop for one user's subscription.
pub struct ProgressMirror {
    store: Arc<dyn ProgressStore>,
    defs: Arc<DefinitionCache>,
    bus: RewardBus,
    view: Arc<RwLock<ProgressView>>,
    user_id: String,
    allow_catchup: bool,
    debug_awards: bool,
    xp_per_level: u32,
    /// Hydrate-only guard for the snapshot delivered on (re)subscription.
    first_snapshot: bool,
    /// At most one award commit in flight per mirror instance.
    awarding: bool,
    /// The record as committed by this mirror's last award transaction.
    ///
    /// The commit itself causes a change-stream emission; that emission is
    /// hydrate-only, like a snapshot arriving while the commit was still
    /// in flight. An emission that does not match was caused by another
    /// writer and is evaluated normally.
    last_commit: Option<ProgressRecord>,
}

impl ProgressMirror {
    /// Create a loop for `user_id`.
    ///
    /// The view is shared: the caller keeps the other handle to observe
    /// hydrated state.
    pub fn new(
        store: Arc<dyn ProgressStore>,
        defs: Arc<DefinitionCache>,
        bus: RewardBus,
        view: Arc<RwLock<ProgressView>>,
        user_id: impl Into<String>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            store,
            defs,
            bus,
            view,
            user_id: user_id.into(),
            allow_catchup: config.allow_catchup,
            debug_awards: config.debug_awards,
            xp_per_level: config.xp_per_level,
            first_snapshot: true,
            awarding: false,
            last_commit: None,
        }
    }

    /// Handle one change-stream emission.
    pub fn process(&mut self, record: ProgressRecord) {
        // Hydration happens on every emission, guards or not.
        let level_up = self
            .view
            .write()
            .unwrap()
            .hydrate(&record, self.xp_per_level);
        if let Some(level) = level_up {
            self.bus.publish(RewardEvent::level_up(level));
        }

        // The snapshot right after (re)subscribing reflects state that is
        // already final; evaluating it would re-propose milestones the
        // record may already hold.
        if self.first_snapshot {
            self.first_snapshot = false;
            return;
        }

        if self.awarding {
            return;
        }

        // The emission caused by our own commit carries nothing the
        // committed plan did not already account for.
        if self.last_commit.as_ref() == Some(&record) {
            self.last_commit = None;
            return;
        }

        let plan = evaluate(&record, self.defs.snapshot(), self.allow_catchup);
        if plan.is_empty() {
            return;
        }

        if self.debug_awards {
            debug!(
                user_id = %self.user_id,
                counts = ?ProgressCounts::of(&record),
                tasks = ?plan.tasks,
                badges = ?plan.badges,
                nominal_xp = plan.nominal_xp,
                "award plan"
            );
        }

        self.awarding = true;
        match commit_awards(
            self.store.as_ref(),
            self.defs.snapshot(),
            &self.user_id,
            &plan,
        ) {
            Ok(outcome) => {
                self.last_commit = outcome.record;
                for event in outcome.events {
                    self.bus.publish(event);
                }
            }
            Err(err) => {
                // The next emission re-attempts; nothing to unwind.
                warn!(user_id = %self.user_id, "award commit failed: {}", err);
            }
        }
        self.awarding = false;
    }

    /// Drive the loop from a subscription on a background thread.
    ///
    /// The loop ends when the subscription is cancelled (emissions already
    /// committed before cancellation are still drained and processed).
    pub fn spawn(mut self, subscription: Subscription) -> MirrorHandle {
        let token = subscription.token();
        let join = thread::spawn(move || {
            while let Some(record) = subscription.recv() {
                self.process(record);
            }
        });
        MirrorHandle {
            token,
            join: Some(join),
        }
    }
}

/// Handle to a spawned mirror loop.
pub struct MirrorHandle {
    token: SubscriptionToken,
    join: Option<JoinHandle<()>>,
}

impl MirrorHandle {
    /// Unsubscribe and wait for the loop to drain and exit.
    pub fn stop(mut self) {
        self.token.cancel();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }

    /// The user this mirror watches.
    pub fn user_id(&self) -> &str {
        self.token.user_id()
    }
}

impl Drop for MirrorHandle {
    fn drop(&mut self) {
        self.token.cancel();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogSnapshot, Kind, TaskDefinition};
    use crate::config::EngineConfig;
    use crate::engine::actions::{mark_quiz_as_complete, mark_resource_as_read};
    use crate::events::RewardKind;
    use crate::store::{MemoryProgressStore, RecordUpdate};
    use std::sync::mpsc::Receiver;
    use std::time::Duration;

    fn defs_with_read_tasks(tasks: &[(u32, u32)]) -> Arc<DefinitionCache> {
        Arc::new(DefinitionCache::from_snapshot(CatalogSnapshot::new(
            tasks
                .iter()
                .map(|&(required, xp)| TaskDefinition {
                    id: format!("read-{}", required),
                    kind: Kind::ResourceRead,
                    required,
                    xp_reward: xp,
                })
                .collect(),
            vec![],
        )))
    }

    fn defs_with_read_task(required: u32, xp: u32) -> Arc<DefinitionCache> {
        defs_with_read_tasks(&[(required, xp)])
    }

    struct Rig {
        store: Arc<MemoryProgressStore>,
        view: Arc<RwLock<ProgressView>>,
        mirror: ProgressMirror,
        events: Receiver<RewardEvent>,
    }

    fn rig(defs: Arc<DefinitionCache>) -> Rig {
        let store = Arc::new(MemoryProgressStore::new());
        let (bus, events) = RewardBus::new();
        let view = Arc::new(RwLock::new(ProgressView::default()));
        let mirror = ProgressMirror::new(
            store.clone() as Arc<dyn ProgressStore>,
            defs,
            bus,
            view.clone(),
            "u1",
            &EngineConfig::default(),
        );
        Rig {
            store,
            view,
            mirror,
            events,
        }
    }

    #[test]
    fn test_first_snapshot_is_hydrate_only() {
        let mut rig = rig(defs_with_read_task(1, 10));

        // Record already satisfies the milestone before subscribing.
        let mut record = ProgressRecord::default();
        record.completed_resources.insert("r1".to_string());

        rig.mirror.process(record);

        // Hydrated, but no grant and no events.
        assert_eq!(rig.view.read().unwrap().completed_resources.len(), 1);
        assert!(rig.store.read("u1").unwrap().completed_tasks.is_empty());
        assert!(rig.events.try_recv().is_err());
    }

    #[test]
    fn test_second_snapshot_grants() {
        let mut rig = rig(defs_with_read_task(1, 10));

        rig.mirror.process(ProgressRecord::default());

        let mut record = ProgressRecord::default();
        record.completed_resources.insert("r1".to_string());
        rig.mirror.process(record);

        let committed = rig.store.read("u1").unwrap();
        assert!(committed.completed_tasks.contains("read-1"));
        assert_eq!(committed.xp, 10);

        let event = rig.events.try_recv().unwrap();
        assert_eq!(event.kind, RewardKind::Task);
    }

    #[test]
    fn test_awarding_guard_skips_evaluation() {
        let mut rig = rig(defs_with_read_task(1, 10));
        rig.mirror.process(ProgressRecord::default());

        rig.mirror.awarding = true;
        let mut record = ProgressRecord::default();
        record.completed_resources.insert("r1".to_string());
        rig.mirror.process(record);

        // Hydrated but not granted.
        assert_eq!(rig.view.read().unwrap().completed_resources.len(), 1);
        assert!(rig.store.read("u1").unwrap().completed_tasks.is_empty());
    }

    #[test]
    fn test_rerunning_cycle_grants_nothing_new() {
        let mut rig = rig(defs_with_read_task(1, 10));
        rig.mirror.process(ProgressRecord::default());

        let mut record = ProgressRecord::default();
        record.completed_resources.insert("r1".to_string());
        rig.mirror.process(record);

        let after_first = rig.store.read("u1").unwrap();
        assert_eq!(after_first.xp, 10);
        while rig.events.try_recv().is_ok() {}

        // The commit's own emission is hydrate-only; a further identical
        // emission is evaluated and proposes nothing because the record
        // already carries the grant.
        rig.mirror.process(after_first.clone());
        rig.mirror.process(after_first.clone());

        assert_eq!(rig.store.read("u1").unwrap(), after_first);
        assert!(rig.events.try_recv().is_err());
    }

    #[test]
    fn test_jump_grants_only_highest_threshold_milestone() {
        // Thresholds {1, 5, 10}, progress jumps 0 -> 12 in one update:
        // only the 10-threshold task may ever be granted for that update.
        let mut rig = rig(defs_with_read_tasks(&[(1, 10), (5, 25), (10, 50)]));
        rig.mirror.process(ProgressRecord::default());

        let mut record = ProgressRecord::default();
        for i in 0..12 {
            record.completed_resources.insert(format!("r{}", i));
        }
        rig.mirror.process(record);

        let committed = rig.store.read("u1").unwrap();
        assert!(committed.completed_tasks.contains("read-10"));
        assert!(!committed.completed_tasks.contains("read-1"));
        assert!(!committed.completed_tasks.contains("read-5"));
        assert_eq!(committed.xp, 50);

        // The emission caused by the grant itself must not cascade into
        // the skipped lower thresholds.
        rig.mirror.process(committed.clone());
        let after = rig.store.read("u1").unwrap();
        assert_eq!(after.completed_tasks.len(), 1);
        assert_eq!(after.xp, 50);

        let event = rig.events.try_recv().unwrap();
        assert!(event.message.contains("+50 XP"));
        assert!(rig.events.try_recv().is_err());
    }

    #[test]
    fn test_level_event_on_hydration_crossing() {
        let mut rig = rig(Arc::new(DefinitionCache::default()));

        let mut record = ProgressRecord::default();
        record.xp = 50;
        rig.mirror.process(record);
        // First hydration never announces the starting level.
        assert!(rig.events.try_recv().is_err());
        assert_eq!(rig.view.read().unwrap().level, 1);

        let mut record = ProgressRecord::default();
        record.xp = 150;
        rig.mirror.process(record);

        let event = rig.events.try_recv().unwrap();
        assert_eq!(event.kind, RewardKind::Level);
        assert!(event.message.contains("level 2"));
        assert_eq!(rig.view.read().unwrap().level, 2);
    }

    #[test]
    fn test_view_reset() {
        let mut view = ProgressView::default();
        let mut record = ProgressRecord::default();
        record.xp = 120;
        record.badges.insert("b1".to_string());
        view.hydrate(&record, 100);
        assert_eq!(view.level, 2);

        view.reset();
        assert_eq!(view, ProgressView::default());
    }

    #[test]
    fn test_spawned_mirror_reacts_to_live_writes() {
        let defs = defs_with_read_task(1, 10);
        let store = Arc::new(MemoryProgressStore::new());
        let (bus, events) = RewardBus::new();
        let view = Arc::new(RwLock::new(ProgressView::default()));

        let mirror = ProgressMirror::new(
            store.clone() as Arc<dyn ProgressStore>,
            defs,
            bus,
            view.clone(),
            "u1",
            &EngineConfig::default(),
        );
        let handle = mirror.spawn(store.subscribe("u1"));

        // The write lands after the initial snapshot, so the derived path
        // may award for it.
        mark_resource_as_read(store.as_ref(), "u1", "r1", 5).unwrap();

        let event = events.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(event.kind, RewardKind::Task);

        handle.stop();
        let record = store.read("u1").unwrap();
        assert_eq!(record.xp, 5 + 10);
        assert!(record.completed_tasks.contains("read-1"));
        assert_eq!(view.read().unwrap().xp, 15);
    }

    #[test]
    fn test_no_double_grant_on_relaunch() {
        let defs = defs_with_read_task(1, 10);
        let store = Arc::new(MemoryProgressStore::new());

        // Pre-satisfied, unclaimed milestone persisted before any
        // subscription exists.
        store
            .transact("u1", &mut |_| Some(RecordUpdate::new().add_resource("r1").add_xp(5)))
            .unwrap();

        // Fresh subscription ("relaunch"): first emission must not grant.
        {
            let (bus, _events) = RewardBus::new();
            let view = Arc::new(RwLock::new(ProgressView::default()));
            let mut mirror = ProgressMirror::new(
                store.clone() as Arc<dyn ProgressStore>,
                defs.clone(),
                bus,
                view,
                "u1",
                &EngineConfig::default(),
            );
            let sub = store.subscribe("u1");
            mirror.process(sub.recv().unwrap());
            assert!(store.read("u1").unwrap().completed_tasks.is_empty());
        }

        // A later progress change on the next subscription may grant it.
        let (bus, _events) = RewardBus::new();
        let view = Arc::new(RwLock::new(ProgressView::default()));
        let mut mirror = ProgressMirror::new(
            store.clone() as Arc<dyn ProgressStore>,
            defs,
            bus,
            view,
            "u1",
            &EngineConfig::default(),
        );
        let sub = store.subscribe("u1");
        mirror.process(sub.recv().unwrap());
        mark_quiz_as_complete(store.as_ref(), "u1", "q1", 0);
        mirror.process(sub.recv().unwrap());

        assert!(store.read("u1").unwrap().completed_tasks.contains("read-1"));
    }

    #[test]
    fn test_teardown_resets_guard_for_next_subscription() {
        // Guard state is owned by the loop instance; a new subscription
        // means a new instance whose first emission is hydrate-only again.
        let defs = defs_with_read_task(1, 10);
        let store = Arc::new(MemoryProgressStore::new());

        let (bus, _events) = RewardBus::new();
        let view = Arc::new(RwLock::new(ProgressView::default()));
        let mirror = ProgressMirror::new(
            store.clone() as Arc<dyn ProgressStore>,
            defs.clone(),
            bus,
            view,
            "u1",
            &EngineConfig::default(),
        );
        mirror.spawn(store.subscribe("u1")).stop();

        let fresh = ProgressMirror::new(
            store.clone() as Arc<dyn ProgressStore>,
            defs,
            RewardBus::new().0,
            Arc::new(RwLock::new(ProgressView::default())),
            "u1",
            &EngineConfig::default(),
        );
        assert!(fresh.first_snapshot);
    }
}

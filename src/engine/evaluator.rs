//! Milestone evaluation.
//!
//! A pure function of the current progress counters, the already-granted id
//! sets, and the loaded catalogs. Its output is a proposal only: nothing is
//! written here, and the committer re-validates every proposed id against
//! the live record before granting.

use std::collections::BTreeMap;

use crate::catalog::{CatalogSnapshot, Kind, Milestone};
use crate::store::ProgressRecord;

/// Current progress counters, one per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressCounts {
    pub resources_read: u32,
    pub quizzes_completed: u32,
    pub streak: u32,
}

impl ProgressCounts {
    /// Snapshot the counters of a record.
    pub fn of(record: &ProgressRecord) -> Self {
        Self {
            resources_read: record.progress_of(Kind::ResourceRead),
            quizzes_completed: record.progress_of(Kind::QuizComplete),
            streak: record.progress_of(Kind::Streak),
        }
    }

    /// Counter value for a kind.
    pub fn get(&self, kind: Kind) -> u32 {
        match kind {
            Kind::ResourceRead => self.resources_read,
            Kind::QuizComplete => self.quizzes_completed,
            Kind::Streak => self.streak,
        }
    }
}

/// A proposed grant set: the evaluator's output.
///
/// `nominal_xp` is the XP total as computed at evaluation time. It is for
/// logging only; the committer recomputes the real delta from whatever is
/// still unclaimed at commit time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AwardPlan {
    /// Task milestones proposed for granting.
    pub tasks: Vec<Milestone>,
    /// Badge milestones proposed for granting.
    pub badges: Vec<Milestone>,
    /// Combined XP of the proposal at evaluation time.
    pub nominal_xp: u32,
}

impl AwardPlan {
    /// True when nothing is proposed.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.badges.is_empty()
    }
}

/// Evaluate which milestones are newly eligible.
///
/// Candidates are milestones whose threshold is reached and whose source id
/// is not already granted. `allow_catchup` selects the policy:
///
/// - `true`: every eligible candidate is proposed, so a progress jump can
///   grant several skipped rewards at once.
/// - `false` (default): per kind, only the single candidate with the
///   highest threshold is proposed; lower ones are permanently skipped,
///   not queued. This is a deliberate trade-off, kept configurable.
pub fn evaluate(
    record: &ProgressRecord,
    catalog: &CatalogSnapshot,
    allow_catchup: bool,
) -> AwardPlan {
    let counts = ProgressCounts::of(record);

    let task_candidates: Vec<Milestone> = catalog
        .tasks()
        .iter()
        .filter(|t| !record.completed_tasks.contains(&t.id))
        .map(|t| t.milestone())
        .filter(|m| m.threshold <= counts.get(m.kind))
        .collect();

    let badge_candidates: Vec<Milestone> = catalog
        .badges()
        .iter()
        .filter(|b| !record.badges.contains(&b.id))
        .map(|b| b.milestone())
        .filter(|m| m.threshold <= counts.get(m.kind))
        .collect();

    let tasks = pick_milestones(task_candidates, &counts, allow_catchup);
    let badges = pick_milestones(badge_candidates, &counts, allow_catchup);

    let nominal_xp = tasks.iter().chain(badges.iter()).map(|m| m.xp_reward).sum();

    AwardPlan {
        tasks,
        badges,
        nominal_xp,
    }
}

/// Apply the selection policy to a set of eligible candidates.
///
/// With catch-up, returns every candidate whose threshold is reached. Without
/// it, returns at most one candidate per kind: the one with the highest
/// threshold. Output order is stable: [`Kind::ALL`] order, then by threshold.
pub fn pick_milestones(
    candidates: Vec<Milestone>,
    counts: &ProgressCounts,
    allow_catchup: bool,
) -> Vec<Milestone> {
    if allow_catchup {
        return candidates
            .into_iter()
            .filter(|m| m.threshold <= counts.get(m.kind))
            .collect();
    }

    let mut by_kind: BTreeMap<usize, Vec<Milestone>> = BTreeMap::new();
    for milestone in candidates {
        let slot = Kind::ALL
            .iter()
            .position(|k| *k == milestone.kind)
            .unwrap_or(Kind::ALL.len());
        by_kind.entry(slot).or_default().push(milestone);
    }

    let mut picks = Vec::new();
    for (_, group) in by_kind {
        let eligible = group
            .into_iter()
            .filter(|m| m.threshold <= counts.get(m.kind));
        if let Some(winner) = eligible.max_by_key(|m| m.threshold) {
            picks.push(winner);
        }
    }
    picks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{BadgeCondition, BadgeDefinition, MilestoneSource, TaskDefinition};

    fn task(id: &str, kind: Kind, required: u32, xp: u32) -> TaskDefinition {
        TaskDefinition {
            id: id.to_string(),
            kind,
            required,
            xp_reward: xp,
        }
    }

    fn badge(id: &str, kind: Kind, value: u32, xp: u32) -> BadgeDefinition {
        BadgeDefinition {
            id: id.to_string(),
            condition: BadgeCondition { kind, value },
            xp_reward: xp,
        }
    }

    fn record_with_resources(n: u32) -> ProgressRecord {
        let mut record = ProgressRecord::default();
        for i in 0..n {
            record.completed_resources.insert(format!("r{}", i));
        }
        record
    }

    fn read_thresholds_catalog() -> CatalogSnapshot {
        CatalogSnapshot::new(
            vec![
                task("read-1", Kind::ResourceRead, 1, 10),
                task("read-5", Kind::ResourceRead, 5, 25),
                task("read-10", Kind::ResourceRead, 10, 50),
            ],
            vec![],
        )
    }

    #[test]
    fn test_no_candidates_below_threshold() {
        let plan = evaluate(&record_with_resources(0), &read_thresholds_catalog(), false);
        assert!(plan.is_empty());
        assert_eq!(plan.nominal_xp, 0);
    }

    #[test]
    fn test_skip_policy_grants_only_highest_threshold() {
        // Progress jumped 0 -> 12 against thresholds {1, 5, 10}: only the
        // 10-threshold milestone is proposed, the others are skipped for
        // good rather than queued.
        let plan = evaluate(&record_with_resources(12), &read_thresholds_catalog(), false);
        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.tasks[0].source_id, "read-10");
        assert_eq!(plan.tasks[0].threshold, 10);
        assert_eq!(plan.nominal_xp, 50);
    }

    #[test]
    fn test_catchup_policy_grants_every_eligible_candidate() {
        let plan = evaluate(&record_with_resources(12), &read_thresholds_catalog(), true);
        let ids: Vec<&str> = plan.tasks.iter().map(|m| m.source_id.as_str()).collect();
        assert_eq!(ids, vec!["read-1", "read-5", "read-10"]);
        assert_eq!(plan.nominal_xp, 85);
    }

    #[test]
    fn test_already_granted_ids_are_not_candidates() {
        let mut record = record_with_resources(12);
        record.completed_tasks.insert("read-10".to_string());

        let plan = evaluate(&record, &read_thresholds_catalog(), false);
        // read-10 is gone, so the highest remaining eligible wins.
        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.tasks[0].source_id, "read-5");
    }

    #[test]
    fn test_one_pick_per_kind_without_catchup() {
        let catalog = CatalogSnapshot::new(
            vec![
                task("read-1", Kind::ResourceRead, 1, 10),
                task("read-3", Kind::ResourceRead, 3, 20),
                task("quiz-1", Kind::QuizComplete, 1, 15),
                task("streak-2", Kind::Streak, 2, 30),
            ],
            vec![],
        );
        let mut record = record_with_resources(4);
        record.completed_quizzes.insert("q1".to_string());
        record.streak = 3;

        let plan = evaluate(&record, &catalog, false);
        let ids: Vec<&str> = plan.tasks.iter().map(|m| m.source_id.as_str()).collect();
        assert_eq!(ids, vec!["read-3", "quiz-1", "streak-2"]);
    }

    #[test]
    fn test_badges_evaluated_against_badge_set() {
        let catalog = CatalogSnapshot::new(
            vec![],
            vec![
                badge("bookworm", Kind::ResourceRead, 3, 40),
                badge("scholar", Kind::ResourceRead, 6, 80),
            ],
        );
        let mut record = record_with_resources(7);
        record.badges.insert("scholar".to_string());

        let plan = evaluate(&record, &catalog, false);
        assert_eq!(plan.badges.len(), 1);
        assert_eq!(plan.badges[0].source_id, "bookworm");
        assert_eq!(plan.badges[0].source, MilestoneSource::Badge);
    }

    #[test]
    fn test_tasks_and_badges_selected_independently() {
        let catalog = CatalogSnapshot::new(
            vec![task("read-1", Kind::ResourceRead, 1, 10)],
            vec![badge("starter", Kind::ResourceRead, 1, 20)],
        );
        let plan = evaluate(&record_with_resources(1), &catalog, false);
        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.badges.len(), 1);
        assert_eq!(plan.nominal_xp, 30);
    }

    #[test]
    fn test_empty_catalog_yields_empty_plan() {
        let plan = evaluate(&record_with_resources(50), &CatalogSnapshot::empty(), false);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_streak_milestones_use_streak_counter() {
        let catalog = CatalogSnapshot::new(
            vec![
                task("streak-3", Kind::Streak, 3, 30),
                task("streak-7", Kind::Streak, 7, 70),
            ],
            vec![],
        );
        let mut record = ProgressRecord::default();
        record.streak = 5;

        let plan = evaluate(&record, &catalog, false);
        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.tasks[0].source_id, "streak-3");
    }

    // =========================================================================
    // Property-based tests
    // =========================================================================

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_kind() -> impl Strategy<Value = Kind> {
            prop_oneof![
                Just(Kind::ResourceRead),
                Just(Kind::QuizComplete),
                Just(Kind::Streak),
            ]
        }

        fn arb_milestones() -> impl Strategy<Value = Vec<Milestone>> {
            prop::collection::vec((arb_kind(), 1u32..50, 0u32..200), 0..12).prop_map(|items| {
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, (kind, threshold, xp))| Milestone {
                        source_id: format!("m{}", i),
                        source: MilestoneSource::Task,
                        kind,
                        threshold,
                        xp_reward: xp,
                    })
                    .collect()
            })
        }

        fn arb_counts() -> impl Strategy<Value = ProgressCounts> {
            (0u32..60, 0u32..60, 0u32..60).prop_map(|(r, q, s)| ProgressCounts {
                resources_read: r,
                quizzes_completed: q,
                streak: s,
            })
        }

        proptest! {
            // Property: every pick is an eligible candidate.
            #[test]
            fn prop_picks_are_eligible(
                candidates in arb_milestones(),
                counts in arb_counts(),
                catchup in any::<bool>(),
            ) {
                let picks = pick_milestones(candidates.clone(), &counts, catchup);
                for pick in &picks {
                    prop_assert!(pick.threshold <= counts.get(pick.kind));
                    prop_assert!(candidates.contains(pick));
                }
            }

            // Property: without catch-up there is at most one pick per kind,
            // and it carries the highest eligible threshold of that kind.
            #[test]
            fn prop_highest_only_without_catchup(
                candidates in arb_milestones(),
                counts in arb_counts(),
            ) {
                let picks = pick_milestones(candidates.clone(), &counts, false);
                for kind in Kind::ALL {
                    let of_kind: Vec<_> = picks.iter().filter(|m| m.kind == kind).collect();
                    prop_assert!(of_kind.len() <= 1);
                    if let Some(pick) = of_kind.first() {
                        let max_eligible = candidates
                            .iter()
                            .filter(|m| m.kind == kind && m.threshold <= counts.get(kind))
                            .map(|m| m.threshold)
                            .max()
                            .unwrap();
                        prop_assert_eq!(pick.threshold, max_eligible);
                    }
                }
            }

            // Property: with catch-up, exactly the eligible candidates are
            // returned.
            #[test]
            fn prop_catchup_returns_all_eligible(
                candidates in arb_milestones(),
                counts in arb_counts(),
            ) {
                let picks = pick_milestones(candidates.clone(), &counts, true);
                let eligible = candidates
                    .iter()
                    .filter(|m| m.threshold <= counts.get(m.kind))
                    .count();
                prop_assert_eq!(picks.len(), eligible);
            }
        }
    }
}

//! One-shot definition cache.
//!
//! Both catalogs are loaded concurrently at subsystem start and exposed as
//! an immutable snapshot. Loading is fail-open per collection: an unreadable
//! catalog logs a warning and contributes nothing, and the cache is
//! considered ready once at least one catalog holds definitions. With both
//! empty, the evaluator simply never finds candidates.

use std::thread;

use tracing::{debug, warn};

use crate::catalog::defs::{BadgeDefinition, TaskDefinition};
use crate::catalog::source::CatalogSource;
use crate::error::FailOpen;

/// Immutable snapshot of both loaded catalogs.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    tasks: Vec<TaskDefinition>,
    badges: Vec<BadgeDefinition>,
}

impl CatalogSnapshot {
    /// Build a snapshot from already-loaded definitions, dropping entries
    /// with non-positive thresholds.
    pub fn new(tasks: Vec<TaskDefinition>, badges: Vec<BadgeDefinition>) -> Self {
        let tasks = tasks
            .into_iter()
            .filter(|t| {
                if !t.is_valid() {
                    warn!(id = %t.id, "dropping task definition with zero threshold");
                }
                t.is_valid()
            })
            .collect();
        let badges = badges
            .into_iter()
            .filter(|b| {
                if !b.is_valid() {
                    warn!(id = %b.id, "dropping badge definition with zero threshold");
                }
                b.is_valid()
            })
            .collect();
        Self { tasks, badges }
    }

    /// An empty snapshot (no definitions loaded).
    pub fn empty() -> Self {
        Self::default()
    }

    /// All task definitions.
    pub fn tasks(&self) -> &[TaskDefinition] {
        &self.tasks
    }

    /// All badge definitions.
    pub fn badges(&self) -> &[BadgeDefinition] {
        &self.badges
    }

    /// Look up a task definition by id.
    pub fn task(&self, id: &str) -> Option<&TaskDefinition> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Look up a badge definition by id.
    pub fn badge(&self, id: &str) -> Option<&BadgeDefinition> {
        self.badges.iter().find(|b| b.id == id)
    }

    /// True when neither catalog holds definitions.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.badges.is_empty()
    }
}

/// One-time bulk load of task and badge definitions.
#[derive(Debug, Clone, Default)]
pub struct DefinitionCache {
    snapshot: CatalogSnapshot,
}

impl DefinitionCache {
    /// Load both catalogs concurrently from a source.
    ///
    /// Each collection fails open to empty so a broken catalog file cannot
    /// prevent the other catalog from operating.
    pub fn load(source: &dyn CatalogSource) -> Self {
        let (tasks, badges) = thread::scope(|scope| {
            let tasks = scope.spawn(|| source.load_tasks().fail_open_default("loading tasks"));
            let badges = scope.spawn(|| source.load_badges().fail_open_default("loading badges"));
            (
                tasks.join().unwrap_or_default(),
                badges.join().unwrap_or_default(),
            )
        });

        let snapshot = CatalogSnapshot::new(tasks, badges);
        debug!(
            tasks = snapshot.tasks().len(),
            badges = snapshot.badges().len(),
            "definition cache loaded"
        );
        Self { snapshot }
    }

    /// Build a cache directly from a snapshot (tests, embedding).
    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Self {
        Self { snapshot }
    }

    /// The dependent subsystem is ready once at least one catalog loaded.
    pub fn is_ready(&self) -> bool {
        !self.snapshot.is_empty()
    }

    /// The loaded snapshot.
    pub fn snapshot(&self) -> &CatalogSnapshot {
        &self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::defs::{BadgeCondition, Kind};
    use crate::catalog::source::{FileCatalogSource, StaticCatalogSource};
    use tempfile::TempDir;

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

    #[test]
    fn test_load_both_catalogs() {
        let source = StaticCatalogSource::new(
            vec![task("t1", Kind::ResourceRead, 1, 10)],
            vec![badge("b1", Kind::Streak, 7, 70)],
        );
        let cache = DefinitionCache::load(&source);
        assert!(cache.is_ready());
        assert_eq!(cache.snapshot().tasks().len(), 1);
        assert_eq!(cache.snapshot().badges().len(), 1);
    }

    #[test]
    fn test_ready_with_only_one_catalog() {
        let source = StaticCatalogSource::new(vec![task("t1", Kind::Streak, 3, 30)], vec![]);
        let cache = DefinitionCache::load(&source);
        assert!(cache.is_ready());
    }

    #[test]
    fn test_not_ready_with_no_definitions() {
        let source = StaticCatalogSource::default();
        let cache = DefinitionCache::load(&source);
        assert!(!cache.is_ready());
        assert!(cache.snapshot().is_empty());
    }

    #[test]
    fn test_broken_catalog_fails_open_to_empty() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("tasks.json"), "not json").unwrap();
        std::fs::write(
            temp.path().join("badges.json"),
            r#"[{"id":"b1","condition":{"type":"streak","value":7},"xpReward":70}]"#,
        )
        .unwrap();

        let cache = DefinitionCache::load(&FileCatalogSource::new(temp.path()));
        assert!(cache.is_ready());
        assert!(cache.snapshot().tasks().is_empty());
        assert_eq!(cache.snapshot().badges().len(), 1);
    }

    #[test]
    fn test_invalid_definitions_dropped() {
        let source = StaticCatalogSource::new(
            vec![
                task("ok", Kind::ResourceRead, 1, 10),
                task("zero", Kind::ResourceRead, 0, 10),
            ],
            vec![badge("zero", Kind::Streak, 0, 70)],
        );
        let cache = DefinitionCache::load(&source);
        assert_eq!(cache.snapshot().tasks().len(), 1);
        assert!(cache.snapshot().badges().is_empty());
    }

    #[test]
    fn test_snapshot_lookup_by_id() {
        let snapshot = CatalogSnapshot::new(
            vec![task("t1", Kind::Streak, 3, 30)],
            vec![badge("b1", Kind::Streak, 7, 70)],
        );
        assert_eq!(snapshot.task("t1").unwrap().xp_reward, 30);
        assert_eq!(snapshot.badge("b1").unwrap().xp_reward, 70);
        assert!(snapshot.task("missing").is_none());
        assert!(snapshot.badge("missing").is_none());
    }
}

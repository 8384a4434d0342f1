//! Catalog sources for task and badge definitions.
//!
//! A [`CatalogSource`] is the bulk-fetch seam the definition cache loads
//! from. The file source reads the two JSON collections under the data
//! directory; the static source holds definitions in memory for tests and
//! seeding.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::catalog::defs::{BadgeDefinition, TaskDefinition};
use crate::error::{LaurelError, Result};

/// Trait for bulk-fetchable definition collections.
///
/// Both collections are read-only and loaded once per session.
pub trait CatalogSource: Send + Sync {
    /// Load every task definition.
    fn load_tasks(&self) -> Result<Vec<TaskDefinition>>;

    /// Load every badge definition.
    fn load_badges(&self) -> Result<Vec<BadgeDefinition>>;
}

/// Blanket implementation for Arc-wrapped sources.
impl<T: CatalogSource + ?Sized> CatalogSource for Arc<T> {
    fn load_tasks(&self) -> Result<Vec<TaskDefinition>> {
        (**self).load_tasks()
    }

    fn load_badges(&self) -> Result<Vec<BadgeDefinition>> {
        (**self).load_badges()
    }
}

/// File-backed catalog source.
///
/// Reads `tasks.json` and `badges.json` from a directory. A missing file is
/// an empty collection, not an error; a malformed file is an error.
#[derive(Debug, Clone)]
pub struct FileCatalogSource {
    dir: PathBuf,
}

impl FileCatalogSource {
    /// Create a source reading from the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the tasks collection file.
    pub fn tasks_path(&self) -> PathBuf {
        self.dir.join("tasks.json")
    }

    /// Path of the badges collection file.
    pub fn badges_path(&self) -> PathBuf {
        self.dir.join("badges.json")
    }

    fn load_collection<T: serde::de::DeserializeOwned>(&self, path: PathBuf) -> Result<Vec<T>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path).map_err(|e| LaurelError::storage(&path, e))?;
        serde_json::from_str(&content)
            .map_err(|e| LaurelError::catalog(format!("{}: {}", path.display(), e)))
    }
}

impl CatalogSource for FileCatalogSource {
    fn load_tasks(&self) -> Result<Vec<TaskDefinition>> {
        self.load_collection(self.tasks_path())
    }

    fn load_badges(&self) -> Result<Vec<BadgeDefinition>> {
        self.load_collection(self.badges_path())
    }
}

/// In-memory catalog source for tests and seeding.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalogSource {
    tasks: Vec<TaskDefinition>,
    badges: Vec<BadgeDefinition>,
}

impl StaticCatalogSource {
    /// Create a source holding the given definitions.
    pub fn new(tasks: Vec<TaskDefinition>, badges: Vec<BadgeDefinition>) -> Self {
        Self { tasks, badges }
    }
}

impl CatalogSource for StaticCatalogSource {
    fn load_tasks(&self) -> Result<Vec<TaskDefinition>> {
        Ok(self.tasks.clone())
    }

    fn load_badges(&self) -> Result<Vec<BadgeDefinition>> {
        Ok(self.badges.clone())
    }
}

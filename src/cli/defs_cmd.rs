//! Defs command for Laurel.
//!
//! Lists the loaded task and badge definitions.

use std::sync::Arc;

use serde::Serialize;

use crate::catalog::{BadgeDefinition, DefinitionCache, TaskDefinition};

/// Output format for the defs command.
#[derive(Debug, Clone, Serialize)]
pub struct DefsOutput {
    /// Whether at least one catalog holds definitions.
    pub ready: bool,
    pub tasks: Vec<TaskDefinition>,
    pub badges: Vec<BadgeDefinition>,
}

/// The defs command implementation.
pub struct DefsCommand {
    defs: Arc<DefinitionCache>,
}

impl DefsCommand {
    /// Create a new defs command over a loaded cache.
    pub fn new(defs: Arc<DefinitionCache>) -> Self {
        Self { defs }
    }

    /// Run the defs command.
    pub fn run(&self) -> DefsOutput {
        let snapshot = self.defs.snapshot();
        DefsOutput {
            ready: self.defs.is_ready(),
            tasks: snapshot.tasks().to_vec(),
            badges: snapshot.badges().to_vec(),
        }
    }
}

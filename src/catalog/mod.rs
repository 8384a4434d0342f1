//! Task and badge catalogs.
//!
//! Definitions are loaded once per session through a [`CatalogSource`] and
//! served as an immutable [`CatalogSnapshot`] by the [`DefinitionCache`].

pub mod cache;
pub mod defs;
pub mod source;

pub use cache::{CatalogSnapshot, DefinitionCache};
pub use defs::{
    BadgeCondition, BadgeDefinition, Kind, Milestone, MilestoneSource, TaskDefinition,
};
pub use source::{CatalogSource, FileCatalogSource, StaticCatalogSource};

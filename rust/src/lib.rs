//! Dependency derivation and critical-path scheduling for hierarchical task matrices.
//!
//! A matrix of sections, categories, tasks and phases is flattened into
//! WBS-coded tasks, dependencies are derived from a fixed rule set, and a
//! two-pass CPM solver assigns working-day dates, slack and criticality.
//! The scheduled set can then be explained (blockers) or projected into
//! downstream work-item payloads.

// Allow clippy warning triggered by PyO3 macro expansion
#![cfg_attr(feature = "python", allow(clippy::useless_conversion))]

pub mod logging;

pub mod blockers;
pub mod calendar;
mod config;
pub mod cpm;
pub mod derive;
mod error;
pub mod hierarchy;
pub mod index;
mod models;
pub mod payload;
pub mod pipeline;
pub mod rollup;
pub mod wbs;

#[cfg(feature = "python")]
mod python;

pub use blockers::{
    analyze_blockers, analyze_blockers_with, Blocker, BlockerAnalysis, BlockerMap, ResourceOverlap,
};
pub use calendar::{DurationRounding, WorkingCalendar};
pub use config::{EngineConfig, MappingConfig, UnresolvedIdentityPolicy};
pub use cpm::{topological_order, CpmScheduler, ScheduleSummary, TaskTiming};
pub use derive::{derive_dependencies, DependencyEdge, DependencyRule, DerivationReport};
pub use error::{EngineError, HierarchyError, PayloadError, ScheduleError};
pub use hierarchy::{build_hierarchy, build_tasks, validate_matrix, Hierarchy, Matrix};
pub use models::Task;
pub use payload::{
    map_payloads, DownstreamMapper, IdentityResolver, MappingOutcome, PayloadMapper, TaskPayload,
};
pub use pipeline::{run_schedule, run_tasks, ScheduleRun, Warning};
pub use rollup::rollup_parents;

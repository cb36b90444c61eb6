//! Full scheduling run: validate, build, derive, schedule, roll up, analyze.
//!
//! Each stage consumes the previous stage's output completely. Any structural
//! error aborts the run and nothing partial is returned.

use rustc_hash::FxHashSet;

use crate::blockers::{analyze_blockers_with, BlockerAnalysis, BlockerMap};
use crate::calendar::WorkingCalendar;
use crate::config::EngineConfig;
use crate::cpm::{CpmScheduler, ScheduleSummary};
use crate::derive::{derive_dependencies, DerivationReport};
use crate::error::EngineError;
use crate::hierarchy::{build_hierarchy, validate_matrix, validate_tasks, Hierarchy, Matrix};
use crate::log_changes;
use crate::models::Task;
use crate::rollup::rollup_parents;
use crate::wbs;

/// Data-quality findings that do not abort a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Warning {
    /// The task cannot meet the backward-pass anchor.
    NegativeSlack(String),
    /// An owning task is flagged as delayed.
    DelayedParent(String),
    /// A dependency points at a code that is not part of the run.
    DanglingReference { task: String, reference: String },
}

/// Everything a run produces.
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduleRun {
    /// Scheduled leaf tasks in build order.
    pub tasks: Vec<Task>,
    /// Owning-task records rolled up from their phases.
    pub parents: Vec<Task>,
    pub derivation: DerivationReport,
    pub summary: ScheduleSummary,
    pub blockers: BlockerAnalysis,
    pub warnings: Vec<Warning>,
}

impl ScheduleRun {
    pub fn blocker_map(&self) -> BlockerMap {
        self.blockers.to_map()
    }

    pub fn task(&self, wbs_code: &str) -> Option<&Task> {
        self.tasks
            .iter()
            .chain(&self.parents)
            .find(|t| t.wbs_code == wbs_code)
    }
}

/// Schedule a task matrix.
///
/// The rounding policy in `config` replaces the calendar's own.
pub fn run_schedule(
    matrix: &Matrix,
    calendar: WorkingCalendar,
    config: &EngineConfig,
) -> Result<ScheduleRun, EngineError> {
    validate_matrix(matrix)?;
    let Hierarchy { phases, parents } = build_hierarchy(matrix);
    log_changes!(
        config.verbosity,
        "built {} phase(s) under {} task(s)",
        phases.len(),
        parents.len()
    );
    run_with_parents(phases, parents, calendar, config)
}

/// Schedule an already-flattened task list, e.g. one carrying explicit
/// dependencies from an earlier run.
///
/// Every `parent_wbs` that is not itself in the list gets an owning-task
/// record, rolled up like the ones `run_schedule` builds.
pub fn run_tasks(
    tasks: Vec<Task>,
    calendar: WorkingCalendar,
    config: &EngineConfig,
) -> Result<ScheduleRun, EngineError> {
    validate_tasks(&tasks)?;
    let parents = owning_records(&tasks);
    run_with_parents(tasks, parents, calendar, config)
}

/// One unscheduled record per referenced parent code missing from `tasks`.
fn owning_records(tasks: &[Task]) -> Vec<Task> {
    let known: FxHashSet<&str> = tasks.iter().map(|t| t.wbs_code.as_str()).collect();
    let mut codes: Vec<&str> = tasks
        .iter()
        .filter_map(|t| t.parent_wbs.as_deref())
        .filter(|code| !known.contains(code))
        .collect();
    wbs::sort_codes(&mut codes);
    codes.dedup();
    codes
        .into_iter()
        .map(|code| {
            let record = Task::new(code, code, 0.0);
            match wbs::parent(code) {
                Some(parent) => record.with_parent(parent),
                None => record,
            }
        })
        .collect()
}

fn run_with_parents(
    mut tasks: Vec<Task>,
    mut parents: Vec<Task>,
    calendar: WorkingCalendar,
    config: &EngineConfig,
) -> Result<ScheduleRun, EngineError> {
    let calendar = calendar.with_rounding(config.rounding);

    let derivation = derive_dependencies(&mut tasks, &config.rules, config.verbosity);
    let summary = CpmScheduler::new(&calendar)
        .with_deadline(config.project_deadline)
        .with_verbosity(config.verbosity)
        .schedule(&mut tasks)?;
    rollup_parents(&mut parents, &tasks, &calendar);
    let blockers = analyze_blockers_with(&tasks, &parents, config.resource_overlap);

    let mut warnings: Vec<Warning> = summary
        .negative_slack
        .iter()
        .cloned()
        .map(Warning::NegativeSlack)
        .collect();
    warnings.extend(
        blockers
            .delayed_parents
            .iter()
            .cloned()
            .map(Warning::DelayedParent),
    );
    for (task, reference) in &summary.dangling_references {
        tracing::warn!(task = %task, reference = %reference, "dependency on unknown task");
        warnings.push(Warning::DanglingReference {
            task: task.clone(),
            reference: reference.clone(),
        });
    }

    Ok(ScheduleRun {
        tasks,
        parents,
        derivation,
        summary,
        blockers,
        warnings,
    })
}

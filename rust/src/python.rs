//! Python bindings.
//!
//! Matrices and configuration cross the boundary as JSON strings so the
//! Python side does not need mirror classes for every input type.

use std::collections::HashMap;

use chrono::NaiveDate;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::calendar::WorkingCalendar;
use crate::config::{EngineConfig, MappingConfig};
use crate::hierarchy::Matrix;
use crate::models::Task;
use crate::payload;
use crate::pipeline::{run_schedule, ScheduleRun, Warning};

fn value_error(e: impl std::fmt::Display) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn parse_json<T: serde::de::DeserializeOwned + Default>(json: Option<&str>) -> PyResult<T> {
    match json {
        Some(text) => serde_json::from_str(text).map_err(value_error),
        None => Ok(T::default()),
    }
}

/// A scheduled task or owning-task record.
#[pyclass(name = "ScheduledTask")]
#[derive(Clone, Debug)]
pub struct PyScheduledTask {
    #[pyo3(get)]
    pub wbs_code: String,
    #[pyo3(get)]
    pub name: String,
    #[pyo3(get)]
    pub duration_days: f64,
    #[pyo3(get)]
    pub assigned_to: String,
    #[pyo3(get)]
    pub parent_wbs: Option<String>,
    #[pyo3(get)]
    pub depends_on: Vec<String>,
    #[pyo3(get)]
    pub earliest_start: Option<NaiveDate>,
    #[pyo3(get)]
    pub earliest_finish: Option<NaiveDate>,
    #[pyo3(get)]
    pub latest_start: Option<NaiveDate>,
    #[pyo3(get)]
    pub latest_finish: Option<NaiveDate>,
    #[pyo3(get)]
    pub slack: Option<i64>,
    #[pyo3(get)]
    pub is_critical: bool,
}

#[pymethods]
impl PyScheduledTask {
    fn __repr__(&self) -> String {
        format!(
            "ScheduledTask(wbs_code={:?}, es={:?}, ef={:?}, slack={:?}, critical={})",
            self.wbs_code, self.earliest_start, self.earliest_finish, self.slack, self.is_critical
        )
    }
}

impl From<&Task> for PyScheduledTask {
    fn from(task: &Task) -> Self {
        Self {
            wbs_code: task.wbs_code.clone(),
            name: task.name.clone(),
            duration_days: task.duration_days,
            assigned_to: task.assigned_to.clone(),
            parent_wbs: task.parent_wbs.clone(),
            depends_on: task.depends_on.clone(),
            earliest_start: task.earliest_start,
            earliest_finish: task.earliest_finish,
            latest_start: task.latest_start,
            latest_finish: task.latest_finish,
            slack: task.slack,
            is_critical: task.is_critical,
        }
    }
}

/// Result of `schedule_matrix`.
#[pyclass(name = "ScheduleResult")]
#[derive(Clone, Debug)]
pub struct PyScheduleResult {
    #[pyo3(get)]
    pub tasks: Vec<PyScheduledTask>,
    #[pyo3(get)]
    pub parents: Vec<PyScheduledTask>,
    #[pyo3(get)]
    pub blockers: HashMap<String, Vec<String>>,
    #[pyo3(get)]
    pub critical_path: Vec<String>,
    #[pyo3(get)]
    pub project_end: NaiveDate,
    #[pyo3(get)]
    pub warnings: Vec<String>,
}

#[pymethods]
impl PyScheduleResult {
    fn __repr__(&self) -> String {
        format!(
            "ScheduleResult(tasks={}, critical={}, project_end={}, warnings={})",
            self.tasks.len(),
            self.critical_path.len(),
            self.project_end,
            self.warnings.len()
        )
    }
}

fn describe_warning(warning: &Warning) -> String {
    match warning {
        Warning::NegativeSlack(code) => format!("negative slack: {code}"),
        Warning::DelayedParent(code) => format!("parent delayed: {code}"),
        Warning::DanglingReference { task, reference } => {
            format!("unknown dependency: {task} -> {reference}")
        }
    }
}

impl From<&ScheduleRun> for PyScheduleResult {
    fn from(run: &ScheduleRun) -> Self {
        Self {
            tasks: run.tasks.iter().map(PyScheduledTask::from).collect(),
            parents: run.parents.iter().map(PyScheduledTask::from).collect(),
            blockers: run.blocker_map().into_iter().collect(),
            critical_path: run.summary.critical_path.clone(),
            project_end: run.summary.project_end,
            warnings: run.warnings.iter().map(describe_warning).collect(),
        }
    }
}

fn run_from_json(
    matrix_json: &str,
    reference_date: NaiveDate,
    holidays: Vec<NaiveDate>,
    config_json: Option<&str>,
) -> PyResult<ScheduleRun> {
    let matrix: Matrix = serde_json::from_str(matrix_json).map_err(value_error)?;
    let config: EngineConfig = parse_json(config_json)?;
    let calendar = WorkingCalendar::new(reference_date, holidays);
    run_schedule(&matrix, calendar, &config).map_err(value_error)
}

/// Build, derive and schedule a task matrix.
///
/// # Raises
/// * ValueError on malformed input, a dependency cycle or duplicate codes
#[pyfunction]
#[pyo3(signature = (matrix_json, reference_date, holidays=Vec::new(), config_json=None))]
fn schedule_matrix(
    matrix_json: &str,
    reference_date: NaiveDate,
    holidays: Vec<NaiveDate>,
    config_json: Option<&str>,
) -> PyResult<PyScheduleResult> {
    let run = run_from_json(matrix_json, reference_date, holidays, config_json)?;
    Ok(PyScheduleResult::from(&run))
}

/// Schedule a matrix and map it to downstream payloads, returned as JSON.
///
/// `identities` maps employee codes to external identities.
#[pyfunction]
#[pyo3(signature = (matrix_json, reference_date, identities, holidays=Vec::new(), config_json=None, mapping_json=None))]
fn map_payloads(
    matrix_json: &str,
    reference_date: NaiveDate,
    identities: HashMap<String, String>,
    holidays: Vec<NaiveDate>,
    config_json: Option<&str>,
    mapping_json: Option<&str>,
) -> PyResult<String> {
    let run = run_from_json(matrix_json, reference_date, holidays, config_json)?;
    let mapping: MappingConfig = parse_json(mapping_json)?;
    let outcome = payload::map_payloads(&run.tasks, &run.parents, &run.blockers, identities, mapping)
        .map_err(value_error)?;
    serde_json::to_string(&outcome).map_err(value_error)
}

/// The wbs_schedule Python module.
#[pymodule]
fn wbs_schedule(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyScheduledTask>()?;
    m.add_class::<PyScheduleResult>()?;

    m.add_function(wrap_pyfunction!(schedule_matrix, m)?)?;
    m.add_function(wrap_pyfunction!(map_payloads, m)?)?;

    Ok(())
}

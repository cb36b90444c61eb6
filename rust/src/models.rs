//! Core data types for a scheduling run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One schedulable unit: a phase of a task in the matrix, or the summary
/// record of an owning task.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub wbs_code: String,
    pub name: String,
    pub duration_days: f64,
    /// Employee code; empty when unassigned.
    #[serde(default)]
    pub assigned_to: String,
    #[serde(default)]
    pub parent_wbs: Option<String>,
    /// Finish-to-start predecessors, in insertion order.
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub earliest_start: Option<NaiveDate>,
    #[serde(default)]
    pub earliest_finish: Option<NaiveDate>,
    #[serde(default)]
    pub latest_start: Option<NaiveDate>,
    #[serde(default)]
    pub latest_finish: Option<NaiveDate>,
    /// Working days between earliest and latest start. Negative means infeasible.
    #[serde(default)]
    pub slack: Option<i64>,
    #[serde(default)]
    pub is_critical: bool,
}

impl Task {
    pub fn new(wbs_code: impl Into<String>, name: impl Into<String>, duration_days: f64) -> Self {
        Self {
            wbs_code: wbs_code.into(),
            name: name.into(),
            duration_days,
            ..Self::default()
        }
    }

    pub fn with_assignee(mut self, assigned_to: impl Into<String>) -> Self {
        self.assigned_to = assigned_to.into();
        self
    }

    pub fn with_parent(mut self, parent_wbs: impl Into<String>) -> Self {
        self.parent_wbs = Some(parent_wbs.into());
        self
    }

    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for dep in deps {
            self.add_dependency(dep);
        }
        self
    }

    /// Append a predecessor. Returns false if it was already present.
    pub fn add_dependency(&mut self, wbs_code: impl Into<String>) -> bool {
        let wbs_code = wbs_code.into();
        if self.depends_on.contains(&wbs_code) {
            return false;
        }
        self.depends_on.push(wbs_code);
        true
    }

    pub fn depends_on(&self, wbs_code: &str) -> bool {
        self.depends_on.iter().any(|d| d == wbs_code)
    }

    pub fn is_assigned(&self) -> bool {
        !self.assigned_to.trim().is_empty()
    }

    /// True once the scheduler has filled in all four dates.
    pub fn is_scheduled(&self) -> bool {
        self.earliest_start.is_some()
            && self.earliest_finish.is_some()
            && self.latest_start.is_some()
            && self.latest_finish.is_some()
    }

    /// Earliest window `[start, finish)` if scheduled.
    pub fn window(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.earliest_start?, self.earliest_finish?))
    }

    /// Clear the schedule fields so the task can be scheduled again.
    pub fn clear_schedule(&mut self) {
        self.earliest_start = None;
        self.earliest_finish = None;
        self.latest_start = None;
        self.latest_finish = None;
        self.slack = None;
        self.is_critical = false;
    }
}

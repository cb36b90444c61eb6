//! Flattening the section/category/task/phase matrix into WBS-coded tasks.

use serde::{Deserialize, Serialize};

use crate::error::HierarchyError;
use crate::models::Task;
use crate::wbs;

/// Nested task matrix as handed over by the parsing layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    #[serde(default)]
    pub sections: Vec<Section>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub categories: Vec<Category>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tasks: Vec<MatrixTask>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MatrixTask {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phases: Vec<Phase>,
}

/// One workflow step of a task (e.g. preparation, review, approval).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    #[serde(default)]
    pub label: String,
    #[serde(default, alias = "assignee")]
    pub assigned_to: String,
    #[serde(default, alias = "duration")]
    pub duration_days: f64,
}

impl Matrix {
    pub fn new(sections: Vec<Section>) -> Self {
        Self { sections }
    }
}

impl Section {
    pub fn new(name: impl Into<String>, categories: Vec<Category>) -> Self {
        Self {
            name: name.into(),
            categories,
        }
    }
}

impl Category {
    pub fn new(name: impl Into<String>, tasks: Vec<MatrixTask>) -> Self {
        Self {
            name: name.into(),
            tasks,
        }
    }
}

impl MatrixTask {
    pub fn new(name: impl Into<String>, phases: Vec<Phase>) -> Self {
        Self {
            name: name.into(),
            phases,
        }
    }
}

impl Phase {
    pub fn new(label: impl Into<String>, assigned_to: impl Into<String>, duration_days: f64) -> Self {
        Self {
            label: label.into(),
            assigned_to: assigned_to.into(),
            duration_days,
        }
    }
}

/// Leaf phases plus one summary record per owning task.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Hierarchy {
    pub phases: Vec<Task>,
    /// Owning-task records (`s.c.t`, parent `s.c`), unscheduled until rolled up.
    pub parents: Vec<Task>,
}

/// Longest phase accepted, in working days (about fourteen working years).
pub const MAX_DURATION_DAYS: f64 = 3650.0;

fn duration_problem(days: f64) -> Option<&'static str> {
    if !days.is_finite() || days < 0.0 {
        Some("duration must be a non-negative number of days")
    } else if days > MAX_DURATION_DAYS {
        Some("duration exceeds the longest accepted phase")
    } else {
        None
    }
}

fn malformed(path: String, reason: &str) -> HierarchyError {
    HierarchyError::MalformedHierarchy {
        path,
        reason: reason.to_string(),
    }
}

/// Check the matrix for missing identifiers, empty tasks and bad durations.
///
/// Building does not validate; callers run this first.
pub fn validate_matrix(matrix: &Matrix) -> Result<(), HierarchyError> {
    for (s, section) in matrix.sections.iter().enumerate() {
        let section_path = format!("section {}", s + 1);
        if section.name.trim().is_empty() {
            return Err(malformed(section_path, "section has no name"));
        }
        for (c, category) in section.categories.iter().enumerate() {
            let category_path = format!("{section_path} / category {}", c + 1);
            if category.name.trim().is_empty() {
                return Err(malformed(category_path, "category has no name"));
            }
            for (t, task) in category.tasks.iter().enumerate() {
                let task_path = format!("{category_path} / task {}", t + 1);
                if task.name.trim().is_empty() {
                    return Err(malformed(task_path, "task has no name"));
                }
                if task.phases.is_empty() {
                    return Err(malformed(task_path, "task has no phases"));
                }
                for (p, phase) in task.phases.iter().enumerate() {
                    let phase_path = format!("{task_path} / phase {}", p + 1);
                    if phase.label.trim().is_empty() {
                        return Err(malformed(phase_path, "phase has no label"));
                    }
                    if let Some(reason) = duration_problem(phase.duration_days) {
                        return Err(malformed(phase_path, reason));
                    }
                }
            }
        }
    }
    Ok(())
}

/// Duration checks for a task list that did not come from a matrix.
pub fn validate_tasks(tasks: &[Task]) -> Result<(), HierarchyError> {
    for task in tasks {
        if let Some(reason) = duration_problem(task.duration_days) {
            return Err(malformed(format!("task {}", task.wbs_code), reason));
        }
    }
    Ok(())
}

/// Flatten the matrix into one task per phase.
///
/// Codes are `{section}.{category}.{task}.{phase}`, 1-based, and depend only
/// on input order.
pub fn build_tasks(matrix: &Matrix) -> Vec<Task> {
    build_hierarchy(matrix).phases
}

/// Flatten the matrix into phases and owning-task records.
pub fn build_hierarchy(matrix: &Matrix) -> Hierarchy {
    let mut hierarchy = Hierarchy::default();
    for (s, section) in matrix.sections.iter().enumerate() {
        for (c, category) in section.categories.iter().enumerate() {
            for (t, task) in category.tasks.iter().enumerate() {
                let task_code = wbs::join(&[s + 1, c + 1, t + 1]);
                let mut record = Task::new(task_code.clone(), task.name.clone(), 0.0);
                if let Some(category_code) = wbs::parent(&task_code) {
                    record = record.with_parent(category_code);
                }
                hierarchy.parents.push(record);
                for (p, phase) in task.phases.iter().enumerate() {
                    let code = wbs::join(&[s + 1, c + 1, t + 1, p + 1]);
                    hierarchy.phases.push(
                        Task::new(
                            code,
                            format!("{} - {}", task.name, phase.label),
                            phase.duration_days,
                        )
                        .with_assignee(phase.assigned_to.trim())
                        .with_parent(task_code.clone()),
                    );
                }
            }
        }
    }
    hierarchy
}

//! Dependency derivation rules.
//!
//! Each rule is a pure function from a task snapshot to the edges it wants to
//! add. [`derive_dependencies`] evaluates the requested rules against the same
//! snapshot and then appends the new edges in one batch, in rule order.
//! Edges are only ever appended; existing entries are never removed or moved.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::log_changes;
use crate::log_checks;
use crate::models::Task;
use crate::wbs;

/// A named derivation strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyRule {
    /// Phases of one owning task run in WBS order.
    PhaseSequence,
    /// Entry phases of section N+1 wait for the last phase of section N.
    SectionSequence,
    /// One assignee works on one task at a time within a section.
    ResourceConflict,
}

impl DependencyRule {
    /// Every rule, in the order they are applied.
    pub const ALL: [DependencyRule; 3] = [
        DependencyRule::PhaseSequence,
        DependencyRule::SectionSequence,
        DependencyRule::ResourceConflict,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DependencyRule::PhaseSequence => "phase_sequence",
            DependencyRule::SectionSequence => "section_sequence",
            DependencyRule::ResourceConflict => "resource_conflict",
        }
    }

    /// Edges this rule derives from the snapshot.
    pub fn edges(self, tasks: &[Task]) -> Vec<DependencyEdge> {
        let mut edges = match self {
            DependencyRule::PhaseSequence => phase_sequence_edges(tasks),
            DependencyRule::SectionSequence => section_sequence_edges(tasks),
            DependencyRule::ResourceConflict => resource_conflict_edges(tasks),
        };
        edges.sort_by(|a, b| {
            wbs::compare(&a.task, &b.task).then_with(|| wbs::compare(&a.predecessor, &b.predecessor))
        });
        edges
    }
}

/// `task` must not start before `predecessor` finishes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DependencyEdge {
    pub task: String,
    pub predecessor: String,
    pub rule: DependencyRule,
}

impl DependencyEdge {
    fn new(task: &str, predecessor: &str, rule: DependencyRule) -> Self {
        Self {
            task: task.to_string(),
            predecessor: predecessor.to_string(),
            rule,
        }
    }
}

/// Edges actually appended by a derivation run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DerivationReport {
    pub added: Vec<DependencyEdge>,
}

impl DerivationReport {
    /// Number of edges a rule contributed.
    pub fn count(&self, rule: DependencyRule) -> usize {
        self.added.iter().filter(|e| e.rule == rule).count()
    }
}

/// Group task references by a key, each group sorted by WBS code.
fn group_sorted<'a, F>(tasks: &'a [Task], key: F) -> Vec<(&'a str, Vec<&'a Task>)>
where
    F: Fn(&'a Task) -> Option<&'a str>,
{
    let mut groups: FxHashMap<&str, Vec<&Task>> = FxHashMap::default();
    for task in tasks {
        if let Some(k) = key(task) {
            groups.entry(k).or_default().push(task);
        }
    }
    let mut groups: Vec<(&str, Vec<&Task>)> = groups.into_iter().collect();
    groups.sort_by(|a, b| wbs::compare(a.0, b.0));
    for (_, members) in &mut groups {
        members.sort_by(|a, b| wbs::compare(&a.wbs_code, &b.wbs_code));
    }
    groups
}

/// Within each owning task, every phase depends on the phase before it.
pub fn phase_sequence_edges(tasks: &[Task]) -> Vec<DependencyEdge> {
    let mut edges = Vec::new();
    for (_, phases) in group_sorted(tasks, |t| t.parent_wbs.as_deref()) {
        for pair in phases.windows(2) {
            edges.push(DependencyEdge::new(
                &pair[1].wbs_code,
                &pair[0].wbs_code,
                DependencyRule::PhaseSequence,
            ));
        }
    }
    edges
}

/// First phases of every task in a section depend on the highest-coded task
/// of the preceding section.
pub fn section_sequence_edges(tasks: &[Task]) -> Vec<DependencyEdge> {
    let sections = group_sorted(tasks, |t| Some(wbs::section(&t.wbs_code)));
    let mut edges = Vec::new();
    for pair in sections.windows(2) {
        let (_, previous) = &pair[0];
        let (_, next) = &pair[1];
        let Some(last) = previous.last() else {
            continue;
        };
        for task in next {
            if wbs::last_segment(&task.wbs_code) == "1" {
                edges.push(DependencyEdge::new(
                    &task.wbs_code,
                    &last.wbs_code,
                    DependencyRule::SectionSequence,
                ));
            }
        }
    }
    edges
}

/// Consecutive tasks of the same assignee within one section are serialized.
///
/// Unassigned tasks are not grouped.
pub fn resource_conflict_edges(tasks: &[Task]) -> Vec<DependencyEdge> {
    let groups = group_sorted(tasks, |t| {
        let who = t.assigned_to.trim();
        (!who.is_empty()).then_some(who)
    });
    let mut edges = Vec::new();
    for (_, assigned) in groups {
        for pair in assigned.windows(2) {
            let (earlier, later) = (pair[0], pair[1]);
            if wbs::section(&earlier.wbs_code) == wbs::section(&later.wbs_code) {
                edges.push(DependencyEdge::new(
                    &later.wbs_code,
                    &earlier.wbs_code,
                    DependencyRule::ResourceConflict,
                ));
            }
        }
    }
    edges
}

/// Evaluate `rules` against the current tasks and append the new edges.
///
/// Edges that already exist, or that an earlier rule in the same batch
/// already added, are skipped. References to unknown tasks are not produced
/// by any rule; dependencies already on a task are left as they are.
pub fn derive_dependencies(
    tasks: &mut [Task],
    rules: &[DependencyRule],
    verbosity: u8,
) -> DerivationReport {
    let mut existing: FxHashSet<(String, String)> = tasks
        .iter()
        .flat_map(|t| {
            t.depends_on
                .iter()
                .map(move |dep| (t.wbs_code.clone(), dep.clone()))
        })
        .collect();

    let mut pending: Vec<DependencyEdge> = Vec::new();
    for &rule in rules {
        let mut added_by_rule = 0usize;
        for edge in rule.edges(tasks) {
            if existing.insert((edge.task.clone(), edge.predecessor.clone())) {
                added_by_rule += 1;
                pending.push(edge);
            }
        }
        log_checks!(
            verbosity,
            "rule {} derived {} new edge(s)",
            rule.name(),
            added_by_rule
        );
    }

    let positions: FxHashMap<String, usize> = tasks
        .iter()
        .enumerate()
        .map(|(i, t)| (t.wbs_code.clone(), i))
        .collect();
    for edge in &pending {
        if let Some(&pos) = positions.get(&edge.task) {
            tasks[pos].add_dependency(edge.predecessor.clone());
            log_changes!(
                verbosity,
                "{} now depends on {} ({})",
                edge.task,
                edge.predecessor,
                edge.rule.name()
            );
        }
    }

    DerivationReport { added: pending }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phase(code: &str, who: &str) -> Task {
        let parent = wbs::parent(code).unwrap_or(code).to_string();
        Task::new(code, code, 1.0)
            .with_assignee(who)
            .with_parent(parent)
    }

    fn pairs(edges: &[DependencyEdge]) -> Vec<(&str, &str)> {
        edges
            .iter()
            .map(|e| (e.task.as_str(), e.predecessor.as_str()))
            .collect()
    }

    #[test]
    fn test_phase_sequence_chains_phases_of_one_task() {
        let tasks = vec![
            phase("1.1.1.3", "A"),
            phase("1.1.1.1", "B"),
            phase("1.1.1.2", "C"),
            phase("1.1.2.1", "A"),
        ];
        let edges = DependencyRule::PhaseSequence.edges(&tasks);
        assert_eq!(
            pairs(&edges),
            vec![("1.1.1.2", "1.1.1.1"), ("1.1.1.3", "1.1.1.2")]
        );
    }

    #[test]
    fn test_phase_sequence_orders_numerically() {
        let mut tasks: Vec<Task> = (1..=10).map(|p| phase(&format!("1.1.1.{p}"), "")).collect();
        tasks.reverse();
        let edges = DependencyRule::PhaseSequence.edges(&tasks);
        assert_eq!(edges.len(), 9);
        assert!(edges
            .iter()
            .any(|e| e.task == "1.1.1.10" && e.predecessor == "1.1.1.9"));
    }

    #[test]
    fn test_section_sequence_links_entry_phases() {
        let tasks = vec![
            phase("1.1.1.1", "A"),
            phase("1.1.1.2", "A"),
            phase("1.2.1.1", "B"),
            phase("2.1.1.1", "C"),
            phase("2.1.1.2", "C"),
            phase("2.1.2.1", "D"),
            phase("3.1.1.1", "E"),
        ];
        let edges = DependencyRule::SectionSequence.edges(&tasks);
        assert_eq!(
            pairs(&edges),
            vec![
                ("2.1.1.1", "1.2.1.1"),
                ("2.1.2.1", "1.2.1.1"),
                ("3.1.1.1", "2.1.2.1"),
            ]
        );
    }

    #[test]
    fn test_resource_conflict_same_section_only() {
        let tasks = vec![
            phase("1.1.1.1", "E001"),
            phase("1.2.1.1", "E001"),
            phase("2.1.1.1", "E001"),
            phase("1.1.2.1", ""),
            phase("1.1.3.1", ""),
        ];
        let edges = DependencyRule::ResourceConflict.edges(&tasks);
        assert_eq!(pairs(&edges), vec![("1.2.1.1", "1.1.1.1")]);
    }

    #[test]
    fn test_derive_is_additive_and_idempotent() {
        let mut tasks = vec![
            phase("1.1.1.1", "E001"),
            phase("1.1.1.2", "E001").with_dependencies(["X.manual"]),
            phase("1.1.2.1", "E002"),
        ];

        let report = derive_dependencies(&mut tasks, &DependencyRule::ALL, 0);
        // phase rule and resource rule both want 1.1.1.2 -> 1.1.1.1
        assert_eq!(report.count(DependencyRule::PhaseSequence), 1);
        assert_eq!(report.count(DependencyRule::ResourceConflict), 0);
        assert_eq!(tasks[1].depends_on, vec!["X.manual", "1.1.1.1"]);

        let before = tasks.clone();
        let again = derive_dependencies(&mut tasks, &DependencyRule::ALL, 0);
        assert!(again.added.is_empty());
        assert_eq!(tasks, before);
    }

    #[test]
    fn test_selected_rules_only() {
        let mut tasks = vec![phase("1.1.1.1", "E001"), phase("1.1.2.1", "E001")];
        let report = derive_dependencies(&mut tasks, &[DependencyRule::PhaseSequence], 0);
        assert!(report.added.is_empty());

        let report = derive_dependencies(&mut tasks, &[DependencyRule::ResourceConflict], 0);
        assert_eq!(pairs(&report.added), vec![("1.1.2.1", "1.1.1.1")]);
        assert_eq!(tasks[1].depends_on, vec!["1.1.1.1"]);
    }
}

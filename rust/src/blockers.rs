//! "What blocks task X" view over a scheduled task set.
//!
//! Read-only: nothing here mutates a task.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::models::Task;
use crate::wbs;

pub const PARENT_DELAYED: &str = "PARENT_DELAYED";
pub const RESOURCE_CONFLICT: &str = "RESOURCE_CONFLICT";

/// Blocker descriptors per WBS code, rendered as strings.
pub type BlockerMap = BTreeMap<String, Vec<String>>;

/// One reason a task cannot proceed.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Blocker {
    /// A `depends_on` entry, verbatim.
    Dependency(String),
    /// The owning task has negative slack.
    ParentDelayed(String),
    /// Another task of the same assignee overlaps this one's window.
    ResourceConflict(String),
}

impl fmt::Display for Blocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Blocker::Dependency(code) => write!(f, "{code}"),
            Blocker::ParentDelayed(code) => write!(f, "{PARENT_DELAYED}:{code}"),
            Blocker::ResourceConflict(code) => write!(f, "{RESOURCE_CONFLICT}:{code}"),
        }
    }
}

impl Serialize for Blocker {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlockerAnalysis {
    pub blockers: BTreeMap<String, Vec<Blocker>>,
    /// Parents flagged as delayed. Should stay empty for a feasible schedule.
    pub delayed_parents: Vec<String>,
}

impl BlockerAnalysis {
    pub fn to_map(&self) -> BlockerMap {
        self.blockers
            .iter()
            .map(|(code, list)| (code.clone(), list.iter().map(|b| b.to_string()).collect()))
            .collect()
    }

    pub fn get(&self, wbs_code: &str) -> &[Blocker] {
        self.blockers
            .get(wbs_code)
            .map(|v| v.as_slice())
            .unwrap_or_default()
    }
}

/// How two windows of the same assignee are compared.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceOverlap {
    /// Closed windows `[ES, EF]`. Only the task's own predecessors are skipped,
    /// so a task still sees the successor that starts on its finish date.
    #[default]
    Inclusive,
    /// Half-open windows `[ES, EF)`, treating EF as a hand-off date. Pairs
    /// linked by a dependency in either direction are skipped.
    HandOff,
}

impl ResourceOverlap {
    fn overlaps(self, a: (NaiveDate, NaiveDate), b: (NaiveDate, NaiveDate)) -> bool {
        match self {
            ResourceOverlap::Inclusive => a.0 <= b.1 && b.0 <= a.1,
            ResourceOverlap::HandOff => a.0 < b.1 && b.0 < a.1,
        }
    }

    fn skips(self, task: &Task, other: &Task) -> bool {
        task.depends_on(&other.wbs_code)
            || (self == ResourceOverlap::HandOff && other.depends_on(&task.wbs_code))
    }
}

/// Build the blocker list for every task in `tasks` with closed windows.
///
/// Parent slack is looked up in `parents` first, then in `tasks`.
pub fn analyze_blockers(tasks: &[Task], parents: &[Task]) -> BlockerAnalysis {
    analyze_blockers_with(tasks, parents, ResourceOverlap::default())
}

/// [`analyze_blockers`] with an explicit window comparison.
pub fn analyze_blockers_with(
    tasks: &[Task],
    parents: &[Task],
    overlap: ResourceOverlap,
) -> BlockerAnalysis {
    // Later entries win, so parent records override same-coded tasks
    let slack_by_code: FxHashMap<&str, Option<i64>> = tasks
        .iter()
        .chain(parents)
        .map(|t| (t.wbs_code.as_str(), t.slack))
        .collect();

    let mut by_assignee: FxHashMap<&str, Vec<&Task>> = FxHashMap::default();
    for task in tasks.iter().filter(|t| t.is_assigned()) {
        by_assignee
            .entry(task.assigned_to.trim())
            .or_default()
            .push(task);
    }

    let mut analysis = BlockerAnalysis::default();
    for task in tasks {
        let mut list: Vec<Blocker> = task
            .depends_on
            .iter()
            .map(|d| Blocker::Dependency(d.clone()))
            .collect();

        if let Some(parent) = task.parent_wbs.as_deref() {
            if let Some(Some(slack)) = slack_by_code.get(parent) {
                if *slack < 0 {
                    list.push(Blocker::ParentDelayed(parent.to_string()));
                    if !analysis.delayed_parents.iter().any(|p| p == parent) {
                        tracing::warn!(
                            parent,
                            slack,
                            "parent task has negative slack; schedule is infeasible"
                        );
                        analysis.delayed_parents.push(parent.to_string());
                    }
                }
            }
        }

        let window = task.window().filter(|_| task.is_assigned());
        if let Some(window) = window {
            let mut conflicts: Vec<&str> = by_assignee
                .get(task.assigned_to.trim())
                .into_iter()
                .flatten()
                .filter(|other| other.wbs_code != task.wbs_code)
                .filter(|other| !overlap.skips(task, other))
                .filter(|other| other.window().is_some_and(|w| overlap.overlaps(window, w)))
                .map(|other| other.wbs_code.as_str())
                .collect();
            wbs::sort_codes(&mut conflicts);
            list.extend(
                conflicts
                    .into_iter()
                    .map(|c| Blocker::ResourceConflict(c.to_string())),
            );
        }

        analysis.blockers.insert(task.wbs_code.clone(), list);
    }
    wbs::sort_codes(&mut analysis.delayed_parents);
    analysis
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn scheduled(code: &str, who: &str, es: u32, ef: u32) -> Task {
        let mut task = Task::new(code, code, 1.0)
            .with_assignee(who)
            .with_parent(wbs::parent(code).unwrap_or(code));
        task.earliest_start = Some(date(es));
        task.earliest_finish = Some(date(ef));
        task.latest_start = Some(date(es));
        task.latest_finish = Some(date(ef));
        task.slack = Some(0);
        task
    }

    #[test]
    fn test_dependencies_listed_verbatim() {
        let tasks = vec![
            scheduled("1.1.1.1", "A", 6, 7),
            scheduled("1.1.1.2", "B", 7, 8).with_dependencies(["1.1.1.1", "X.external"]),
        ];
        let analysis = analyze_blockers(&tasks, &[]);
        assert!(analysis.get("1.1.1.1").is_empty());
        assert_eq!(
            analysis.to_map()["1.1.1.2"],
            vec!["1.1.1.1".to_string(), "X.external".to_string()]
        );
    }

    #[test]
    fn test_overlapping_same_assignee_is_conflict() {
        let tasks = vec![
            scheduled("1.1.1.1", "E001", 6, 9),
            scheduled("2.1.1.1", "E001", 8, 10),
            scheduled("2.1.2.1", "E002", 6, 9),
        ];
        let map = analyze_blockers(&tasks, &[]).to_map();
        assert_eq!(map["1.1.1.1"], vec!["RESOURCE_CONFLICT:2.1.1.1"]);
        assert_eq!(map["2.1.1.1"], vec!["RESOURCE_CONFLICT:1.1.1.1"]);
        assert!(map["2.1.2.1"].is_empty());
    }

    #[test]
    fn test_shared_finish_date_is_a_conflict() {
        // second starts on the finish date of the first, in another section
        let tasks = vec![
            scheduled("1.1.1.1", "E001", 6, 7),
            scheduled("2.1.1.1", "E001", 7, 8),
        ];
        let map = analyze_blockers(&tasks, &[]).to_map();
        assert_eq!(map["1.1.1.1"], vec!["RESOURCE_CONFLICT:2.1.1.1"]);
        assert_eq!(map["2.1.1.1"], vec!["RESOURCE_CONFLICT:1.1.1.1"]);
    }

    #[test]
    fn test_handoff_windows_ignore_shared_finish_date() {
        let tasks = vec![
            scheduled("1.1.1.1", "E001", 6, 7),
            scheduled("2.1.1.1", "E001", 7, 8),
        ];
        let map = analyze_blockers_with(&tasks, &[], ResourceOverlap::HandOff).to_map();
        assert!(map.values().all(|v| v.is_empty()));
    }

    #[test]
    fn test_own_predecessor_not_reported_as_conflict() {
        let tasks = vec![
            scheduled("1.1.1.1", "E001", 6, 9),
            scheduled("1.1.2.1", "E001", 7, 9).with_dependencies(["1.1.1.1"]),
        ];
        let map = analyze_blockers(&tasks, &[]).to_map();
        assert_eq!(map["1.1.2.1"], vec!["1.1.1.1"]);
        // the predecessor does not list its successor, so it still sees the overlap
        assert_eq!(map["1.1.1.1"], vec!["RESOURCE_CONFLICT:1.1.2.1"]);

        let map = analyze_blockers_with(&tasks, &[], ResourceOverlap::HandOff).to_map();
        assert_eq!(map["1.1.2.1"], vec!["1.1.1.1"]);
        assert!(map["1.1.1.1"].is_empty());
    }

    #[test]
    fn test_overlap_serde_names() {
        let overlap: ResourceOverlap = serde_json::from_str(r#""hand_off""#).unwrap();
        assert_eq!(overlap, ResourceOverlap::HandOff);
        assert_eq!(ResourceOverlap::default(), ResourceOverlap::Inclusive);
    }

    #[test]
    fn test_delayed_parent_flagged() {
        let tasks = vec![scheduled("1.1.1.1", "E001", 6, 7)];
        let mut parent = Task::new("1.1.1", "Late task", 1.0);
        parent.slack = Some(-2);
        let analysis = analyze_blockers(&tasks, &[parent]);
        assert_eq!(
            analysis.get("1.1.1.1"),
            &[Blocker::ParentDelayed("1.1.1".to_string())]
        );
        assert_eq!(analysis.delayed_parents, vec!["1.1.1"]);
        assert_eq!(analysis.to_map()["1.1.1.1"], vec!["PARENT_DELAYED:1.1.1"]);
    }

    #[test]
    fn test_on_time_parent_not_flagged() {
        let tasks = vec![scheduled("1.1.1.1", "E001", 6, 7)];
        let mut parent = Task::new("1.1.1", "On time", 1.0);
        parent.slack = Some(0);
        let analysis = analyze_blockers(&tasks, &[parent]);
        assert!(analysis.delayed_parents.is_empty());
        assert!(analysis.get("1.1.1.1").is_empty());
    }

    #[test]
    fn test_blocker_serializes_as_string() {
        let json = serde_json::to_string(&vec![
            Blocker::Dependency("1.1.1.1".to_string()),
            Blocker::ResourceConflict("1.2.1.1".to_string()),
        ])
        .unwrap();
        assert_eq!(json, r#"["1.1.1.1","RESOURCE_CONFLICT:1.2.1.1"]"#);
    }
}

//! Projection of scheduled tasks into a downstream task-creation payload.
//!
//! Pure serialization of already-computed state: the scheduler knows nothing
//! about the payload shape, and the shape lives behind [`PayloadMapper`] so it
//! can be swapped per downstream system.

use std::collections::HashMap;
use std::hash::BuildHasher;

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::blockers::{Blocker, BlockerAnalysis};
use crate::config::{MappingConfig, UnresolvedIdentityPolicy};
use crate::error::PayloadError;
use crate::models::Task;
use crate::wbs;
use crate::{log_changes, log_checks};

/// Resolves an employee code to the downstream system's user identifier.
pub trait IdentityResolver {
    fn resolve(&self, employee_code: &str) -> Option<String>;
}

impl<S: BuildHasher> IdentityResolver for HashMap<String, String, S> {
    fn resolve(&self, employee_code: &str) -> Option<String> {
        self.get(employee_code).cloned()
    }
}

/// Adapts a closure into an [`IdentityResolver`].
pub struct FnResolver<F>(pub F);

impl<F> IdentityResolver for FnResolver<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn resolve(&self, employee_code: &str) -> Option<String> {
        (self.0)(employee_code)
    }
}

/// Turns one task into one payload.
pub trait PayloadMapper {
    type Payload;

    /// Map a scheduled task. `parent_reference` is the reference already given
    /// to the task's parent, if the parent was mapped.
    fn map_task(
        &mut self,
        task: &Task,
        blockers: &[Blocker],
        parent_reference: Option<&str>,
    ) -> Result<Self::Payload, PayloadError>;

    /// Reference children use to point at this payload.
    fn reference(&self, payload: &Self::Payload) -> String;
}

/// Map parents (when given) and then tasks, in WBS order, resolving each
/// record's parent linkage through the references handed out so far.
pub fn map_all<M: PayloadMapper>(
    mapper: &mut M,
    tasks: &[Task],
    parents: &[Task],
    blockers: &BlockerAnalysis,
) -> Result<Vec<M::Payload>, PayloadError> {
    let mut ordered: Vec<&Task> = parents.iter().chain(tasks).collect();
    ordered.sort_by(|a, b| wbs::compare(&a.wbs_code, &b.wbs_code));

    let mut references: FxHashMap<&str, String> = FxHashMap::default();
    let mut payloads = Vec::with_capacity(ordered.len());
    for task in ordered {
        let parent_reference = task
            .parent_wbs
            .as_deref()
            .and_then(|p| references.get(p))
            .map(|r| r.as_str());
        let payload = mapper.map_task(task, blockers.get(&task.wbs_code), parent_reference)?;
        references.insert(task.wbs_code.as_str(), mapper.reference(&payload));
        payloads.push(payload);
    }
    Ok(payloads)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
}

impl Priority {
    pub fn from_critical(is_critical: bool) -> Self {
        if is_critical {
            Priority::High
        } else {
            Priority::Medium
        }
    }
}

/// Task-creation record for the downstream project-management system.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TaskPayload {
    pub reference: String,
    pub name: String,
    pub assignee: Option<String>,
    /// ISO-8601 (`YYYY-MM-DD`) when serialized.
    pub due_date: NaiveDate,
    pub parent_reference: Option<String>,
    pub priority: Priority,
    pub description: String,
}

/// A fallback identity used in place of an unresolved employee code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IdentitySubstitution {
    pub wbs_code: String,
    pub employee_code: String,
    pub substituted: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MappingOutcome {
    pub payloads: Vec<TaskPayload>,
    pub substitutions: Vec<IdentitySubstitution>,
}

/// Default mapper producing [`TaskPayload`]s.
pub struct DownstreamMapper<R> {
    resolver: R,
    config: MappingConfig,
    substitutions: Vec<IdentitySubstitution>,
}

impl<R: IdentityResolver> DownstreamMapper<R> {
    pub fn new(resolver: R, config: MappingConfig) -> Self {
        Self {
            resolver,
            config,
            substitutions: Vec::new(),
        }
    }

    /// Fallback substitutions made so far, for audit.
    pub fn substitutions(&self) -> &[IdentitySubstitution] {
        &self.substitutions
    }

    fn resolve_assignee(&mut self, task: &Task) -> Result<Option<String>, PayloadError> {
        if !task.is_assigned() {
            return Ok(None);
        }
        let code = task.assigned_to.trim();
        if let Some(identity) = self.resolver.resolve(code) {
            return Ok(Some(identity));
        }
        match &self.config.unresolved_identity {
            UnresolvedIdentityPolicy::Fail => Err(PayloadError::UnresolvedIdentity {
                wbs_code: task.wbs_code.clone(),
                employee_code: code.to_string(),
            }),
            UnresolvedIdentityPolicy::Fallback(fallback) => {
                tracing::warn!(
                    wbs_code = %task.wbs_code,
                    employee_code = code,
                    fallback = %fallback,
                    "no external identity, using fallback"
                );
                self.substitutions.push(IdentitySubstitution {
                    wbs_code: task.wbs_code.clone(),
                    employee_code: code.to_string(),
                    substituted: fallback.clone(),
                });
                Ok(Some(fallback.clone()))
            }
        }
    }
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Free-text description carrying the computed schedule.
pub fn describe(task: &Task, blockers: &[Blocker]) -> String {
    let assignee = if task.is_assigned() {
        task.assigned_to.trim()
    } else {
        "unassigned"
    };
    let blockers = if blockers.is_empty() {
        "none".to_string()
    } else {
        blockers
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let slack = task
        .slack
        .map(|s| s.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "WBS: {}\nDuration: {} working day(s)\nAssignee: {}\nEarliest: {} -> {}\nLatest: {} -> {}\nSlack: {}{}\nBlockers: {}",
        task.wbs_code,
        task.duration_days,
        assignee,
        format_date(task.earliest_start),
        format_date(task.earliest_finish),
        format_date(task.latest_start),
        format_date(task.latest_finish),
        slack,
        if task.is_critical { " (critical)" } else { "" },
        blockers,
    )
}

impl<R: IdentityResolver> PayloadMapper for DownstreamMapper<R> {
    type Payload = TaskPayload;

    fn map_task(
        &mut self,
        task: &Task,
        blockers: &[Blocker],
        parent_reference: Option<&str>,
    ) -> Result<TaskPayload, PayloadError> {
        let due_date = task
            .earliest_finish
            .ok_or_else(|| PayloadError::Unscheduled(task.wbs_code.clone()))?;
        if task.parent_wbs.is_some() && parent_reference.is_none() {
            log_checks!(
                self.config.verbosity,
                "{} has no mapped parent, emitting without linkage",
                task.wbs_code
            );
        }
        let payload = TaskPayload {
            reference: format!("{}{}", self.config.reference_prefix, task.wbs_code),
            name: task.name.clone(),
            assignee: self.resolve_assignee(task)?,
            due_date,
            parent_reference: parent_reference.map(str::to_string),
            priority: Priority::from_critical(task.is_critical),
            description: describe(task, blockers),
        };
        log_changes!(
            self.config.verbosity,
            "mapped {} as {}",
            task.wbs_code,
            payload.reference
        );
        Ok(payload)
    }

    fn reference(&self, payload: &TaskPayload) -> String {
        payload.reference.clone()
    }
}

/// Map a finished run with the default mapper.
pub fn map_payloads<R: IdentityResolver>(
    tasks: &[Task],
    parents: &[Task],
    blockers: &BlockerAnalysis,
    resolver: R,
    config: MappingConfig,
) -> Result<MappingOutcome, PayloadError> {
    let include_parents = config.include_parents;
    let mut mapper = DownstreamMapper::new(resolver, config);
    let parents: &[Task] = if include_parents { parents } else { &[] };
    let payloads = map_all(&mut mapper, tasks, parents, blockers)?;
    Ok(MappingOutcome {
        payloads,
        substitutions: mapper.substitutions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockers::analyze_blockers;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn scheduled(code: &str, parent: &str, who: &str, critical: bool) -> Task {
        let mut task = Task::new(code, format!("Task {code}"), 1.0)
            .with_assignee(who)
            .with_parent(parent);
        task.earliest_start = Some(date(6));
        task.earliest_finish = Some(date(7));
        task.latest_start = Some(date(6));
        task.latest_finish = Some(date(7));
        task.slack = Some(if critical { 0 } else { 2 });
        task.is_critical = critical;
        task
    }

    fn identities() -> HashMap<String, String> {
        HashMap::from([
            ("E001".to_string(), "user-1".to_string()),
            ("E002".to_string(), "user-2".to_string()),
        ])
    }

    #[test]
    fn test_maps_fields_and_parent_linkage() {
        let parent = scheduled("1.1.1", "1.1", "", true);
        let tasks = vec![
            scheduled("1.1.1.2", "1.1.1", "E002", false).with_dependencies(["1.1.1.1"]),
            scheduled("1.1.1.1", "1.1.1", "E001", true),
        ];
        let analysis = analyze_blockers(&tasks, &[parent.clone()]);
        let outcome = map_payloads(
            &tasks,
            &[parent],
            &analysis,
            identities(),
            MappingConfig::default(),
        )
        .unwrap();

        let refs: Vec<&str> = outcome.payloads.iter().map(|p| p.reference.as_str()).collect();
        assert_eq!(refs, vec!["WBS-1.1.1", "WBS-1.1.1.1", "WBS-1.1.1.2"]);

        let summary = &outcome.payloads[0];
        assert_eq!(summary.assignee, None);
        assert_eq!(summary.parent_reference, None);

        let review = &outcome.payloads[2];
        assert_eq!(review.assignee.as_deref(), Some("user-2"));
        assert_eq!(review.parent_reference.as_deref(), Some("WBS-1.1.1"));
        assert_eq!(review.priority, Priority::Medium);
        assert_eq!(review.due_date, date(7));
        assert!(review.description.contains("WBS: 1.1.1.2"));
        assert!(review.description.contains("Slack: 2"));
        assert!(review.description.contains("Blockers: 1.1.1.1"));

        assert_eq!(outcome.payloads[1].priority, Priority::High);
        assert!(outcome.substitutions.is_empty());
    }

    #[test]
    fn test_unresolved_identity_fails_by_default() {
        let tasks = vec![scheduled("1.1.1.1", "1.1.1", "E999", true)];
        let err = map_payloads(
            &tasks,
            &[],
            &BlockerAnalysis::default(),
            identities(),
            MappingConfig::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            PayloadError::UnresolvedIdentity {
                wbs_code: "1.1.1.1".to_string(),
                employee_code: "E999".to_string(),
            }
        );
    }

    #[test]
    fn test_fallback_identity_is_recorded() {
        let tasks = vec![scheduled("1.1.1.1", "1.1.1", "E999", true)];
        let config = MappingConfig {
            unresolved_identity: UnresolvedIdentityPolicy::Fallback("ops@example.com".to_string()),
            ..MappingConfig::default()
        };
        let outcome =
            map_payloads(&tasks, &[], &BlockerAnalysis::default(), identities(), config).unwrap();
        assert_eq!(
            outcome.payloads[0].assignee.as_deref(),
            Some("ops@example.com")
        );
        assert_eq!(
            outcome.substitutions,
            vec![IdentitySubstitution {
                wbs_code: "1.1.1.1".to_string(),
                employee_code: "E999".to_string(),
                substituted: "ops@example.com".to_string(),
            }]
        );
    }

    #[test]
    fn test_unscheduled_task_rejected() {
        let tasks = vec![Task::new("1.1.1.1", "Prep", 1.0)];
        let err = map_payloads(
            &tasks,
            &[],
            &BlockerAnalysis::default(),
            identities(),
            MappingConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, PayloadError::Unscheduled("1.1.1.1".to_string()));
    }

    #[test]
    fn test_closure_resolver_and_json_shape() {
        let tasks = vec![scheduled("2.1.1.1", "2.1.1", "E5", true)];
        let resolver = FnResolver(|code: &str| Some(format!("ext-{code}")));
        let config = MappingConfig {
            include_parents: false,
            ..MappingConfig::default()
        };
        let outcome =
            map_payloads(&tasks, &[], &BlockerAnalysis::default(), resolver, config).unwrap();
        let json = serde_json::to_value(&outcome.payloads[0]).unwrap();
        assert_eq!(json["assignee"], "ext-E5");
        assert_eq!(json["due_date"], "2025-01-07");
        assert_eq!(json["priority"], "high");
        assert_eq!(json["parent_reference"], serde_json::Value::Null);
    }

    #[test]
    fn test_describe_lists_dates_and_blockers() {
        let task = scheduled("1.1.1.1", "1.1.1", "", true);
        let text = describe(
            &task,
            &[Blocker::ResourceConflict("1.2.1.1".to_string())],
        );
        assert_eq!(
            text,
            "WBS: 1.1.1.1\nDuration: 1 working day(s)\nAssignee: unassigned\n\
             Earliest: 2025-01-06 -> 2025-01-07\nLatest: 2025-01-06 -> 2025-01-07\n\
             Slack: 0 (critical)\nBlockers: RESOURCE_CONFLICT:1.2.1.1"
        );
    }
}

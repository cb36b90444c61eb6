//! Critical path calculation using forward and backward passes over working days.

use chrono::NaiveDate;
use std::collections::VecDeque;

use crate::calendar::WorkingCalendar;
use crate::error::ScheduleError;
use crate::index::{TaskIdx, WbsIndex};
use crate::models::Task;
use crate::wbs;
use crate::{log_changes, log_checks, log_debug};

/// Per-task dates computed by the two passes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskTiming {
    pub earliest_start: NaiveDate,
    pub earliest_finish: NaiveDate,
    pub latest_start: NaiveDate,
    pub latest_finish: NaiveDate,
    /// Working days between earliest and latest start.
    pub slack: i64,
}

impl TaskTiming {
    pub fn is_critical(&self) -> bool {
        self.slack == 0
    }
}

/// Outcome of a scheduling pass, besides the dates written onto the tasks.
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduleSummary {
    pub project_start: NaiveDate,
    /// Latest earliest-finish over all tasks.
    pub project_end: NaiveDate,
    /// Date the backward pass was anchored to (deadline or project end).
    pub backward_anchor: NaiveDate,
    /// Every code in the order the forward pass visited it.
    pub topological_order: Vec<String>,
    /// Critical codes in topological order.
    pub critical_path: Vec<String>,
    /// Codes with negative slack, i.e. the schedule cannot meet its anchor.
    pub negative_slack: Vec<String>,
    /// `(task, reference)` pairs whose reference is not part of this run.
    pub dangling_references: Vec<(String, String)>,
}

impl ScheduleSummary {
    pub fn is_feasible(&self) -> bool {
        self.negative_slack.is_empty()
    }
}

/// Resolved dependency graph over task positions.
struct TaskGraph {
    index: WbsIndex,
    /// Known predecessors per task, deduplicated, in `depends_on` order.
    deps: Vec<Vec<TaskIdx>>,
    /// Reverse edges: tasks that depend on each task.
    dependents: Vec<Vec<TaskIdx>>,
    dangling: Vec<(String, String)>,
}

impl TaskGraph {
    fn build(tasks: &[Task]) -> Result<Self, ScheduleError> {
        let index = WbsIndex::build(tasks)?;
        let n = index.len();
        let mut deps: Vec<Vec<TaskIdx>> = vec![Vec::new(); n];
        let mut dependents: Vec<Vec<TaskIdx>> = vec![Vec::new(); n];
        let mut dangling = Vec::new();

        for (pos, task) in tasks.iter().enumerate() {
            for dep in &task.depends_on {
                match index.get(dep) {
                    Some(dep_idx) => {
                        if !deps[pos].contains(&dep_idx) {
                            deps[pos].push(dep_idx);
                            dependents[dep_idx as usize].push(pos as TaskIdx);
                        }
                    }
                    None => dangling.push((task.wbs_code.clone(), dep.clone())),
                }
            }
        }

        Ok(Self {
            index,
            deps,
            dependents,
            dangling,
        })
    }

    fn code(&self, idx: TaskIdx) -> String {
        self.index.resolve(idx).unwrap_or_default().to_string()
    }

    /// Kahn's algorithm, predecessors before dependents.
    ///
    /// Sources are seeded in WBS order so the result depends only on input.
    fn topological_order(&self) -> Result<Vec<TaskIdx>, ScheduleError> {
        let n = self.index.len();
        let mut in_degree: Vec<usize> = self.deps.iter().map(|d| d.len()).collect();

        let mut sources: Vec<TaskIdx> = (0..n as TaskIdx)
            .filter(|&i| in_degree[i as usize] == 0)
            .collect();
        sources.sort_by(|&a, &b| {
            wbs::compare(
                self.index.resolve(a).unwrap_or_default(),
                self.index.resolve(b).unwrap_or_default(),
            )
        });
        let mut queue: VecDeque<TaskIdx> = sources.into();
        let mut result: Vec<TaskIdx> = Vec::with_capacity(n);

        while let Some(idx) = queue.pop_front() {
            result.push(idx);
            for &dependent in &self.dependents[idx as usize] {
                let degree = &mut in_degree[dependent as usize];
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        if result.len() != n {
            return Err(ScheduleError::CyclicDependency(self.find_cycle(&in_degree)));
        }
        Ok(result)
    }

    /// Extract one cycle from the nodes Kahn's algorithm could not release.
    ///
    /// Every such node still has an unreleased predecessor, so following
    /// predecessors must revisit a node. The returned codes read as
    /// "depends on" from left to right and start and end with the same code.
    fn find_cycle(&self, in_degree: &[usize]) -> Vec<String> {
        let mut stuck: Vec<TaskIdx> = (0..in_degree.len() as TaskIdx)
            .filter(|&i| in_degree[i as usize] > 0)
            .collect();
        stuck.sort_by(|&a, &b| {
            wbs::compare(
                self.index.resolve(a).unwrap_or_default(),
                self.index.resolve(b).unwrap_or_default(),
            )
        });
        let Some(&start) = stuck.first() else {
            return Vec::new();
        };

        let mut path: Vec<TaskIdx> = Vec::new();
        let mut position: Vec<Option<usize>> = vec![None; in_degree.len()];
        let mut current = start;
        loop {
            if let Some(at) = position[current as usize] {
                let mut cycle: Vec<String> = path[at..].iter().map(|&i| self.code(i)).collect();
                cycle.push(self.code(current));
                return cycle;
            }
            position[current as usize] = Some(path.len());
            path.push(current);
            match self.deps[current as usize]
                .iter()
                .copied()
                .find(|&p| in_degree[p as usize] > 0)
            {
                Some(next) => current = next,
                None => return path.iter().map(|&i| self.code(i)).collect(),
            }
        }
    }
}

/// Order task codes so every task follows its predecessors.
///
/// References to codes outside `tasks` are ignored.
pub fn topological_order(tasks: &[Task]) -> Result<Vec<String>, ScheduleError> {
    let graph = TaskGraph::build(tasks)?;
    let order = graph.topological_order()?;
    Ok(order.into_iter().map(|i| graph.code(i)).collect())
}

/// Two-pass Critical Path Method solver over a working-day calendar.
pub struct CpmScheduler<'a> {
    calendar: &'a WorkingCalendar,
    project_deadline: Option<NaiveDate>,
    verbosity: u8,
}

impl<'a> CpmScheduler<'a> {
    pub fn new(calendar: &'a WorkingCalendar) -> Self {
        Self {
            calendar,
            project_deadline: None,
            verbosity: 0,
        }
    }

    /// Anchor the backward pass to a fixed date instead of the computed end.
    pub fn with_deadline(mut self, deadline: Option<NaiveDate>) -> Self {
        self.project_deadline = deadline;
        self
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Compute timings without touching the tasks.
    ///
    /// Returned timings are indexed like `tasks`.
    pub fn compute(
        &self,
        tasks: &[Task],
    ) -> Result<(Vec<TaskTiming>, ScheduleSummary), ScheduleError> {
        let graph = TaskGraph::build(tasks)?;
        for (task, reference) in &graph.dangling {
            log_checks!(
                self.verbosity,
                "{} depends on unknown task {}, ignored for scheduling",
                task,
                reference
            );
        }

        let topo_order = graph.topological_order()?;
        log_debug!(
            self.verbosity,
            "topological order: {:?}",
            topo_order.iter().map(|&i| graph.code(i)).collect::<Vec<_>>()
        );

        let n = tasks.len();
        let reference_date = self.calendar.reference_date();

        // Forward pass: earliest start/finish
        let mut earliest: Vec<(NaiveDate, NaiveDate)> = vec![(reference_date, reference_date); n];
        for &idx in &topo_order {
            let i = idx as usize;
            let earliest_start = graph.deps[i]
                .iter()
                .map(|&d| earliest[d as usize].1)
                .max()
                .unwrap_or(reference_date);
            let earliest_finish = self
                .calendar
                .add_working_days(earliest_start, tasks[i].duration_days);
            earliest[i] = (earliest_start, earliest_finish);
            log_debug!(
                self.verbosity,
                "forward {}: ES={} EF={}",
                tasks[i].wbs_code,
                earliest_start,
                earliest_finish
            );
        }

        let project_end = earliest
            .iter()
            .map(|&(_, finish)| finish)
            .max()
            .unwrap_or(reference_date);
        let backward_anchor = self.project_deadline.unwrap_or(project_end);

        // Backward pass: latest start/finish, reverse topological order
        let mut latest: Vec<(NaiveDate, NaiveDate)> = vec![(backward_anchor, backward_anchor); n];
        for &idx in topo_order.iter().rev() {
            let i = idx as usize;
            let latest_finish = graph.dependents[i]
                .iter()
                .map(|&s| latest[s as usize].0)
                .min()
                .unwrap_or(backward_anchor);
            let latest_start = self
                .calendar
                .subtract_working_days(latest_finish, tasks[i].duration_days);
            latest[i] = (latest_start, latest_finish);
        }

        let timings: Vec<TaskTiming> = (0..n)
            .map(|i| {
                let (earliest_start, earliest_finish) = earliest[i];
                let (latest_start, latest_finish) = latest[i];
                TaskTiming {
                    earliest_start,
                    earliest_finish,
                    latest_start,
                    latest_finish,
                    slack: self
                        .calendar
                        .working_days_between(earliest_start, latest_start),
                }
            })
            .collect();

        let critical_path: Vec<String> = topo_order
            .iter()
            .filter(|&&i| timings[i as usize].is_critical())
            .map(|&i| graph.code(i))
            .collect();
        let negative_slack: Vec<String> = topo_order
            .iter()
            .filter(|&&i| timings[i as usize].slack < 0)
            .map(|&i| graph.code(i))
            .collect();
        if !negative_slack.is_empty() {
            tracing::warn!(
                anchor = %backward_anchor,
                project_end = %project_end,
                "infeasible schedule: {} task(s) with negative slack: {}",
                negative_slack.len(),
                negative_slack.join(", ")
            );
        }

        let summary = ScheduleSummary {
            project_start: reference_date,
            project_end,
            backward_anchor,
            topological_order: topo_order.iter().map(|&i| graph.code(i)).collect(),
            critical_path,
            negative_slack,
            dangling_references: graph.dangling,
        };
        Ok((timings, summary))
    }

    /// Run both passes and write the dates, slack and criticality onto `tasks`.
    ///
    /// On error no task is modified.
    pub fn schedule(&self, tasks: &mut [Task]) -> Result<ScheduleSummary, ScheduleError> {
        let (timings, summary) = self.compute(tasks)?;
        for (task, timing) in tasks.iter_mut().zip(&timings) {
            task.earliest_start = Some(timing.earliest_start);
            task.earliest_finish = Some(timing.earliest_finish);
            task.latest_start = Some(timing.latest_start);
            task.latest_finish = Some(timing.latest_finish);
            task.slack = Some(timing.slack);
            task.is_critical = timing.is_critical();
        }
        log_changes!(
            self.verbosity,
            "scheduled {} task(s): {} -> {}, {} critical",
            tasks.len(),
            summary.project_start,
            summary.project_end,
            summary.critical_path.len()
        );
        Ok(summary)
    }
}

//! Rolling scheduled phases up into their owning-task records.

use rustc_hash::FxHashMap;

use crate::calendar::WorkingCalendar;
use crate::models::Task;

/// Fill each parent's schedule fields from its scheduled children.
///
/// ES and LS take the earliest child value, EF and LF the latest. Slack is the
/// tightest child slack, so a parent is delayed as soon as any phase is.
/// The parent's duration becomes its working-day span. Parents without
/// scheduled children are cleared.
pub fn rollup_parents(parents: &mut [Task], children: &[Task], calendar: &WorkingCalendar) {
    let mut by_parent: FxHashMap<&str, Vec<&Task>> = FxHashMap::default();
    for child in children.iter().filter(|c| c.is_scheduled()) {
        if let Some(parent) = child.parent_wbs.as_deref() {
            by_parent.entry(parent).or_default().push(child);
        }
    }

    for parent in parents.iter_mut() {
        parent.clear_schedule();
        let Some(kids) = by_parent.get(parent.wbs_code.as_str()) else {
            continue;
        };
        parent.earliest_start = kids.iter().filter_map(|k| k.earliest_start).min();
        parent.earliest_finish = kids.iter().filter_map(|k| k.earliest_finish).max();
        parent.latest_start = kids.iter().filter_map(|k| k.latest_start).min();
        parent.latest_finish = kids.iter().filter_map(|k| k.latest_finish).max();
        parent.slack = kids.iter().filter_map(|k| k.slack).min();
        parent.is_critical = kids.iter().any(|k| k.is_critical);
        if let Some((start, finish)) = parent.window() {
            parent.duration_days = calendar.working_days_between(start, finish).max(0) as f64;
        }
    }
}

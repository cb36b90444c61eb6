//! WBS code interning for array-indexed graph passes.
//!
//! Maps each task's code to its position in the task slice so the passes can
//! use `Vec` lookups instead of string-keyed maps.

use rustc_hash::FxHashMap;

use crate::error::ScheduleError;
use crate::models::Task;

/// Position of a task in the slice the index was built from.
pub type TaskIdx = u32;

#[derive(Debug, Clone)]
pub struct WbsIndex {
    to_idx: FxHashMap<String, TaskIdx>,
    codes: Vec<String>,
}

impl WbsIndex {
    /// Build from a task slice, rejecting duplicate codes.
    pub fn build(tasks: &[Task]) -> Result<Self, ScheduleError> {
        let mut to_idx = FxHashMap::with_capacity_and_hasher(tasks.len(), Default::default());
        let mut codes = Vec::with_capacity(tasks.len());
        for (pos, task) in tasks.iter().enumerate() {
            if to_idx.insert(task.wbs_code.clone(), pos as TaskIdx).is_some() {
                return Err(ScheduleError::DuplicateWbs(task.wbs_code.clone()));
            }
            codes.push(task.wbs_code.clone());
        }
        Ok(Self { to_idx, codes })
    }

    #[inline]
    pub fn get(&self, code: &str) -> Option<TaskIdx> {
        self.to_idx.get(code).copied()
    }

    #[inline]
    pub fn resolve(&self, idx: TaskIdx) -> Option<&str> {
        self.codes.get(idx as usize).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_and_resolve() {
        let tasks = vec![Task::new("1.1.1.1", "a", 1.0), Task::new("1.1.1.2", "b", 1.0)];
        let index = WbsIndex::build(&tasks).unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.get("1.1.1.2"), Some(1));
        assert_eq!(index.resolve(0), Some("1.1.1.1"));
        assert_eq!(index.get("9.9"), None);
    }

    #[test]
    fn test_duplicate_code_rejected() {
        let tasks = vec![Task::new("1.1.1.1", "a", 1.0), Task::new("1.1.1.1", "b", 1.0)];
        assert_eq!(
            WbsIndex::build(&tasks).unwrap_err(),
            ScheduleError::DuplicateWbs("1.1.1.1".to_string())
        );
    }
}

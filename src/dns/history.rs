//! Bounded in-memory history of past runs.

use crate::dns::types::RunReport;
use std::collections::VecDeque;

/// Number of runs kept by default.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// FIFO of ranked run reports, oldest first.
#[derive(Debug, Clone)]
pub struct RunHistory {
    runs: VecDeque<RunReport>,
    capacity: usize,
}

impl RunHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// History holding at most `capacity` runs (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            runs: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append a run, evicting the oldest one when over capacity.
    pub fn append(&mut self, report: RunReport) {
        self.runs.push_back(report);
        while self.runs.len() > self.capacity {
            self.runs.pop_front();
        }
    }

    /// All runs, newest last.
    #[must_use]
    pub fn all(&self) -> &VecDeque<RunReport> {
        &self.runs
    }

    #[must_use]
    pub fn latest(&self) -> Option<&RunReport> {
        self.runs.back()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for RunHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::types::RunConfig;
    use chrono::{Duration as ChronoDuration, Local};

    fn report(minutes: i64) -> RunReport {
        RunReport {
            timestamp: Local::now() + ChronoDuration::minutes(minutes),
            config: RunConfig::default(),
            results: Vec::new(),
        }
    }

    #[test]
    fn test_append_keeps_order() {
        let mut history = RunHistory::new();
        assert!(history.is_empty());
        let first = report(0);
        let second = report(1);
        history.append(first.clone());
        history.append(second.clone());

        assert_eq!(history.len(), 2);
        assert_eq!(history.all()[0], first);
        assert_eq!(history.latest(), Some(&second));
    }

    #[test]
    fn test_eleventh_run_evicts_oldest() {
        let mut history = RunHistory::new();
        let reports: Vec<RunReport> = (0..11).map(report).collect();
        for r in &reports {
            history.append(r.clone());
        }

        assert_eq!(history.len(), DEFAULT_HISTORY_CAPACITY);
        assert_eq!(history.all()[0], reports[1]);
        assert_eq!(history.latest(), Some(&reports[10]));
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let mut history = RunHistory::with_capacity(0);
        history.append(report(0));
        history.append(report(1));
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.len(), 1);
    }
}

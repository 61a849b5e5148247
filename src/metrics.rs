//! Dataset metrics
//!
//! Structured counts over a validated store: status distributions, tasks
//! per issue, completion ratio, workload summary, and referential health
//! (orphan tasks, issues without tasks). Rendering and time-series
//! consolidation are left to the surrounding tooling.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::record::LedgerRecord;
use crate::store::RecordStore;

/// Task counts in each workflow column
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkloadSummary {
    pub total_tasks: usize,
    pub tasks_todo: usize,
    pub tasks_in_progress: usize,
    pub tasks_in_review: usize,
    pub tasks_done: usize,
}

/// A metrics snapshot of the three datasets
#[derive(Debug, Clone, Serialize)]
pub struct DatasetMetrics {
    pub generated_at: DateTime<Utc>,
    pub num_sprints: usize,
    pub num_issues: usize,
    pub num_tasks: usize,
    pub issue_status_distribution: BTreeMap<String, usize>,
    pub task_status_distribution: BTreeMap<String, usize>,
    pub tasks_per_issue: BTreeMap<String, usize>,
    /// Issues done over total issues; 0.0 for an empty issue set
    pub completion_ratio: f64,
    pub workload: WorkloadSummary,
    pub orphan_tasks: Vec<String>,
    pub issues_without_tasks: Vec<String>,
}

impl DatasetMetrics {
    /// Compute a snapshot over the current store contents
    pub fn compute(store: &RecordStore) -> Self {
        let issue_status_distribution = distribution(store.issues.records());
        let task_status_distribution = distribution(store.tasks.records());

        let mut tasks_per_issue: BTreeMap<String, usize> = BTreeMap::new();
        for task in store.tasks.records() {
            *tasks_per_issue.entry(task.issue_id.clone()).or_insert(0) += 1;
        }

        let done_issues = issue_status_distribution.get("done").copied().unwrap_or(0);
        let total_issues = store.issues.len();
        let completion_ratio = if total_issues > 0 {
            done_issues as f64 / total_issues as f64
        } else {
            0.0
        };

        let workload = WorkloadSummary {
            total_tasks: store.tasks.len(),
            tasks_todo: task_status_distribution.get("todo").copied().unwrap_or(0),
            tasks_in_progress: task_status_distribution
                .get("in_progress")
                .copied()
                .unwrap_or(0),
            tasks_in_review: task_status_distribution.get("review").copied().unwrap_or(0),
            tasks_done: task_status_distribution.get("done").copied().unwrap_or(0),
        };

        let issue_ids: HashSet<&str> = store.issues.records().iter().map(|i| i.id.as_str()).collect();
        let orphan_tasks: Vec<String> = store
            .tasks
            .records()
            .iter()
            .filter(|t| !issue_ids.contains(t.issue_id.as_str()))
            .map(|t| t.id.clone())
            .collect();

        let referenced: HashSet<&str> = store
            .tasks
            .records()
            .iter()
            .map(|t| t.issue_id.as_str())
            .collect();
        let issues_without_tasks: Vec<String> = store
            .issues
            .records()
            .iter()
            .filter(|i| !referenced.contains(i.id.as_str()))
            .map(|i| i.id.clone())
            .collect();

        Self {
            generated_at: Utc::now(),
            num_sprints: store.sprints.len(),
            num_issues: total_issues,
            num_tasks: store.tasks.len(),
            issue_status_distribution,
            task_status_distribution,
            tasks_per_issue,
            completion_ratio,
            workload,
            orphan_tasks,
            issues_without_tasks,
        }
    }
}

fn distribution<R: LedgerRecord>(records: &[R]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.status().to_string()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Issue, Sprint, StatusEntry, Task};
    use chrono::TimeZone;

    fn entry(status: &str) -> StatusEntry {
        StatusEntry::new(
            status,
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            "alice",
            "created",
        )
    }

    fn store() -> RecordStore {
        let mut store = RecordStore::new();
        store.sprints.insert(Sprint {
            id: "S03".to_string(),
            status: "active".to_string(),
            status_history: vec![entry("active")],
            extra: serde_json::Map::new(),
        });
        for (id, status) in [("S03.I01", "done"), ("S03.I02", "in_progress")] {
            store.issues.insert(Issue {
                id: id.to_string(),
                sprint_id: "S03".to_string(),
                status: status.to_string(),
                status_history: vec![entry(status)],
                extra: serde_json::Map::new(),
            });
        }
        for (id, issue_id, status) in [
            ("S03.I01.T01", "S03.I01", "done"),
            ("S03.I01.T02", "S03.I01", "review"),
            ("S03.I99.T01", "S03.I99", "todo"),
        ] {
            store.tasks.insert(Task {
                id: id.to_string(),
                issue_id: issue_id.to_string(),
                sprint_id: "S03".to_string(),
                status: status.to_string(),
                status_history: vec![entry(status)],
                extra: serde_json::Map::new(),
            });
        }
        store
    }

    #[test]
    fn test_counts_and_distributions() {
        let metrics = DatasetMetrics::compute(&store());
        assert_eq!(metrics.num_sprints, 1);
        assert_eq!(metrics.num_issues, 2);
        assert_eq!(metrics.num_tasks, 3);
        assert_eq!(metrics.issue_status_distribution["done"], 1);
        assert_eq!(metrics.task_status_distribution["review"], 1);
        assert_eq!(metrics.tasks_per_issue["S03.I01"], 2);
        assert!((metrics.completion_ratio - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_workload_summary() {
        let metrics = DatasetMetrics::compute(&store());
        assert_eq!(metrics.workload.total_tasks, 3);
        assert_eq!(metrics.workload.tasks_todo, 1);
        assert_eq!(metrics.workload.tasks_in_review, 1);
        assert_eq!(metrics.workload.tasks_done, 1);
        assert_eq!(metrics.workload.tasks_in_progress, 0);
    }

    #[test]
    fn test_referential_health() {
        let metrics = DatasetMetrics::compute(&store());
        assert_eq!(metrics.orphan_tasks, vec!["S03.I99.T01".to_string()]);
        assert_eq!(metrics.issues_without_tasks, vec!["S03.I02".to_string()]);
    }

    #[test]
    fn test_empty_store_has_zero_ratio() {
        let metrics = DatasetMetrics::compute(&RecordStore::new());
        assert_eq!(metrics.completion_ratio, 0.0);
        assert!(metrics.orphan_tasks.is_empty());
    }
}

//! Dataset validation
//!
//! Runs every structural, enumeration, pattern, foreign-key, and
//! status-history check the registry implies, in a fixed order, and reports
//! the first violation found. A collect mode gathers every violation in the
//! same order for batch reporting; both modes are read-only.
//!
//! ## Check order (per kind: sprints, issues, tasks)
//! 1. Required fields, before any other per-record rule
//! 2. Identifier pattern and uniqueness
//! 3. Status against the kind's allowed set
//! 4. Foreign keys, against a once-computed target id set
//! 5. Status-history structure

use std::collections::{BTreeMap, HashSet};

use crate::error::{Result, Violation, ViolationRule};
use crate::record::{EntityKind, LedgerRecord};
use crate::registry::{EntitySchema, Registry, TransitionTable};
use crate::store::RecordStore;

/// The dataset validator
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Self
    }

    /// Fail-fast validation: `Ok(())` when every invariant holds, otherwise
    /// the first violation in check order.
    pub fn validate(&self, store: &RecordStore, registry: &Registry) -> Result<()> {
        match self.run(store, registry, 1).into_iter().next() {
            Some(violation) => Err(violation.into()),
            None => Ok(()),
        }
    }

    /// Collect every violation, preserving the fail-fast check order so
    /// batch reports are deterministic.
    pub fn collect_violations(&self, store: &RecordStore, registry: &Registry) -> Vec<Violation> {
        self.run(store, registry, usize::MAX)
    }

    fn run(&self, store: &RecordStore, registry: &Registry, limit: usize) -> Vec<Violation> {
        let mut sink = Sink::new(limit);

        // FK lookups are O(1) set probes, computed once per pass
        let id_sets: BTreeMap<EntityKind, HashSet<String>> = EntityKind::ALL
            .iter()
            .map(|&kind| (kind, store.id_set(kind)))
            .collect();

        let table = registry.workflow();
        for kind in EntityKind::ALL {
            if sink.full() {
                break;
            }
            let schema = registry.schema_for(kind);
            match kind {
                EntityKind::Sprint => {
                    check_collection(store.sprints.records(), schema, table, &id_sets, &mut sink)
                }
                EntityKind::Issue => {
                    check_collection(store.issues.records(), schema, table, &id_sets, &mut sink)
                }
                EntityKind::Task => {
                    check_collection(store.tasks.records(), schema, table, &id_sets, &mut sink)
                }
            }
        }

        sink.violations
    }
}

struct Sink {
    violations: Vec<Violation>,
    limit: usize,
}

impl Sink {
    fn new(limit: usize) -> Self {
        Self {
            violations: Vec::new(),
            limit,
        }
    }

    /// Record a violation; returns false once the limit is reached
    fn push(&mut self, violation: Violation) -> bool {
        self.violations.push(violation);
        !self.full()
    }

    fn full(&self) -> bool {
        self.violations.len() >= self.limit
    }
}

fn check_collection<R: LedgerRecord>(
    records: &[R],
    schema: &EntitySchema,
    table: &TransitionTable,
    id_sets: &BTreeMap<EntityKind, HashSet<String>>,
    sink: &mut Sink,
) {
    let kind = schema.kind;

    // 1. Required fields, schema-level
    for field in &schema.required_fields {
        if let Some(record) = records.iter().find(|r| !r.has_field(field)) {
            if !sink.push(Violation::new(
                kind,
                Some(record.id()),
                ViolationRule::MissingField,
                field,
                "absent",
            )) {
                return;
            }
        }
    }

    // 2. Identifier pattern and uniqueness
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !schema.id_pattern.is_match(record.id()) {
            if !sink.push(Violation::new(
                kind,
                Some(record.id()),
                ViolationRule::IdPattern,
                schema.id_pattern.as_str(),
                record.id(),
            )) {
                return;
            }
        }
        if !seen.insert(record.id()) {
            if !sink.push(Violation::new(
                kind,
                Some(record.id()),
                ViolationRule::DuplicateId,
                "unique identifier",
                record.id(),
            )) {
                return;
            }
        }
    }

    // 3. Status enumeration
    for record in records {
        if !schema.allows_status(record.status()) {
            if !sink.push(Violation::new(
                kind,
                Some(record.id()),
                ViolationRule::StatusValue,
                format!("one of {:?}", schema.status_values),
                record.status(),
            )) {
                return;
            }
        }
    }

    // 4. Foreign keys
    for fk in &schema.foreign_keys {
        let targets = &id_sets[&fk.target_kind];
        for record in records {
            let resolved = match record.str_field(&fk.field) {
                Some(value) if targets.contains(value) => continue,
                Some(value) => value,
                None => "(missing)",
            };
            if !sink.push(Violation::new(
                kind,
                Some(record.id()),
                ViolationRule::ForeignKey,
                format!("existing {} {}", fk.target_kind.dataset_name(), fk.target_field),
                format!("{}='{}'", fk.field, resolved),
            )) {
                return;
            }
        }
    }

    // 5. Status history
    for record in records {
        if !check_history(record, table, sink) {
            return;
        }
    }
}

/// Validate one record's history; returns false once the sink is full
fn check_history<R: LedgerRecord>(record: &R, table: &TransitionTable, sink: &mut Sink) -> bool {
    let kind = R::KIND;
    let history = record.history();

    if history.is_empty() {
        return sink.push(Violation::new(
            kind,
            Some(record.id()),
            ViolationRule::EmptyHistory,
            "at least one entry",
            "empty",
        ));
    }

    for pair in history.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);
        if !table.allows(&prev.status, &curr.status) {
            if !sink.push(Violation::new(
                kind,
                Some(record.id()),
                ViolationRule::HistoryTransition,
                format!("one of {:?} after '{}'", table.transitions_from(&prev.status), prev.status),
                format!("{} -> {}", prev.status, curr.status),
            )) {
                return false;
            }
        }
        if curr.timestamp <= prev.timestamp {
            if !sink.push(Violation::new(
                kind,
                Some(record.id()),
                ViolationRule::HistoryOrder,
                format!("timestamp > {}", prev.timestamp.to_rfc3339()),
                curr.timestamp.to_rfc3339(),
            )) {
                return false;
            }
        }
    }

    if let Some(last) = history.last() {
        if record.status() != last.status {
            return sink.push(Violation::new(
                kind,
                Some(record.id()),
                ViolationRule::StatusMismatch,
                &last.status,
                record.status(),
            ));
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::record::{Issue, Sprint, StatusEntry, Task};
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;

    fn registry() -> Registry {
        Registry::from_value(json!({
            "registry_version": "1.0.0",
            "schemas": {
                "sprints": {
                    "schema_version": "1.0.0",
                    "id_field": "id",
                    "required_fields": ["id", "status", "status_history"],
                    "id_pattern": r"S\d\d",
                    "status_values": ["active", "closed"]
                },
                "issues": {
                    "schema_version": "1.0.0",
                    "id_field": "id",
                    "required_fields": ["id", "sprint_id", "title", "status", "status_history"],
                    "id_pattern": r"S\d\d\.I\d\d",
                    "status_values": ["todo", "in_progress", "review", "done"],
                    "foreign_keys": { "sprint_id": "sprints.id" }
                },
                "tasks": {
                    "schema_version": "1.0.0",
                    "id_field": "id",
                    "required_fields": ["id", "issue_id", "status", "status_history"],
                    "id_pattern": r"S\d\d\.I\d\d\.T\d\d",
                    "status_values": ["todo", "in_progress", "review", "done"],
                    "foreign_keys": { "issue_id": "issues.id" }
                }
            },
            "workflow": {
                "allowed_transitions": {
                    "todo": ["in_progress"],
                    "in_progress": ["review", "todo"],
                    "review": ["done", "in_progress"],
                    "done": []
                }
            }
        }))
        .unwrap()
    }

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn sprint(id: &str) -> Sprint {
        Sprint {
            id: id.to_string(),
            status: "active".to_string(),
            status_history: vec![StatusEntry::new("active", ts(0), "alice", "opened")],
            extra: serde_json::Map::new(),
        }
    }

    fn issue(id: &str, status: &str) -> Issue {
        let mut extra = serde_json::Map::new();
        extra.insert("title".to_string(), json!("some issue"));
        Issue {
            id: id.to_string(),
            sprint_id: "S03".to_string(),
            status: status.to_string(),
            status_history: vec![StatusEntry::new(status, ts(0), "alice", "created")],
            extra,
        }
    }

    fn task(id: &str, issue_id: &str) -> Task {
        Task {
            id: id.to_string(),
            issue_id: issue_id.to_string(),
            sprint_id: "S03".to_string(),
            status: "todo".to_string(),
            status_history: vec![StatusEntry::new("todo", ts(0), "alice", "created")],
            extra: serde_json::Map::new(),
        }
    }

    fn valid_store() -> RecordStore {
        let mut store = RecordStore::new();
        store.sprints.insert(sprint("S03"));
        store.issues.insert(issue("S03.I01", "todo"));
        store.tasks.insert(task("S03.I01.T01", "S03.I01"));
        store
    }

    fn first_violation(store: &RecordStore) -> Violation {
        match Validator::new().validate(store, &registry()).unwrap_err() {
            LedgerError::Validation(v) => v,
            other => panic!("Expected a violation, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_dataset_passes() {
        Validator::new().validate(&valid_store(), &registry()).unwrap();
    }

    #[test]
    fn test_validation_is_idempotent() {
        let store = valid_store();
        let registry = registry();
        let validator = Validator::new();
        assert!(validator.validate(&store, &registry).is_ok());
        assert!(validator.validate(&store, &registry).is_ok());
    }

    #[test]
    fn test_missing_required_field_is_reported_first() {
        let mut store = valid_store();
        let mut bad = issue("S03.I02", "bad_status");
        bad.extra.remove("title");
        store.issues.insert(bad);

        let v = first_violation(&store);
        assert_eq!(v.rule, ViolationRule::MissingField);
        assert_eq!(v.record_id.as_deref(), Some("S03.I02"));
        assert_eq!(v.expected, "title");
    }

    #[test]
    fn test_id_pattern_violation() {
        let mut store = valid_store();
        store.issues.insert(issue("ISSUE-2", "todo"));

        let v = first_violation(&store);
        assert_eq!(v.rule, ViolationRule::IdPattern);
        assert_eq!(v.actual, "ISSUE-2");
    }

    #[test]
    fn test_duplicate_id_violation() {
        let mut store = valid_store();
        store.issues.insert(issue("S03.I01", "todo"));

        let v = first_violation(&store);
        assert_eq!(v.rule, ViolationRule::DuplicateId);
        assert_eq!(v.record_id.as_deref(), Some("S03.I01"));
    }

    #[test]
    fn test_status_enum_violation() {
        let mut store = valid_store();
        let mut bad = issue("S03.I02", "todo");
        bad.status = "paused".to_string();
        bad.status_history = vec![StatusEntry::new("paused", ts(0), "alice", "created")];
        store.issues.insert(bad);

        let v = first_violation(&store);
        assert_eq!(v.rule, ViolationRule::StatusValue);
        assert_eq!(v.actual, "paused");
    }

    #[test]
    fn test_foreign_key_violation_names_both_ids() {
        let mut store = valid_store();
        let mut orphan = task("S03.I99.T01", "S03.I99");
        orphan.id = "S03.I01.T02".to_string();
        store.tasks.insert(orphan);

        let v = first_violation(&store);
        assert_eq!(v.rule, ViolationRule::ForeignKey);
        assert_eq!(v.record_id.as_deref(), Some("S03.I01.T02"));
        assert!(v.actual.contains("S03.I99"));
    }

    #[test]
    fn test_empty_history_violation() {
        let mut store = valid_store();
        let mut bad = issue("S03.I02", "todo");
        bad.status_history.clear();
        store.issues.insert(bad);

        let v = first_violation(&store);
        assert_eq!(v.rule, ViolationRule::EmptyHistory);
    }

    #[test]
    fn test_illegal_history_transition_violation() {
        let mut store = valid_store();
        let mut bad = issue("S03.I02", "done");
        bad.status_history = vec![
            StatusEntry::new("todo", ts(0), "alice", "created"),
            StatusEntry::new("done", ts(10), "alice", "skipped review"),
        ];
        store.issues.insert(bad);

        let v = first_violation(&store);
        assert_eq!(v.rule, ViolationRule::HistoryTransition);
        assert_eq!(v.actual, "todo -> done");
    }

    #[test]
    fn test_equal_timestamps_are_a_violation() {
        let mut store = valid_store();
        let mut bad = issue("S03.I02", "in_progress");
        bad.status_history = vec![
            StatusEntry::new("todo", ts(0), "alice", "created"),
            StatusEntry::new("in_progress", ts(0), "alice", "started"),
        ];
        store.issues.insert(bad);

        let v = first_violation(&store);
        assert_eq!(v.rule, ViolationRule::HistoryOrder);
    }

    #[test]
    fn test_status_mismatch_violation() {
        let mut store = valid_store();
        let mut bad = issue("S03.I02", "todo");
        bad.status = "in_progress".to_string();
        store.issues.insert(bad);

        let v = first_violation(&store);
        assert_eq!(v.rule, ViolationRule::StatusMismatch);
        assert_eq!(v.expected, "todo");
        assert_eq!(v.actual, "in_progress");
    }

    #[test]
    fn test_collect_mode_preserves_check_order() {
        let mut store = valid_store();
        // One status violation and one FK violation on different records
        let mut bad_status = issue("S03.I02", "todo");
        bad_status.status = "paused".to_string();
        bad_status.status_history = vec![StatusEntry::new("paused", ts(0), "alice", "created")];
        store.issues.insert(bad_status);
        store.tasks.insert(task("S03.I05.T01", "S03.I05"));

        let violations = Validator::new().collect_violations(&store, &registry());
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].rule, ViolationRule::StatusValue);
        assert_eq!(violations[1].rule, ViolationRule::ForeignKey);
    }
}

//! Record types for the three governed entity kinds

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::LedgerError;

/// One of the governed record kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Sprint,
    Issue,
    Task,
}

impl EntityKind {
    /// All kinds, in validation order
    pub const ALL: [EntityKind; 3] = [EntityKind::Sprint, EntityKind::Issue, EntityKind::Task];

    /// Singular lowercase name (e.g. "issue")
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Sprint => "sprint",
            EntityKind::Issue => "issue",
            EntityKind::Task => "task",
        }
    }

    /// Dataset name, used for registry sections and JSONL file stems
    pub fn dataset_name(&self) -> &'static str {
        match self {
            EntityKind::Sprint => "sprints",
            EntityKind::Issue => "issues",
            EntityKind::Task => "tasks",
        }
    }

    /// Capitalized label used in rendered violations
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Sprint => "Sprints",
            EntityKind::Issue => "Issues",
            EntityKind::Task => "Tasks",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sprint" | "sprints" => Ok(EntityKind::Sprint),
            "issue" | "issues" => Ok(EntityKind::Issue),
            "task" | "tasks" => Ok(EntityKind::Task),
            other => Err(LedgerError::UnknownKind(other.to_string())),
        }
    }
}

/// One entry in a record's append-only status history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub status: String,
    /// ISO-8601 with timezone on disk
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub reason: String,
}

impl StatusEntry {
    /// Create a new history entry
    pub fn new(
        status: impl Into<String>,
        timestamp: DateTime<Utc>,
        actor: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            status: status.into(),
            timestamp,
            actor: actor.into(),
            reason: reason.into(),
        }
    }
}

/// The seam the Validator, Record Store, and Transition Engine share.
///
/// Workflow-bearing fields are statically typed; descriptive fields live in
/// each record's open map and are reached by name for schema validation.
pub trait LedgerRecord: Clone + Serialize + DeserializeOwned {
    const KIND: EntityKind;

    fn id(&self) -> &str;
    fn status(&self) -> &str;
    fn set_status(&mut self, status: String);
    fn history(&self) -> &[StatusEntry];
    fn history_mut(&mut self) -> &mut Vec<StatusEntry>;

    /// Presence lookup for required-field validation
    fn has_field(&self, name: &str) -> bool;

    /// String value lookup for foreign-key validation
    fn str_field(&self, name: &str) -> Option<&str>;
}

/// A sprint record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sprint {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub status_history: Vec<StatusEntry>,
    /// Descriptive fields (name, dates, notes, ...) pass through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An issue record, owned by a sprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub sprint_id: String,
    pub status: String,
    #[serde(default)]
    pub status_history: Vec<StatusEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A task record, owned by an issue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub issue_id: String,
    pub sprint_id: String,
    pub status: String,
    #[serde(default)]
    pub status_history: Vec<StatusEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn extra_str<'a>(extra: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    extra.get(name).and_then(Value::as_str)
}

impl LedgerRecord for Sprint {
    const KIND: EntityKind = EntityKind::Sprint;

    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> &str {
        &self.status
    }

    fn set_status(&mut self, status: String) {
        self.status = status;
    }

    fn history(&self) -> &[StatusEntry] {
        &self.status_history
    }

    fn history_mut(&mut self) -> &mut Vec<StatusEntry> {
        &mut self.status_history
    }

    fn has_field(&self, name: &str) -> bool {
        matches!(name, "id" | "status" | "status_history") || self.extra.contains_key(name)
    }

    fn str_field(&self, name: &str) -> Option<&str> {
        match name {
            "id" => Some(&self.id),
            "status" => Some(&self.status),
            _ => extra_str(&self.extra, name),
        }
    }
}

impl LedgerRecord for Issue {
    const KIND: EntityKind = EntityKind::Issue;

    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> &str {
        &self.status
    }

    fn set_status(&mut self, status: String) {
        self.status = status;
    }

    fn history(&self) -> &[StatusEntry] {
        &self.status_history
    }

    fn history_mut(&mut self) -> &mut Vec<StatusEntry> {
        &mut self.status_history
    }

    fn has_field(&self, name: &str) -> bool {
        matches!(name, "id" | "sprint_id" | "status" | "status_history")
            || self.extra.contains_key(name)
    }

    fn str_field(&self, name: &str) -> Option<&str> {
        match name {
            "id" => Some(&self.id),
            "sprint_id" => Some(&self.sprint_id),
            "status" => Some(&self.status),
            _ => extra_str(&self.extra, name),
        }
    }
}

impl LedgerRecord for Task {
    const KIND: EntityKind = EntityKind::Task;

    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> &str {
        &self.status
    }

    fn set_status(&mut self, status: String) {
        self.status = status;
    }

    fn history(&self) -> &[StatusEntry] {
        &self.status_history
    }

    fn history_mut(&mut self) -> &mut Vec<StatusEntry> {
        &mut self.status_history
    }

    fn has_field(&self, name: &str) -> bool {
        matches!(
            name,
            "id" | "issue_id" | "sprint_id" | "status" | "status_history"
        ) || self.extra.contains_key(name)
    }

    fn str_field(&self, name: &str) -> Option<&str> {
        match name {
            "id" => Some(&self.id),
            "issue_id" => Some(&self.issue_id),
            "sprint_id" => Some(&self.sprint_id),
            "status" => Some(&self.status),
            _ => extra_str(&self.extra, name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("issue".parse::<EntityKind>().unwrap(), EntityKind::Issue);
        assert_eq!("tasks".parse::<EntityKind>().unwrap(), EntityKind::Task);
        assert!("epic".parse::<EntityKind>().is_err());
    }

    #[test]
    fn test_issue_round_trip_preserves_extra_fields() {
        let json = serde_json::json!({
            "id": "S03.I01",
            "sprint_id": "S03",
            "status": "todo",
            "status_history": [],
            "title": "Establish telemetry substrate",
            "tags": ["infra"]
        });
        let issue: Issue = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(issue.id, "S03.I01");
        assert_eq!(issue.extra["title"], "Establish telemetry substrate");

        let back = serde_json::to_value(&issue).unwrap();
        assert_eq!(back["tags"], json["tags"]);
    }

    #[test]
    fn test_field_lookup_reaches_named_and_extra_fields() {
        let task: Task = serde_json::from_value(serde_json::json!({
            "id": "S03.I01.T01",
            "issue_id": "S03.I01",
            "sprint_id": "S03",
            "status": "done",
            "title": "Create extraction script"
        }))
        .unwrap();

        assert!(task.has_field("issue_id"));
        assert!(task.has_field("title"));
        assert!(!task.has_field("description"));
        assert_eq!(task.str_field("issue_id"), Some("S03.I01"));
        assert_eq!(task.str_field("title"), Some("Create extraction script"));
        assert_eq!(task.str_field("description"), None);
    }
}

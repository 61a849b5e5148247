//! Schema registry model
//!
//! Loads the versioned registry document (per-kind schemas plus the shared
//! workflow transition table) once and exposes it as an immutable value that
//! is passed explicitly into the Validator and Transition Engine.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use regex::Regex;
use semver::Version;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{LedgerError, Result};
use crate::record::EntityKind;

/// A declared foreign key: a field on this kind referencing another kind
#[derive(Debug, Clone)]
pub struct ForeignKey {
    /// Field on the owning record (e.g. "sprint_id")
    pub field: String,
    /// Kind the reference must resolve in
    pub target_kind: EntityKind,
    /// Field on the target record (e.g. "id")
    pub target_field: String,
}

/// The validated schema for a single entity kind
#[derive(Debug, Clone)]
pub struct EntitySchema {
    pub kind: EntityKind,
    pub schema_version: Version,
    /// The identifier field, named explicitly rather than inferred
    pub id_field: String,
    pub required_fields: Vec<String>,
    /// Fully anchored identifier pattern
    pub id_pattern: Regex,
    pub status_values: Vec<String>,
    /// Sorted by field name so reports are deterministic
    pub foreign_keys: Vec<ForeignKey>,
}

impl EntitySchema {
    /// Check a status against the kind's allowed set
    pub fn allows_status(&self, status: &str) -> bool {
        self.status_values.iter().any(|s| s == status)
    }
}

/// The shared status-transition table
#[derive(Debug, Clone, Default)]
pub struct TransitionTable {
    transitions: HashMap<String, Vec<String>>,
}

impl TransitionTable {
    /// Statuses legally reachable from `status` in one step.
    ///
    /// Terminal and unknown statuses both yield an empty slice.
    pub fn transitions_from(&self, status: &str) -> &[String] {
        self.transitions.get(status).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `from -> to` is a legal single-step transition
    pub fn allows(&self, from: &str, to: &str) -> bool {
        self.transitions_from(from).iter().any(|s| s == to)
    }
}

/// The loaded, immutable schema registry
#[derive(Debug, Clone)]
pub struct Registry {
    registry_version: Version,
    sprint: EntitySchema,
    issue: EntitySchema,
    task: EntitySchema,
    workflow: TransitionTable,
}

#[derive(Debug, Deserialize)]
struct RegistryDoc {
    registry_version: Version,
    schemas: HashMap<String, SchemaDoc>,
    workflow: WorkflowDoc,
}

#[derive(Debug, Deserialize)]
struct SchemaDoc {
    schema_version: Version,
    id_field: String,
    required_fields: Vec<String>,
    id_pattern: String,
    status_values: Vec<String>,
    #[serde(default)]
    foreign_keys: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct WorkflowDoc {
    allowed_transitions: HashMap<String, Vec<String>>,
}

impl Registry {
    /// Load the registry from a JSON document on disk
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load the registry from a JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        let doc: RegistryDoc = serde_json::from_str(content)?;
        Self::from_doc(doc)
    }

    /// Load the registry from an in-memory JSON value
    pub fn from_value(value: Value) -> Result<Self> {
        let doc: RegistryDoc = serde_json::from_value(value)?;
        Self::from_doc(doc)
    }

    fn from_doc(mut doc: RegistryDoc) -> Result<Self> {
        let sprint = build_schema(EntityKind::Sprint, &mut doc.schemas)?;
        let issue = build_schema(EntityKind::Issue, &mut doc.schemas)?;
        let task = build_schema(EntityKind::Task, &mut doc.schemas)?;

        Ok(Self {
            registry_version: doc.registry_version,
            sprint,
            issue,
            task,
            workflow: TransitionTable {
                transitions: doc.workflow.allowed_transitions,
            },
        })
    }

    /// The version tag of the registry document, carried through for audit
    pub fn registry_version(&self) -> &Version {
        &self.registry_version
    }

    /// The schema for a kind
    pub fn schema_for(&self, kind: EntityKind) -> &EntitySchema {
        match kind {
            EntityKind::Sprint => &self.sprint,
            EntityKind::Issue => &self.issue,
            EntityKind::Task => &self.task,
        }
    }

    /// All schemas, in validation order
    pub fn schemas(&self) -> impl Iterator<Item = &EntitySchema> {
        [&self.sprint, &self.issue, &self.task].into_iter()
    }

    /// Per-kind schema versions, for audit records
    pub fn schema_versions(&self) -> std::collections::BTreeMap<EntityKind, Version> {
        EntityKind::ALL
            .iter()
            .map(|&kind| (kind, self.schema_for(kind).schema_version.clone()))
            .collect()
    }

    /// The shared transition table
    pub fn workflow(&self) -> &TransitionTable {
        &self.workflow
    }

    /// Statuses legally reachable from `status` in one step
    pub fn transitions_from(&self, status: &str) -> &[String] {
        self.workflow.transitions_from(status)
    }

    /// Whether `from -> to` is a legal single-step transition
    pub fn allows(&self, from: &str, to: &str) -> bool {
        self.workflow.allows(from, to)
    }
}

fn build_schema(
    kind: EntityKind,
    schemas: &mut HashMap<String, SchemaDoc>,
) -> Result<EntitySchema> {
    let doc = schemas
        .remove(kind.dataset_name())
        .ok_or(LedgerError::MissingSchema(kind))?;

    if !doc.required_fields.iter().any(|f| *f == doc.id_field) {
        return Err(LedgerError::InvalidRegistry(format!(
            "id_field '{}' of {} is not listed in required_fields",
            doc.id_field,
            kind.dataset_name()
        )));
    }

    // Full anchoring; a prefix match would let a task id pass as an issue id
    let id_pattern = Regex::new(&format!("^(?:{})$", doc.id_pattern))?;

    let mut foreign_keys = Vec::with_capacity(doc.foreign_keys.len());
    for (field, target) in doc.foreign_keys {
        let (dataset, target_field) = target.split_once('.').ok_or_else(|| {
            LedgerError::InvalidRegistry(format!(
                "foreign key '{field}' of {} has malformed target '{target}'",
                kind.dataset_name()
            ))
        })?;
        let target_kind: EntityKind = dataset.parse()?;
        foreign_keys.push(ForeignKey {
            field,
            target_kind,
            target_field: target_field.to_string(),
        });
    }
    foreign_keys.sort_by(|a, b| a.field.cmp(&b.field));

    Ok(EntitySchema {
        kind,
        schema_version: doc.schema_version,
        id_field: doc.id_field,
        required_fields: doc.required_fields,
        id_pattern,
        status_values: doc.status_values,
        foreign_keys,
    })
}

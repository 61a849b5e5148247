//! Record store
//!
//! Uniform access to the three record collections: insertion-ordered
//! iteration, O(1) lookup by identifier, and whole-record replacement.
//! JSONL persistence lives here as the adapter the surrounding tooling uses;
//! nothing in the core blocks on it.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{LedgerError, Result};
use crate::record::{EntityKind, Issue, LedgerRecord, Sprint, Task};

/// An ordered collection of records of one kind
#[derive(Debug, Clone)]
pub struct Collection<R> {
    records: Vec<R>,
    index: HashMap<String, usize>,
}

impl<R: LedgerRecord> Collection<R> {
    /// Create an empty collection
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Build a collection from loaded records.
    ///
    /// Duplicate identifiers are kept in the sequence (the index keeps the
    /// first occurrence) so the Validator can report them instead of the
    /// store silently dropping records.
    pub fn from_records(records: Vec<R>) -> Self {
        let mut index = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            index.entry(record.id().to_string()).or_insert(i);
        }
        Self { records, index }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records, in insertion order
    pub fn records(&self) -> &[R] {
        &self.records
    }

    /// Look up a record by identifier
    pub fn get(&self, id: &str) -> Option<&R> {
        self.index.get(id).map(|&i| &self.records[i])
    }

    /// Append a record
    pub fn insert(&mut self, record: R) {
        let id = record.id().to_string();
        self.records.push(record);
        self.index.entry(id).or_insert(self.records.len() - 1);
    }

    /// Replace an existing record wholesale; the id must already be present
    pub fn replace(&mut self, record: R) -> Result<()> {
        match self.index.get(record.id()) {
            Some(&i) => {
                self.records[i] = record;
                Ok(())
            }
            None => Err(LedgerError::NotFound {
                kind: R::KIND,
                id: record.id().to_string(),
            }),
        }
    }

    /// The set of identifiers present in this collection
    pub fn id_set(&self) -> HashSet<String> {
        self.records.iter().map(|r| r.id().to_string()).collect()
    }
}

impl<R: LedgerRecord> Default for Collection<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// The three governed collections
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    pub sprints: Collection<Sprint>,
    pub issues: Collection<Issue>,
    pub tasks: Collection<Task>,
}

impl RecordStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `sprints.jsonl`, `issues.jsonl`, and `tasks.jsonl` from a directory
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        Ok(Self {
            sprints: Collection::from_records(read_jsonl(&dataset_path(dir, EntityKind::Sprint))?),
            issues: Collection::from_records(read_jsonl(&dataset_path(dir, EntityKind::Issue))?),
            tasks: Collection::from_records(read_jsonl(&dataset_path(dir, EntityKind::Task))?),
        })
    }

    /// Write all three datasets back as canonical JSONL
    pub fn save_dir(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        for kind in EntityKind::ALL {
            fs::write(dataset_path(dir, kind), self.canonical_jsonl(kind)?)?;
        }
        Ok(())
    }

    /// Number of records of a kind
    pub fn len(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Sprint => self.sprints.len(),
            EntityKind::Issue => self.issues.len(),
            EntityKind::Task => self.tasks.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        EntityKind::ALL.iter().all(|&kind| self.len(kind) == 0)
    }

    /// Per-kind record counts, for audit records
    pub fn counts(&self) -> BTreeMap<EntityKind, usize> {
        EntityKind::ALL
            .iter()
            .map(|&kind| (kind, self.len(kind)))
            .collect()
    }

    /// Whether a record exists
    pub fn contains(&self, kind: EntityKind, id: &str) -> bool {
        self.status_of(kind, id).is_some()
    }

    /// The current status of a record, if present
    pub fn status_of(&self, kind: EntityKind, id: &str) -> Option<&str> {
        match kind {
            EntityKind::Sprint => self.sprints.get(id).map(|r| r.status()),
            EntityKind::Issue => self.issues.get(id).map(|r| r.status()),
            EntityKind::Task => self.tasks.get(id).map(|r| r.status()),
        }
    }

    /// Identifier set of a kind, computed once per validation pass
    pub fn id_set(&self, kind: EntityKind) -> HashSet<String> {
        match kind {
            EntityKind::Sprint => self.sprints.id_set(),
            EntityKind::Issue => self.issues.id_set(),
            EntityKind::Task => self.tasks.id_set(),
        }
    }

    /// Canonical JSONL rendering of one dataset: compact JSON, one record
    /// per line, trailing newline per line. `save_dir` writes exactly these
    /// bytes, so content digests match the files on disk.
    pub fn canonical_jsonl(&self, kind: EntityKind) -> Result<String> {
        match kind {
            EntityKind::Sprint => jsonl_string(self.sprints.records()),
            EntityKind::Issue => jsonl_string(self.issues.records()),
            EntityKind::Task => jsonl_string(self.tasks.records()),
        }
    }
}

/// Path of one dataset inside a data directory
pub fn dataset_path(dir: &Path, kind: EntityKind) -> std::path::PathBuf {
    dir.join(format!("{}.jsonl", kind.dataset_name()))
}

fn read_jsonl<R: DeserializeOwned>(path: &Path) -> Result<Vec<R>> {
    let content = fs::read_to_string(path)?;
    let mut records = Vec::new();
    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(line).map_err(|source| LedgerError::DatasetParse {
            path: path.display().to_string(),
            line: i + 1,
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}

fn jsonl_string<R: Serialize>(records: &[R]) -> Result<String> {
    let mut out = String::new();
    for record in records {
        out.push_str(&serde_json::to_string(record)?);
        out.push('\n');
    }
    Ok(out)
}

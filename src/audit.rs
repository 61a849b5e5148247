//! Audit/integrity layer
//!
//! Wraps a Transition Engine run with before/after content digests of the
//! affected datasets and the structured parameters of the run: record
//! counts, registry and schema versions, and the old/new status and
//! timestamp of every committed change. The audit layer observes; it never
//! gates. A failed digest degrades the run to "committed but unaudited"
//! rather than blocking a batch that has already committed in memory.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use semver::Version;
use serde::Serialize;

use crate::checksum::Checksum;
use crate::error::Result;
use crate::record::EntityKind;
use crate::registry::Registry;
use crate::store::RecordStore;
use crate::transition::AppliedChange;

/// The traceable record of one workflow run
#[derive(Debug, Clone, Serialize)]
pub struct RunAudit {
    pub run_name: String,
    pub sprint: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub registry_version: Version,
    pub schema_versions: BTreeMap<EntityKind, Version>,
    pub record_counts: BTreeMap<EntityKind, usize>,
    pub update_count: usize,
    /// Per-dataset digest before the commit pass; `None` marks a dataset
    /// that could not be digested
    pub digests_before: BTreeMap<EntityKind, Option<Checksum>>,
    pub digests_after: BTreeMap<EntityKind, Option<Checksum>>,
    pub changes: Vec<AppliedChange>,
    /// False when any digest is missing: committed but unaudited
    pub audited: bool,
}

impl RunAudit {
    /// Capture the pre-commit side of a run
    pub fn begin(
        run_name: impl Into<String>,
        sprint: Option<String>,
        registry: &Registry,
        store: &RecordStore,
        update_count: usize,
    ) -> Self {
        Self {
            run_name: run_name.into(),
            sprint,
            started_at: Utc::now(),
            finished_at: None,
            registry_version: registry.registry_version().clone(),
            schema_versions: registry.schema_versions(),
            record_counts: store.counts(),
            update_count,
            digests_before: digest_datasets(store),
            digests_after: BTreeMap::new(),
            changes: Vec::new(),
            audited: false,
        }
    }

    /// Capture the post-commit side of a run
    pub fn complete(&mut self, store: &RecordStore, changes: Vec<AppliedChange>) {
        self.digests_after = digest_datasets(store);
        self.changes = changes;
        self.finished_at = Some(Utc::now());
        self.audited = self
            .digests_before
            .values()
            .chain(self.digests_after.values())
            .all(Option::is_some);
        if !self.audited {
            tracing::warn!(run = %self.run_name, "run committed but unaudited: dataset digest missing");
        }
    }

    /// Write the audit record as pretty-printed JSON
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// Digest every dataset's canonical JSONL content. A dataset that fails to
/// serialize is reported and recorded as absent instead of aborting.
fn digest_datasets(store: &RecordStore) -> BTreeMap<EntityKind, Option<Checksum>> {
    EntityKind::ALL
        .iter()
        .map(|&kind| {
            let digest = match store.canonical_jsonl(kind) {
                Ok(content) => Some(Checksum::from_str(&content)),
                Err(e) => {
                    tracing::warn!(kind = %kind, error = %e, "failed to digest dataset");
                    None
                }
            };
            (kind, digest)
        })
        .collect()
}

//! Status-transition engine
//!
//! Applies batches of status changes as a single atomic unit. A batch is
//! pre-validated in full before any record is touched: every target must
//! resolve and every requested status must be a legal transition from the
//! status the record had when the batch arrived. Only then does the commit
//! pass mutate the store, in input order, stamping each history append with
//! the monotonic clock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::MonotonicClock;
use crate::error::{LedgerError, Result};
use crate::record::{EntityKind, LedgerRecord, StatusEntry};
use crate::registry::Registry;
use crate::store::{Collection, RecordStore};

/// One requested status change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub kind: EntityKind,
    pub id: String,
    pub new_status: String,
    pub actor: String,
    pub reason: String,
}

impl ChangeRequest {
    /// Create a new change request
    pub fn new(
        kind: EntityKind,
        id: impl Into<String>,
        new_status: impl Into<String>,
        actor: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            id: id.into(),
            new_status: new_status.into(),
            actor: actor.into(),
            reason: reason.into(),
        }
    }
}

/// The audit-facing result of one committed change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedChange {
    pub kind: EntityKind,
    pub id: String,
    pub old_status: String,
    pub new_status: String,
    pub timestamp: DateTime<Utc>,
}

/// The transition engine
#[derive(Debug, Clone, Copy, Default)]
pub struct TransitionEngine {
    clock: MonotonicClock,
}

impl TransitionEngine {
    /// Engine stamping with the system clock
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine stamping with a supplied clock
    pub fn with_clock(clock: MonotonicClock) -> Self {
        Self { clock }
    }

    /// Apply a batch of change requests atomically.
    ///
    /// On any pre-validation failure the store is left untouched and the
    /// error names the offending request; there is no partial-commit state.
    pub fn apply_batch(
        &self,
        store: &mut RecordStore,
        registry: &Registry,
        requests: &[ChangeRequest],
    ) -> Result<Vec<AppliedChange>> {
        // Pre-validation pass: no mutation
        for request in requests {
            let current =
                store
                    .status_of(request.kind, &request.id)
                    .ok_or_else(|| LedgerError::NotFound {
                        kind: request.kind,
                        id: request.id.clone(),
                    })?;
            if !registry.allows(current, &request.new_status) {
                return Err(LedgerError::IllegalTransition {
                    kind: request.kind,
                    id: request.id.clone(),
                    from: current.to_string(),
                    to: request.new_status.clone(),
                });
            }
        }

        // Commit pass, in input order
        let mut applied = Vec::with_capacity(requests.len());
        for request in requests {
            let change = match request.kind {
                EntityKind::Sprint => self.commit(&mut store.sprints, request)?,
                EntityKind::Issue => self.commit(&mut store.issues, request)?,
                EntityKind::Task => self.commit(&mut store.tasks, request)?,
            };
            tracing::debug!(
                kind = %change.kind,
                id = %change.id,
                from = %change.old_status,
                to = %change.new_status,
                "status change committed"
            );
            applied.push(change);
        }
        Ok(applied)
    }

    fn commit<R: LedgerRecord>(
        &self,
        collection: &mut Collection<R>,
        request: &ChangeRequest,
    ) -> Result<AppliedChange> {
        let mut record = collection
            .get(&request.id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound {
                kind: R::KIND,
                id: request.id.clone(),
            })?;

        let old_status = record.status().to_string();
        let last = record.history().last().map(|entry| entry.timestamp);
        let timestamp = self.clock.next(last);

        record.set_status(request.new_status.clone());
        record.history_mut().push(StatusEntry::new(
            request.new_status.clone(),
            timestamp,
            request.actor.clone(),
            request.reason.clone(),
        ));
        collection.replace(record)?;

        Ok(AppliedChange {
            kind: R::KIND,
            id: request.id.clone(),
            old_status,
            new_status: request.new_status.clone(),
            timestamp,
        })
    }
}

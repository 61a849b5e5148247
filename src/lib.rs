//! Governance Ledger
//!
//! A schema-validated ledger of sprints, issues, and tasks stored as
//! JSON-line datasets, with a controlled status workflow and an audit trail
//! for every change.
//!
//! ## Features
//!
//! - **Schema Registry**: versioned per-kind schemas (required fields,
//!   identifier patterns, allowed statuses, foreign keys) loaded once and
//!   passed explicitly
//! - **Referential Validation**: fail-fast structural, enumeration,
//!   foreign-key, and status-history checks before a dataset is published
//! - **Atomic Workflow Batches**: status changes pre-validate in full, then
//!   commit in order with strictly increasing history timestamps
//! - **Audit Trail**: SHA256 before/after dataset digests plus structured
//!   run parameters for every committed batch
//!
//! ## Architecture
//!
//! ```text
//! data/
//! ├── sprints.jsonl
//! ├── issues.jsonl
//! └── tasks.jsonl
//! frameworks/
//! └── schema_registry.json
//! reports/<sprint>/
//! ├── minutes/
//! └── transactions/
//! ```

pub mod audit;
pub mod batch;
pub mod checksum;
pub mod clock;
pub mod config;
pub mod error;
pub mod metrics;
pub mod record;
pub mod registry;
pub mod store;
pub mod transition;
pub mod validator;

pub use audit::RunAudit;
pub use checksum::Checksum;
pub use clock::MonotonicClock;
pub use config::LedgerConfig;
pub use error::{LedgerError, Result, Violation, ViolationRule};
pub use metrics::DatasetMetrics;
pub use record::{EntityKind, Issue, LedgerRecord, Sprint, StatusEntry, Task};
pub use registry::{EntitySchema, Registry, TransitionTable};
pub use store::{Collection, RecordStore};
pub use transition::{AppliedChange, ChangeRequest, TransitionEngine};
pub use validator::Validator;

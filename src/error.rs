//! Error types for the governance ledger

use serde::Serialize;
use thiserror::Error;

use crate::record::EntityKind;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Governance ledger errors
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Registry has no schema section for '{0}'")]
    MissingSchema(EntityKind),

    #[error("Invalid registry document: {0}")]
    InvalidRegistry(String),

    #[error("Unknown entity kind: {0}")]
    UnknownKind(String),

    #[error(transparent)]
    Validation(#[from] Violation),

    #[error("{kind} '{id}' not found")]
    NotFound { kind: EntityKind, id: String },

    #[error("Illegal transition {from} -> {to} for {kind} '{id}'")]
    IllegalTransition {
        kind: EntityKind,
        id: String,
        from: String,
        to: String,
    },

    #[error("Invalid change request: {0}")]
    InvalidRequest(String),

    #[error("Failed to parse {path} line {line}: {source}")]
    DatasetParse {
        path: String,
        line: usize,
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Semver error: {0}")]
    Semver(#[from] semver::Error),
}

/// The rule a record or collection violated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationRule {
    /// A required field is absent from a record
    MissingField,
    /// An identifier does not match its kind's pattern
    IdPattern,
    /// An identifier appears more than once within its kind
    DuplicateId,
    /// A status is not in the kind's allowed set
    StatusValue,
    /// A foreign key does not resolve in the target kind
    ForeignKey,
    /// A status history is missing or empty
    EmptyHistory,
    /// An adjacent history pair is not a legal transition
    HistoryTransition,
    /// History timestamps are not strictly increasing
    HistoryOrder,
    /// The record status disagrees with the last history entry
    StatusMismatch,
}

impl ViolationRule {
    /// Human-readable phrase used in rendered violations
    pub fn describe(&self) -> &'static str {
        match self {
            ViolationRule::MissingField => "missing required field",
            ViolationRule::IdPattern => "identifier does not match pattern",
            ViolationRule::DuplicateId => "duplicate identifier",
            ViolationRule::StatusValue => "status not in allowed set",
            ViolationRule::ForeignKey => "unresolved foreign key",
            ViolationRule::EmptyHistory => "missing or empty status_history",
            ViolationRule::HistoryTransition => "illegal status-history transition",
            ViolationRule::HistoryOrder => "status-history timestamps not strictly increasing",
            ViolationRule::StatusMismatch => "status does not match last history entry",
        }
    }
}

impl std::fmt::Display for ViolationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.describe())
    }
}

/// A single validation failure with enough context to locate and fix it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// The entity kind the offending record belongs to
    pub entity: EntityKind,
    /// The offending record, when the violation is record-scoped
    pub record_id: Option<String>,
    /// Which rule failed
    pub rule: ViolationRule,
    /// What the rule expected
    pub expected: String,
    /// What was actually found
    pub actual: String,
}

impl Violation {
    /// Create a new violation
    pub fn new(
        entity: EntityKind,
        record_id: Option<&str>,
        rule: ViolationRule,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            entity,
            record_id: record_id.map(String::from),
            rule,
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.record_id {
            Some(id) => write!(
                f,
                "{} {}: {} (expected {}, actual {})",
                self.entity.label(),
                id,
                self.rule,
                self.expected,
                self.actual
            ),
            None => write!(
                f,
                "{}: {} (expected {}, actual {})",
                self.entity.label(),
                self.rule,
                self.expected,
                self.actual
            ),
        }
    }
}

impl std::error::Error for Violation {}

//! Validation findings.
//!
//! A finding is a single diagnosis produced by a validator: what kind of
//! problem was found, how severe it is, where it lives in the uploaded
//! grid (if anywhere), and an optional remediation hint.
//!
//! Findings are plain values. They are regenerated from scratch on every
//! validation pass and compared by content only.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single validation finding.
///
/// Serialized with the field names the grid collaborator keys on
/// (`type`, `rowIndex`, `columnId`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    /// Finding category.
    #[serde(rename = "type")]
    pub kind: FindingKind,
    /// Human-readable description.
    pub message: String,
    /// Row of the offending record within its collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_index: Option<usize>,
    /// Column of the offending cell.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_id: Option<String>,
    /// How strongly the finding gates export.
    pub severity: Severity,
    /// Advisory remediation text. Never applied automatically.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// Finding categories.
///
/// The serialized names form a fixed vocabulary shared with the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// A required column is absent from the sampled record.
    MissingColumn,
    /// An ID value occurs more than once.
    DuplicateId,
    /// A list-typed column holds a non-list value.
    MalformedArray,
    /// A numeric column holds a non-finite or non-numeric value.
    MalformedNumber,
    /// A value lies outside its allowed range.
    OutOfRange,
    /// AttributesJSON does not decode.
    BrokenJson,
    /// A reference names an entity that does not exist.
    UnknownReference,
    /// Co-run rules form a cycle.
    CircularDependency,
    /// A client requests a task no worker can perform.
    SkillCoverageGap,
    /// Too few workers are available in a task's preferred phase.
    PhaseAvailabilityMismatch,
    /// Two rules, or a rule and a record, contradict each other.
    RuleConflict,
    /// A rule declares more capacity than its workers provide.
    RuleCapacityMismatch,
    /// A worker's per-phase load exceeds its slot count.
    OverloadedWorker,
    /// Task demand in a phase exceeds worker capacity.
    PhaseSaturation,
    /// A required skill is held by no worker.
    SkillCoverage,
    /// MaxConcurrent exceeds the number of qualified workers.
    MaxConcurrency,
    /// A phase number lies outside the valid phase range.
    InvalidPhase,
}

/// Finding severity.
///
/// Only [`Severity::Error`] blocks export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Must be fixed before export.
    Error,
    /// Likely infeasible, but not structurally broken.
    Warning,
    /// Informational only.
    Info,
}

impl ValidationError {
    /// Creates a finding with no cell location and no suggestion.
    pub fn new(kind: FindingKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            row_index: None,
            column_id: None,
            severity,
            suggestion: None,
        }
    }

    /// Creates an error-severity finding.
    pub fn error(kind: FindingKind, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Error, message)
    }

    /// Creates a warning-severity finding.
    pub fn warning(kind: FindingKind, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Warning, message)
    }

    /// Creates an info-severity finding.
    pub fn info(kind: FindingKind, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Info, message)
    }

    /// Locates the finding at a grid cell.
    pub fn at(mut self, row_index: usize, column_id: impl Into<String>) -> Self {
        self.row_index = Some(row_index);
        self.column_id = Some(column_id.into());
        self
    }

    /// Locates the finding at a column without a specific row.
    pub fn in_column(mut self, column_id: impl Into<String>) -> Self {
        self.column_id = Some(column_id.into());
        self
    }

    /// Attaches remediation text.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Whether this finding blocks export.
    #[inline]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Whether this finding is located at the given cell.
    pub fn is_at(&self, row_index: usize, column_id: &str) -> bool {
        self.row_index == Some(row_index) && self.column_id.as_deref() == Some(column_id)
    }
}

impl FindingKind {
    /// The wire name of this category (e.g. `"duplicate_id"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingColumn => "missing_column",
            Self::DuplicateId => "duplicate_id",
            Self::MalformedArray => "malformed_array",
            Self::MalformedNumber => "malformed_number",
            Self::OutOfRange => "out_of_range",
            Self::BrokenJson => "broken_json",
            Self::UnknownReference => "unknown_reference",
            Self::CircularDependency => "circular_dependency",
            Self::SkillCoverageGap => "skill_coverage_gap",
            Self::PhaseAvailabilityMismatch => "phase_availability_mismatch",
            Self::RuleConflict => "rule_conflict",
            Self::RuleCapacityMismatch => "rule_capacity_mismatch",
            Self::OverloadedWorker => "overloaded_worker",
            Self::PhaseSaturation => "phase_saturation",
            Self::SkillCoverage => "skill_coverage",
            Self::MaxConcurrency => "max_concurrency",
            Self::InvalidPhase => "invalid_phase",
        }
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        };
        f.write_str(s)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.kind, self.message)?;
        if let Some(row) = self.row_index {
            write!(f, " (row {row}")?;
            if let Some(col) = &self.column_id {
                write!(f, ", column {col}")?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

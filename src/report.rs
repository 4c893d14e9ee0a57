//! Validation reports.
//!
//! A [`ValidationReport`] wraps the ordered findings of one pass with the
//! queries the grid and the export gate need. [`ReportSlot`] holds the
//! report currently on display and drops results of passes that were
//! superseded while they ran.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{FindingKind, Severity, ValidationError};

/// Ordered findings of one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationReport {
    findings: Vec<ValidationError>,
}

impl ValidationReport {
    /// Wraps findings, keeping their order.
    pub fn new(findings: Vec<ValidationError>) -> Self {
        Self { findings }
    }

    /// All findings in emission order.
    pub fn findings(&self) -> &[ValidationError] {
        &self.findings
    }

    /// Consumes the report.
    pub fn into_findings(self) -> Vec<ValidationError> {
        self.findings
    }

    /// Number of findings.
    pub fn len(&self) -> usize {
        self.findings.len()
    }

    /// Whether the pass found nothing at all.
    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// Whether any error-severity finding is present.
    ///
    /// Export is gated on this; warnings and infos never block.
    pub fn blocks_export(&self) -> bool {
        self.findings.iter().any(ValidationError::is_error)
    }

    /// Number of findings at a severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }

    /// Findings anchored to one grid cell, for cell highlighting.
    pub fn findings_at<'a>(
        &'a self,
        row_index: usize,
        column_id: &'a str,
    ) -> impl Iterator<Item = &'a ValidationError> + 'a {
        self.findings
            .iter()
            .filter(move |f| f.is_at(row_index, column_id))
    }

    /// Findings of one kind.
    pub fn of_kind(&self, kind: FindingKind) -> impl Iterator<Item = &ValidationError> + '_ {
        self.findings.iter().filter(move |f| f.kind == kind)
    }

    /// Findings grouped by kind, each group in emission order.
    pub fn by_kind(&self) -> BTreeMap<FindingKind, Vec<&ValidationError>> {
        let mut groups: BTreeMap<FindingKind, Vec<&ValidationError>> = BTreeMap::new();
        for finding in &self.findings {
            groups.entry(finding.kind).or_default().push(finding);
        }
        groups
    }
}

impl From<Vec<ValidationError>> for ValidationReport {
    fn from(findings: Vec<ValidationError>) -> Self {
        Self::new(findings)
    }
}

impl<'a> IntoIterator for &'a ValidationReport {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.findings.iter()
    }
}

/// Latest-wins holder for reports of concurrently issued passes.
///
/// Each pass takes a ticket from [`ReportSlot::issue`] before it starts.
/// A finished report is accepted only if no newer ticket has already
/// published, so a slow pass over stale data never overwrites a fresh one.
#[derive(Debug, Clone, Default)]
pub struct ReportSlot {
    next_ticket: u64,
    published: Option<u64>,
    current: ValidationReport,
}

impl ReportSlot {
    /// Creates a slot holding an empty report and no issued tickets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves a sequence number for a pass about to start.
    pub fn issue(&mut self) -> u64 {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        ticket
    }

    /// Offers a finished report. Returns `false` if it was stale.
    pub fn publish(&mut self, ticket: u64, report: ValidationReport) -> bool {
        if self.published.is_some_and(|p| p >= ticket) {
            tracing::debug!(ticket, "discarding stale validation report");
            return false;
        }
        self.published = Some(ticket);
        self.current = report;
        true
    }

    /// The report currently on display.
    pub fn current(&self) -> &ValidationReport {
        &self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> ValidationReport {
        ValidationReport::new(vec![
            ValidationError::error(FindingKind::DuplicateId, "Duplicate WorkerID: W1")
                .at(1, "WorkerID"),
            ValidationError::warning(FindingKind::OverloadedWorker, "Worker W2 overloaded")
                .at(2, "MaxLoadPerPhase"),
            ValidationError::error(FindingKind::DuplicateId, "Duplicate WorkerID: W3")
                .at(4, "WorkerID"),
            ValidationError::info(FindingKind::RuleConflict, "Pattern matches nothing"),
        ])
    }

    #[test]
    fn test_blocks_export() {
        assert!(sample_report().blocks_export());

        let warnings_only = ValidationReport::new(vec![ValidationError::warning(
            FindingKind::PhaseSaturation,
            "Phase 2 oversubscribed",
        )]);
        assert!(!warnings_only.blocks_export());
        assert!(!ValidationReport::default().blocks_export());
    }

    #[test]
    fn test_counts() {
        let report = sample_report();
        assert_eq!(report.len(), 4);
        assert_eq!(report.count(Severity::Error), 2);
        assert_eq!(report.count(Severity::Warning), 1);
        assert_eq!(report.count(Severity::Info), 1);
    }

    #[test]
    fn test_findings_at() {
        let report = sample_report();
        let at: Vec<_> = report.findings_at(1, "WorkerID").collect();
        assert_eq!(at.len(), 1);
        assert_eq!(at[0].message, "Duplicate WorkerID: W1");
        assert_eq!(report.findings_at(1, "WorkerName").count(), 0);
    }

    #[test]
    fn test_by_kind_keeps_order() {
        let report = sample_report();
        let groups = report.by_kind();
        let dups = &groups[&FindingKind::DuplicateId];
        assert_eq!(dups.len(), 2);
        assert_eq!(dups[0].row_index, Some(1));
        assert_eq!(dups[1].row_index, Some(4));
        assert_eq!(report.of_kind(FindingKind::RuleConflict).count(), 1);
    }

    #[test]
    fn test_serializes_as_array() {
        let report = sample_report();
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["type"], "duplicate_id");
        assert_eq!(json[0]["rowIndex"], 1);
    }

    #[test]
    fn test_slot_latest_wins() {
        let mut slot = ReportSlot::new();
        let first = slot.issue();
        let second = slot.issue();

        assert!(slot.publish(second, sample_report()));
        assert!(!slot.publish(first, ValidationReport::default()));
        assert_eq!(slot.current().len(), 4);

        let third = slot.issue();
        assert!(slot.publish(third, ValidationReport::default()));
        assert!(slot.current().is_empty());
    }
}

//! Validation orchestration.
//!
//! Composes the field, reference, and rule validators into two passes:
//!
//! - **Full pass** ([`Validator::validate_all`]): every check over the whole
//!   dataset, in a fixed order. This is the authoritative result and the
//!   only one that may gate export. [`Validator::validate_upload`] runs the
//!   same pass over parsed sheets, with the shape checks on the uploaded
//!   rows.
//! - **Incremental pass** ([`Validator::validate_change`]): the subset of
//!   checks relevant to one edited record, for fast per-cell feedback.
//!
//! # Full Pass Order
//!
//! | # | Check | Collections |
//! |---|-------|-------------|
//! | 1 | missing columns | clients, workers, tasks |
//! | 2 | duplicate IDs | clients, workers, tasks |
//! | 3 | malformed arrays / numbers | clients, workers, tasks |
//! | 4 | unreadable upload fields | uploads only |
//! | 5 | priority out of range | clients |
//! | 6 | broken AttributesJSON | clients |
//! | 7 | unknown task references | clients × tasks |
//! | 8 | co-run cycles | rules |
//! | 9 | preferred phase range | tasks |
//! | 10 | task duration | tasks |
//! | 11 | overloaded workers | workers |
//! | 12 | phase saturation | tasks × workers |
//! | 13 | skill coverage | tasks × workers |
//! | 14 | max concurrency | tasks × workers |
//! | 15 | rule conflicts | rules × all |
//! | 16 | cross-entity relationships | all |
//!
//! Validators never fail on bad data; bad data is what they report.

mod field;
mod reference;
mod rules;

pub use field::{
    validate_broken_json, validate_duplicates, validate_durations, validate_malformed,
    validate_missing_columns, validate_out_of_range, validate_overloaded,
    validate_phase_window_constraints,
};
pub use reference::{
    phase_capacity, phase_demand, validate_cross_entity_relationships, validate_max_concurrency,
    validate_phase_slot_saturation, validate_skill_coverage, validate_unknown_refs,
};
pub use rules::{
    co_run_graph, detect_circular_dependencies, validate_rule_conflicts, DependencyGraph,
};

use serde::Serialize;

use crate::config::ValidationConfig;
use crate::dataset::{Dataset, RowFailure, Upload};
use crate::models::{Client, FindingKind, Rule, Task, ValidationError, Worker};
use crate::schema::{ClientSchema, EntitySchema, TaskSchema, WorkerSchema};

/// One freshly edited record and its position in its collection.
#[derive(Debug, Clone, Copy)]
pub enum EntityChange<'a> {
    /// An edited client at `row`.
    Client { row: usize, client: &'a Client },
    /// An edited worker at `row`.
    Worker { row: usize, worker: &'a Worker },
    /// An edited task at `row`.
    Task { row: usize, task: &'a Task },
}

/// Runs validation passes under a fixed configuration.
///
/// Stateless between calls: every pass recomputes from its inputs.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Creates a validator with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a validator with a custom configuration.
    pub fn with_config(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Full pass over the whole dataset.
    ///
    /// Findings are concatenated in the documented check order; running the
    /// pass twice on unchanged input yields the same list.
    pub fn validate_all(
        &self,
        clients: &[Client],
        workers: &[Worker],
        tasks: &[Task],
        rules: &[Rule],
    ) -> Vec<ValidationError> {
        tracing::debug!(
            clients = clients.len(),
            workers = workers.len(),
            tasks = tasks.len(),
            rules = rules.len(),
            "full validation pass"
        );
        let mut errors = self.shape_findings(clients, workers, tasks);
        errors.extend(self.entity_findings(clients, workers, tasks, rules));

        tracing::debug!(findings = errors.len(), "full validation pass complete");
        errors
    }

    /// Full pass over a dataset snapshot.
    pub fn validate_dataset(&self, dataset: &Dataset) -> Vec<ValidationError> {
        self.validate_all(
            &dataset.clients,
            &dataset.workers,
            &dataset.tasks,
            &dataset.rules,
        )
    }

    /// Full pass over parsed sheets.
    ///
    /// Missing-column and malformed checks see the rows as uploaded. Any
    /// unreadable field those checks do not already report becomes a
    /// finding at its cell, so no bad row slips past the export gate.
    pub fn validate_upload(&self, upload: &Upload) -> Vec<ValidationError> {
        let ds = &upload.dataset;
        tracing::debug!(
            clients = ds.clients.len(),
            workers = ds.workers.len(),
            tasks = ds.tasks.len(),
            rules = ds.rules.len(),
            failures = upload.failures.len(),
            "full validation pass over upload"
        );
        let mut errors =
            self.shape_findings(upload.client_rows(), upload.worker_rows(), upload.task_rows());
        let unread = unreported_failures(&upload.failures, &errors);
        errors.extend(unread);
        errors.extend(self.entity_findings(&ds.clients, &ds.workers, &ds.tasks, &ds.rules));

        tracing::debug!(findings = errors.len(), "full validation pass complete");
        errors
    }

    /// Missing columns, duplicate IDs, and malformed cells.
    fn shape_findings<C, W, T>(&self, clients: &[C], workers: &[W], tasks: &[T]) -> Vec<ValidationError>
    where
        C: Serialize,
        W: Serialize,
        T: Serialize,
    {
        let cfg = &self.config;
        let mut errors = Vec::new();

        errors.extend(validate_missing_columns(clients, &cfg.client_columns));
        errors.extend(validate_missing_columns(workers, &cfg.worker_columns));
        errors.extend(validate_missing_columns(tasks, &cfg.task_columns));

        errors.extend(validate_duplicates(clients, ClientSchema::ID_COLUMN));
        errors.extend(validate_duplicates(workers, WorkerSchema::ID_COLUMN));
        errors.extend(validate_duplicates(tasks, TaskSchema::ID_COLUMN));

        errors.extend(validate_malformed(
            clients,
            ClientSchema::ARRAY_COLUMNS,
            ClientSchema::NUMERIC_COLUMNS,
        ));
        errors.extend(validate_malformed(
            workers,
            WorkerSchema::ARRAY_COLUMNS,
            WorkerSchema::NUMERIC_COLUMNS,
        ));
        errors.extend(validate_malformed(
            tasks,
            TaskSchema::ARRAY_COLUMNS,
            TaskSchema::NUMERIC_COLUMNS,
        ));

        errors
    }

    /// Value, reference, capacity, and rule checks over typed entities.
    fn entity_findings(
        &self,
        clients: &[Client],
        workers: &[Worker],
        tasks: &[Task],
        rules: &[Rule],
    ) -> Vec<ValidationError> {
        let cfg = &self.config;
        let mut errors = Vec::new();

        errors.extend(validate_out_of_range(clients, cfg));
        errors.extend(validate_broken_json(clients));
        errors.extend(validate_unknown_refs(clients, tasks));
        errors.extend(detect_circular_dependencies(rules));
        errors.extend(validate_phase_window_constraints(tasks, cfg));
        errors.extend(validate_durations(tasks));
        errors.extend(validate_overloaded(workers));
        errors.extend(validate_phase_slot_saturation(tasks, workers));
        errors.extend(validate_skill_coverage(tasks, workers));
        errors.extend(validate_max_concurrency(tasks, workers));
        errors.extend(validate_rule_conflicts(rules, clients, workers, tasks, cfg));
        errors.extend(validate_cross_entity_relationships(
            clients, workers, tasks, rules,
        ));

        errors
    }

    /// Incremental pass for one edited record.
    ///
    /// `context` is the dataset the record belongs to; the edited record
    /// stands in for whatever `context` holds at its row. Findings are
    /// located at the edited row. This is a responsiveness aid only: export
    /// must still be gated on [`Validator::validate_all`].
    pub fn validate_change(
        &self,
        change: EntityChange<'_>,
        context: &Dataset,
    ) -> Vec<ValidationError> {
        let cfg = &self.config;
        let mut errors = Vec::new();

        match change {
            EntityChange::Client { row, client } => {
                tracing::debug!(row, id = %client.id, "incremental validation: client");
                let one = std::slice::from_ref(client);
                errors.extend(collides(
                    &client.id,
                    row,
                    &context.clients,
                    |c| &c.id,
                    ClientSchema::ID_COLUMN,
                ));
                errors.extend(relocate(validate_out_of_range(one, cfg), row));
                errors.extend(relocate(validate_broken_json(one), row));
                errors.extend(relocate(validate_unknown_refs(one, &context.tasks), row));
            }
            EntityChange::Worker { row, worker } => {
                tracing::debug!(row, id = %worker.id, "incremental validation: worker");
                let one = std::slice::from_ref(worker);
                errors.extend(collides(
                    &worker.id,
                    row,
                    &context.workers,
                    |w| &w.id,
                    WorkerSchema::ID_COLUMN,
                ));
                errors.extend(relocate(validate_overloaded(one), row));
                let workers = substitute(&context.workers, row, worker);
                errors.extend(validate_phase_slot_saturation(&context.tasks, &workers));
            }
            EntityChange::Task { row, task } => {
                tracing::debug!(row, id = %task.id, "incremental validation: task");
                let one = std::slice::from_ref(task);
                errors.extend(collides(
                    &task.id,
                    row,
                    &context.tasks,
                    |t| &t.id,
                    TaskSchema::ID_COLUMN,
                ));
                errors.extend(relocate(validate_phase_window_constraints(one, cfg), row));
                errors.extend(relocate(validate_durations(one), row));
                errors.extend(relocate(validate_skill_coverage(one, &context.workers), row));
                errors.extend(relocate(validate_max_concurrency(one, &context.workers), row));
            }
        }

        tracing::debug!(findings = errors.len(), "incremental validation complete");
        errors
    }
}

/// Full pass with the default configuration.
pub fn validate_all(
    clients: &[Client],
    workers: &[Worker],
    tasks: &[Task],
    rules: &[Rule],
) -> Vec<ValidationError> {
    Validator::new().validate_all(clients, workers, tasks, rules)
}

/// Incremental pass with the default configuration.
pub fn validate_change(change: EntityChange<'_>, context: &Dataset) -> Vec<ValidationError> {
    Validator::new().validate_change(change, context)
}

/// Findings for unreadable upload fields the shape checks left unreported.
///
/// A cell already flagged stays single; a missing cell is also covered by a
/// sheet-level missing-column finding for its column.
fn unreported_failures(
    failures: &[RowFailure],
    reported: &[ValidationError],
) -> Vec<ValidationError> {
    let sheet_missing = |column: &str| {
        reported.iter().any(|e| {
            e.kind == FindingKind::MissingColumn
                && e.row_index.is_none()
                && e.column_id.as_deref() == Some(column)
        })
    };

    failures
        .iter()
        .flat_map(RowFailure::to_findings)
        .filter(|finding| {
            let (Some(row), Some(column)) = (finding.row_index, finding.column_id.as_deref())
            else {
                return true;
            };
            let flagged = reported.iter().any(|e| e.is_at(row, column));
            let sheet_level = finding.kind == FindingKind::MissingColumn && sheet_missing(column);
            !(flagged || sheet_level)
        })
        .collect()
}

/// Moves row-located findings from a single-record run to the record's real row.
fn relocate(errors: Vec<ValidationError>, row: usize) -> Vec<ValidationError> {
    errors
        .into_iter()
        .map(|mut e| {
            if e.row_index.is_some() {
                e.row_index = Some(row);
            }
            e
        })
        .collect()
}

/// Reports the edited ID if another row already holds it.
fn collides<T>(
    id: &str,
    row: usize,
    rows: &[T],
    id_of: impl Fn(&T) -> &String,
    column: &str,
) -> Option<ValidationError> {
    let taken = rows
        .iter()
        .enumerate()
        .any(|(i, r)| i != row && id_of(r) == id);
    taken.then(|| {
        ValidationError::error(FindingKind::DuplicateId, format!("Duplicate {column}: {id}"))
            .at(row, column)
            .with_suggestion(format!("Ensure each {column} is unique"))
    })
}

/// The collection with `edited` at `row`, appended when `row` is past the end.
fn substitute<T: Clone>(rows: &[T], row: usize, edited: &T) -> Vec<T> {
    let mut out = rows.to_vec();
    match out.get_mut(row) {
        Some(slot) => *slot = edited.clone(),
        None => out.push(edited.clone()),
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Attributes, Severity};

    fn sample_dataset() -> Dataset {
        Dataset::new()
            .with_client(
                Client::new("C1")
                    .with_name("Acme")
                    .with_priority(3)
                    .with_request("T1"),
            )
            .with_worker(
                Worker::new("W1")
                    .with_skill("coding")
                    .with_slots(vec![1, 2, 3])
                    .with_max_load(2)
                    .with_group("A"),
            )
            .with_worker(
                Worker::new("W2")
                    .with_skill("design")
                    .with_slots(vec![1, 2])
                    .with_max_load(1)
                    .with_group("B"),
            )
            .with_task(
                Task::new("T1")
                    .with_skill("coding")
                    .with_phases(vec![1, 2])
                    .with_duration(1),
            )
            .with_task(
                Task::new("T2")
                    .with_skill("design")
                    .with_phases(vec![2])
                    .with_duration(1),
            )
    }

    #[test]
    fn test_clean_dataset_has_no_findings() {
        let ds = sample_dataset();
        let errors = Validator::new().validate_dataset(&ds);
        assert!(errors.is_empty(), "unexpected findings: {errors:?}");
    }

    #[test]
    fn test_full_pass_order() {
        let ds = sample_dataset()
            .with_client(Client::new("C1").with_priority(9).with_request("T404"))
            .with_rule(Rule::co_run("R1", vec!["T1".into(), "T2".into()]));
        let errors = Validator::new().validate_dataset(&ds);
        let kinds: Vec<FindingKind> = errors.iter().map(|e| e.kind).collect();

        assert_eq!(
            kinds,
            vec![
                FindingKind::DuplicateId,
                FindingKind::OutOfRange,
                FindingKind::UnknownReference,
                FindingKind::CircularDependency,
            ]
        );
        assert!(errors[0].is_at(1, "ClientID"));
    }

    #[test]
    fn test_full_pass_idempotent() {
        let ds = sample_dataset()
            .with_task(
                Task::new("T3")
                    .with_skill("welding")
                    .with_phases(vec![0, 4, 5])
                    .with_duration(3),
            )
            .with_rule(Rule::co_run("R1", vec!["T1".into(), "T3".into()]))
            .with_rule(Rule::load_limit("R2", "A", 5));
        let v = Validator::new();

        let first = v.validate_dataset(&ds);
        let second = v.validate_dataset(&ds);
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_custom_config_changes_bounds() {
        let ds = sample_dataset().with_task(Task::new("T3").with_phases(vec![12]));
        let default_errors = Validator::new().validate_dataset(&ds);
        assert!(default_errors.iter().any(|e| e.kind == FindingKind::InvalidPhase));

        let wide = Validator::with_config(ValidationConfig::new().with_phase_range(1, 12));
        let errors = wide.validate_dataset(&ds);
        assert!(!errors.iter().any(|e| e.kind == FindingKind::InvalidPhase));
    }

    #[test]
    fn test_change_client_located_at_row() {
        let ds = sample_dataset().with_client(Client::new("C2").with_request("T2"));
        let edited = Client::new("C2")
            .with_priority(7)
            .with_request("T9")
            .with_attributes(Attributes::from_text("{bad"));
        let errors = validate_change(EntityChange::Client { row: 1, client: &edited }, &ds);
        let kinds: Vec<FindingKind> = errors.iter().map(|e| e.kind).collect();

        assert_eq!(
            kinds,
            vec![
                FindingKind::OutOfRange,
                FindingKind::BrokenJson,
                FindingKind::UnknownReference,
            ]
        );
        assert!(errors.iter().all(|e| e.row_index == Some(1)));
    }

    #[test]
    fn test_change_client_id_collision() {
        let ds = sample_dataset().with_client(Client::new("C2"));
        let edited = Client::new("C1");
        let errors = validate_change(EntityChange::Client { row: 1, client: &edited }, &ds);

        assert_eq!(errors.len(), 1);
        assert!(errors[0].is_at(1, "ClientID"));

        // Editing a row in place does not collide with itself.
        let same = Client::new("C1");
        assert!(validate_change(EntityChange::Client { row: 0, client: &same }, &ds).is_empty());
    }

    #[test]
    fn test_change_worker_saturation_uses_whole_pool() {
        let ds = sample_dataset();
        // W2 drops phase 2; W1 alone still covers demand of 2 in phase 2.
        let edited = Worker::new("W2")
            .with_skill("design")
            .with_slots(vec![1])
            .with_max_load(1);
        let errors = validate_change(EntityChange::Worker { row: 1, worker: &edited }, &ds);
        assert!(errors.is_empty(), "unexpected findings: {errors:?}");

        let overloaded = Worker::new("W2").with_slots(vec![]).with_max_load(1);
        let errors = validate_change(EntityChange::Worker { row: 1, worker: &overloaded }, &ds);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, FindingKind::OverloadedWorker);
        assert!(errors[0].is_at(1, "MaxLoadPerPhase"));
    }

    #[test]
    fn test_change_task() {
        let ds = sample_dataset();
        let edited = Task::new("T2")
            .with_skill("juggling")
            .with_phases(vec![2, 11])
            .with_max_concurrent(2);
        let errors = validate_change(EntityChange::Task { row: 1, task: &edited }, &ds);
        let kinds: Vec<FindingKind> = errors.iter().map(|e| e.kind).collect();

        assert_eq!(
            kinds,
            vec![
                FindingKind::InvalidPhase,
                FindingKind::SkillCoverage,
                FindingKind::MaxConcurrency,
            ]
        );
        assert!(errors.iter().all(|e| e.row_index == Some(1)));
        assert_eq!(errors[2].severity, Severity::Warning);
    }

    fn record(value: serde_json::Value) -> crate::schema::Record {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn test_upload_unreadable_fields_reported_once() {
        let clients = vec![
            record(serde_json::json!({
                "ClientID": "C1", "PriorityLevel": 0, "RequestedTaskIDs": [],
                "GroupTag": "A", "AttributesJSON": {}
            })),
            record(serde_json::json!({
                "ClientID": "C2", "PriorityLevel": "urgent", "RequestedTaskIDs": [],
                "GroupTag": "A", "AttributesJSON": {}
            })),
        ];
        let upload = Dataset::from_records(&clients, &[], &[]);
        let errors = Validator::new().validate_upload(&upload);
        let kinds: Vec<FindingKind> = errors.iter().map(|e| e.kind).collect();

        // ClientName: one sheet-level finding covers row 1 too.
        // PriorityLevel "urgent": flagged by the malformed check, not again.
        // PriorityLevel 0: read fine, then out of range.
        assert_eq!(
            kinds,
            vec![
                FindingKind::MissingColumn,
                FindingKind::MalformedNumber,
                FindingKind::OutOfRange,
            ]
        );
        assert_eq!(errors[0].column_id.as_deref(), Some("ClientName"));
        assert!(errors[1].is_at(1, "PriorityLevel"));
        assert!(errors[2].is_at(0, "PriorityLevel"));
    }

    #[test]
    fn test_upload_priority_range_follows_config() {
        let clients = vec![record(serde_json::json!({
            "ClientID": "C1", "ClientName": "Acme", "PriorityLevel": 0,
            "RequestedTaskIDs": [], "GroupTag": "A", "AttributesJSON": {}
        }))];
        let upload = Dataset::from_records(&clients, &[], &[]);
        assert!(upload.failures.is_empty());

        let wide = Validator::with_config(ValidationConfig::new().with_priority_range(0, 9));
        assert!(wide.validate_upload(&upload).is_empty());
        assert_eq!(Validator::new().validate_upload(&upload).len(), 1);
    }

    #[test]
    fn test_zero_duration_reported_in_both_passes() {
        let ds = sample_dataset();
        let edited = Task::new("T2").with_skill("design").with_phases(vec![2]).with_duration(0);

        let errors = validate_change(EntityChange::Task { row: 1, task: &edited }, &ds);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].is_at(1, "Duration"));

        let ds = ds.with_task(Task::new("T3").with_skill("coding").with_duration(0));
        let errors = Validator::new().validate_dataset(&ds);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, FindingKind::OutOfRange);
        assert!(errors[0].is_at(2, "Duration"));
    }

    #[test]
    fn test_substitute_appends_new_row() {
        let rows = vec![1, 2];
        assert_eq!(substitute(&rows, 1, &9), vec![1, 9]);
        assert_eq!(substitute(&rows, 5, &9), vec![1, 2, 9]);
    }
}

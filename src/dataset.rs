//! Dataset snapshot.
//!
//! The caller owns all state: a [`Dataset`] is an explicit snapshot of the
//! three entity collections plus the rule list, handed to the validator by
//! reference. Nothing here is cached between passes.
//!
//! An [`Upload`] is a dataset parsed from loose sheets. It keeps every row,
//! including rows with unreadable fields, together with the record view the
//! shape checks run on, so bad cells become findings instead of vanishing.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{Client, FindingKind, Rule, Task, ValidationError, Worker};
use crate::report::ValidationReport;
use crate::schema::{
    upload_view, ClientSchema, EntitySchema, ParseFailure, Record, TaskSchema, WorkerSchema,
};
use crate::validation::Validator;

/// Entity collections and rules for one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Client records, in grid order.
    pub clients: Vec<Client>,
    /// Worker records, in grid order.
    pub workers: Vec<Worker>,
    /// Task records, in grid order.
    pub tasks: Vec<Task>,
    /// Business rules, in list order.
    pub rules: Vec<Rule>,
}

/// Entity kinds of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Client,
    Worker,
    Task,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Client => "client",
            Self::Worker => "worker",
            Self::Task => "task",
        };
        f.write_str(s)
    }
}

/// An uploaded row that did not parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFailure {
    /// Which sheet the row came from.
    pub kind: EntityKind,
    /// Row position within its sheet.
    pub row: usize,
    /// Per-field reasons.
    pub failure: ParseFailure,
}

impl fmt::Display for RowFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} row {}: {}", self.kind, self.row + 1, self.failure)
    }
}

impl Dataset {
    /// Creates an empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses uploaded sheets.
    ///
    /// Every row is kept at its position. Fields that fail to parse fall
    /// back to defaults and are listed in [`Upload::failures`].
    pub fn from_records(clients: &[Record], workers: &[Record], tasks: &[Record]) -> Upload {
        let mut failures = Vec::new();
        let (clients, client_rows) =
            parse_sheet::<ClientSchema>(clients, EntityKind::Client, &mut failures);
        let (workers, worker_rows) =
            parse_sheet::<WorkerSchema>(workers, EntityKind::Worker, &mut failures);
        let (tasks, task_rows) = parse_sheet::<TaskSchema>(tasks, EntityKind::Task, &mut failures);

        Upload {
            dataset: Self {
                clients,
                workers,
                tasks,
                rules: Vec::new(),
            },
            failures,
            client_rows,
            worker_rows,
            task_rows,
        }
    }

    /// Adds a client.
    pub fn with_client(mut self, client: Client) -> Self {
        self.clients.push(client);
        self
    }

    /// Adds a worker.
    pub fn with_worker(mut self, worker: Worker) -> Self {
        self.workers.push(worker);
        self
    }

    /// Adds a task.
    pub fn with_task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    /// Adds a rule.
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Replaces the rule list.
    pub fn with_rules(mut self, rules: Vec<Rule>) -> Self {
        self.rules = rules;
        self
    }

    /// Full pass with the default configuration.
    pub fn validate(&self) -> ValidationReport {
        self.validate_with(&Validator::new())
    }

    /// Full pass with a given validator.
    pub fn validate_with(&self, validator: &Validator) -> ValidationReport {
        ValidationReport::new(validator.validate_dataset(self))
    }
}

/// A dataset parsed from uploaded sheets.
#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    /// Parsed entities, one per uploaded row.
    pub dataset: Dataset,
    /// Rows with fields that could not be read.
    pub failures: Vec<RowFailure>,
    client_rows: Vec<Record>,
    worker_rows: Vec<Record>,
    task_rows: Vec<Record>,
}

impl Upload {
    /// Replaces the rule list.
    pub fn with_rules(mut self, rules: Vec<Rule>) -> Self {
        self.dataset.rules = rules;
        self
    }

    /// Shape-check views of the client sheet.
    pub fn client_rows(&self) -> &[Record] {
        &self.client_rows
    }

    /// Shape-check views of the worker sheet.
    pub fn worker_rows(&self) -> &[Record] {
        &self.worker_rows
    }

    /// Shape-check views of the task sheet.
    pub fn task_rows(&self) -> &[Record] {
        &self.task_rows
    }

    /// Full pass with the default configuration.
    pub fn validate(&self) -> ValidationReport {
        self.validate_with(&Validator::new())
    }

    /// Full pass with a given validator.
    pub fn validate_with(&self, validator: &Validator) -> ValidationReport {
        ValidationReport::new(validator.validate_upload(self))
    }

    /// Drops the sheet views, keeping the parsed dataset.
    pub fn into_dataset(self) -> Dataset {
        self.dataset
    }
}

impl RowFailure {
    /// One located finding per unreadable field.
    pub fn to_findings(&self) -> Vec<ValidationError> {
        let numeric_columns = match self.kind {
            EntityKind::Client => ClientSchema::NUMERIC_COLUMNS,
            EntityKind::Worker => WorkerSchema::NUMERIC_COLUMNS,
            EntityKind::Task => TaskSchema::NUMERIC_COLUMNS,
        };

        self.failure
            .issues
            .iter()
            .map(|issue| {
                let column = issue.column.as_str();
                let finding = if issue.is_missing() {
                    ValidationError::error(
                        FindingKind::MissingColumn,
                        format!("Missing required column: {column}"),
                    )
                    .with_suggestion(format!("Fill in {column} for this row"))
                } else if column == "AttributesJSON" {
                    ValidationError::error(
                        FindingKind::BrokenJson,
                        format!("AttributesJSON {}", issue.reason),
                    )
                    .with_suggestion("Fix JSON syntax or use valid JSON object")
                } else if numeric_columns.contains(&column) {
                    ValidationError::error(
                        FindingKind::MalformedNumber,
                        format!("Column {column} {}", issue.reason),
                    )
                    .with_suggestion("Enter a whole number")
                } else {
                    // Only list columns remain: string columns accept any value.
                    ValidationError::error(
                        FindingKind::MalformedArray,
                        format!("Column {column} {}", issue.reason),
                    )
                    .with_suggestion("Convert to array format: [value1, value2, ...]")
                };
                finding.at(self.row, column)
            })
            .collect()
    }
}

fn parse_sheet<S: EntitySchema>(
    rows: &[Record],
    kind: EntityKind,
    failures: &mut Vec<RowFailure>,
) -> (Vec<S::Entity>, Vec<Record>) {
    let mut entities = Vec::with_capacity(rows.len());
    let mut views = Vec::with_capacity(rows.len());
    for (row, raw) in rows.iter().enumerate() {
        let (entity, issues) = S::parse_partial(raw);
        views.push(upload_view::<S>(raw, &entity, &issues));
        entities.push(entity);
        if !issues.is_empty() {
            tracing::debug!(%kind, row, issues = issues.len(), "uploaded row has unreadable fields");
            failures.push(RowFailure {
                kind,
                row,
                failure: ParseFailure { issues },
            });
        }
    }
    (entities, views)
}

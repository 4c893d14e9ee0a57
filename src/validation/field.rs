//! Field-level validators.
//!
//! Each validator inspects one collection on its own, with no knowledge of
//! the other entity kinds, and returns zero or more findings. Row indices in
//! findings are positions within the slice passed in.
//!
//! The shape validators (`missing_columns`, `duplicates`, `malformed`) accept
//! any serializable row, so they work on typed entities and on loose
//! [`Record`](crate::schema::Record)s alike.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

use crate::config::ValidationConfig;
use crate::models::{Client, FindingKind, Task, ValidationError, Worker};
use crate::schema::{record_view, Record};

fn view_or_empty<R: Serialize>(row: &R, index: usize) -> Record {
    record_view(row).unwrap_or_else(|| {
        tracing::warn!(row = index, "row does not serialize to an object; treating as empty");
        Record::new()
    })
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Reports required columns absent from the collection.
///
/// Only the first row is sampled; each missing column is reported once.
/// An empty collection has no columns to check.
pub fn validate_missing_columns<R, S>(rows: &[R], required: &[S]) -> Vec<ValidationError>
where
    R: Serialize,
    S: AsRef<str>,
{
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    let sample = view_or_empty(first, 0);

    required
        .iter()
        .map(AsRef::as_ref)
        .filter(|column| !sample.contains_key(*column))
        .map(|column| {
            ValidationError::error(
                FindingKind::MissingColumn,
                format!("Missing required column: {column}"),
            )
            .in_column(column)
            .with_suggestion(format!("Add a {column} column to the uploaded sheet"))
        })
        .collect()
}

/// Reports every repeat occurrence of an ID value.
///
/// The first occurrence is accepted; each later one is flagged at its own
/// row. Rows without an ID are skipped.
pub fn validate_duplicates<R: Serialize>(rows: &[R], id_column: &str) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (index, row) in rows.iter().enumerate() {
        let view = view_or_empty(row, index);
        let Some(id) = view.get(id_column).filter(|v| !v.is_null()) else {
            continue;
        };
        // JSON text keeps 1 and "1" distinct.
        if !seen.insert(id.to_string()) {
            errors.push(
                ValidationError::error(
                    FindingKind::DuplicateId,
                    format!("Duplicate {id_column}: {}", display_value(id)),
                )
                .at(index, id_column)
                .with_suggestion(format!("Ensure each {id_column} is unique")),
            );
        }
    }

    errors
}

/// Reports list columns holding non-lists and numeric columns holding non-numbers.
///
/// Empty, null, zero, and false values in list columns count as "no value"
/// and are not flagged. Any present value in a numeric column must be a number.
pub fn validate_malformed<R, S>(
    rows: &[R],
    array_columns: &[S],
    numeric_columns: &[S],
) -> Vec<ValidationError>
where
    R: Serialize,
    S: AsRef<str>,
{
    let mut errors = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        let view = view_or_empty(row, index);

        for column in array_columns.iter().map(AsRef::as_ref) {
            let Some(value) = view.get(column) else {
                continue;
            };
            if is_blank(value) || value.is_array() {
                continue;
            }
            errors.push(
                ValidationError::error(
                    FindingKind::MalformedArray,
                    format!(
                        "Column {column} should be an array, got: {}",
                        type_name(value)
                    ),
                )
                .at(index, column)
                .with_suggestion("Convert to array format: [value1, value2, ...]"),
            );
        }

        for column in numeric_columns.iter().map(AsRef::as_ref) {
            let Some(value) = view.get(column) else {
                continue;
            };
            if value.as_f64().is_some_and(f64::is_finite) {
                continue;
            }
            errors.push(
                ValidationError::error(
                    FindingKind::MalformedNumber,
                    format!(
                        "Column {column} should be a number, got: {}",
                        display_value(value)
                    ),
                )
                .at(index, column)
                .with_suggestion("Enter a valid number"),
            );
        }
    }

    errors
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

/// Reports clients whose PriorityLevel lies outside the configured range.
pub fn validate_out_of_range(clients: &[Client], config: &ValidationConfig) -> Vec<ValidationError> {
    let levels = config.priority_levels();
    clients
        .iter()
        .enumerate()
        .filter(|(_, c)| !levels.contains(&c.priority_level))
        .map(|(index, c)| {
            ValidationError::error(
                FindingKind::OutOfRange,
                format!(
                    "PriorityLevel must be between {}-{}, got: {}",
                    levels.start(),
                    levels.end(),
                    c.priority_level
                ),
            )
            .at(index, "PriorityLevel")
            .with_suggestion(format!(
                "Set PriorityLevel to a value between {} and {}",
                levels.start(),
                levels.end()
            ))
        })
        .collect()
}

/// Reports clients whose AttributesJSON is still undecodable text.
///
/// An empty string means "no attributes" and is not flagged.
pub fn validate_broken_json(clients: &[Client]) -> Vec<ValidationError> {
    clients
        .iter()
        .enumerate()
        .filter_map(|(index, c)| {
            let text = c.attributes.unparsed().filter(|t| !t.is_empty())?;
            Some(
                ValidationError::error(
                    FindingKind::BrokenJson,
                    format!("Invalid JSON in AttributesJSON: {text}"),
                )
                .at(index, "AttributesJSON")
                .with_suggestion("Fix JSON syntax or use valid JSON object"),
            )
        })
        .collect()
}

/// Reports workers whose per-phase load exceeds their number of slots.
///
/// Advisory only: the worker is still usable.
pub fn validate_overloaded(workers: &[Worker]) -> Vec<ValidationError> {
    workers
        .iter()
        .enumerate()
        .filter(|(_, w)| (w.available_slots.len() as i64) < w.max_load_per_phase)
        .map(|(index, w)| {
            let slots = w.available_slots.len();
            ValidationError::warning(
                FindingKind::OverloadedWorker,
                format!(
                    "Worker {} has {slots} available slots but MaxLoadPerPhase is {}",
                    w.id, w.max_load_per_phase
                ),
            )
            .at(index, "MaxLoadPerPhase")
            .with_suggestion(format!(
                "Increase AvailableSlots or decrease MaxLoadPerPhase to {slots}"
            ))
        })
        .collect()
}

/// Reports tasks preferring phases outside the configured phase range.
///
/// One finding per task, listing every offending phase.
pub fn validate_phase_window_constraints(
    tasks: &[Task],
    config: &ValidationConfig,
) -> Vec<ValidationError> {
    let phases = config.phases();
    let mut errors = Vec::new();

    for (index, task) in tasks.iter().enumerate() {
        let invalid: Vec<String> = task
            .preferred_phases
            .iter()
            .filter(|p| !phases.contains(p))
            .map(i64::to_string)
            .collect();
        if invalid.is_empty() {
            continue;
        }
        errors.push(
            ValidationError::error(
                FindingKind::InvalidPhase,
                format!("Invalid phases in PreferredPhases: {}", invalid.join(", ")),
            )
            .at(index, "PreferredPhases")
            .with_suggestion(format!(
                "Phases must be numbers between {} and {}",
                phases.start(),
                phases.end()
            )),
        );
    }

    errors
}

/// Reports tasks whose Duration is shorter than one phase.
pub fn validate_durations(tasks: &[Task]) -> Vec<ValidationError> {
    tasks
        .iter()
        .enumerate()
        .filter(|(_, t)| t.duration < 1)
        .map(|(index, t)| {
            ValidationError::error(
                FindingKind::OutOfRange,
                format!("Duration must be at least 1, got: {}", t.duration),
            )
            .at(index, "Duration")
            .with_suggestion("Set Duration to the number of phases the task occupies")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Attributes;
    use crate::schema::{EntitySchema, WorkerSchema};
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn test_missing_columns_samples_first_row() {
        let rows = vec![
            record(json!({"WorkerID": "W1", "Skills": []})),
            record(json!({"WorkerID": "W2"})),
        ];
        let errors = validate_missing_columns(&rows, &["WorkerID", "Skills", "WorkerName"]);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, FindingKind::MissingColumn);
        assert_eq!(errors[0].column_id.as_deref(), Some("WorkerName"));
        assert!(errors[0].row_index.is_none());
    }

    #[test]
    fn test_missing_columns_typed_entities_complete() {
        let workers = vec![Worker::new("W1")];
        assert!(validate_missing_columns(&workers, WorkerSchema::COLUMNS).is_empty());
        assert!(validate_missing_columns::<Worker, &str>(&[], WorkerSchema::COLUMNS).is_empty());
    }

    #[test]
    fn test_duplicates_flags_second_occurrence() {
        let workers = vec![Worker::new("W1"), Worker::new("W2"), Worker::new("W1")];
        let errors = validate_duplicates(&workers, "WorkerID");

        assert_eq!(errors.len(), 1);
        assert!(errors[0].is_at(2, "WorkerID"));
        assert_eq!(errors[0].message, "Duplicate WorkerID: W1");
    }

    #[test]
    fn test_duplicates_unique_and_triple() {
        let unique = vec![Task::new("T1"), Task::new("T2"), Task::new("T3")];
        assert!(validate_duplicates(&unique, "TaskID").is_empty());

        let triple = vec![Task::new("T1"), Task::new("T1"), Task::new("T1")];
        assert_eq!(validate_duplicates(&triple, "TaskID").len(), 2);
    }

    #[test]
    fn test_duplicates_distinguishes_number_and_string() {
        let rows = vec![
            record(json!({"TaskID": 1})),
            record(json!({"TaskID": "1"})),
            record(json!({})),
            record(json!({})),
        ];
        assert!(validate_duplicates(&rows, "TaskID").is_empty());
    }

    #[test]
    fn test_malformed() {
        let rows = vec![
            record(json!({"Skills": "coding", "AvailableSlots": [1], "MaxLoadPerPhase": "two"})),
            record(json!({"Skills": "", "AvailableSlots": null, "MaxLoadPerPhase": 2})),
            record(json!({"Skills": ["x"], "MaxLoadPerPhase": null})),
        ];
        let errors = validate_malformed(&rows, &["Skills", "AvailableSlots"], &["MaxLoadPerPhase"]);

        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].kind, FindingKind::MalformedArray);
        assert!(errors[0].is_at(0, "Skills"));
        assert_eq!(errors[0].message, "Column Skills should be an array, got: string");
        assert_eq!(errors[1].kind, FindingKind::MalformedNumber);
        assert!(errors[1].is_at(0, "MaxLoadPerPhase"));
        assert!(errors[2].is_at(2, "MaxLoadPerPhase"));
    }

    #[test]
    fn test_malformed_typed_entities_clean() {
        let workers = vec![Worker::new("W1").with_skill("x").with_slots(vec![1, 2])];
        let errors = validate_malformed(
            &workers,
            WorkerSchema::ARRAY_COLUMNS,
            WorkerSchema::NUMERIC_COLUMNS,
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn test_out_of_range() {
        let cfg = ValidationConfig::default();
        let clients = vec![Client::new("C1").with_priority(6)];
        let errors = validate_out_of_range(&clients, &cfg);

        assert_eq!(errors.len(), 1);
        assert!(errors[0].is_at(0, "PriorityLevel"));
        assert!(errors[0].is_error());

        let valid: Vec<Client> = (1..=5)
            .map(|p| Client::new(format!("C{p}")).with_priority(p))
            .collect();
        assert!(validate_out_of_range(&valid, &cfg).is_empty());

        let zero = vec![Client::new("C0").with_priority(0)];
        assert_eq!(validate_out_of_range(&zero, &cfg).len(), 1);
    }

    #[test]
    fn test_broken_json() {
        let clients = vec![
            Client::new("C1").with_attributes(Attributes::from_text(r#"{"a": 1}"#)),
            Client::new("C2").with_attributes(Attributes::from_text("{oops")),
            Client::new("C3").with_attributes(Attributes::Unparsed(String::new())),
        ];
        let errors = validate_broken_json(&clients);

        assert_eq!(errors.len(), 1);
        assert!(errors[0].is_at(1, "AttributesJSON"));
        assert_eq!(errors[0].kind, FindingKind::BrokenJson);
    }

    #[test]
    fn test_overloaded() {
        let workers = vec![
            Worker::new("W1").with_slots(vec![1, 2, 3]).with_max_load(2),
            Worker::new("W2").with_slots(vec![1]).with_max_load(3),
        ];
        let errors = validate_overloaded(&workers);

        assert_eq!(errors.len(), 1);
        assert!(errors[0].is_at(1, "MaxLoadPerPhase"));
        assert_eq!(errors[0].severity, crate::models::Severity::Warning);
        assert_eq!(
            errors[0].suggestion.as_deref(),
            Some("Increase AvailableSlots or decrease MaxLoadPerPhase to 1")
        );
    }

    #[test]
    fn test_phase_window_constraints() {
        let cfg = ValidationConfig::default();
        let tasks = vec![
            Task::new("T1").with_phases(vec![1, 2, 10]),
            Task::new("T2").with_phases(vec![0, 5, 11]),
        ];
        let errors = validate_phase_window_constraints(&tasks, &cfg);

        assert_eq!(errors.len(), 1);
        assert!(errors[0].is_at(1, "PreferredPhases"));
        assert_eq!(errors[0].message, "Invalid phases in PreferredPhases: 0, 11");
    }

    #[test]
    fn test_durations() {
        let tasks = vec![
            Task::new("T1").with_duration(3),
            Task::new("T2").with_duration(0),
            Task::new("T3").with_duration(-2),
        ];
        let errors = validate_durations(&tasks);

        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].kind, FindingKind::OutOfRange);
        assert!(errors[0].is_at(1, "Duration"));
        assert_eq!(errors[0].message, "Duration must be at least 1, got: 0");
        assert!(errors[1].is_at(2, "Duration"));
    }
}

//! Entity schemas and loose-record parsing.
//!
//! Uploads arrive as loosely-typed records (often all string-valued after
//! CSV parsing). Each schema knows its column set and converts such a record
//! into a typed entity, or reports every field that could not be converted.
//!
//! Parsing checks presence and type only. Value ranges (PriorityLevel,
//! Duration, phase numbers) are the validators' business, so an
//! out-of-range value survives parsing and is reported as a finding.
//!
//! # Normalization
//! - Phase lists accept an integer array, a JSON array string, a
//!   comma-separated string (`"1,3,5"`), or a range string (`"2-4"`).
//!   Pieces that are not integers are dropped; an undecodable encoding
//!   yields an empty list instead of failing the record.
//! - String lists accept an array of strings or a comma-separated string.
//! - AttributesJSON accepts an object or a string. A string that does not
//!   decode is kept raw (see [`Attributes`]) and reported later as
//!   `broken_json`; it never fails the record.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

use crate::models::{Attributes, Client, Task, Worker};

/// A loosely-typed record keyed by column name.
pub type Record = Map<String, Value>;

/// Widest `"a-b"` range accepted when expanding a phase range string.
const MAX_RANGE_SPAN: i64 = 1_000;

/// A record that could not be converted into an entity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", summarize(.issues))]
pub struct ParseFailure {
    /// One entry per offending field.
    pub issues: Vec<FieldIssue>,
}

/// Reason recorded for an absent or null column.
pub const REQUIRED: &str = "is required";

/// A single field-level parse problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    /// Column name.
    pub column: String,
    /// Why the value was rejected.
    pub reason: String,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.column, self.reason)
    }
}

fn summarize(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(FieldIssue::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl FieldIssue {
    /// Whether the column was absent or null.
    pub fn is_missing(&self) -> bool {
        self.reason == REQUIRED
    }
}

impl ParseFailure {
    /// Whether a given column was rejected.
    pub fn has_issue(&self, column: &str) -> bool {
        self.issues.iter().any(|i| i.column == column)
    }
}

/// Column contract and parser for one entity kind.
pub trait EntitySchema {
    /// The typed entity produced by [`EntitySchema::parse`].
    type Entity: Serialize;

    /// Every column the entity carries, in template order.
    const COLUMNS: &'static [&'static str];
    /// The unique-key column.
    const ID_COLUMN: &'static str;
    /// Columns holding lists.
    const ARRAY_COLUMNS: &'static [&'static str];
    /// Columns holding numbers.
    const NUMERIC_COLUMNS: &'static [&'static str];

    /// Converts a loose record, falling back to defaults for bad fields.
    ///
    /// Always yields an entity; the returned issues name every field that
    /// fell back.
    fn parse_partial(raw: &Record) -> (Self::Entity, Vec<FieldIssue>);

    /// Converts a loose record into a typed entity.
    fn parse(raw: &Record) -> Result<Self::Entity, ParseFailure> {
        let (entity, issues) = Self::parse_partial(raw);
        if issues.is_empty() {
            Ok(entity)
        } else {
            Err(ParseFailure { issues })
        }
    }
}

/// Client column contract.
#[derive(Debug, Clone, Copy)]
pub struct ClientSchema;

/// Worker column contract.
#[derive(Debug, Clone, Copy)]
pub struct WorkerSchema;

/// Task column contract.
#[derive(Debug, Clone, Copy)]
pub struct TaskSchema;

impl EntitySchema for ClientSchema {
    type Entity = Client;

    const COLUMNS: &'static [&'static str] = &[
        "ClientID",
        "ClientName",
        "PriorityLevel",
        "RequestedTaskIDs",
        "GroupTag",
        "AttributesJSON",
    ];
    const ID_COLUMN: &'static str = "ClientID";
    const ARRAY_COLUMNS: &'static [&'static str] = &["RequestedTaskIDs"];
    const NUMERIC_COLUMNS: &'static [&'static str] = &["PriorityLevel"];

    fn parse_partial(raw: &Record) -> (Client, Vec<FieldIssue>) {
        let mut p = FieldParser::new(raw);
        let client = Client {
            id: p.string("ClientID"),
            name: p.string("ClientName"),
            priority_level: p.integer("PriorityLevel", 1),
            requested_task_ids: p.string_list("RequestedTaskIDs"),
            group_tag: p.string("GroupTag"),
            attributes: p.attributes("AttributesJSON"),
        };
        (client, p.issues)
    }
}

impl EntitySchema for WorkerSchema {
    type Entity = Worker;

    const COLUMNS: &'static [&'static str] = &[
        "WorkerID",
        "WorkerName",
        "Skills",
        "AvailableSlots",
        "MaxLoadPerPhase",
        "WorkerGroup",
        "QualificationLevel",
    ];
    const ID_COLUMN: &'static str = "WorkerID";
    const ARRAY_COLUMNS: &'static [&'static str] = &["Skills", "AvailableSlots"];
    const NUMERIC_COLUMNS: &'static [&'static str] = &["MaxLoadPerPhase", "QualificationLevel"];

    fn parse_partial(raw: &Record) -> (Worker, Vec<FieldIssue>) {
        let mut p = FieldParser::new(raw);
        let worker = Worker {
            id: p.string("WorkerID"),
            name: p.string("WorkerName"),
            skills: p.string_list("Skills"),
            available_slots: p.phase_list("AvailableSlots"),
            max_load_per_phase: p.integer("MaxLoadPerPhase", 1),
            group: p.string("WorkerGroup"),
            qualification_level: p.integer("QualificationLevel", 0),
        };
        (worker, p.issues)
    }
}

impl EntitySchema for TaskSchema {
    type Entity = Task;

    const COLUMNS: &'static [&'static str] = &[
        "TaskID",
        "TaskName",
        "Category",
        "Duration",
        "RequiredSkills",
        "PreferredPhases",
        "MaxConcurrent",
    ];
    const ID_COLUMN: &'static str = "TaskID";
    const ARRAY_COLUMNS: &'static [&'static str] = &["RequiredSkills", "PreferredPhases"];
    const NUMERIC_COLUMNS: &'static [&'static str] = &["Duration", "MaxConcurrent"];

    fn parse_partial(raw: &Record) -> (Task, Vec<FieldIssue>) {
        let mut p = FieldParser::new(raw);
        let task = Task {
            id: p.string("TaskID"),
            name: p.string("TaskName"),
            category: p.string("Category"),
            duration: p.integer("Duration", 1),
            required_skills: p.string_list("RequiredSkills"),
            preferred_phases: p.phase_list("PreferredPhases"),
            max_concurrent: p.integer("MaxConcurrent", 1),
        };
        (task, p.issues)
    }
}

/// Collects field values and issues for one record.
struct FieldParser<'a> {
    raw: &'a Record,
    issues: Vec<FieldIssue>,
}

impl<'a> FieldParser<'a> {
    fn new(raw: &'a Record) -> Self {
        Self {
            raw,
            issues: Vec::new(),
        }
    }

    fn reject(&mut self, column: &str, reason: impl Into<String>) {
        self.issues.push(FieldIssue {
            column: column.to_string(),
            reason: reason.into(),
        });
    }

    fn present(&mut self, column: &str) -> Option<&'a Value> {
        let raw = self.raw;
        match raw.get(column) {
            Some(v) if !v.is_null() => Some(v),
            _ => {
                self.reject(column, REQUIRED);
                None
            }
        }
    }

    /// Any present value is accepted; non-strings keep their JSON text.
    fn string(&mut self, column: &str) -> String {
        match self.present(column) {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }

    fn integer(&mut self, column: &str, fallback: i64) -> i64 {
        let Some(value) = self.present(column) else {
            return fallback;
        };
        match integer_from_value(value) {
            Some(n) => n,
            None => {
                self.reject(column, "must be an integer");
                fallback
            }
        }
    }

    /// Lists treat a null cell as empty.
    fn list_value(&mut self, column: &str) -> Option<&'a Value> {
        let raw = self.raw;
        match raw.get(column) {
            Some(Value::Null) => None,
            Some(v) => Some(v),
            None => {
                self.reject(column, REQUIRED);
                None
            }
        }
    }

    fn string_list(&mut self, column: &str) -> Vec<String> {
        match self.list_value(column) {
            Some(Value::Array(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(s) => out.push(s.trim().to_string()),
                        Value::Number(n) => out.push(n.to_string()),
                        _ => {
                            self.reject(column, "must be a list of strings");
                            return Vec::new();
                        }
                    }
                }
                out
            }
            Some(Value::String(s)) => split_list(s),
            Some(_) => {
                self.reject(column, "must be a list of strings");
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    fn phase_list(&mut self, column: &str) -> Vec<i64> {
        self.list_value(column).map(phase_list_from_value).unwrap_or_default()
    }

    fn attributes(&mut self, column: &str) -> Attributes {
        match self.present(column) {
            Some(Value::Object(map)) => Attributes::Object(map.clone()),
            Some(Value::String(s)) => Attributes::from_text(s),
            Some(_) => {
                self.reject(column, "must be a JSON object");
                Attributes::default()
            }
            None => Attributes::default(),
        }
    }
}

/// Reads an integer from a JSON number or a numeric string.
///
/// Whole-valued floats (`2.0`) are accepted; fractional values are not.
pub fn integer_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Normalizes any accepted phase-list encoding into an explicit list.
///
/// ```
/// use serde_json::json;
/// use u_allocation::schema::phase_list_from_value;
///
/// assert_eq!(phase_list_from_value(&json!("2-4")), vec![2, 3, 4]);
/// assert_eq!(phase_list_from_value(&json!([2, 3, 4])), vec![2, 3, 4]);
/// assert_eq!(phase_list_from_value(&json!("x,y")), Vec::<i64>::new());
/// ```
pub fn phase_list_from_value(value: &Value) -> Vec<i64> {
    match value {
        Value::Array(items) => items.iter().filter_map(integer_from_value).collect(),
        Value::Number(_) => integer_from_value(value).into_iter().collect(),
        Value::String(s) => phase_list_from_str(s),
        _ => Vec::new(),
    }
}

/// Normalizes a string phase-list encoding.
pub fn phase_list_from_str(text: &str) -> Vec<i64> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if text.starts_with('[') {
        return match serde_json::from_str::<Value>(text) {
            Ok(v @ Value::Array(_)) => phase_list_from_value(&v),
            _ => Vec::new(),
        };
    }
    if let Some((start, end)) = text.split_once('-') {
        return match (start.trim().parse::<i64>(), end.trim().parse::<i64>()) {
            (Ok(a), Ok(b)) if a <= b && b - a <= MAX_RANGE_SPAN => (a..=b).collect(),
            _ => Vec::new(),
        };
    }
    text.split(',')
        .filter_map(|piece| piece.trim().parse::<i64>().ok())
        .collect()
}

fn split_list(text: &str) -> Vec<String> {
    let text = text.trim();
    if text.starts_with('[') {
        if let Ok(items) = serde_json::from_str::<Vec<String>>(text) {
            return items;
        }
    }
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Views any serializable row as a loose record.
///
/// Returns `None` when the row does not serialize to a JSON object.
pub fn record_view<R: Serialize>(row: &R) -> Option<Record> {
    match serde_json::to_value(row) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// The loose record the shape checks see for one uploaded row.
///
/// Accepted columns appear in their parsed, normalized form. Columns the
/// upload lacks are left out, and every column that failed to parse keeps
/// its uploaded value, so missing-column and malformed checks still see the
/// uploaded problem.
pub fn upload_view<S: EntitySchema>(
    raw: &Record,
    entity: &S::Entity,
    issues: &[FieldIssue],
) -> Record {
    let mut view = record_view(entity).unwrap_or_default();
    for &column in S::COLUMNS {
        match raw.get(column) {
            None => {
                view.remove(column);
            }
            Some(value) if issues.iter().any(|i| i.column == column) => {
                view.insert(column.to_string(), value.clone());
            }
            Some(_) => {}
        }
    }
    view
}

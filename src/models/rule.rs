//! Business rules.
//!
//! Rules constrain how the downstream allocator may place tasks on workers.
//! This crate never applies them; it only checks that they are well formed
//! and consistent with the data and with each other.
//!
//! # Priority
//! Every rule carries a priority where 1 is highest. Priority orders rule
//! application when two rules disagree, but never suppresses a conflict:
//! conflicting rules are reported, not resolved.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::schema::phase_list_from_value;

/// A business rule with identity and priority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Rule identifier, referenced by precedence overrides.
    pub id: String,
    /// Application priority (1 = highest).
    #[serde(default = "default_priority")]
    pub priority: i64,
    /// Rule body.
    #[serde(flatten)]
    pub kind: RuleKind,
}

fn default_priority() -> i64 {
    1
}

/// Rule variants.
///
/// Serialized internally tagged: `{"type": "coRun", "tasks": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RuleKind {
    /// Listed tasks must be scheduled together.
    CoRun { tasks: Vec<String> },

    /// Members of `group` must share at least `min_common_slots` phases.
    SlotRestriction { group: String, min_common_slots: i64 },

    /// Workers of `worker_group` take at most `max_slots_per_phase` units per phase.
    LoadLimit {
        worker_group: String,
        max_slots_per_phase: i64,
    },

    /// `task` may only run in the listed phases.
    PhaseWindow { task: String, phases: Vec<i64> },

    /// Entities whose ID matches `regex` receive the `template` rule with `params`.
    PatternMatch {
        regex: String,
        template: String,
        #[serde(default)]
        params: Map<String, Value>,
    },

    /// Raises the precedence of rule `target`, globally or locally.
    PrecedenceOverride {
        target: String,
        #[serde(default)]
        global: bool,
    },
}

/// Why a loosely-shaped rule could not be converted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleParseError {
    /// The candidate is not a JSON object.
    #[error("rule must be a JSON object")]
    NotAnObject,
    /// The `type` tag is missing or not a string.
    #[error("rule is missing its type")]
    MissingType,
    /// The `type` tag names no known rule variant.
    #[error("unsupported rule type: {0}")]
    UnknownType(String),
    /// A parameter the variant needs is absent or has the wrong shape.
    #[error("rule {rule_type} has invalid parameter {parameter}")]
    InvalidParameter {
        rule_type: &'static str,
        parameter: &'static str,
    },
}

impl RuleKind {
    /// Wire names of every variant, usable as pattern templates.
    pub const TYPE_NAMES: [&'static str; 6] = [
        "coRun",
        "slotRestriction",
        "loadLimit",
        "phaseWindow",
        "patternMatch",
        "precedenceOverride",
    ];

    /// Wire name of this variant.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::CoRun { .. } => "coRun",
            Self::SlotRestriction { .. } => "slotRestriction",
            Self::LoadLimit { .. } => "loadLimit",
            Self::PhaseWindow { .. } => "phaseWindow",
            Self::PatternMatch { .. } => "patternMatch",
            Self::PrecedenceOverride { .. } => "precedenceOverride",
        }
    }
}

impl Rule {
    /// Creates a rule with priority 1.
    pub fn new(id: impl Into<String>, kind: RuleKind) -> Self {
        Self {
            id: id.into(),
            priority: 1,
            kind,
        }
    }

    /// Creates a co-run rule.
    pub fn co_run(id: impl Into<String>, tasks: Vec<String>) -> Self {
        Self::new(id, RuleKind::CoRun { tasks })
    }

    /// Creates a slot-restriction rule.
    pub fn slot_restriction(
        id: impl Into<String>,
        group: impl Into<String>,
        min_common_slots: i64,
    ) -> Self {
        Self::new(
            id,
            RuleKind::SlotRestriction {
                group: group.into(),
                min_common_slots,
            },
        )
    }

    /// Creates a load-limit rule.
    pub fn load_limit(
        id: impl Into<String>,
        worker_group: impl Into<String>,
        max_slots_per_phase: i64,
    ) -> Self {
        Self::new(
            id,
            RuleKind::LoadLimit {
                worker_group: worker_group.into(),
                max_slots_per_phase,
            },
        )
    }

    /// Creates a phase-window rule.
    pub fn phase_window(id: impl Into<String>, task: impl Into<String>, phases: Vec<i64>) -> Self {
        Self::new(
            id,
            RuleKind::PhaseWindow {
                task: task.into(),
                phases,
            },
        )
    }

    /// Creates a pattern-match rule with no parameters.
    pub fn pattern_match(
        id: impl Into<String>,
        regex: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            RuleKind::PatternMatch {
                regex: regex.into(),
                template: template.into(),
                params: Map::new(),
            },
        )
    }

    /// Creates a precedence override.
    pub fn precedence_override(id: impl Into<String>, target: impl Into<String>, global: bool) -> Self {
        Self::new(
            id,
            RuleKind::PrecedenceOverride {
                target: target.into(),
                global,
            },
        )
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Wire name of the rule variant.
    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    /// Task IDs this rule names directly.
    pub fn referenced_tasks(&self) -> Vec<&str> {
        match &self.kind {
            RuleKind::CoRun { tasks } => tasks.iter().map(String::as_str).collect(),
            RuleKind::PhaseWindow { task, .. } => vec![task.as_str()],
            _ => Vec::new(),
        }
    }

    /// Whether `self` (at list position `index`) outranks `other` (at `other_index`).
    ///
    /// Lower priority number wins; ties go to the earlier rule.
    pub fn outranks(&self, index: usize, other: &Rule, other_index: usize) -> bool {
        (self.priority, index) < (other.priority, other_index)
    }

    /// Converts the shape produced by an external suggestion helper.
    ///
    /// Expected input: `{"type": ..., "parameters": {...}, "priority": n}`
    /// with an optional `"id"`. `"precedence"` is accepted as an alias for
    /// `"precedenceOverride"`. Phase lists may be arrays or range strings.
    /// A missing ID is left empty for the caller to assign.
    pub fn from_suggestion(value: &Value) -> Result<Self, RuleParseError> {
        let obj = value.as_object().ok_or(RuleParseError::NotAnObject)?;
        let rule_type = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or(RuleParseError::MissingType)?;
        let empty = Map::new();
        let params = obj
            .get("parameters")
            .and_then(Value::as_object)
            .unwrap_or(&empty);

        let kind = match rule_type {
            "coRun" => RuleKind::CoRun {
                tasks: string_list(params, "coRun", "tasks")?,
            },
            "slotRestriction" => RuleKind::SlotRestriction {
                group: string_param(params, "slotRestriction", "group")?,
                min_common_slots: int_param(params, "slotRestriction", "minCommonSlots")?,
            },
            "loadLimit" => RuleKind::LoadLimit {
                worker_group: string_param(params, "loadLimit", "workerGroup")?,
                max_slots_per_phase: int_param(params, "loadLimit", "maxSlotsPerPhase")?,
            },
            "phaseWindow" => RuleKind::PhaseWindow {
                task: string_param(params, "phaseWindow", "task")?,
                phases: params
                    .get("phases")
                    .map(phase_list_from_value)
                    .ok_or(RuleParseError::InvalidParameter {
                        rule_type: "phaseWindow",
                        parameter: "phases",
                    })?,
            },
            "patternMatch" => RuleKind::PatternMatch {
                regex: string_param(params, "patternMatch", "regex")?,
                template: string_param(params, "patternMatch", "template")?,
                params: params
                    .get("params")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default(),
            },
            "precedenceOverride" | "precedence" => RuleKind::PrecedenceOverride {
                target: string_param(params, "precedenceOverride", "target")?,
                global: params.get("global").and_then(Value::as_bool).unwrap_or(false),
            },
            other => return Err(RuleParseError::UnknownType(other.to_string())),
        };

        Ok(Self {
            id: obj
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            priority: obj
                .get("priority")
                .and_then(Value::as_i64)
                .unwrap_or_else(default_priority),
            kind,
        })
    }
}

fn string_param(
    params: &Map<String, Value>,
    rule_type: &'static str,
    parameter: &'static str,
) -> Result<String, RuleParseError> {
    params
        .get(parameter)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(RuleParseError::InvalidParameter {
            rule_type,
            parameter,
        })
}

fn int_param(
    params: &Map<String, Value>,
    rule_type: &'static str,
    parameter: &'static str,
) -> Result<i64, RuleParseError> {
    params
        .get(parameter)
        .and_then(Value::as_i64)
        .ok_or(RuleParseError::InvalidParameter {
            rule_type,
            parameter,
        })
}

fn string_list(
    params: &Map<String, Value>,
    rule_type: &'static str,
    parameter: &'static str,
) -> Result<Vec<String>, RuleParseError> {
    let err = RuleParseError::InvalidParameter {
        rule_type,
        parameter,
    };
    let items = params
        .get(parameter)
        .and_then(Value::as_array)
        .ok_or(err.clone())?;
    items
        .iter()
        .map(|v| v.as_str().map(str::to_string).ok_or(err.clone()))
        .collect()
}

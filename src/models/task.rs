//! Task model.
//!
//! A task is a unit of work requested by clients. It occupies `duration`
//! phases, needs workers holding its required skills, and prefers a set of
//! phases.
//!
//! Field names serialize as the upload column names.

use serde::{Deserialize, Serialize};

/// A task record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    #[serde(rename = "TaskID")]
    pub id: String,
    /// Display name.
    #[serde(rename = "TaskName")]
    pub name: String,
    /// Task category.
    #[serde(rename = "Category")]
    pub category: String,
    /// Number of phases the task occupies.
    #[serde(rename = "Duration")]
    pub duration: i64,
    /// Capability tags a worker needs (any one suffices).
    #[serde(rename = "RequiredSkills")]
    pub required_skills: Vec<String>,
    /// Phases the task would like to run in.
    #[serde(rename = "PreferredPhases")]
    pub preferred_phases: Vec<i64>,
    /// Maximum simultaneous instances.
    #[serde(rename = "MaxConcurrent")]
    pub max_concurrent: i64,
}

impl Task {
    /// Creates a task of duration 1 with no skills or phases.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            category: String::new(),
            duration: 1,
            required_skills: Vec::new(),
            preferred_phases: Vec::new(),
            max_concurrent: 1,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Sets the duration in phases.
    pub fn with_duration(mut self, duration: i64) -> Self {
        self.duration = duration;
        self
    }

    /// Adds a required skill.
    pub fn with_skill(mut self, skill: impl Into<String>) -> Self {
        self.required_skills.push(skill.into());
        self
    }

    /// Sets the preferred phases.
    pub fn with_phases(mut self, phases: Vec<i64>) -> Self {
        self.preferred_phases = phases;
        self
    }

    /// Sets the maximum concurrency.
    pub fn with_max_concurrent(mut self, max: i64) -> Self {
        self.max_concurrent = max;
        self
    }

    /// Whether the task prefers a given phase.
    pub fn prefers_phase(&self, phase: i64) -> bool {
        self.preferred_phases.contains(&phase)
    }
}

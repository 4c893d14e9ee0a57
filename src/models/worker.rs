//! Worker model.
//!
//! Workers perform tasks. Each worker holds a set of skill tags, the phases
//! in which it can work, and a per-phase load ceiling. Field names serialize
//! as the upload column names.

use serde::{Deserialize, Serialize};

use super::Task;

/// A worker record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    /// Unique worker identifier.
    #[serde(rename = "WorkerID")]
    pub id: String,
    /// Display name.
    #[serde(rename = "WorkerName")]
    pub name: String,
    /// Capability tags.
    #[serde(rename = "Skills")]
    pub skills: Vec<String>,
    /// Phases in which the worker can work.
    #[serde(rename = "AvailableSlots")]
    pub available_slots: Vec<i64>,
    /// Maximum concurrent task-units per phase.
    #[serde(rename = "MaxLoadPerPhase")]
    pub max_load_per_phase: i64,
    /// Group label referenced by load-limit and slot-restriction rules.
    #[serde(rename = "WorkerGroup")]
    pub group: String,
    /// Qualification level.
    #[serde(rename = "QualificationLevel")]
    pub qualification_level: i64,
}

impl Worker {
    /// Creates a worker with no skills or slots and a load ceiling of 1.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            skills: Vec::new(),
            available_slots: Vec::new(),
            max_load_per_phase: 1,
            group: String::new(),
            qualification_level: 0,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a skill tag.
    pub fn with_skill(mut self, skill: impl Into<String>) -> Self {
        self.skills.push(skill.into());
        self
    }

    /// Sets the available phases.
    pub fn with_slots(mut self, slots: Vec<i64>) -> Self {
        self.available_slots = slots;
        self
    }

    /// Sets the per-phase load ceiling.
    pub fn with_max_load(mut self, max_load: i64) -> Self {
        self.max_load_per_phase = max_load;
        self
    }

    /// Sets the worker group.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Sets the qualification level.
    pub fn with_qualification(mut self, level: i64) -> Self {
        self.qualification_level = level;
        self
    }

    /// Whether this worker holds a given skill.
    pub fn has_skill(&self, skill: &str) -> bool {
        self.skills.iter().any(|s| s == skill)
    }

    /// Whether this worker can work in a given phase.
    pub fn is_available_in(&self, phase: i64) -> bool {
        self.available_slots.contains(&phase)
    }

    /// Whether this worker can take on a task.
    ///
    /// A worker qualifies when it holds at least one of the task's required
    /// skills, so no worker qualifies for a task that lists none.
    pub fn qualifies_for(&self, task: &Task) -> bool {
        task.required_skills.iter().any(|s| self.has_skill(s))
    }
}

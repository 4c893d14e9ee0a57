//! Validation configuration.
//!
//! Holds the bounds and column sets the validators check against. The
//! defaults match the upload templates: priority levels 1..=5, phases 1..=10,
//! and every schema column required.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use crate::schema::{ClientSchema, EntitySchema, TaskSchema, WorkerSchema};

/// Tunable bounds for a validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Lowest valid client priority level.
    pub min_priority: i64,
    /// Highest valid client priority level.
    pub max_priority: i64,
    /// First valid phase number.
    pub min_phase: i64,
    /// Last valid phase number.
    pub max_phase: i64,
    /// Columns every client record must carry.
    pub client_columns: Vec<String>,
    /// Columns every worker record must carry.
    pub worker_columns: Vec<String>,
    /// Columns every task record must carry.
    pub task_columns: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_priority: 1,
            max_priority: 5,
            min_phase: 1,
            max_phase: 10,
            client_columns: owned(ClientSchema::COLUMNS),
            worker_columns: owned(WorkerSchema::COLUMNS),
            task_columns: owned(TaskSchema::COLUMNS),
        }
    }
}

fn owned(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| c.to_string()).collect()
}

impl ValidationConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the valid priority range.
    pub fn with_priority_range(mut self, min: i64, max: i64) -> Self {
        self.min_priority = min;
        self.max_priority = max;
        self
    }

    /// Sets the valid phase range.
    pub fn with_phase_range(mut self, min: i64, max: i64) -> Self {
        self.min_phase = min;
        self.max_phase = max;
        self
    }

    /// Valid priority levels.
    #[inline]
    pub fn priority_levels(&self) -> RangeInclusive<i64> {
        self.min_priority..=self.max_priority
    }

    /// Valid phase numbers.
    #[inline]
    pub fn phases(&self) -> RangeInclusive<i64> {
        self.min_phase..=self.max_phase
    }
}

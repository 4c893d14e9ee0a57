//! Resource-allocation domain models.
//!
//! Provides the record types an allocation dataset is made of, the business
//! rules layered on top of them, and the findings validators produce.
//!
//! # Entity Relationships
//!
//! | Entity | Key | References |
//! |--------|-----|-----------|
//! | Client | ClientID | RequestedTaskIDs → Task |
//! | Worker | WorkerID | Skills ↔ Task.RequiredSkills |
//! | Task | TaskID | PreferredPhases ↔ Worker.AvailableSlots |
//! | Rule | id | tasks, worker groups, other rules |

mod client;
mod finding;
mod rule;
mod task;
mod worker;

pub use client::{Attributes, Client};
pub use finding::{FindingKind, Severity, ValidationError};
pub use rule::{Rule, RuleKind, RuleParseError};
pub use task::Task;
pub use worker::Worker;

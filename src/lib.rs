//! Validation engine for resource-allocation datasets.
//!
//! Checks uploaded clients, workers, and tasks, together with the business
//! rules layered on top of them, before the data is handed to a downstream
//! allocator. Every check is a pure function of its inputs and returns
//! findings; nothing is ever corrected automatically.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Client`, `Worker`, `Task`, `Rule`, `ValidationError`
//! - **`schema`**: Column contracts and loose-record parsing
//! - **`validation`**: Field, cross-reference, and rule validators plus the ordered full pass
//! - **`dataset`**: Snapshot of entity collections and rules
//! - **`report`**: Finding queries, export gate, latest-wins report slot
//! - **`suggest`**: Intake of externally suggested rules
//! - **`weights`**: Prioritization weights for the allocator
//! - **`config`**: Valid ranges and column lists
//!
//! # Example
//!
//! ```
//! use u_allocation::dataset::Dataset;
//! use u_allocation::models::{Client, FindingKind, Task};
//!
//! let dataset = Dataset::new()
//!     .with_client(Client::new("C1").with_request("T9"))
//!     .with_task(Task::new("T1"));
//!
//! let report = dataset.validate();
//! assert!(report.blocks_export());
//! assert_eq!(report.of_kind(FindingKind::UnknownReference).count(), 1);
//! ```

pub mod config;
pub mod dataset;
pub mod models;
pub mod report;
pub mod schema;
pub mod suggest;
pub mod validation;
pub mod weights;

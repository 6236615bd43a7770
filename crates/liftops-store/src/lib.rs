//! Storage abstractions for the checklist engine.
//!
//! The engine is stateless between calls; all state lives behind these
//! traits. Response mutation and closure evaluation go through
//! [`ResponseStore::with_responses`], one atomic read-modify-write unit per
//! snapshot's response set; snapshot insertion carries its seed records in
//! the same write. The backing implementation owns both guarantees.
//!
//! Design stance:
//! - A transactional database remains the source of truth in production.
//! - The in-memory adapter here is deterministic and test-friendly.

#![deny(unsafe_code)]

mod error;
mod memory;
mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStorage;
pub use traits::{
    ChecklistStorage, ResponseSet, ResponseStore, SnapshotStore, TemplateStore, WorkOrderStore,
};

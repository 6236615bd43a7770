//! Error types for the checklist engine.
//!
//! These are the hard errors: the request is malformed and rejected with no
//! partial write. Soft conditions — constraint violations and blocked
//! closures — are returned as data on the Ok path, never through here.

use crate::{ItemType, SnapshotId, TemplateId, WorkOrderId};

/// Errors that can occur in checklist engine operations
#[derive(Debug, thiserror::Error)]
pub enum ChecklistError {
    #[error("template not found or inactive: {0}")]
    TemplateNotFound(TemplateId),

    #[error("snapshot not found: {0}")]
    SnapshotNotFound(SnapshotId),

    #[error("work order not found: {0}")]
    WorkOrderNotFound(WorkOrderId),

    #[error("work order {0} has no checklist snapshot")]
    SnapshotNotBound(WorkOrderId),

    #[error("item {item_order} not found in snapshot {snapshot_id}")]
    ItemNotFound {
        snapshot_id: SnapshotId,
        item_order: u32,
    },

    #[error("value slot does not match item {item_order}: expected {expected:?} slot")]
    TypeMismatch { item_order: u32, expected: ItemType },

    #[error("duplicate item order in template: {0}")]
    DuplicateItemOrder(u32),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Result type alias for checklist engine operations
pub type ChecklistResult<T> = Result<T, ChecklistError>;

//! The closure gate's verdict types.
//!
//! A refused closure is a normal, expected outcome — it travels as data so
//! the caller can render every blocking item at once, not one at a time.

use crate::WorkOrderStatus;
use serde::{Deserialize, Serialize};

/// Why an item blocks closure
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Mandatory item never answered
    MandatoryPending,
    /// Critical item verified non-compliant
    CriticalNonCompliant,
}

/// One item that blocks the requested closure
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockingReason {
    /// Order index identifying the item
    pub item_order: u32,
    /// Section label, for display grouping
    pub section: String,
    /// Item description
    pub description: String,
    /// Which rule fired
    pub kind: BlockKind,
}

/// Non-blocking condition surfaced alongside the verdict
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClosureWarning {
    /// Order index identifying the item
    pub item_order: u32,
    /// Item description
    pub description: String,
}

/// The closure gate's full verdict
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClosureDecision {
    /// Whether the transition was permitted
    pub allowed: bool,
    /// Every blocking reason, empty when allowed
    pub blockers: Vec<BlockingReason>,
    /// Non-blocking warnings (e.g. optional items left pending)
    pub warnings: Vec<ClosureWarning>,
    /// The status the work order moved to, when allowed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_status: Option<WorkOrderStatus>,
}

impl ClosureDecision {
    pub fn allowed(next_status: WorkOrderStatus, warnings: Vec<ClosureWarning>) -> Self {
        Self {
            allowed: true,
            blockers: Vec::new(),
            warnings,
            next_status: Some(next_status),
        }
    }

    pub fn refused(blockers: Vec<BlockingReason>, warnings: Vec<ClosureWarning>) -> Self {
        Self {
            allowed: false,
            blockers,
            warnings,
            next_status: None,
        }
    }
}

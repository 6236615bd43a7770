//! Work orders and their lifecycle.
//!
//! The lifecycle runs `new → en_route → checked_in → in_progress →
//! {awaiting_signature → completed} | canceled`. `stopped` is an orthogonal
//! flag for out-of-service equipment: it can be raised from any active
//! state and cleared back to it without losing position in the lifecycle.

use crate::{ServiceKind, SnapshotId, TechnicianId, WorkOrderId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a work order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderStatus {
    /// Created, not yet accepted by a technician
    New,
    /// Accepted; technician traveling to site
    EnRoute,
    /// Technician arrived and checked in
    CheckedIn,
    /// Inspection under way
    InProgress,
    /// Closure gate passed; waiting for the client signature
    AwaitingSignature,
    /// Terminal: closed successfully
    Completed,
    /// Terminal: canceled
    Canceled,
}

impl WorkOrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Canceled)
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

/// The action that drives a lifecycle transition
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionAction {
    /// Work order created
    Create,
    /// Technician accepts and departs
    Accept,
    /// Technician arrives on site
    CheckIn,
    /// Inspection starts
    Start,
    /// Closure requested through the gate
    RequestClose,
    /// Client signature collected
    Sign,
    /// Work order canceled
    Cancel,
    /// Equipment flagged out of service
    Stop,
    /// Out-of-service flag cleared
    Resume,
}

/// A work order with its bound checklist snapshot
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkOrder {
    /// Unique work order identifier
    pub id: WorkOrderId,
    /// Snapshot bound at creation; set once, never re-pointed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<SnapshotId>,
    /// Current lifecycle status
    pub status: WorkOrderStatus,
    /// Orthogonal out-of-service flag
    pub stopped: bool,
    /// Whether closure must pass through `awaiting_signature`
    pub requires_signature: bool,
    /// Service category
    pub service_kind: ServiceKind,
    /// When the work order was created
    pub created_at: DateTime<Utc>,
    /// Last status change
    pub updated_at: DateTime<Utc>,
}

impl WorkOrder {
    pub fn new(service_kind: ServiceKind) -> Self {
        let now = Utc::now();
        Self {
            id: WorkOrderId::generate(),
            snapshot_id: None,
            status: WorkOrderStatus::New,
            stopped: false,
            requires_signature: true,
            service_kind,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: WorkOrderId) -> Self {
        self.id = id;
        self
    }

    /// Skip the signature stage on closure
    pub fn without_signature(mut self) -> Self {
        self.requires_signature = false;
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// One entry of the status-history audit trail
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusTransition {
    /// The work order that changed
    pub work_order_id: WorkOrderId,
    /// Status before the change; `None` for creation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<WorkOrderStatus>,
    /// Status after the change
    pub to: WorkOrderStatus,
    /// The action that caused it
    pub action: TransitionAction,
    /// Who drove the transition, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<TechnicianId>,
    /// When it happened
    pub changed_at: DateTime<Utc>,
}

impl StatusTransition {
    pub fn new(
        work_order_id: WorkOrderId,
        from: Option<WorkOrderStatus>,
        to: WorkOrderStatus,
        action: TransitionAction,
    ) -> Self {
        Self {
            work_order_id,
            from,
            to,
            action,
            actor: None,
            changed_at: Utc::now(),
        }
    }

    pub fn by(mut self, actor: TechnicianId) -> Self {
        self.actor = Some(actor);
        self
    }
}

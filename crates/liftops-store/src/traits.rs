use crate::{StoreError, StoreResult};
use async_trait::async_trait;
use liftops_types::{
    ChecklistSnapshot, ChecklistTemplate, ResponseRecord, SnapshotId, StatusTransition,
    TemplateId, WorkOrder, WorkOrderId,
};
use std::collections::BTreeMap;

/// One snapshot's response records keyed by item order, as seen inside an
/// atomic mutation unit.
pub type ResponseSet = BTreeMap<u32, ResponseRecord>;

/// Read-only access to checklist templates.
///
/// Templates are authored elsewhere; the engine reads them exactly once per
/// work order, at snapshot creation.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Get a template by id, only if it is active. Inactive or unknown
    /// templates are both `None` — the engine treats them identically.
    async fn get_active_template(&self, id: &TemplateId)
        -> StoreResult<Option<ChecklistTemplate>>;
}

/// Storage for immutable checklist snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persist a newly frozen snapshot together with its seed response
    /// records, all or nothing. Fails with `Conflict` if the snapshot id or
    /// its work order already has one; on any failure nothing is written,
    /// so a snapshot can never exist with part of its record set missing.
    async fn insert_snapshot(
        &self,
        snapshot: &ChecklistSnapshot,
        responses: &[ResponseRecord],
    ) -> StoreResult<()>;

    /// Get a snapshot by id.
    async fn get_snapshot(&self, id: &SnapshotId) -> StoreResult<Option<ChecklistSnapshot>>;

    /// Find the snapshot bound to a work order, if any.
    async fn find_snapshot_for_work_order(
        &self,
        work_order_id: &WorkOrderId,
    ) -> StoreResult<Option<ChecklistSnapshot>>;
}

/// Storage for response records.
///
/// All mutation goes through [`ResponseStore::with_responses`], which scopes
/// one atomic read-modify-write unit to a single snapshot's response set.
/// One technician owns one work order at a time, but offline sync may replay
/// writes concurrently and out of order, so implementations must hold the
/// exclusion for the whole unit rather than per call.
#[async_trait]
pub trait ResponseStore: Send + Sync {
    /// Load all responses for a snapshot, ordered by item order.
    async fn load_responses(&self, snapshot_id: &SnapshotId) -> StoreResult<Vec<ResponseRecord>>;

    /// Run one atomic read-modify-write unit over a snapshot's response
    /// set. The closure sees the current records and edits them in place;
    /// changes are committed only when it returns `Ok`, and no other unit
    /// for the same snapshot may interleave.
    async fn with_responses<T, E, F>(&self, snapshot_id: &SnapshotId, unit: F) -> Result<T, E>
    where
        F: FnOnce(&mut ResponseSet) -> Result<T, E> + Send,
        T: Send,
        E: From<StoreError> + Send;
}

/// Storage for work orders and their status history.
#[async_trait]
pub trait WorkOrderStore: Send + Sync {
    /// Insert a new work order. Fails with `Conflict` on duplicate id.
    async fn insert_work_order(&self, order: &WorkOrder) -> StoreResult<()>;

    /// Get a work order by id.
    async fn get_work_order(&self, id: &WorkOrderId) -> StoreResult<Option<WorkOrder>>;

    /// Persist a changed work order (status, stopped flag, snapshot binding).
    async fn update_work_order(&self, order: &WorkOrder) -> StoreResult<()>;

    /// Append one entry to the status-history audit trail.
    async fn append_history(&self, entry: &StatusTransition) -> StoreResult<()>;

    /// Read a work order's history, oldest first.
    async fn list_history(&self, work_order_id: &WorkOrderId)
        -> StoreResult<Vec<StatusTransition>>;
}

/// Unified storage bundle consumed by the engine facade.
pub trait ChecklistStorage:
    TemplateStore + SnapshotStore + ResponseStore + WorkOrderStore + Send + Sync
{
}

impl<T> ChecklistStorage for T where
    T: TemplateStore + SnapshotStore + ResponseStore + WorkOrderStore + Send + Sync
{
}

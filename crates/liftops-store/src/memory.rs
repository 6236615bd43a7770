//! In-memory reference implementation of the storage traits.
//!
//! Deterministic and test-friendly. Production deployments should use a
//! transactional backend for source-of-truth data. The per-snapshot
//! atomicity contract documented on [`ResponseStore`] is met by holding the
//! responses write lock across the whole mutation unit: the closure runs
//! against a working copy under that lock and the copy is committed only on
//! `Ok`, so units never interleave and a failed unit writes nothing.

use crate::traits::{ResponseSet, ResponseStore, SnapshotStore, TemplateStore, WorkOrderStore};
use crate::{StoreError, StoreResult};
use async_trait::async_trait;
use liftops_types::{
    ChecklistSnapshot, ChecklistTemplate, ResponseRecord, SnapshotId, StatusTransition,
    TemplateId, WorkOrder, WorkOrderId,
};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage adapter.
#[derive(Default)]
pub struct InMemoryStorage {
    templates: RwLock<HashMap<TemplateId, ChecklistTemplate>>,
    snapshots: RwLock<HashMap<SnapshotId, ChecklistSnapshot>>,
    responses: RwLock<HashMap<SnapshotId, ResponseSet>>,
    work_orders: RwLock<HashMap<WorkOrderId, WorkOrder>>,
    history: RwLock<Vec<StatusTransition>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a template. Test/setup helper; templates are otherwise authored
    /// outside the engine.
    pub fn put_template(&self, template: ChecklistTemplate) -> StoreResult<()> {
        let mut guard = self
            .templates
            .write()
            .map_err(|_| StoreError::Backend("templates lock poisoned".to_string()))?;
        guard.insert(template.id.clone(), template);
        Ok(())
    }
}

#[async_trait]
impl TemplateStore for InMemoryStorage {
    async fn get_active_template(
        &self,
        id: &TemplateId,
    ) -> StoreResult<Option<ChecklistTemplate>> {
        let guard = self
            .templates
            .read()
            .map_err(|_| StoreError::Backend("templates lock poisoned".to_string()))?;
        Ok(guard.get(id).filter(|t| t.active).cloned())
    }
}

#[async_trait]
impl SnapshotStore for InMemoryStorage {
    async fn insert_snapshot(
        &self,
        snapshot: &ChecklistSnapshot,
        responses: &[ResponseRecord],
    ) -> StoreResult<()> {
        // Both locks taken up front so the snapshot and its seed records
        // land together or not at all
        let mut snapshots = self
            .snapshots
            .write()
            .map_err(|_| StoreError::Backend("snapshots lock poisoned".to_string()))?;
        let mut sets = self
            .responses
            .write()
            .map_err(|_| StoreError::Backend("responses lock poisoned".to_string()))?;

        if snapshots.contains_key(&snapshot.id) {
            return Err(StoreError::Conflict(format!(
                "snapshot {} already exists",
                snapshot.id
            )));
        }
        if snapshots
            .values()
            .any(|s| s.work_order_id == snapshot.work_order_id)
        {
            return Err(StoreError::Conflict(format!(
                "work order {} already has a snapshot",
                snapshot.work_order_id
            )));
        }

        snapshots.insert(snapshot.id.clone(), snapshot.clone());
        sets.insert(
            snapshot.id.clone(),
            responses
                .iter()
                .map(|r| (r.item_order, r.clone()))
                .collect(),
        );
        Ok(())
    }

    async fn get_snapshot(&self, id: &SnapshotId) -> StoreResult<Option<ChecklistSnapshot>> {
        let guard = self
            .snapshots
            .read()
            .map_err(|_| StoreError::Backend("snapshots lock poisoned".to_string()))?;
        Ok(guard.get(id).cloned())
    }

    async fn find_snapshot_for_work_order(
        &self,
        work_order_id: &WorkOrderId,
    ) -> StoreResult<Option<ChecklistSnapshot>> {
        let guard = self
            .snapshots
            .read()
            .map_err(|_| StoreError::Backend("snapshots lock poisoned".to_string()))?;
        Ok(guard
            .values()
            .find(|s| s.work_order_id == *work_order_id)
            .cloned())
    }
}

#[async_trait]
impl ResponseStore for InMemoryStorage {
    async fn load_responses(&self, snapshot_id: &SnapshotId) -> StoreResult<Vec<ResponseRecord>> {
        let guard = self
            .responses
            .read()
            .map_err(|_| StoreError::Backend("responses lock poisoned".to_string()))?;
        Ok(guard
            .get(snapshot_id)
            .map(|set| set.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn with_responses<T, E, F>(&self, snapshot_id: &SnapshotId, unit: F) -> Result<T, E>
    where
        F: FnOnce(&mut ResponseSet) -> Result<T, E> + Send,
        T: Send,
        E: From<StoreError> + Send,
    {
        let mut guard = self
            .responses
            .write()
            .map_err(|_| E::from(StoreError::Backend("responses lock poisoned".to_string())))?;
        // Run the unit on a working copy; commit only on Ok
        let mut working = guard.get(snapshot_id).cloned().unwrap_or_default();
        let out = unit(&mut working)?;
        guard.insert(snapshot_id.clone(), working);
        Ok(out)
    }
}

#[async_trait]
impl WorkOrderStore for InMemoryStorage {
    async fn insert_work_order(&self, order: &WorkOrder) -> StoreResult<()> {
        let mut guard = self
            .work_orders
            .write()
            .map_err(|_| StoreError::Backend("work orders lock poisoned".to_string()))?;
        if guard.contains_key(&order.id) {
            return Err(StoreError::Conflict(format!(
                "work order {} already exists",
                order.id
            )));
        }
        guard.insert(order.id.clone(), order.clone());
        Ok(())
    }

    async fn get_work_order(&self, id: &WorkOrderId) -> StoreResult<Option<WorkOrder>> {
        let guard = self
            .work_orders
            .read()
            .map_err(|_| StoreError::Backend("work orders lock poisoned".to_string()))?;
        Ok(guard.get(id).cloned())
    }

    async fn update_work_order(&self, order: &WorkOrder) -> StoreResult<()> {
        let mut guard = self
            .work_orders
            .write()
            .map_err(|_| StoreError::Backend("work orders lock poisoned".to_string()))?;
        if !guard.contains_key(&order.id) {
            return Err(StoreError::NotFound(format!(
                "work order {} not found",
                order.id
            )));
        }
        guard.insert(order.id.clone(), order.clone());
        Ok(())
    }

    async fn append_history(&self, entry: &StatusTransition) -> StoreResult<()> {
        let mut guard = self
            .history
            .write()
            .map_err(|_| StoreError::Backend("history lock poisoned".to_string()))?;
        guard.push(entry.clone());
        Ok(())
    }

    async fn list_history(
        &self,
        work_order_id: &WorkOrderId,
    ) -> StoreResult<Vec<StatusTransition>> {
        let guard = self
            .history
            .read()
            .map_err(|_| StoreError::Backend("history lock poisoned".to_string()))?;
        Ok(guard
            .iter()
            .filter(|e| e.work_order_id == *work_order_id)
            .cloned()
            .collect())
    }
}

//! The engine facade: orchestrates stores, validators, scorer and gate.
//!
//! Stateless between calls. Every operation loads what it needs from the
//! repositories, evaluates pure rules, and persists the outcome. The
//! atomicity contract for response writes and closure evaluation is
//! documented on the store traits and assumed here.

use crate::{evaluate_closure, lifecycle, score, validate};
use chrono::Utc;
use liftops_store::ChecklistStorage;
use liftops_types::{
    ChecklistError, ChecklistResult, ChecklistSnapshot, ClosureDecision, ComplianceScore,
    ConstraintViolation, ResponseRecord, ResponseUpdate, ServiceKind, SnapshotId,
    StatusTransition, TechnicianId, TemplateId, TransitionAction, WorkOrder, WorkOrderId,
    WorkOrderStatus,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Checklist compliance & work-order closure engine
pub struct ChecklistEngine<S> {
    store: Arc<S>,
}

impl<S> Clone for ChecklistEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: ChecklistStorage> ChecklistEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create a work order in `new` status.
    pub async fn create_work_order(
        &self,
        service_kind: ServiceKind,
        requires_signature: bool,
    ) -> ChecklistResult<WorkOrder> {
        let mut order = WorkOrder::new(service_kind);
        if !requires_signature {
            order = order.without_signature();
        }
        self.store.insert_work_order(&order).await?;
        self.store
            .append_history(&StatusTransition::new(
                order.id.clone(),
                None,
                order.status,
                TransitionAction::Create,
            ))
            .await?;
        info!(work_order = %order.id, "work order created");
        Ok(order)
    }

    /// Freeze the active template version onto a work order.
    ///
    /// Copies the item list by value and eagerly creates one pending
    /// response per item — no item may be silently absent; the snapshot and
    /// its records are persisted in one write. Idempotent: if the work
    /// order already has a snapshot, that snapshot and its responses are
    /// returned and only a missing work-order binding is repaired.
    pub async fn create_snapshot(
        &self,
        work_order_id: &WorkOrderId,
        template_id: &TemplateId,
    ) -> ChecklistResult<(ChecklistSnapshot, Vec<ResponseRecord>)> {
        let mut order = self
            .store
            .get_work_order(work_order_id)
            .await?
            .ok_or_else(|| ChecklistError::WorkOrderNotFound(work_order_id.clone()))?;

        if let Some(existing) = self.store.find_snapshot_for_work_order(work_order_id).await? {
            // A failed earlier attempt may have died between the snapshot
            // write and the binding update; a retry completes it
            if order.snapshot_id.is_none() {
                order.snapshot_id = Some(existing.id.clone());
                order.updated_at = Utc::now();
                self.store.update_work_order(&order).await?;
            }
            debug!(work_order = %work_order_id, snapshot = %existing.id, "snapshot already exists");
            let responses = self.store.load_responses(&existing.id).await?;
            return Ok((existing, responses));
        }

        let template = self
            .store
            .get_active_template(template_id)
            .await?
            .ok_or_else(|| ChecklistError::TemplateNotFound(template_id.clone()))?;

        let snapshot = ChecklistSnapshot::from_template(work_order_id.clone(), &template);
        let responses: Vec<ResponseRecord> = snapshot
            .items
            .iter()
            .map(|item| ResponseRecord::pending(snapshot.id.clone(), item.order))
            .collect();

        self.store.insert_snapshot(&snapshot, &responses).await?;

        order.snapshot_id = Some(snapshot.id.clone());
        order.updated_at = Utc::now();
        self.store.update_work_order(&order).await?;

        info!(
            work_order = %work_order_id,
            snapshot = %snapshot.id,
            template = %template.id,
            version = template.version,
            items = snapshot.item_count(),
            "checklist snapshot created"
        );
        Ok((snapshot, responses))
    }

    /// Validate and persist one answer.
    ///
    /// Hard errors (`ItemNotFound`, `TypeMismatch`) reject the call with no
    /// write. A compliant submission whose constraint fails is persisted
    /// with its status clamped to non-compliant, and the violation comes
    /// back as a warning alongside the saved record.
    ///
    /// The read-modify-write runs as one store unit, so an interleaved
    /// writer's committed value is never overwritten by a stale read.
    pub async fn set_response(
        &self,
        snapshot_id: &SnapshotId,
        item_order: u32,
        update: ResponseUpdate,
    ) -> ChecklistResult<(ResponseRecord, Vec<ConstraintViolation>)> {
        let snapshot = self
            .store
            .get_snapshot(snapshot_id)
            .await?
            .ok_or_else(|| ChecklistError::SnapshotNotFound(snapshot_id.clone()))?;
        let item = snapshot
            .item(item_order)
            .ok_or_else(|| ChecklistError::ItemNotFound {
                snapshot_id: snapshot_id.clone(),
                item_order,
            })?;

        // Reject a mismatched slot before touching the stored record
        validate::check_value_slot(item, update.value.as_ref())?;

        let now = Utc::now();
        let (record, warnings) = self
            .store
            .with_responses(snapshot_id, move |records| {
                // Records are created at snapshot time; a miss means the
                // store lost one, so rebuild it pending rather than fail
                let existing = records
                    .get(&item_order)
                    .cloned()
                    .unwrap_or_else(|| ResponseRecord::pending(snapshot_id.clone(), item_order));

                let effective_value = update.value.or_else(|| existing.value.clone());
                let outcome =
                    validate::validate_response(item, update.status, effective_value.as_ref())?;

                let mut record = existing;
                record.status = outcome.effective_status;
                record.value = effective_value;
                record.updated_at = now;
                if let Some(note) = update.note {
                    record.note = Some(note);
                }
                if record.status.is_answered() {
                    if update.actor.is_some() {
                        record.answered_by = update.actor;
                    }
                    record.answered_at.get_or_insert(now);
                } else {
                    // An explicit pending resubmission un-answers the item
                    record.answered_by = None;
                    record.answered_at = None;
                }

                records.insert(item_order, record.clone());
                Ok::<_, ChecklistError>((record, outcome.warnings))
            })
            .await?;

        debug!(
            snapshot = %snapshot_id,
            item = item_order,
            status = ?record.status,
            warnings = warnings.len(),
            "response saved"
        );
        Ok((record, warnings))
    }

    /// Compute the compliance score for a snapshot's current responses.
    pub async fn get_score(&self, snapshot_id: &SnapshotId) -> ChecklistResult<ComplianceScore> {
        let snapshot = self
            .store
            .get_snapshot(snapshot_id)
            .await?
            .ok_or_else(|| ChecklistError::SnapshotNotFound(snapshot_id.clone()))?;
        let responses = self.store.load_responses(snapshot_id).await?;
        Ok(score(&snapshot, &responses))
    }

    /// Evaluate the closure gate and commit the transition when permitted.
    ///
    /// A refused closure is a normal outcome, returned as data with the
    /// full blocker list — never an error. When nothing blocks, the work
    /// order moves to `awaiting_signature`, or straight to `completed` if
    /// no signature requirement is configured.
    pub async fn request_close(
        &self,
        work_order_id: &WorkOrderId,
        actor: Option<TechnicianId>,
    ) -> ChecklistResult<ClosureDecision> {
        let mut order = self
            .store
            .get_work_order(work_order_id)
            .await?
            .ok_or_else(|| ChecklistError::WorkOrderNotFound(work_order_id.clone()))?;

        if order.status != WorkOrderStatus::InProgress {
            return Err(ChecklistError::InvalidTransition(format!(
                "closure can only be requested from InProgress, not {:?}",
                order.status
            )));
        }
        if order.stopped {
            return Err(ChecklistError::InvalidTransition(
                "work order is stopped (equipment out of service)".to_string(),
            ));
        }

        let snapshot_id = order
            .snapshot_id
            .clone()
            .ok_or_else(|| ChecklistError::SnapshotNotBound(work_order_id.clone()))?;
        let snapshot = self
            .store
            .get_snapshot(&snapshot_id)
            .await?
            .ok_or_else(|| ChecklistError::SnapshotNotFound(snapshot_id.clone()))?;

        // Evaluate inside the response-set unit so no write interleaves
        // with the reading of the records it judges
        let (blockers, warnings) = self
            .store
            .with_responses(&snapshot_id, |records| {
                let responses: Vec<ResponseRecord> = records.values().cloned().collect();
                Ok::<_, ChecklistError>(evaluate_closure(&snapshot, &responses))
            })
            .await?;
        if !blockers.is_empty() {
            info!(
                work_order = %work_order_id,
                blockers = blockers.len(),
                "closure refused"
            );
            return Ok(ClosureDecision::refused(blockers, warnings));
        }

        let next = if order.requires_signature {
            WorkOrderStatus::AwaitingSignature
        } else {
            WorkOrderStatus::Completed
        };
        let previous = order.status;
        order.status = next;
        order.updated_at = Utc::now();
        self.store.update_work_order(&order).await?;

        let mut entry = StatusTransition::new(
            order.id.clone(),
            Some(previous),
            next,
            TransitionAction::RequestClose,
        );
        if let Some(actor) = actor {
            entry = entry.by(actor);
        }
        self.store.append_history(&entry).await?;

        info!(work_order = %work_order_id, to = ?next, "closure permitted");
        Ok(ClosureDecision::allowed(next, warnings))
    }

    /// Technician accepts the work order and departs.
    pub async fn accept(
        &self,
        work_order_id: &WorkOrderId,
        actor: Option<TechnicianId>,
    ) -> ChecklistResult<WorkOrder> {
        self.transition(work_order_id, TransitionAction::Accept, actor)
            .await
    }

    /// Technician arrives on site.
    pub async fn check_in(
        &self,
        work_order_id: &WorkOrderId,
        actor: Option<TechnicianId>,
    ) -> ChecklistResult<WorkOrder> {
        self.transition(work_order_id, TransitionAction::CheckIn, actor)
            .await
    }

    /// Inspection starts.
    pub async fn start(
        &self,
        work_order_id: &WorkOrderId,
        actor: Option<TechnicianId>,
    ) -> ChecklistResult<WorkOrder> {
        self.transition(work_order_id, TransitionAction::Start, actor)
            .await
    }

    /// Client signature collected; closes the work order.
    pub async fn sign(
        &self,
        work_order_id: &WorkOrderId,
        actor: Option<TechnicianId>,
    ) -> ChecklistResult<WorkOrder> {
        self.transition(work_order_id, TransitionAction::Sign, actor)
            .await
    }

    /// Cancel the work order from any active state.
    pub async fn cancel(
        &self,
        work_order_id: &WorkOrderId,
        actor: Option<TechnicianId>,
    ) -> ChecklistResult<WorkOrder> {
        self.transition(work_order_id, TransitionAction::Cancel, actor)
            .await
    }

    /// Flag the equipment out of service. The lifecycle position is kept;
    /// forward transitions are refused until resumed.
    pub async fn stop(
        &self,
        work_order_id: &WorkOrderId,
        actor: Option<TechnicianId>,
    ) -> ChecklistResult<WorkOrder> {
        let mut order = self
            .store
            .get_work_order(work_order_id)
            .await?
            .ok_or_else(|| ChecklistError::WorkOrderNotFound(work_order_id.clone()))?;
        if order.is_terminal() {
            return Err(ChecklistError::InvalidTransition(
                "cannot stop a terminal work order".to_string(),
            ));
        }
        if order.stopped {
            return Err(ChecklistError::InvalidTransition(
                "work order is already stopped".to_string(),
            ));
        }

        order.stopped = true;
        order.updated_at = Utc::now();
        self.store.update_work_order(&order).await?;
        self.record_transition(&order, order.status, TransitionAction::Stop, actor)
            .await?;
        info!(work_order = %work_order_id, "equipment flagged out of service");
        Ok(order)
    }

    /// Clear the out-of-service flag, returning to the prior state.
    pub async fn resume(
        &self,
        work_order_id: &WorkOrderId,
        actor: Option<TechnicianId>,
    ) -> ChecklistResult<WorkOrder> {
        let mut order = self
            .store
            .get_work_order(work_order_id)
            .await?
            .ok_or_else(|| ChecklistError::WorkOrderNotFound(work_order_id.clone()))?;
        if !order.stopped {
            return Err(ChecklistError::InvalidTransition(
                "work order is not stopped".to_string(),
            ));
        }

        order.stopped = false;
        order.updated_at = Utc::now();
        self.store.update_work_order(&order).await?;
        self.record_transition(&order, order.status, TransitionAction::Resume, actor)
            .await?;
        info!(work_order = %work_order_id, "out-of-service flag cleared");
        Ok(order)
    }

    /// Read a work order's status-history audit trail, oldest first.
    pub async fn history(
        &self,
        work_order_id: &WorkOrderId,
    ) -> ChecklistResult<Vec<StatusTransition>> {
        Ok(self.store.list_history(work_order_id).await?)
    }

    // ── Internal helpers ─────────────────────────────────────────────

    async fn transition(
        &self,
        work_order_id: &WorkOrderId,
        action: TransitionAction,
        actor: Option<TechnicianId>,
    ) -> ChecklistResult<WorkOrder> {
        let mut order = self
            .store
            .get_work_order(work_order_id)
            .await?
            .ok_or_else(|| ChecklistError::WorkOrderNotFound(work_order_id.clone()))?;

        // Stopped equipment halts forward progress; only cancel remains legal
        if order.stopped && action != TransitionAction::Cancel {
            return Err(ChecklistError::InvalidTransition(format!(
                "{action:?} refused: work order is stopped"
            )));
        }

        let previous = order.status;
        order.status = lifecycle::next_status(action, previous)?;
        order.updated_at = Utc::now();
        self.store.update_work_order(&order).await?;
        self.record_transition(&order, previous, action, actor).await?;

        debug!(work_order = %work_order_id, from = ?previous, to = ?order.status, "transition applied");
        Ok(order)
    }

    async fn record_transition(
        &self,
        order: &WorkOrder,
        from: WorkOrderStatus,
        action: TransitionAction,
        actor: Option<TechnicianId>,
    ) -> ChecklistResult<()> {
        let mut entry =
            StatusTransition::new(order.id.clone(), Some(from), order.status, action);
        if let Some(actor) = actor {
            entry = entry.by(actor);
        }
        self.store.append_history(&entry).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use liftops_store::{
        InMemoryStorage, ResponseSet, ResponseStore, SnapshotStore, StoreError, StoreResult,
        TemplateStore, WorkOrderStore,
    };
    use liftops_types::{
        ChecklistTemplate, EvidenceRef, ItemType, ResponseStatus, ResponseValue, TemplateItem,
    };
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Storage wrapper that can fail selected operations once, to exercise
    /// partial-failure recovery.
    struct FlakyStorage {
        inner: InMemoryStorage,
        fail_next_snapshot_insert: AtomicBool,
        fail_next_work_order_update: AtomicBool,
    }

    impl FlakyStorage {
        fn new() -> Self {
            Self {
                inner: InMemoryStorage::new(),
                fail_next_snapshot_insert: AtomicBool::new(false),
                fail_next_work_order_update: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl TemplateStore for FlakyStorage {
        async fn get_active_template(
            &self,
            id: &TemplateId,
        ) -> StoreResult<Option<ChecklistTemplate>> {
            self.inner.get_active_template(id).await
        }
    }

    #[async_trait]
    impl SnapshotStore for FlakyStorage {
        async fn insert_snapshot(
            &self,
            snapshot: &ChecklistSnapshot,
            responses: &[ResponseRecord],
        ) -> StoreResult<()> {
            if self.fail_next_snapshot_insert.swap(false, Ordering::SeqCst) {
                return Err(StoreError::Backend("injected failure".to_string()));
            }
            self.inner.insert_snapshot(snapshot, responses).await
        }

        async fn get_snapshot(&self, id: &SnapshotId) -> StoreResult<Option<ChecklistSnapshot>> {
            self.inner.get_snapshot(id).await
        }

        async fn find_snapshot_for_work_order(
            &self,
            work_order_id: &WorkOrderId,
        ) -> StoreResult<Option<ChecklistSnapshot>> {
            self.inner.find_snapshot_for_work_order(work_order_id).await
        }
    }

    #[async_trait]
    impl ResponseStore for FlakyStorage {
        async fn load_responses(
            &self,
            snapshot_id: &SnapshotId,
        ) -> StoreResult<Vec<ResponseRecord>> {
            self.inner.load_responses(snapshot_id).await
        }

        async fn with_responses<T, E, F>(&self, snapshot_id: &SnapshotId, unit: F) -> Result<T, E>
        where
            F: FnOnce(&mut ResponseSet) -> Result<T, E> + Send,
            T: Send,
            E: From<StoreError> + Send,
        {
            self.inner.with_responses(snapshot_id, unit).await
        }
    }

    #[async_trait]
    impl WorkOrderStore for FlakyStorage {
        async fn insert_work_order(&self, order: &WorkOrder) -> StoreResult<()> {
            self.inner.insert_work_order(order).await
        }

        async fn get_work_order(&self, id: &WorkOrderId) -> StoreResult<Option<WorkOrder>> {
            self.inner.get_work_order(id).await
        }

        async fn update_work_order(&self, order: &WorkOrder) -> StoreResult<()> {
            if self.fail_next_work_order_update.swap(false, Ordering::SeqCst) {
                return Err(StoreError::Backend("injected failure".to_string()));
            }
            self.inner.update_work_order(order).await
        }

        async fn append_history(&self, entry: &StatusTransition) -> StoreResult<()> {
            self.inner.append_history(entry).await
        }

        async fn list_history(
            &self,
            work_order_id: &WorkOrderId,
        ) -> StoreResult<Vec<StatusTransition>> {
            self.inner.list_history(work_order_id).await
        }
    }

    fn engine_with_template(template: ChecklistTemplate) -> (ChecklistEngine<InMemoryStorage>, TemplateId) {
        let store = Arc::new(InMemoryStorage::new());
        let id = template.id.clone();
        store.put_template(template).unwrap();
        (ChecklistEngine::new(store), id)
    }

    fn simple_template(items: Vec<TemplateItem>) -> ChecklistTemplate {
        let mut template = ChecklistTemplate::new("Monthly preventive", ServiceKind::Preventive);
        for item in items {
            template.add_item(item).unwrap();
        }
        template
    }

    #[tokio::test]
    async fn snapshot_creates_one_pending_response_per_item() {
        let template = simple_template(vec![
            TemplateItem::new(1, "Cabin", "A", ItemType::Boolean),
            TemplateItem::new(2, "Cabin", "B", ItemType::Text),
            TemplateItem::new(3, "Pit", "C", ItemType::Photo),
        ]);
        let (engine, template_id) = engine_with_template(template);
        let order = engine
            .create_work_order(ServiceKind::Preventive, true)
            .await
            .unwrap();

        let (snapshot, responses) = engine
            .create_snapshot(&order.id, &template_id)
            .await
            .unwrap();

        assert_eq!(responses.len(), 3);
        assert!(responses.iter().all(|r| r.status == ResponseStatus::Pending));
        assert_eq!(snapshot.item_count(), 3);
    }

    #[tokio::test]
    async fn snapshot_of_empty_template_is_legal() {
        let template = simple_template(vec![]);
        let (engine, template_id) = engine_with_template(template);
        let order = engine
            .create_work_order(ServiceKind::Callout, false)
            .await
            .unwrap();

        let (snapshot, responses) = engine
            .create_snapshot(&order.id, &template_id)
            .await
            .unwrap();
        assert_eq!(responses.len(), 0);

        let score = engine.get_score(&snapshot.id).await.unwrap();
        assert_eq!(score.percentage, 100);
    }

    #[tokio::test]
    async fn snapshot_creation_is_idempotent_per_work_order() {
        let template = simple_template(vec![TemplateItem::new(1, "Cabin", "A", ItemType::Boolean)]);
        let (engine, template_id) = engine_with_template(template);
        let order = engine
            .create_work_order(ServiceKind::Preventive, true)
            .await
            .unwrap();

        let (first, _) = engine.create_snapshot(&order.id, &template_id).await.unwrap();
        let (second, responses) = engine.create_snapshot(&order.id, &template_id).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(responses.len(), 1);
    }

    #[tokio::test]
    async fn inactive_template_is_not_found() {
        let mut template = simple_template(vec![]);
        template.deactivate();
        let (engine, template_id) = engine_with_template(template);
        let order = engine
            .create_work_order(ServiceKind::Preventive, true)
            .await
            .unwrap();

        let result = engine.create_snapshot(&order.id, &template_id).await;
        assert!(matches!(result, Err(ChecklistError::TemplateNotFound(_))));
    }

    #[tokio::test]
    async fn snapshot_survives_template_edits() {
        let template = simple_template(vec![TemplateItem::new(1, "Cabin", "A", ItemType::Boolean)]);
        let store = Arc::new(InMemoryStorage::new());
        let template_id = template.id.clone();
        store.put_template(template.clone()).unwrap();
        let engine = ChecklistEngine::new(Arc::clone(&store));

        let order = engine
            .create_work_order(ServiceKind::Preventive, true)
            .await
            .unwrap();
        let (snapshot, _) = engine.create_snapshot(&order.id, &template_id).await.unwrap();

        // Publish an edited template after the snapshot was taken
        let mut edited = template;
        edited
            .add_item(TemplateItem::new(2, "Pit", "B", ItemType::Boolean))
            .unwrap();
        edited.bump_version();
        store.put_template(edited).unwrap();

        // The frozen copy keeps the original version and item set
        let score = engine.get_score(&snapshot.id).await.unwrap();
        assert_eq!(score.total, 1);
        assert_eq!(snapshot.template_version, 1);
    }

    #[tokio::test]
    async fn type_mismatch_rejects_without_write() {
        let template = simple_template(vec![TemplateItem::new(1, "Cabin", "A", ItemType::Boolean)]);
        let (engine, template_id) = engine_with_template(template);
        let order = engine
            .create_work_order(ServiceKind::Preventive, true)
            .await
            .unwrap();
        let (snapshot, _) = engine.create_snapshot(&order.id, &template_id).await.unwrap();

        let result = engine
            .set_response(
                &snapshot.id,
                1,
                ResponseUpdate::new(ResponseStatus::Compliant)
                    .with_value(ResponseValue::Number(3.0)),
            )
            .await;
        assert!(matches!(result, Err(ChecklistError::TypeMismatch { .. })));

        // Nothing was written: the record is still pending
        let score = engine.get_score(&snapshot.id).await.unwrap();
        assert_eq!(score.counts.pending, 1);
    }

    #[tokio::test]
    async fn unknown_item_is_not_found() {
        let template = simple_template(vec![TemplateItem::new(1, "Cabin", "A", ItemType::Boolean)]);
        let (engine, template_id) = engine_with_template(template);
        let order = engine
            .create_work_order(ServiceKind::Preventive, true)
            .await
            .unwrap();
        let (snapshot, _) = engine.create_snapshot(&order.id, &template_id).await.unwrap();

        let result = engine
            .set_response(&snapshot.id, 42, ResponseUpdate::new(ResponseStatus::Compliant))
            .await;
        assert!(matches!(result, Err(ChecklistError::ItemNotFound { item_order: 42, .. })));
    }

    #[tokio::test]
    async fn out_of_range_value_is_persisted_but_clamped() {
        let template = simple_template(vec![
            TemplateItem::new(1, "Machine room", "Motor current", ItemType::Number)
                .with_range(10.0, 20.0)
                .mandatory(),
        ]);
        let (engine, template_id) = engine_with_template(template);
        let order = engine
            .create_work_order(ServiceKind::Preventive, true)
            .await
            .unwrap();
        let (snapshot, _) = engine.create_snapshot(&order.id, &template_id).await.unwrap();

        // In range: honored as compliant
        let (record, warnings) = engine
            .set_response(
                &snapshot.id,
                1,
                ResponseUpdate::new(ResponseStatus::Compliant)
                    .with_value(ResponseValue::Number(15.0)),
            )
            .await
            .unwrap();
        assert_eq!(record.status, ResponseStatus::Compliant);
        assert!(warnings.is_empty());

        // Out of range: value persisted, status clamped, warning returned
        let (record, warnings) = engine
            .set_response(
                &snapshot.id,
                1,
                ResponseUpdate::new(ResponseStatus::Compliant)
                    .with_value(ResponseValue::Number(25.0)),
            )
            .await
            .unwrap();
        assert_eq!(record.status, ResponseStatus::NonCompliant);
        assert_eq!(record.value, Some(ResponseValue::Number(25.0)));
        assert_eq!(warnings.len(), 1);
    }

    #[tokio::test]
    async fn status_only_update_preserves_committed_value() {
        let template = simple_template(vec![TemplateItem::new(1, "Cabin", "A", ItemType::Boolean)]);
        let (engine, template_id) = engine_with_template(template);
        let order = engine
            .create_work_order(ServiceKind::Preventive, true)
            .await
            .unwrap();
        let (snapshot, _) = engine.create_snapshot(&order.id, &template_id).await.unwrap();

        engine
            .set_response(
                &snapshot.id,
                1,
                ResponseUpdate::new(ResponseStatus::Compliant)
                    .with_value(ResponseValue::Bool(true)),
            )
            .await
            .unwrap();

        // A later status-only write reads and rewrites inside one store
        // unit; the committed value must survive it
        let (record, _) = engine
            .set_response(
                &snapshot.id,
                1,
                ResponseUpdate::new(ResponseStatus::NonCompliant)
                    .with_note("intermittent fault on retest"),
            )
            .await
            .unwrap();
        assert_eq!(record.status, ResponseStatus::NonCompliant);
        assert_eq!(record.value, Some(ResponseValue::Bool(true)));
    }

    #[tokio::test]
    async fn resubmitting_pending_clears_answer_stamps() {
        let template = simple_template(vec![TemplateItem::new(1, "Cabin", "A", ItemType::Boolean)]);
        let (engine, template_id) = engine_with_template(template);
        let order = engine
            .create_work_order(ServiceKind::Preventive, true)
            .await
            .unwrap();
        let (snapshot, _) = engine.create_snapshot(&order.id, &template_id).await.unwrap();

        engine
            .set_response(
                &snapshot.id,
                1,
                ResponseUpdate::new(ResponseStatus::Compliant)
                    .with_value(ResponseValue::Bool(true))
                    .by(TechnicianId::new("tech-7")),
            )
            .await
            .unwrap();

        let (record, _) = engine
            .set_response(&snapshot.id, 1, ResponseUpdate::new(ResponseStatus::Pending))
            .await
            .unwrap();
        assert_eq!(record.status, ResponseStatus::Pending);
        assert!(record.answered_by.is_none());
        assert!(record.answered_at.is_none());
    }

    #[tokio::test]
    async fn failed_snapshot_insert_leaves_no_partial_state() {
        let template = simple_template(vec![
            TemplateItem::new(1, "Cabin", "A", ItemType::Boolean),
            TemplateItem::new(2, "Pit", "B", ItemType::Photo),
        ]);
        let store = Arc::new(FlakyStorage::new());
        let template_id = template.id.clone();
        store.inner.put_template(template).unwrap();
        let engine = ChecklistEngine::new(Arc::clone(&store));
        let order = engine
            .create_work_order(ServiceKind::Preventive, true)
            .await
            .unwrap();

        store.fail_next_snapshot_insert.store(true, Ordering::SeqCst);
        assert!(engine.create_snapshot(&order.id, &template_id).await.is_err());

        // Nothing persisted: no snapshot, no records, no binding
        assert!(store
            .inner
            .find_snapshot_for_work_order(&order.id)
            .await
            .unwrap()
            .is_none());
        let stored = store.inner.get_work_order(&order.id).await.unwrap().unwrap();
        assert!(stored.snapshot_id.is_none());

        // Retry completes with the full record set
        let (snapshot, responses) = engine.create_snapshot(&order.id, &template_id).await.unwrap();
        assert_eq!(responses.len(), 2);
        let stored = store.inner.get_work_order(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.snapshot_id, Some(snapshot.id));
    }

    #[tokio::test]
    async fn retry_repairs_missing_snapshot_binding() {
        let template = simple_template(vec![TemplateItem::new(1, "Cabin", "A", ItemType::Boolean)]);
        let store = Arc::new(FlakyStorage::new());
        let template_id = template.id.clone();
        store.inner.put_template(template).unwrap();
        let engine = ChecklistEngine::new(Arc::clone(&store));
        let order = engine
            .create_work_order(ServiceKind::Preventive, true)
            .await
            .unwrap();

        // Die between the snapshot write and the binding update
        store.fail_next_work_order_update.store(true, Ordering::SeqCst);
        assert!(engine.create_snapshot(&order.id, &template_id).await.is_err());
        assert!(store
            .inner
            .find_snapshot_for_work_order(&order.id)
            .await
            .unwrap()
            .is_some());
        let stored = store.inner.get_work_order(&order.id).await.unwrap().unwrap();
        assert!(stored.snapshot_id.is_none());

        // Retry returns the existing snapshot and repairs the binding
        let (snapshot, responses) = engine.create_snapshot(&order.id, &template_id).await.unwrap();
        assert_eq!(responses.len(), 1);
        let stored = store.inner.get_work_order(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.snapshot_id, Some(snapshot.id));
    }

    #[tokio::test]
    async fn answered_response_is_stamped() {
        let template = simple_template(vec![TemplateItem::new(1, "Cabin", "A", ItemType::Boolean)]);
        let (engine, template_id) = engine_with_template(template);
        let order = engine
            .create_work_order(ServiceKind::Preventive, true)
            .await
            .unwrap();
        let (snapshot, _) = engine.create_snapshot(&order.id, &template_id).await.unwrap();

        let (record, _) = engine
            .set_response(
                &snapshot.id,
                1,
                ResponseUpdate::new(ResponseStatus::Compliant)
                    .with_value(ResponseValue::Bool(true))
                    .with_note("verified twice")
                    .by(TechnicianId::new("tech-7")),
            )
            .await
            .unwrap();

        assert_eq!(record.answered_by, Some(TechnicianId::new("tech-7")));
        assert!(record.answered_at.is_some());
        assert_eq!(record.note.as_deref(), Some("verified twice"));
    }

    #[tokio::test]
    async fn get_score_is_idempotent() {
        let template = simple_template(vec![
            TemplateItem::new(1, "Cabin", "A", ItemType::Boolean),
            TemplateItem::new(2, "Cabin", "B", ItemType::Text),
        ]);
        let (engine, template_id) = engine_with_template(template);
        let order = engine
            .create_work_order(ServiceKind::Preventive, true)
            .await
            .unwrap();
        let (snapshot, _) = engine.create_snapshot(&order.id, &template_id).await.unwrap();

        engine
            .set_response(
                &snapshot.id,
                1,
                ResponseUpdate::new(ResponseStatus::Compliant)
                    .with_value(ResponseValue::Bool(true)),
            )
            .await
            .unwrap();

        let first = engine.get_score(&snapshot.id).await.unwrap();
        let second = engine.get_score(&snapshot.id).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn lifecycle_happy_path_with_signature() {
        let template = simple_template(vec![]);
        let (engine, template_id) = engine_with_template(template);
        let order = engine
            .create_work_order(ServiceKind::Preventive, true)
            .await
            .unwrap();
        engine.create_snapshot(&order.id, &template_id).await.unwrap();

        engine.accept(&order.id, None).await.unwrap();
        engine.check_in(&order.id, None).await.unwrap();
        engine.start(&order.id, None).await.unwrap();

        let decision = engine.request_close(&order.id, None).await.unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.next_status, Some(WorkOrderStatus::AwaitingSignature));

        let order = engine.sign(&order.id, None).await.unwrap();
        assert_eq!(order.status, WorkOrderStatus::Completed);

        let history = engine.history(&order.id).await.unwrap();
        let actions: Vec<TransitionAction> = history.iter().map(|h| h.action).collect();
        assert_eq!(
            actions,
            vec![
                TransitionAction::Create,
                TransitionAction::Accept,
                TransitionAction::CheckIn,
                TransitionAction::Start,
                TransitionAction::RequestClose,
                TransitionAction::Sign,
            ]
        );
    }

    #[tokio::test]
    async fn closure_skips_signature_when_not_required() {
        let template = simple_template(vec![]);
        let (engine, template_id) = engine_with_template(template);
        let order = engine
            .create_work_order(ServiceKind::Callout, false)
            .await
            .unwrap();
        engine.create_snapshot(&order.id, &template_id).await.unwrap();
        engine.accept(&order.id, None).await.unwrap();
        engine.check_in(&order.id, None).await.unwrap();
        engine.start(&order.id, None).await.unwrap();

        let decision = engine.request_close(&order.id, None).await.unwrap();
        assert_eq!(decision.next_status, Some(WorkOrderStatus::Completed));
    }

    #[tokio::test]
    async fn critical_non_compliant_always_blocks_closure() {
        let template = simple_template(vec![
            TemplateItem::new(1, "Cabin", "Alarm button", ItemType::Boolean)
                .mandatory()
                .critical(),
        ]);
        let (engine, template_id) = engine_with_template(template);
        let order = engine
            .create_work_order(ServiceKind::Preventive, true)
            .await
            .unwrap();
        let (snapshot, _) = engine.create_snapshot(&order.id, &template_id).await.unwrap();
        engine.accept(&order.id, None).await.unwrap();
        engine.check_in(&order.id, None).await.unwrap();
        engine.start(&order.id, None).await.unwrap();

        engine
            .set_response(
                &snapshot.id,
                1,
                ResponseUpdate::new(ResponseStatus::NonCompliant)
                    .with_value(ResponseValue::Bool(false)),
            )
            .await
            .unwrap();

        let decision = engine.request_close(&order.id, None).await.unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.blockers.len(), 1);
        assert_eq!(decision.blockers[0].item_order, 1);

        // The work order did not move
        let history = engine.history(&order.id).await.unwrap();
        assert!(history.iter().all(|h| h.action != TransitionAction::RequestClose));
    }

    #[tokio::test]
    async fn request_close_requires_in_progress() {
        let template = simple_template(vec![]);
        let (engine, template_id) = engine_with_template(template);
        let order = engine
            .create_work_order(ServiceKind::Preventive, true)
            .await
            .unwrap();
        engine.create_snapshot(&order.id, &template_id).await.unwrap();

        let result = engine.request_close(&order.id, None).await;
        assert!(matches!(result, Err(ChecklistError::InvalidTransition(_))));
    }

    #[tokio::test]
    async fn stopped_work_order_refuses_forward_transitions() {
        let template = simple_template(vec![]);
        let (engine, template_id) = engine_with_template(template);
        let order = engine
            .create_work_order(ServiceKind::Emergency, true)
            .await
            .unwrap();
        engine.create_snapshot(&order.id, &template_id).await.unwrap();
        engine.accept(&order.id, None).await.unwrap();

        engine.stop(&order.id, None).await.unwrap();
        let result = engine.check_in(&order.id, None).await;
        assert!(matches!(result, Err(ChecklistError::InvalidTransition(_))));

        // Cancel remains legal while stopped
        let resumed = engine.resume(&order.id, None).await.unwrap();
        assert_eq!(resumed.status, WorkOrderStatus::EnRoute);
        assert!(!resumed.stopped);

        let order = engine.check_in(&order.id, None).await.unwrap();
        assert_eq!(order.status, WorkOrderStatus::CheckedIn);
    }

    #[tokio::test]
    async fn cancel_is_legal_while_stopped() {
        let template = simple_template(vec![]);
        let (engine, template_id) = engine_with_template(template);
        let order = engine
            .create_work_order(ServiceKind::Emergency, true)
            .await
            .unwrap();
        engine.create_snapshot(&order.id, &template_id).await.unwrap();
        engine.stop(&order.id, None).await.unwrap();

        let order = engine.cancel(&order.id, None).await.unwrap();
        assert_eq!(order.status, WorkOrderStatus::Canceled);
    }

    #[tokio::test]
    async fn photo_evidence_counts_toward_compliance() {
        let template = simple_template(vec![
            TemplateItem::new(1, "Pit", "Buffer photos", ItemType::Photo)
                .with_min_photos(2)
                .mandatory(),
        ]);
        let (engine, template_id) = engine_with_template(template);
        let order = engine
            .create_work_order(ServiceKind::Preventive, true)
            .await
            .unwrap();
        let (snapshot, _) = engine.create_snapshot(&order.id, &template_id).await.unwrap();

        let (record, warnings) = engine
            .set_response(
                &snapshot.id,
                1,
                ResponseUpdate::new(ResponseStatus::Compliant).with_value(
                    ResponseValue::EvidenceRefs(vec![EvidenceRef::new("ph-1")]),
                ),
            )
            .await
            .unwrap();
        assert_eq!(record.status, ResponseStatus::NonCompliant);
        assert_eq!(warnings.len(), 1);

        let (record, warnings) = engine
            .set_response(
                &snapshot.id,
                1,
                ResponseUpdate::new(ResponseStatus::Compliant).with_value(
                    ResponseValue::EvidenceRefs(vec![
                        EvidenceRef::new("ph-1"),
                        EvidenceRef::new("ph-2"),
                    ]),
                ),
            )
            .await
            .unwrap();
        assert_eq!(record.status, ResponseStatus::Compliant);
        assert!(warnings.is_empty());
    }
}

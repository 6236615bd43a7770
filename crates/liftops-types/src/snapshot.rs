//! Checklist snapshots: a template frozen onto one work order.
//!
//! The snapshot copies the template's item list by value at work-order
//! creation time and keeps no reference to the live template. Edits or
//! deletion of the source template never alter a snapshot; its lifecycle is
//! the lifecycle of its owning work order.

use crate::{ChecklistTemplate, ServiceKind, SnapshotId, TemplateId, TemplateItem, WorkOrderId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable copy of a checklist template bound 1:1 to a work order
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChecklistSnapshot {
    /// Unique snapshot identifier
    pub id: SnapshotId,
    /// The work order this snapshot belongs to
    pub work_order_id: WorkOrderId,
    /// Source template id, for traceability only — never dereferenced again
    pub template_id: TemplateId,
    /// Template name at freeze time
    pub template_name: String,
    /// Service category at freeze time
    pub service_kind: ServiceKind,
    /// Template version at freeze time
    pub template_version: u32,
    /// By-value copy of the template's items, sorted by order
    pub items: Vec<TemplateItem>,
    /// When the snapshot was taken
    pub created_at: DateTime<Utc>,
}

impl ChecklistSnapshot {
    /// Freeze a template onto a work order.
    ///
    /// The item list is copied by value and sorted by order index; the
    /// result holds no live reference to the template.
    pub fn from_template(work_order_id: WorkOrderId, template: &ChecklistTemplate) -> Self {
        let mut items = template.items.clone();
        items.sort_by_key(|i| i.order);
        Self {
            id: SnapshotId::generate(),
            work_order_id,
            template_id: template.id.clone(),
            template_name: template.name.clone(),
            service_kind: template.service_kind,
            template_version: template.version,
            items,
            created_at: Utc::now(),
        }
    }

    /// Look up an item by order index
    pub fn item(&self, order: u32) -> Option<&TemplateItem> {
        self.items.iter().find(|i| i.order == order)
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}

//! Response records and their typed value slots.
//!
//! Every snapshot item gets exactly one response record, created pending at
//! snapshot time. The value slot is a tagged sum type; which variant is
//! legal depends on the item's declared type and is checked at the
//! validator boundary, never by duck typing.

use crate::{EvidenceRef, ItemType, SnapshotId, TechnicianId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of one answered (or unanswered) checklist item
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    /// Not yet answered
    Pending,
    /// Verified satisfactory
    Compliant,
    /// Verified unsatisfactory
    NonCompliant,
    /// Not applicable to this equipment; excluded from the score denominator
    NotApplicable,
}

impl ResponseStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Whether the item has been answered at all
    pub fn is_answered(&self) -> bool {
        !self.is_pending()
    }
}

/// Typed value slot for a response, keyed by the item's declared type
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ResponseValue {
    /// Boolean items
    Bool(bool),
    /// Text items
    Text(String),
    /// Number and reading items
    Number(f64),
    /// Photo and signature items
    EvidenceRefs(Vec<EvidenceRef>),
}

impl ResponseValue {
    /// Whether this variant is the legal slot for the given item type
    pub fn matches(&self, item_type: ItemType) -> bool {
        matches!(
            (self, item_type),
            (Self::Bool(_), ItemType::Boolean)
                | (Self::Text(_), ItemType::Text)
                | (Self::Number(_), ItemType::Number)
                | (Self::Number(_), ItemType::Reading)
                | (Self::EvidenceRefs(_), ItemType::Photo)
                | (Self::EvidenceRefs(_), ItemType::Signature)
        )
    }

    /// Number of evidence references carried, 0 for non-evidence variants
    pub fn evidence_count(&self) -> usize {
        match self {
            Self::EvidenceRefs(refs) => refs.len(),
            _ => 0,
        }
    }
}

/// One response per (snapshot, item order)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResponseRecord {
    /// The snapshot this response belongs to
    pub snapshot_id: SnapshotId,
    /// Order index of the item answered
    pub item_order: u32,
    /// Current status
    pub status: ResponseStatus,
    /// Typed value, populated only for the slot matching the item type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<ResponseValue>,
    /// Free-text note from the technician (e.g. justifying an override)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Who answered, stamped when the record leaves pending
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answered_by: Option<TechnicianId>,
    /// When it was answered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answered_at: Option<DateTime<Utc>>,
    /// Last write timestamp
    pub updated_at: DateTime<Utc>,
}

impl ResponseRecord {
    /// Create the initial pending record for a snapshot item
    pub fn pending(snapshot_id: SnapshotId, item_order: u32) -> Self {
        Self {
            snapshot_id,
            item_order,
            status: ResponseStatus::Pending,
            value: None,
            note: None,
            answered_by: None,
            answered_at: None,
            updated_at: Utc::now(),
        }
    }
}

/// Incremental update submitted for one response record
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResponseUpdate {
    /// Requested status; may be clamped by the validator
    pub status: ResponseStatus,
    /// New value for the item's slot; `None` keeps the stored value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<ResponseValue>,
    /// Optional technician note
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Who is submitting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<TechnicianId>,
}

impl ResponseUpdate {
    pub fn new(status: ResponseStatus) -> Self {
        Self {
            status,
            value: None,
            note: None,
            actor: None,
        }
    }

    pub fn with_value(mut self, value: ResponseValue) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn by(mut self, actor: TechnicianId) -> Self {
        self.actor = Some(actor);
        self
    }
}

/// Soft validation outcome: the value was persisted, but the submitted
/// status could not be honored as-is. Surfaced as a warning, never an error,
/// because field data capture must not be blocked by validation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstraintViolation {
    /// The item whose constraint failed
    pub item_order: u32,
    /// Which rule failed
    pub rule: ConstraintRule,
    /// Human-readable detail for the caller to display
    pub detail: String,
}

/// The per-type constraint that a compliant status must satisfy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintRule {
    /// Boolean item answered false cannot be compliant
    BooleanFalse,
    /// Text item needs a non-empty submission
    EmptyText,
    /// Numeric value outside the declared permitted interval
    OutOfRange,
    /// Photo evidence count under the declared minimum
    InsufficientPhotos,
    /// Signature item with no evidence reference
    MissingSignature,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_slot_matching() {
        assert!(ResponseValue::Bool(true).matches(ItemType::Boolean));
        assert!(ResponseValue::Number(7.5).matches(ItemType::Reading));
        assert!(ResponseValue::Number(7.5).matches(ItemType::Number));
        assert!(!ResponseValue::Bool(true).matches(ItemType::Text));
        assert!(!ResponseValue::Text("ok".into()).matches(ItemType::Photo));
        assert!(
            ResponseValue::EvidenceRefs(vec![EvidenceRef::new("ph-1")]).matches(ItemType::Photo)
        );
    }

    #[test]
    fn test_pending_record_has_empty_slots() {
        let record = ResponseRecord::pending(SnapshotId::new("snap-1"), 4);
        assert!(record.status.is_pending());
        assert!(record.value.is_none());
        assert!(record.answered_by.is_none());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&ResponseStatus::NonCompliant).unwrap();
        assert_eq!(json, "\"non_compliant\"");
    }
}

//! Checklist templates: versioned, ordered lists of inspection items.
//!
//! Templates are authored elsewhere (ordinary CRUD, out of scope). The
//! engine reads them exactly once, at snapshot creation. An edit that
//! changes item semantics must bump `version` rather than mutate in place,
//! so snapshots taken from earlier versions stay historically faithful.

use crate::{ChecklistError, ChecklistResult, TemplateId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Service category a template applies to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    /// Scheduled preventive maintenance
    Preventive,
    /// Corrective repair
    Corrective,
    /// Emergency response (equipment stopped, possible entrapment)
    Emergency,
    /// Client-originated call-out
    Callout,
}

/// Declared answer type of a checklist item
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    /// Yes/no verification
    Boolean,
    /// Free-text observation; submission, not content, is judged
    Text,
    /// Plain numeric measurement
    Number,
    /// Calibrated instrument reading with a unit and permitted interval
    Reading,
    /// Photographic evidence, optionally with a minimum count
    Photo,
    /// Signature evidence
    Signature,
}

impl ItemType {
    /// Base score weight for this answer type.
    ///
    /// Evidence-bearing and measured items weigh more than simple checks.
    pub fn base_weight(&self) -> u32 {
        match self {
            Self::Boolean | Self::Text => 1,
            Self::Number | Self::Reading | Self::Photo | Self::Signature => 2,
        }
    }
}

/// One inspection item inside a template
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemplateItem {
    /// Order index, unique within the template. Defines display and
    /// evaluation order and identifies the item's response record.
    pub order: u32,
    /// Section label used for grouping
    pub section: String,
    /// What the technician is asked to verify
    pub description: String,
    /// Declared answer type
    pub item_type: ItemType,
    /// Must reach a non-pending status before closure is allowed
    pub mandatory: bool,
    /// Must not be left non-compliant before closure is allowed
    pub critical: bool,
    /// Permitted interval for number/reading items, inclusive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_range: Option<(f64, f64)>,
    /// Measurement unit for reading items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Minimum photo count for photo items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_photos: Option<u32>,
    /// External norm references (informational only, e.g. ABNT clauses)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reference_tags: Vec<String>,
}

impl TemplateItem {
    pub fn new(
        order: u32,
        section: impl Into<String>,
        description: impl Into<String>,
        item_type: ItemType,
    ) -> Self {
        Self {
            order,
            section: section.into(),
            description: description.into(),
            item_type,
            mandatory: false,
            critical: false,
            allowed_range: None,
            unit: None,
            min_photos: None,
            reference_tags: Vec::new(),
        }
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.allowed_range = Some((min, max));
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_min_photos(mut self, count: u32) -> Self {
        self.min_photos = Some(count);
        self
    }

    pub fn with_reference_tag(mut self, tag: impl Into<String>) -> Self {
        self.reference_tags.push(tag.into());
        self
    }

    /// Score weight: base weight for the answer type, +2 when critical.
    pub fn weight(&self) -> u32 {
        let base = self.item_type.base_weight();
        if self.critical {
            base + 2
        } else {
            base
        }
    }
}

/// A versioned checklist template
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChecklistTemplate {
    /// Unique template identifier
    pub id: TemplateId,
    /// Human-readable template name
    pub name: String,
    /// Service category this template applies to
    pub service_kind: ServiceKind,
    /// Inspection items, unique by `order`
    pub items: Vec<TemplateItem>,
    /// Version number, bumped on every semantic edit
    pub version: u32,
    /// Inactive templates are invisible to snapshot creation
    pub active: bool,
    /// When this template was created
    pub created_at: DateTime<Utc>,
    /// When this template was last edited
    pub updated_at: DateTime<Utc>,
}

impl ChecklistTemplate {
    pub fn new(name: impl Into<String>, service_kind: ServiceKind) -> Self {
        let now = Utc::now();
        Self {
            id: TemplateId::generate(),
            name: name.into(),
            service_kind,
            items: Vec::new(),
            version: 1,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: TemplateId) -> Self {
        self.id = id;
        self
    }

    /// Add an item. Fails if the order index is already taken.
    pub fn add_item(&mut self, item: TemplateItem) -> ChecklistResult<()> {
        if self.items.iter().any(|i| i.order == item.order) {
            return Err(ChecklistError::DuplicateItemOrder(item.order));
        }
        self.items.push(item);
        self.items.sort_by_key(|i| i.order);
        Ok(())
    }

    /// Look up an item by order index
    pub fn item(&self, order: u32) -> Option<&TemplateItem> {
        self.items.iter().find(|i| i.order == order)
    }

    /// Record a semantic edit: bump the version, never mutate in place.
    pub fn bump_version(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }

    /// Retire this template. Existing snapshots are unaffected.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.updated_at = Utc::now();
    }
}

//! Domain types for the checklist compliance & work-order closure engine.
//!
//! A work order carries an immutable **snapshot** of a versioned inspection
//! template. Technicians answer snapshot items with typed responses; the
//! engine scores the response set and decides whether the work order may
//! transition toward closure.
//!
//! # Key Concepts
//!
//! - **ChecklistTemplate**: a versioned, ordered list of inspection items.
//!   Edits that change item semantics bump the version, never mutate history.
//! - **ChecklistSnapshot**: a by-value copy of a template frozen onto one
//!   work order at creation time. Later template edits never alter it.
//! - **ResponseRecord**: one per snapshot item, created pending, holding a
//!   value slot matching the item's declared type.
//! - **ComplianceScore**: derived counts-by-status plus a percentage over
//!   applicable items.
//! - **ClosureDecision**: the closure gate's structured verdict — the full
//!   list of blocking reasons and warnings, returned as data, never thrown.
//!
//! # Design Principles
//!
//! 1. Hard errors reject malformed requests outright; business conditions
//!    (constraint violations, blocked closure) travel on the Ok path.
//! 2. Snapshots own their item data. No live reference to the template.
//! 3. Value slots are a tagged sum type checked at the validator boundary.

#![deny(unsafe_code)]

mod closure;
mod errors;
mod ids;
mod response;
mod score;
mod snapshot;
mod template;
mod workorder;

pub use closure::*;
pub use errors::*;
pub use ids::*;
pub use response::*;
pub use score::*;
pub use snapshot::*;
pub use template::*;
pub use workorder::*;

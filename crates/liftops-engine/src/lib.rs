//! Checklist compliance & work-order closure engine.
//!
//! The engine decides, for a versioned inspection template frozen onto a
//! work order, whether every required item has been satisfactorily
//! answered, what score the response set represents, and whether the work
//! order may transition toward closure. It is UI-agnostic: web, mobile and
//! offline sync all evaluate the same rules.
//!
//! # Operations
//!
//! - [`ChecklistEngine::create_snapshot`]: freeze the active template
//!   version onto a work order and pre-create one pending response per item.
//! - [`ChecklistEngine::set_response`]: validate and persist one answer;
//!   constraint failures clamp the status and surface as warnings.
//! - [`ChecklistEngine::get_score`]: pure aggregate of the response set.
//! - [`ChecklistEngine::request_close`]: evaluate the closure gate and
//!   commit the transition when nothing blocks.
//!
//! # Design Principles
//!
//! 1. Hard errors reject the call with no partial write; business
//!    conditions travel as data on the Ok path.
//! 2. Scoring and gate evaluation are pure functions over a snapshot and
//!    its responses — same input, same verdict, no caching to invalidate.
//! 3. The engine holds no state between calls; persistence sits behind the
//!    repository traits of `liftops-store`.

#![deny(unsafe_code)]

mod engine;
mod gate;
mod lifecycle;
mod score;
mod validate;

pub use engine::ChecklistEngine;
pub use gate::evaluate_closure;
pub use lifecycle::next_status;
pub use score::score;
pub use validate::{check_value_slot, validate_response, ValidationOutcome};

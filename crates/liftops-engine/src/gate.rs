//! Closure gate: the rules deciding whether a work order may close.
//!
//! Pure evaluation, no side effects. The blocking rule set is
//! deliberately conservative: a mandatory item left pending blocks, and a
//! critical item verified non-compliant blocks. A mandatory item that was
//! answered non-compliant does not by itself block — the finding is
//! recorded and scored, but only critical items can veto closure on
//! content. Optional items left pending warn and never block.

use liftops_types::{
    BlockKind, BlockingReason, ChecklistSnapshot, ClosureWarning, ResponseRecord, ResponseStatus,
};
use std::collections::HashMap;

/// Evaluate the closure gate over one snapshot's response set.
///
/// Returns every blocking reason and every warning in item order, so the
/// caller can present all of them at once.
pub fn evaluate_closure(
    snapshot: &ChecklistSnapshot,
    responses: &[ResponseRecord],
) -> (Vec<BlockingReason>, Vec<ClosureWarning>) {
    let by_order: HashMap<u32, ResponseStatus> = responses
        .iter()
        .map(|r| (r.item_order, r.status))
        .collect();

    let mut blockers = Vec::new();
    let mut warnings = Vec::new();

    for item in &snapshot.items {
        let status = by_order
            .get(&item.order)
            .copied()
            .unwrap_or(ResponseStatus::Pending);

        if item.mandatory && status == ResponseStatus::Pending {
            blockers.push(BlockingReason {
                item_order: item.order,
                section: item.section.clone(),
                description: item.description.clone(),
                kind: BlockKind::MandatoryPending,
            });
        }

        if item.critical && status == ResponseStatus::NonCompliant {
            blockers.push(BlockingReason {
                item_order: item.order,
                section: item.section.clone(),
                description: item.description.clone(),
                kind: BlockKind::CriticalNonCompliant,
            });
        }

        if !item.mandatory && status == ResponseStatus::Pending {
            warnings.push(ClosureWarning {
                item_order: item.order,
                description: item.description.clone(),
            });
        }
    }

    (blockers, warnings)
}

//! Compliance scorer: a pure aggregate over one snapshot's responses.
//!
//! Deterministic and side-effect-free — the same input always yields the
//! same score, so it is safe to re-evaluate on every read with no caching
//! invalidation concerns.

use liftops_types::{
    percentage_of, ChecklistSnapshot, ComplianceScore, ResponseRecord, ResponseStatus,
    StatusCounts,
};
use std::collections::HashMap;

/// Score a snapshot's response set. O(n) in item count.
///
/// Items without a matching record count as pending; snapshot creation
/// makes that unreachable, but offline sync is not trusted to preserve it.
pub fn score(snapshot: &ChecklistSnapshot, responses: &[ResponseRecord]) -> ComplianceScore {
    let by_order: HashMap<u32, ResponseStatus> = responses
        .iter()
        .map(|r| (r.item_order, r.status))
        .collect();

    let mut counts = StatusCounts::default();
    let mut weighted_total = 0_u32;
    let mut weighted_compliant = 0_u32;
    let mut critical_open = 0_u32;

    for item in &snapshot.items {
        let status = by_order
            .get(&item.order)
            .copied()
            .unwrap_or(ResponseStatus::Pending);
        counts.tally(status);

        let weight = item.weight();
        weighted_total += weight;
        // Not-applicable items never drag the weighted score down
        if matches!(
            status,
            ResponseStatus::Compliant | ResponseStatus::NotApplicable
        ) {
            weighted_compliant += weight;
        }

        if item.critical
            && matches!(
                status,
                ResponseStatus::Pending | ResponseStatus::NonCompliant
            )
        {
            critical_open += 1;
        }
    }

    let total = snapshot.items.len() as u32;
    let applicable = total - counts.not_applicable;

    ComplianceScore {
        total,
        counts,
        percentage: percentage_of(counts.compliant, applicable),
        weighted_total,
        weighted_compliant,
        weighted_percentage: percentage_of(weighted_compliant, weighted_total),
        critical_open,
        open_items: counts.pending,
    }
}

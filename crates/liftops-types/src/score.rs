//! Compliance score: derived, never persisted.
//!
//! The percentage counts compliant items over applicable ones (total minus
//! not-applicable). A weighted tally rides along for reporting: evidence
//! and measurement items weigh more, critical items more still, and
//! not-applicable items count toward the conforming weight so they never
//! drag a score down.

use serde::{Deserialize, Serialize};

use crate::ResponseStatus;

/// Item counts per response status
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: u32,
    pub compliant: u32,
    pub non_compliant: u32,
    pub not_applicable: u32,
}

impl StatusCounts {
    pub fn tally(&mut self, status: ResponseStatus) {
        match status {
            ResponseStatus::Pending => self.pending += 1,
            ResponseStatus::Compliant => self.compliant += 1,
            ResponseStatus::NonCompliant => self.non_compliant += 1,
            ResponseStatus::NotApplicable => self.not_applicable += 1,
        }
    }
}

/// Aggregate compliance of one snapshot's response set
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceScore {
    /// Total item count in the snapshot
    pub total: u32,
    /// Counts per status
    pub counts: StatusCounts,
    /// compliant / (total - not_applicable), rounded to nearest integer;
    /// 100 when the denominator is zero
    pub percentage: u8,
    /// Sum of item weights
    pub weighted_total: u32,
    /// Weight counted as conforming (compliant + not-applicable items)
    pub weighted_compliant: u32,
    /// Weighted counterpart of `percentage`, same zero-denominator rule
    pub weighted_percentage: u8,
    /// Critical items still pending or non-compliant
    pub critical_open: u32,
    /// Items still pending
    pub open_items: u32,
}

impl ComplianceScore {
    /// Every applicable item marked compliant
    pub fn is_fully_compliant(&self) -> bool {
        self.percentage == 100
    }

    /// Nothing left pending
    pub fn is_fully_answered(&self) -> bool {
        self.counts.pending == 0
    }
}

/// Rounded percentage with the zero-denominator rule: an empty or fully
/// not-applicable set is trivially 100% compliant.
pub fn percentage_of(numerator: u32, denominator: u32) -> u8 {
    if denominator == 0 {
        return 100;
    }
    (((numerator as f64) / (denominator as f64) * 100.0).round()) as u8
}

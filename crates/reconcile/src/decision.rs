//! Terminal per-item outcomes of reconciliation.

use serde::Serialize;

use pricesync_catalog::CatalogEntry;
use pricesync_core::Money;
use pricesync_matching::MatchCandidate;

/// Why an item needs a human decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewReason {
    /// Best candidate is reviewable but below the auto-apply threshold.
    LowConfidence,
    /// The top two candidates are too close to pick one.
    Ambiguous,
    /// Confident match, but the item is priced in another currency.
    CurrencyMismatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    NoMatch,
    BelowThreshold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    AutoApplied,
    PendingReview,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconciliationDecision {
    /// The item was matched with confidence; the catalog price was brought in
    /// line with it unless it already was (`price_changed == false`) or the run
    /// is a dry run (`applied == false`).
    AutoApplied {
        /// Matched entry carrying its price after the decision.
        entry: CatalogEntry,
        old_price: Money,
        new_price: Money,
        confidence: f64,
        price_changed: bool,
        applied: bool,
    },
    /// Needs an operator. No catalog price was touched.
    PendingReview {
        reason: ReviewReason,
        /// Every candidate at or above the review threshold, best first.
        candidates: Vec<MatchCandidate>,
        confidence: f64,
        proposed_price: Money,
    },
    Rejected {
        reason: RejectReason,
        best_confidence: Option<f64>,
    },
}

impl ReconciliationDecision {
    pub fn kind(&self) -> DecisionKind {
        match self {
            Self::AutoApplied { .. } => DecisionKind::AutoApplied,
            Self::PendingReview { .. } => DecisionKind::PendingReview,
            Self::Rejected { .. } => DecisionKind::Rejected,
        }
    }

    pub fn is_auto_applied(&self) -> bool {
        matches!(self, Self::AutoApplied { .. })
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::PendingReview { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// Confidence of the best candidate, if there was one.
    pub fn confidence(&self) -> Option<f64> {
        match self {
            Self::AutoApplied { confidence, .. } | Self::PendingReview { confidence, .. } => {
                Some(*confidence)
            }
            Self::Rejected { best_confidence, .. } => *best_confidence,
        }
    }

    /// True when the catalog price was written.
    pub fn mutated_catalog(&self) -> bool {
        matches!(self, Self::AutoApplied { applied: true, .. })
    }
}

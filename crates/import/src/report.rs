//! Aggregate result of one import run.

use chrono::{DateTime, Utc};
use serde::Serialize;

use pricesync_catalog::PriceListItem;
use pricesync_core::{BatchId, CatalogId, Money, RowError};
use pricesync_reconcile::{DecisionKind, ReconciliationDecision};

/// A decision together with the row that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionRecord {
    pub row: usize,
    pub item: PriceListItem,
    pub decision: ReconciliationDecision,
}

/// A catalog price that an `AutoApplied` decision changed (or would change,
/// in a dry run).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceChange {
    pub row: usize,
    pub entry: CatalogId,
    pub old: Money,
    pub new: Money,
    pub applied: bool,
}

/// Terminal result of one dispatched row.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ItemOutcome {
    Decided(DecisionRecord),
    Failed(RowError),
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub batch_id: BatchId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// The run was cancelled; counters cover the dispatched rows only.
    pub cancelled: bool,
    pub dry_run: bool,

    /// Rows dispatched.
    pub total: usize,
    pub auto_applied: usize,
    /// `AutoApplied` rows whose price was already current.
    pub unchanged: usize,
    pub pending: usize,
    pub rejected: usize,
    pub errors: usize,

    pub row_errors: Vec<RowError>,
    /// `PendingReview` and `Rejected` decisions in row order.
    pub decisions: Vec<DecisionRecord>,
    pub price_changes: Vec<PriceChange>,
}

impl ImportReport {
    /// Fold per-row outcomes into counters. Outcomes must be in row order.
    pub(crate) fn tally(
        batch_id: BatchId,
        started_at: DateTime<Utc>,
        dry_run: bool,
        cancelled: bool,
        outcomes: Vec<ItemOutcome>,
    ) -> Self {
        let mut report = Self {
            batch_id,
            started_at,
            finished_at: started_at,
            cancelled,
            dry_run,
            total: 0,
            auto_applied: 0,
            unchanged: 0,
            pending: 0,
            rejected: 0,
            errors: 0,
            row_errors: Vec::new(),
            decisions: Vec::new(),
            price_changes: Vec::new(),
        };

        for outcome in outcomes {
            report.total += 1;
            match outcome {
                ItemOutcome::Failed(err) => {
                    report.errors += 1;
                    report.row_errors.push(err);
                }
                ItemOutcome::Decided(record) => report.record(record),
            }
        }

        report.finished_at = Utc::now();
        report
    }

    fn record(&mut self, record: DecisionRecord) {
        match &record.decision {
            ReconciliationDecision::AutoApplied {
                entry,
                old_price,
                new_price,
                price_changed,
                applied,
                ..
            } => {
                self.auto_applied += 1;
                if *price_changed {
                    self.price_changes.push(PriceChange {
                        row: record.row,
                        entry: entry.id_typed(),
                        old: old_price.clone(),
                        new: new_price.clone(),
                        applied: *applied,
                    });
                } else {
                    self.unchanged += 1;
                }
            }
            ReconciliationDecision::PendingReview { .. } => {
                self.pending += 1;
                self.decisions.push(record);
            }
            ReconciliationDecision::Rejected { .. } => {
                self.rejected += 1;
                self.decisions.push(record);
            }
        }
    }

    pub fn pending_items(&self) -> impl Iterator<Item = &DecisionRecord> {
        self.decisions_of(DecisionKind::PendingReview)
    }

    pub fn rejected_items(&self) -> impl Iterator<Item = &DecisionRecord> {
        self.decisions_of(DecisionKind::Rejected)
    }

    fn decisions_of(&self, kind: DecisionKind) -> impl Iterator<Item = &DecisionRecord> {
        self.decisions.iter().filter(move |r| r.decision.kind() == kind)
    }

    /// Every dispatched row ended in exactly one bucket.
    pub fn is_balanced(&self) -> bool {
        self.auto_applied + self.pending + self.rejected + self.errors == self.total
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

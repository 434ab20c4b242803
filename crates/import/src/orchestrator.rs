//! Batch driver: normalize, match and reconcile a stream of raw rows.
//!
//! Rows are pulled lazily in chunks. Within a chunk, normalization and
//! matching run on a rayon pool; reconciliation then runs on the calling
//! thread in row order, so price writes and the report do not depend on how
//! the pool scheduled the match work.

use chrono::Utc;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use pricesync_catalog::{PriceListItem, RawPriceRow};
use pricesync_core::{BatchId, Currency, EngineError, EngineResult, RowError};
use pricesync_matching::{CandidateIndex, MatchCandidate, Matcher, NormalizedItem};
use pricesync_reconcile::Reconciler;

use crate::cancel::CancellationToken;
use crate::config::ImportPolicy;
use crate::report::{DecisionRecord, ImportReport, ItemOutcome};

/// Rows pulled from the source per worker and chunk.
const ROWS_PER_WORKER: usize = 64;

/// Result of the parallel phase for one row.
enum Prepared {
    Matched {
        item: PriceListItem,
        candidates: Vec<MatchCandidate>,
    },
    Failed(RowError),
}

pub(crate) fn run<I>(
    rows: I,
    index: &CandidateIndex,
    policy: &ImportPolicy,
    cancel: &CancellationToken,
) -> EngineResult<ImportReport>
where
    I: IntoIterator<Item = RawPriceRow>,
{
    policy.validate()?;
    if index.is_empty() {
        return Err(EngineError::index_unavailable("catalog snapshot is empty"));
    }

    let workers = policy.worker_count();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("pricesync-match-{i}"))
        .build()
        .map_err(|e| EngineError::config(format!("failed to start worker pool: {e}")))?;

    let batch_id = BatchId::new();
    let started_at = Utc::now();
    let dry_run = !policy.import.update_existing_prices;
    let matcher = Matcher::new(policy.matching.clone());
    let reconciler = Reconciler::new(policy.reconcile.clone()).with_commit(!dry_run);
    let default_currency = &policy.import.default_currency;

    info!(
        batch = %batch_id,
        workers,
        entries = index.len(),
        dry_run,
        "import started"
    );

    let chunk_size = workers * ROWS_PER_WORKER;
    let mut rows = rows.into_iter();
    let mut outcomes: Vec<ItemOutcome> = Vec::new();
    let mut cancelled = false;

    while !cancelled {
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }

        let chunk: Vec<RawPriceRow> = rows.by_ref().take(chunk_size).collect();
        if chunk.is_empty() {
            break;
        }

        let prepared: Vec<Option<Prepared>> = pool.install(|| {
            chunk
                .into_par_iter()
                .map(|raw| {
                    if cancel.is_cancelled() {
                        return None;
                    }
                    Some(prepare(raw, index, &matcher, default_currency))
                })
                .collect()
        });

        for slot in prepared {
            let Some(prepared) = slot else {
                cancelled = true;
                continue;
            };
            outcomes.push(settle(batch_id, prepared, index, &reconciler));
        }
    }

    if cancelled {
        warn!(batch = %batch_id, dispatched = outcomes.len(), "import cancelled");
    }

    let report = ImportReport::tally(batch_id, started_at, dry_run, cancelled, outcomes);
    info!(
        batch = %batch_id,
        total = report.total,
        auto_applied = report.auto_applied,
        unchanged = report.unchanged,
        pending = report.pending,
        rejected = report.rejected,
        errors = report.errors,
        cancelled,
        "import finished"
    );
    Ok(report)
}

/// Normalize and match one row.
fn prepare(
    raw: RawPriceRow,
    index: &CandidateIndex,
    matcher: &Matcher,
    default_currency: &Currency,
) -> Prepared {
    let normalized = match NormalizedItem::from_raw(&raw, default_currency) {
        Ok(normalized) => normalized,
        Err(err) => return Prepared::Failed(err),
    };

    let candidates = matcher.match_normalized(index, &normalized);
    Prepared::Matched {
        item: normalized.into_item(),
        candidates,
    }
}

fn settle(
    batch_id: BatchId,
    prepared: Prepared,
    index: &CandidateIndex,
    reconciler: &Reconciler,
) -> ItemOutcome {
    match prepared {
        Prepared::Failed(err) => {
            warn!(batch = %batch_id, row = err.row, kind = ?err.kind, error = %err, "row skipped");
            ItemOutcome::Failed(err)
        }
        Prepared::Matched { item, candidates } => {
            let decision = reconciler.reconcile(&item, candidates, index.catalog());
            debug!(
                batch = %batch_id,
                row = item.row,
                decision = ?decision.kind(),
                confidence = ?decision.confidence(),
                "row reconciled"
            );
            ItemOutcome::Decided(DecisionRecord {
                row: item.row,
                item,
                decision,
            })
        }
    }
}

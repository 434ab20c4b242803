//! Price-list import.
//!
//! Entry points for reconciling a supplier price list against a catalog
//! snapshot:
//!
//! - [`build_index`] turns a catalog snapshot into a [`CandidateIndex`]
//! - [`import_batch`] drives raw rows through normalize → match → reconcile
//!   and returns an [`ImportReport`]
//! - [`validate_rows`] checks rows up front without touching the catalog
//!
//! One bad row never aborts a batch: it is recorded in the report and the
//! run continues. Only an unusable snapshot or configuration is an `Err`.

pub mod cancel;
pub mod config;
pub mod orchestrator;
pub mod report;
pub mod validation;

pub use cancel::CancellationToken;
pub use config::{ImportOptions, ImportPolicy};
pub use pricesync_matching::{CandidateIndex, build_index};
pub use report::{DecisionRecord, ImportReport, PriceChange};
pub use validation::{IssueKind, ValidationIssue, ValidationReport, validate_rows};

use pricesync_catalog::{RawPriceRow, SupplierProfile};
use pricesync_core::EngineResult;

/// Reconcile `rows` against `index`.
///
/// `rows` is consumed lazily. Prices of confidently matched entries are
/// updated inside `index`'s catalog unless `policy` asks for a dry run.
pub fn import_batch(
    rows: impl IntoIterator<Item = RawPriceRow>,
    index: &CandidateIndex,
    policy: &ImportPolicy,
) -> EngineResult<ImportReport> {
    import_batch_with_cancel(rows, index, policy, &CancellationToken::new())
}

/// [`import_batch`] that stops dispatching rows once `cancel` fires and
/// returns the partial report (`cancelled == true`).
pub fn import_batch_with_cancel(
    rows: impl IntoIterator<Item = RawPriceRow>,
    index: &CandidateIndex,
    policy: &ImportPolicy,
    cancel: &CancellationToken,
) -> EngineResult<ImportReport> {
    orchestrator::run(rows, index, policy, cancel)
}

/// Import header-keyed records laid out as `profile` describes. Rows are
/// numbered from 1; the supplier's default currency takes precedence over
/// the policy's.
pub fn import_supplier_batch<R, K, V>(
    profile: &SupplierProfile,
    records: impl IntoIterator<Item = R>,
    index: &CandidateIndex,
    policy: &ImportPolicy,
) -> EngineResult<ImportReport>
where
    R: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    profile.validate()?;

    let mut policy = policy.clone();
    if let Some(currency) = &profile.default_currency {
        policy.import.default_currency = currency.clone();
    }

    let rows = records
        .into_iter()
        .enumerate()
        .map(|(i, record)| profile.map_row(i + 1, record));
    import_batch(rows, index, &policy)
}

use tracing::{debug, warn};

use pricesync_catalog::{Catalog, PriceListItem};
use pricesync_core::{CatalogId, EngineError, EngineResult};
use pricesync_matching::{MatchCandidate, rank_candidates};

use crate::decision::{ReconciliationDecision, RejectReason, ReviewReason};
use crate::policy::ReconcilePolicy;

/// Absorbs float noise when comparing a confidence gap against the band.
const BAND_TOLERANCE: f64 = 1e-9;

/// Applies a [`ReconcilePolicy`] to ranked candidates.
#[derive(Debug, Clone)]
pub struct Reconciler {
    policy: ReconcilePolicy,
    commit: bool,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(ReconcilePolicy::default())
    }
}

impl Reconciler {
    pub fn new(policy: ReconcilePolicy) -> Self {
        Self { policy, commit: true }
    }

    /// When `false`, confident matches are reported as `AutoApplied` with
    /// `applied == false` and the catalog is left untouched.
    pub fn with_commit(mut self, commit: bool) -> Self {
        self.commit = commit;
        self
    }

    pub fn policy(&self) -> &ReconcilePolicy {
        &self.policy
    }

    pub fn commits(&self) -> bool {
        self.commit
    }

    /// Decide the fate of `item`.
    ///
    /// Only an `AutoApplied` outcome writes to `catalog`, and it does so under
    /// the matched entry's lock.
    pub fn reconcile(
        &self,
        item: &PriceListItem,
        mut candidates: Vec<MatchCandidate>,
        catalog: &Catalog,
    ) -> ReconciliationDecision {
        rank_candidates(&mut candidates);

        let Some(top) = candidates.first() else {
            debug!(row = item.row, "no candidates");
            return ReconciliationDecision::Rejected {
                reason: RejectReason::NoMatch,
                best_confidence: None,
            };
        };
        let confidence = top.confidence;

        if confidence < self.policy.review_min {
            debug!(row = item.row, confidence, "best candidate below review threshold");
            return ReconciliationDecision::Rejected {
                reason: RejectReason::BelowThreshold,
                best_confidence: Some(confidence),
            };
        }

        let ambiguous = candidates.get(1).is_some_and(|runner_up| {
            runner_up.confidence >= self.policy.review_min
                && confidence - runner_up.confidence <= self.policy.ambiguity_band + BAND_TOLERANCE
        });

        if ambiguous {
            return self.pending(item, ReviewReason::Ambiguous, candidates, catalog);
        }
        if confidence < self.policy.auto_apply_min {
            return self.pending(item, ReviewReason::LowConfidence, candidates, catalog);
        }

        let id = top.entry.id_typed();
        let epsilon = self.policy.epsilon_for(&item.price.currency);
        match catalog.apply_price(id, &item.price, epsilon, self.commit) {
            Ok(update) => {
                debug!(
                    row = item.row,
                    entry = %id,
                    confidence,
                    old = %update.old,
                    new = %update.new,
                    applied = update.applied,
                    "auto-applied"
                );
                let entry = catalog.get(id).unwrap_or_else(|| top.entry.clone());
                ReconciliationDecision::AutoApplied {
                    entry,
                    old_price: update.old,
                    new_price: update.new,
                    confidence,
                    price_changed: update.changed,
                    applied: update.applied,
                }
            }
            Err(EngineError::NotFound) => {
                warn!(row = item.row, entry = %id, "candidate is not part of the catalog snapshot");
                ReconciliationDecision::Rejected {
                    reason: RejectReason::NoMatch,
                    best_confidence: Some(confidence),
                }
            }
            Err(err) => {
                debug!(row = item.row, entry = %id, error = %err, "price not applicable");
                self.pending(item, ReviewReason::CurrencyMismatch, candidates, catalog)
            }
        }
    }

    /// Candidates are re-read from `catalog` so reviewers see prices written
    /// by earlier rows of the batch.
    fn pending(
        &self,
        item: &PriceListItem,
        reason: ReviewReason,
        mut candidates: Vec<MatchCandidate>,
        catalog: &Catalog,
    ) -> ReconciliationDecision {
        candidates.retain(|c| c.confidence >= self.policy.review_min);
        for candidate in &mut candidates {
            if let Some(entry) = catalog.get(candidate.entry.id_typed()) {
                candidate.entry = entry;
            }
        }
        let confidence = candidates.first().map_or(0.0, |c| c.confidence);
        debug!(row = item.row, ?reason, confidence, candidates = candidates.len(), "pending review");
        ReconciliationDecision::PendingReview {
            reason,
            candidates,
            confidence,
            proposed_price: item.price.clone(),
        }
    }
}

/// Write the item's price to entry `id` when it differs by more than
/// `epsilon`. Returns whether the price changed.
pub fn update_price(
    catalog: &Catalog,
    id: CatalogId,
    item: &PriceListItem,
    epsilon: f64,
) -> EngineResult<bool> {
    let update = catalog.apply_price(id, &item.price, epsilon, true)?;
    Ok(update.changed)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::decision::DecisionKind;
    use pricesync_catalog::CatalogEntry;
    use pricesync_core::{Currency, Money};
    use pricesync_matching::MatchField;

    fn rub(amount: f64) -> Money {
        Money::new(amount, Currency::parse("RUB").unwrap())
    }

    fn war_and_peace() -> CatalogEntry {
        CatalogEntry::new(CatalogId::new(42), "War and Peace", rub(750.0)).with_isbn("9785699123456")
    }

    fn catalog() -> Catalog {
        Catalog::from_entries(vec![
            war_and_peace(),
            CatalogEntry::new(CatalogId::new(43), "The Master and Margarita", rub(580.0)),
            CatalogEntry::new(CatalogId::new(44), "The Master and Margarita", rub(620.0)),
        ])
        .unwrap()
    }

    fn candidate(catalog: &Catalog, id: u64, confidence: f64) -> MatchCandidate {
        MatchCandidate {
            entry: catalog.get(CatalogId::new(id)).unwrap(),
            confidence,
            matched_fields: BTreeSet::from([MatchField::Title]),
        }
    }

    fn item(price: f64) -> PriceListItem {
        PriceListItem::new(1, "War and Peace", rub(price)).with_isbn("9785699123456")
    }

    #[test]
    fn isbn_match_applies_new_price() {
        let catalog = catalog();
        let candidates = vec![candidate(&catalog, 42, 1.0)];

        let decision = Reconciler::default().reconcile(&item(850.0), candidates, &catalog);
        match &decision {
            ReconciliationDecision::AutoApplied {
                entry,
                old_price,
                new_price,
                confidence,
                price_changed,
                applied,
            } => {
                assert_eq!(entry.id_typed().get(), 42);
                assert_eq!(entry.price().amount, 850.0);
                assert_eq!(old_price.amount, 750.0);
                assert_eq!(new_price.amount, 850.0);
                assert_eq!(*confidence, 1.0);
                assert!(price_changed);
                assert!(applied);
            }
            other => panic!("unexpected decision {other:?}"),
        }
        assert!(decision.mutated_catalog());
        assert_eq!(catalog.current_price(CatalogId::new(42)).unwrap().amount, 850.0);
    }

    #[test]
    fn price_within_epsilon_is_unchanged() {
        let catalog = catalog();
        let decision =
            Reconciler::default().reconcile(&item(750.005), vec![candidate(&catalog, 42, 1.0)], &catalog);

        assert!(matches!(
            decision,
            ReconciliationDecision::AutoApplied {
                price_changed: false,
                applied: false,
                ..
            }
        ));
        assert_eq!(catalog.current_price(CatalogId::new(42)).unwrap().amount, 750.0);
    }

    #[test]
    fn dry_run_reports_without_mutating() {
        let catalog = catalog();
        let reconciler = Reconciler::default().with_commit(false);
        let decision = reconciler.reconcile(&item(850.0), vec![candidate(&catalog, 42, 1.0)], &catalog);

        assert!(matches!(
            decision,
            ReconciliationDecision::AutoApplied {
                price_changed: true,
                applied: false,
                ..
            }
        ));
        assert_eq!(catalog.current_price(CatalogId::new(42)).unwrap().amount, 750.0);
    }

    #[test]
    fn close_runner_up_is_ambiguous_even_above_auto_apply() {
        let catalog = catalog();
        let margarita = PriceListItem::new(1, "The Master and Margarita", rub(600.0));
        let candidates = vec![candidate(&catalog, 44, 0.90), candidate(&catalog, 43, 0.95)];

        let decision = Reconciler::default().reconcile(&margarita, candidates, &catalog);
        match &decision {
            ReconciliationDecision::PendingReview {
                reason,
                candidates,
                confidence,
                proposed_price,
            } => {
                assert_eq!(*reason, ReviewReason::Ambiguous);
                let ids: Vec<u64> = candidates.iter().map(|c| c.entry.id_typed().get()).collect();
                assert_eq!(ids, vec![43, 44]);
                assert_eq!(*confidence, 0.95);
                assert_eq!(proposed_price.amount, 600.0);
            }
            other => panic!("unexpected decision {other:?}"),
        }
        assert_eq!(catalog.current_price(CatalogId::new(43)).unwrap().amount, 580.0);
        assert_eq!(catalog.current_price(CatalogId::new(44)).unwrap().amount, 620.0);
    }

    #[test]
    fn clear_winner_above_auto_apply_is_applied() {
        let catalog = catalog();
        let margarita = PriceListItem::new(1, "The Master and Margarita", rub(600.0));
        let candidates = vec![candidate(&catalog, 43, 0.97), candidate(&catalog, 44, 0.6)];

        let decision = Reconciler::default().reconcile(&margarita, candidates, &catalog);
        assert_eq!(decision.kind(), DecisionKind::AutoApplied);
        assert_eq!(catalog.current_price(CatalogId::new(43)).unwrap().amount, 600.0);
    }

    #[test]
    fn reviewable_confidence_is_pending_and_drops_weak_candidates() {
        let catalog = catalog();
        let candidates = vec![candidate(&catalog, 42, 0.7), candidate(&catalog, 43, 0.4)];

        let decision = Reconciler::default().reconcile(&item(850.0), candidates, &catalog);
        match &decision {
            ReconciliationDecision::PendingReview { reason, candidates, .. } => {
                assert_eq!(*reason, ReviewReason::LowConfidence);
                assert_eq!(candidates.len(), 1);
            }
            other => panic!("unexpected decision {other:?}"),
        }
        assert_eq!(catalog.current_price(CatalogId::new(42)).unwrap().amount, 750.0);
    }

    #[test]
    fn pending_candidates_show_current_catalog_price() {
        let catalog = catalog();
        let margarita = PriceListItem::new(2, "The Master and Margarita", rub(600.0));
        let candidates = vec![candidate(&catalog, 43, 0.95), candidate(&catalog, 44, 0.90)];
        let earlier = PriceListItem::new(1, "The Master and Margarita", rub(640.0));
        assert!(update_price(&catalog, CatalogId::new(43), &earlier, 0.01).unwrap());

        let decision = Reconciler::default().reconcile(&margarita, candidates, &catalog);
        match &decision {
            ReconciliationDecision::PendingReview { candidates, .. } => {
                assert_eq!(candidates[0].entry.id_typed().get(), 43);
                assert_eq!(candidates[0].entry.price().amount, 640.0);
                assert_eq!(candidates[1].entry.price().amount, 620.0);
            }
            other => panic!("unexpected decision {other:?}"),
        }
    }

    #[test]
    fn rejections() {
        let catalog = catalog();
        let reconciler = Reconciler::default();

        let none = reconciler.reconcile(&item(850.0), Vec::new(), &catalog);
        assert_eq!(
            none,
            ReconciliationDecision::Rejected {
                reason: RejectReason::NoMatch,
                best_confidence: None,
            }
        );

        let weak = reconciler.reconcile(&item(850.0), vec![candidate(&catalog, 42, 0.3)], &catalog);
        assert_eq!(
            weak,
            ReconciliationDecision::Rejected {
                reason: RejectReason::BelowThreshold,
                best_confidence: Some(0.3),
            }
        );
        assert_eq!(catalog.current_price(CatalogId::new(42)).unwrap().amount, 750.0);
    }

    #[test]
    fn foreign_currency_goes_to_review() {
        let catalog = catalog();
        let usd = PriceListItem::new(1, "War and Peace", Money::new(12.0, Currency::parse("USD").unwrap()));

        let decision = Reconciler::default().reconcile(&usd, vec![candidate(&catalog, 42, 1.0)], &catalog);
        assert!(matches!(
            decision,
            ReconciliationDecision::PendingReview {
                reason: ReviewReason::CurrencyMismatch,
                ..
            }
        ));
        assert_eq!(catalog.current_price(CatalogId::new(42)).unwrap().amount, 750.0);
    }

    #[test]
    fn update_price_reports_change() {
        let catalog = catalog();
        assert!(update_price(&catalog, CatalogId::new(42), &item(850.0), 0.01).unwrap());
        assert!(!update_price(&catalog, CatalogId::new(42), &item(850.0), 0.01).unwrap());
        assert!(update_price(&catalog, CatalogId::new(99), &item(850.0), 0.01).is_err());
    }

    #[test]
    fn decisions_serialize_with_kind_tag() {
        let decision = ReconciliationDecision::Rejected {
            reason: RejectReason::NoMatch,
            best_confidence: None,
        };
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["kind"], "rejected");
        assert_eq!(json["reason"], "no_match");
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 300,
                ..ProptestConfig::default()
            })]

            /// Property: only AutoApplied decisions ever change a catalog price.
            #[test]
            fn only_auto_applied_mutates(
                first in 0.0f64..=1.0,
                second in proptest::option::of(0.0f64..=1.0),
                price in 1.0f64..2000.0,
            ) {
                let catalog = catalog();
                let mut candidates = vec![candidate(&catalog, 43, first)];
                if let Some(second) = second {
                    candidates.push(candidate(&catalog, 44, second));
                }
                let margarita = PriceListItem::new(1, "The Master and Margarita", rub(price));

                let decision = Reconciler::default().reconcile(&margarita, candidates, &catalog);
                let before = [580.0, 620.0];
                let after = [
                    catalog.current_price(CatalogId::new(43)).unwrap().amount,
                    catalog.current_price(CatalogId::new(44)).unwrap().amount,
                ];
                if decision.mutated_catalog() {
                    prop_assert!(decision.is_auto_applied());
                    prop_assert_ne!(before, after);
                } else {
                    prop_assert_eq!(before, after);
                }
            }
        }
    }
}

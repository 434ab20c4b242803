//! Arena-backed catalog snapshot with per-entry price cells.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use tracing::debug;

use pricesync_core::{CatalogId, EngineError, EngineResult, Money};

use crate::entry::CatalogEntry;

/// Outcome of a price application against one catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceUpdate {
    pub old: Money,
    pub new: Money,
    /// The new price differs from the old one by more than epsilon.
    pub changed: bool,
    /// The catalog price was actually written (`changed` and not a dry run).
    pub applied: bool,
}

/// Catalog snapshot stored as an arena ordered by ascending [`CatalogId`].
///
/// Entries are immutable; the current price of each entry lives in its own
/// lock so that two price-list rows resolving to the same entry are
/// serialized while updates to different entries proceed independently.
#[derive(Debug)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    prices: Vec<Mutex<Money>>,
    slots: HashMap<CatalogId, usize>,
}

impl Catalog {
    /// Build from a snapshot. Duplicate identifiers are rejected.
    pub fn from_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> EngineResult<Self> {
        let mut entries: Vec<CatalogEntry> = entries.into_iter().collect();
        entries.sort_by_key(CatalogEntry::id_typed);

        let mut slots = HashMap::with_capacity(entries.len());
        for (slot, entry) in entries.iter().enumerate() {
            if slots.insert(entry.id_typed(), slot).is_some() {
                return Err(EngineError::validation(format!(
                    "duplicate catalog id {} in snapshot",
                    entry.id_typed()
                )));
            }
        }

        let prices = entries.iter().map(|e| Mutex::new(e.price().clone())).collect();
        Ok(Self {
            entries,
            prices,
            slots,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Arena slot of `id`. Slots are ordered like identifiers.
    pub fn slot_of(&self, id: CatalogId) -> Option<usize> {
        self.slots.get(&id).copied()
    }

    /// Entry as it was when the snapshot was taken (original price).
    pub fn entry_at(&self, slot: usize) -> &CatalogEntry {
        &self.entries[slot]
    }

    /// Snapshot-time entries in ascending id order.
    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter()
    }

    /// Entry carrying its current price.
    pub fn get(&self, id: CatalogId) -> Option<CatalogEntry> {
        self.slot_of(id).map(|slot| self.current_entry_at(slot))
    }

    /// Entry at `slot` carrying its current price.
    pub fn current_entry_at(&self, slot: usize) -> CatalogEntry {
        self.entries[slot].with_price(self.price_at(slot))
    }

    pub fn current_price(&self, id: CatalogId) -> EngineResult<Money> {
        let slot = self.slot_of(id).ok_or_else(EngineError::not_found)?;
        Ok(self.price_at(slot))
    }

    /// Compare `new` against the current price of `id` and, when it differs by
    /// more than `epsilon` and `commit` is set, store it.
    ///
    /// Read and write happen under the entry's lock.
    pub fn apply_price(
        &self,
        id: CatalogId,
        new: &Money,
        epsilon: f64,
        commit: bool,
    ) -> EngineResult<PriceUpdate> {
        let slot = self.slot_of(id).ok_or_else(EngineError::not_found)?;
        let mut current = self.prices[slot]
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if !current.same_currency(new) {
            return Err(EngineError::validation(format!(
                "entry {id} is priced in {}, refusing a {} price",
                current.currency, new.currency
            )));
        }

        let old = current.clone();
        let changed = old.differs_from(new, epsilon);
        let applied = changed && commit;
        if applied {
            *current = new.clone();
        }
        debug!(entry = %id, old = %old, new = %new, changed, applied, "price applied");

        Ok(PriceUpdate {
            old,
            new: new.clone(),
            changed,
            applied,
        })
    }

    /// Every entry with its current price, for the catalog store to persist.
    pub fn snapshot(&self) -> Vec<CatalogEntry> {
        self.entries
            .iter()
            .enumerate()
            .map(|(slot, e)| e.with_price(self.price_at(slot)))
            .collect()
    }

    fn price_at(&self, slot: usize) -> Money {
        self.prices[slot]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    use pricesync_core::Currency;

    fn rub(amount: f64) -> Money {
        Money::new(amount, Currency::parse("RUB").unwrap())
    }

    fn catalog() -> Catalog {
        Catalog::from_entries(vec![
            CatalogEntry::new(CatalogId::new(44), "The Master and Margarita", rub(620.0)),
            CatalogEntry::new(CatalogId::new(42), "War and Peace", rub(750.0)),
            CatalogEntry::new(CatalogId::new(43), "The Master and Margarita", rub(580.0)),
        ])
        .unwrap()
    }

    #[test]
    fn slots_follow_id_order() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.slot_of(CatalogId::new(42)), Some(0));
        assert_eq!(catalog.slot_of(CatalogId::new(44)), Some(2));
        assert_eq!(catalog.slot_of(CatalogId::new(1)), None);
        let ids: Vec<u64> = catalog.entries().map(|e| e.id_typed().get()).collect();
        assert_eq!(ids, vec![42, 43, 44]);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = Catalog::from_entries(vec![
            CatalogEntry::new(CatalogId::new(1), "A", rub(1.0)),
            CatalogEntry::new(CatalogId::new(1), "B", rub(2.0)),
        ])
        .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn apply_price_writes_changed_price() {
        let catalog = catalog();
        let update = catalog
            .apply_price(CatalogId::new(42), &rub(850.0), 0.01, true)
            .unwrap();

        assert!(update.changed);
        assert!(update.applied);
        assert_eq!(update.old.amount, 750.0);
        assert_eq!(catalog.current_price(CatalogId::new(42)).unwrap().amount, 850.0);
        // The snapshot-time entry is untouched.
        assert_eq!(catalog.entry_at(0).price().amount, 750.0);
        assert_eq!(catalog.get(CatalogId::new(42)).unwrap().price().amount, 850.0);
    }

    #[test]
    fn apply_price_within_epsilon_is_a_no_op() {
        let catalog = catalog();
        let update = catalog
            .apply_price(CatalogId::new(42), &rub(750.004), 0.01, true)
            .unwrap();

        assert!(!update.changed);
        assert!(!update.applied);
        assert_eq!(catalog.current_price(CatalogId::new(42)).unwrap().amount, 750.0);
    }

    #[test]
    fn dry_run_reports_change_without_writing() {
        let catalog = catalog();
        let update = catalog
            .apply_price(CatalogId::new(42), &rub(850.0), 0.01, false)
            .unwrap();

        assert!(update.changed);
        assert!(!update.applied);
        assert_eq!(catalog.current_price(CatalogId::new(42)).unwrap().amount, 750.0);
    }

    #[test]
    fn apply_price_refuses_other_currency() {
        let catalog = catalog();
        let usd = Money::new(10.0, Currency::parse("USD").unwrap());
        assert!(catalog.apply_price(CatalogId::new(42), &usd, 0.01, true).is_err());
        assert!(matches!(
            catalog.apply_price(CatalogId::new(7), &rub(1.0), 0.01, true),
            Err(EngineError::NotFound)
        ));
    }

    #[test]
    fn concurrent_updates_to_one_entry_are_serialized() {
        let catalog = Arc::new(catalog());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let catalog = catalog.clone();
                thread::spawn(move || {
                    catalog
                        .apply_price(CatalogId::new(43), &rub(600.0 + i as f64), 0.01, true)
                        .unwrap()
                })
            })
            .collect();
        let updates: Vec<PriceUpdate> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        // Every write observed a distinct predecessor: the old prices form a chain.
        let final_price = catalog.current_price(CatalogId::new(43)).unwrap().amount;
        let mut olds: Vec<f64> = updates.iter().map(|u| u.old.amount).collect();
        olds.sort_by(f64::total_cmp);
        olds.dedup();
        assert_eq!(olds.len(), 8);
        assert!(updates.iter().any(|u| u.new.amount == final_price));
    }
}

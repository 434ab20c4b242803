//! Candidate index: exact ISBN lookup plus an inverted token index over a
//! catalog snapshot.

use std::collections::HashMap;

use tracing::{info, warn};

use pricesync_catalog::{Catalog, CatalogEntry};
use pricesync_core::{EngineError, EngineResult};

use crate::normalize::{NormalizedKeys, normalize_isbn, tokens};
use crate::similarity::DEFAULT_TOP_K;

/// Build an index over `entries` with the default candidate bound.
pub fn build_index(entries: impl IntoIterator<Item = CatalogEntry>) -> EngineResult<CandidateIndex> {
    CandidateIndex::build(entries, DEFAULT_TOP_K)
}

/// Read-only lookup structures over one catalog snapshot.
///
/// Entries live in the [`Catalog`] arena; the ISBN map and token postings
/// refer to arena slots, which are ordered like catalog identifiers. Only the
/// per-entry prices inside the catalog change during a batch.
#[derive(Debug)]
pub struct CandidateIndex {
    catalog: Catalog,
    keys: Vec<NormalizedKeys>,
    by_isbn: HashMap<String, usize>,
    by_token: HashMap<String, Vec<usize>>,
    top_k: usize,
}

impl CandidateIndex {
    /// Build from a catalog snapshot. An empty snapshot leaves nothing to
    /// match against and is rejected as `IndexUnavailable`.
    pub fn build(entries: impl IntoIterator<Item = CatalogEntry>, top_k: usize) -> EngineResult<Self> {
        if top_k == 0 {
            return Err(EngineError::config("top_k must be at least 1"));
        }

        let catalog = Catalog::from_entries(entries)?;
        if catalog.is_empty() {
            return Err(EngineError::index_unavailable("catalog snapshot is empty"));
        }

        let keys: Vec<NormalizedKeys> = catalog.entries().map(NormalizedKeys::for_entry).collect();

        let mut by_isbn: HashMap<String, usize> = HashMap::new();
        let mut by_token: HashMap<String, Vec<usize>> = HashMap::new();
        for (slot, k) in keys.iter().enumerate() {
            if let Some(isbn) = &k.isbn {
                // Slots ascend with ids: the lowest id keeps a shared ISBN.
                if let Some(&kept) = by_isbn.get(isbn) {
                    warn!(
                        isbn = %isbn,
                        kept = %catalog.entry_at(kept).id_typed(),
                        ignored = %catalog.entry_at(slot).id_typed(),
                        "duplicate ISBN in catalog snapshot"
                    );
                } else {
                    by_isbn.insert(isbn.clone(), slot);
                }
            }

            let mut entry_tokens: Vec<&str> = tokens(&k.title).chain(tokens(&k.author)).collect();
            entry_tokens.sort_unstable();
            entry_tokens.dedup();
            for token in entry_tokens {
                by_token.entry(token.to_string()).or_default().push(slot);
            }
        }

        info!(
            entries = catalog.len(),
            isbn_keys = by_isbn.len(),
            tokens = by_token.len(),
            top_k,
            "candidate index built"
        );

        Ok(Self {
            catalog,
            keys,
            by_isbn,
            by_token,
            top_k,
        })
    }

    /// Replace the snapshot. Requires exclusive access, so no match pass can
    /// be running against the old one. On error the current index is kept.
    pub fn rebuild(&mut self, entries: impl IntoIterator<Item = CatalogEntry>) -> EngineResult<()> {
        *self = Self::build(entries, self.top_k)?;
        Ok(())
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn keys_at(&self, slot: usize) -> &NormalizedKeys {
        &self.keys[slot]
    }

    /// Exact lookup by ISBN (raw or already normalized).
    pub fn lookup_by_isbn(&self, isbn: &str) -> Option<&CatalogEntry> {
        self.isbn_slot(isbn).map(|slot| self.catalog.entry_at(slot))
    }

    /// Entries sharing tokens with the folded title/author keys, most shared
    /// tokens first, ties by ascending id, at most `top_k` of them.
    pub fn lookup_by_tokens(&self, title_key: &str, author_key: &str) -> Vec<&CatalogEntry> {
        self.lookup_by_tokens_top(title_key, author_key, self.top_k)
    }

    pub fn lookup_by_tokens_top(&self, title_key: &str, author_key: &str, k: usize) -> Vec<&CatalogEntry> {
        self.token_slots(title_key, author_key, k)
            .into_iter()
            .map(|slot| self.catalog.entry_at(slot))
            .collect()
    }

    pub(crate) fn isbn_slot(&self, isbn: &str) -> Option<usize> {
        let key = normalize_isbn(isbn)?;
        self.by_isbn.get(&key).copied()
    }

    pub(crate) fn token_slots(&self, title_key: &str, author_key: &str, k: usize) -> Vec<usize> {
        let mut query: Vec<&str> = tokens(title_key).chain(tokens(author_key)).collect();
        query.sort_unstable();
        query.dedup();

        let mut overlap: HashMap<usize, u32> = HashMap::new();
        for token in query {
            if let Some(postings) = self.by_token.get(token) {
                for &slot in postings {
                    *overlap.entry(slot).or_default() += 1;
                }
            }
        }

        let mut ranked: Vec<(usize, u32)> = overlap.into_iter().collect();
        ranked.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(k);
        ranked.into_iter().map(|(slot, _)| slot).collect()
    }
}

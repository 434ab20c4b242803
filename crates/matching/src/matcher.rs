use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use pricesync_catalog::{CatalogEntry, PriceListItem};

use crate::index::CandidateIndex;
use crate::normalize::{NormalizedItem, NormalizedKeys};
use crate::similarity::{MatchSettings, text_similarity};

/// Confidence is reported with six decimal places so that weighted sums land
/// on the values configured as thresholds (0.6 + 0.3 is 0.9, not 0.8999…).
const CONFIDENCE_SCALE: f64 = 1e6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchField {
    Isbn,
    Title,
    Author,
    Publisher,
}

/// A catalog entry scored against one price-list item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchCandidate {
    /// Carries the catalog price current when the candidate was built.
    pub entry: CatalogEntry,
    /// In [0, 1].
    pub confidence: f64,
    pub matched_fields: BTreeSet<MatchField>,
}

impl MatchCandidate {
    pub fn is_exact(&self) -> bool {
        self.matched_fields.contains(&MatchField::Isbn)
    }
}

/// Descending confidence, then ascending catalog id.
pub fn rank_candidates(candidates: &mut [MatchCandidate]) {
    candidates.sort_by(compare_candidates);
}

fn compare_candidates(a: &MatchCandidate, b: &MatchCandidate) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| a.entry.id_typed().cmp(&b.entry.id_typed()))
}

fn quantize(score: f64) -> f64 {
    (score.clamp(0.0, 1.0) * CONFIDENCE_SCALE).round() / CONFIDENCE_SCALE
}

/// Scores price-list items against a [`CandidateIndex`].
///
/// Stateless apart from its settings; share one across worker threads.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    settings: MatchSettings,
}

impl Matcher {
    pub fn new(settings: MatchSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &MatchSettings {
        &self.settings
    }

    /// Ranked candidates at or above the configured threshold. An item with
    /// neither a usable ISBN nor a title yields nothing.
    pub fn match_item(&self, index: &CandidateIndex, item: &PriceListItem) -> Vec<MatchCandidate> {
        self.match_keys(index, &NormalizedKeys::for_item(item), self.settings.threshold)
    }

    pub fn match_normalized(&self, index: &CandidateIndex, item: &NormalizedItem) -> Vec<MatchCandidate> {
        self.match_keys(index, item.keys(), self.settings.threshold)
    }

    /// Like [`Matcher::match_item`] with a caller-supplied threshold.
    pub fn find_potential_matches(
        &self,
        index: &CandidateIndex,
        item: &PriceListItem,
        threshold: f64,
    ) -> Vec<MatchCandidate> {
        self.match_keys(index, &NormalizedKeys::for_item(item), threshold)
    }

    /// Entry of the best-ranked candidate, if any.
    pub fn find_best_match(&self, index: &CandidateIndex, item: &PriceListItem) -> Option<CatalogEntry> {
        self.match_item(index, item)
            .into_iter()
            .next()
            .map(|candidate| candidate.entry)
    }

    pub fn match_keys(
        &self,
        index: &CandidateIndex,
        keys: &NormalizedKeys,
        threshold: f64,
    ) -> Vec<MatchCandidate> {
        if index.is_empty() || !keys.is_usable() {
            return Vec::new();
        }

        if let Some(slot) = keys.isbn.as_deref().and_then(|isbn| index.isbn_slot(isbn)) {
            return vec![MatchCandidate {
                entry: index.catalog().current_entry_at(slot),
                confidence: 1.0,
                matched_fields: BTreeSet::from([MatchField::Isbn]),
            }];
        }

        let mut candidates: Vec<MatchCandidate> = index
            .token_slots(&keys.title, &keys.author, self.settings.top_k)
            .into_iter()
            .filter_map(|slot| self.score(index, slot, keys))
            .filter(|candidate| candidate.confidence >= threshold)
            .collect();
        rank_candidates(&mut candidates);
        candidates
    }

    fn score(&self, index: &CandidateIndex, slot: usize, keys: &NormalizedKeys) -> Option<MatchCandidate> {
        let target = index.keys_at(slot);
        let weights = &self.settings.weights;
        let fields = [
            (MatchField::Title, weights.title, text_similarity(&keys.title, &target.title)),
            (MatchField::Author, weights.author, text_similarity(&keys.author, &target.author)),
            (
                MatchField::Publisher,
                weights.publisher,
                text_similarity(&keys.publisher, &target.publisher),
            ),
        ];

        let confidence = quantize(fields.iter().map(|(_, weight, sim)| weight * sim).sum());
        if confidence <= 0.0 {
            return None;
        }

        let matched_fields = fields
            .iter()
            .filter(|(_, weight, sim)| *weight > 0.0 && *sim >= self.settings.field_floor)
            .map(|(field, _, _)| *field)
            .collect();

        Some(MatchCandidate {
            entry: index.catalog().current_entry_at(slot),
            confidence,
            matched_fields,
        })
    }
}

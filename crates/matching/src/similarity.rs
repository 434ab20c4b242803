//! Field similarity and scoring weights.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use pricesync_core::{EngineError, EngineResult};

use crate::normalize::tokens;

/// Token-set Jaccard index of two folded keys. Empty input scores 0.
pub fn token_jaccard(a: &str, b: &str) -> f64 {
    let left: BTreeSet<&str> = tokens(a).collect();
    let right: BTreeSet<&str> = tokens(b).collect();
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let shared = left.intersection(&right).count();
    let union = left.union(&right).count();
    shared as f64 / union as f64
}

/// Similarity of two folded keys in [0, 1].
///
/// The better of token Jaccard (robust to word order: "tolstoy leo" vs
/// "leo tolstoy") and normalized Levenshtein (robust to typos: "margarita"
/// vs "margaritta"). A missing value on either side scores 0.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    token_jaccard(a, b).max(strsim::normalized_levenshtein(a, b))
}

/// Per-field weights of the confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchWeights {
    #[serde(default = "default_title_weight")]
    pub title: f64,
    #[serde(default = "default_author_weight")]
    pub author: f64,
    #[serde(default = "default_publisher_weight")]
    pub publisher: f64,
}

fn default_title_weight() -> f64 {
    0.6
}

fn default_author_weight() -> f64 {
    0.3
}

fn default_publisher_weight() -> f64 {
    0.1
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            title: default_title_weight(),
            author: default_author_weight(),
            publisher: default_publisher_weight(),
        }
    }
}

impl MatchWeights {
    pub fn validate(&self) -> EngineResult<()> {
        let all = [self.title, self.author, self.publisher];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(EngineError::config("match weights must be finite and non-negative"));
        }
        if all.iter().sum::<f64>() <= 0.0 {
            return Err(EngineError::config("match weights must not all be zero"));
        }
        Ok(())
    }
}

pub const DEFAULT_THRESHOLD: f64 = 0.5;
pub const DEFAULT_TOP_K: usize = 20;

/// Matcher tuning: acceptance threshold, token candidate bound, weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSettings {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Minimum field similarity for the field to be reported as matched.
    #[serde(default = "default_field_floor")]
    pub field_floor: f64,
    #[serde(default)]
    pub weights: MatchWeights,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_field_floor() -> f64 {
    0.5
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            top_k: default_top_k(),
            field_floor: default_field_floor(),
            weights: MatchWeights::default(),
        }
    }
}

impl MatchSettings {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_weights(mut self, weights: MatchWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn validate(&self) -> EngineResult<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(EngineError::config(format!(
                "matching.threshold must be within [0, 1], got {}",
                self.threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.field_floor) {
            return Err(EngineError::config(format!(
                "matching.field_floor must be within [0, 1], got {}",
                self.field_floor
            )));
        }
        if self.top_k == 0 {
            return Err(EngineError::config("matching.top_k must be at least 1"));
        }
        self.weights.validate()
    }
}

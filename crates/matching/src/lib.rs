//! Matching module.
//!
//! Turns raw price-list fields into comparable keys, indexes a catalog
//! snapshot by ISBN and by title/author tokens, and scores items against it.
//! Pure and deterministic: the same inputs always produce the same ranking.

pub mod error;
pub mod index;
pub mod matcher;
pub mod normalize;
pub mod similarity;

pub use error::NormalizeError;
pub use index::{CandidateIndex, build_index};
pub use matcher::{MatchCandidate, MatchField, Matcher, rank_candidates};
pub use normalize::{NormalizedItem, NormalizedKeys, fold_text, normalize_isbn, tokens};
pub use similarity::{
    DEFAULT_THRESHOLD, DEFAULT_TOP_K, MatchSettings, MatchWeights, text_similarity, token_jaccard,
};

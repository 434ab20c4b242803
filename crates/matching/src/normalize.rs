//! Canonical comparison keys for catalog entries and price-list rows.
//!
//! Everything here is a pure function of its input. Malformed input degrades
//! to "no key" rather than failing; only the [`NormalizedItem`] constructors
//! turn a keyless row into an error.

use serde::Serialize;
use unicode_normalization::UnicodeNormalization;

use pricesync_catalog::{CatalogEntry, PriceListItem, RawPriceRow};
use pricesync_core::{Currency, RowError};

use crate::error::NormalizeError;

/// Canonical ISBN key: digits (and a trailing `X` for ISBN-10) only.
///
/// Returns `None` for anything that is not 10 or 13 characters long after
/// stripping separators. Check digits are not verified.
pub fn normalize_isbn(raw: &str) -> Option<String> {
    let key: String = raw
        .chars()
        .filter_map(|c| match c {
            '0'..='9' => Some(c),
            'x' | 'X' => Some('X'),
            _ => None,
        })
        .collect();

    let digits_before_last = key[..key.len().saturating_sub(1)]
        .bytes()
        .all(|b| b.is_ascii_digit());
    match key.len() {
        10 if digits_before_last => Some(key),
        13 if key.bytes().all(|b| b.is_ascii_digit()) => Some(key),
        _ => None,
    }
}

/// Fold free text for approximate comparison: compatibility-decompose, drop
/// combining marks, lower-case, turn punctuation into spaces and collapse runs
/// of whitespace. `"  Лев  Толстой, "` and `"лев толстои"` fold identically.
pub fn fold_text(raw: &str) -> String {
    // Lower-casing can reintroduce combining marks (`İ` -> `i` + U+0307),
    // hence the second decomposition.
    let lowered: String = strip_marks(raw).flat_map(char::to_lowercase).collect();
    let folded: String = strip_marks(&lowered)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_marks(raw: &str) -> impl Iterator<Item = char> + '_ {
    raw.nfkd()
        .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
}

/// Index tokens of a folded key. Single letters carry no signal and are skipped.
pub fn tokens(folded: &str) -> impl Iterator<Item = &str> {
    folded
        .split(' ')
        .filter(|t| !t.is_empty())
        .filter(|t| t.chars().count() > 1 || t.chars().all(|c| c.is_numeric()))
}

/// Comparable keys derived from one record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizedKeys {
    pub isbn: Option<String>,
    pub title: String,
    pub author: String,
    pub publisher: String,
}

impl NormalizedKeys {
    pub fn from_fields(isbn: Option<&str>, title: &str, author: &str, publisher: &str) -> Self {
        Self {
            isbn: isbn.and_then(normalize_isbn),
            title: fold_text(title),
            author: fold_text(author),
            publisher: fold_text(publisher),
        }
    }

    pub fn for_entry(entry: &CatalogEntry) -> Self {
        Self::from_fields(entry.isbn(), entry.title(), entry.author(), entry.publisher())
    }

    pub fn for_item(item: &PriceListItem) -> Self {
        Self::from_fields(item.isbn.as_deref(), &item.title, &item.author, &item.publisher)
    }

    pub fn for_raw(raw: &RawPriceRow) -> Self {
        Self::from_fields(
            raw.isbn.as_deref(),
            raw.title.as_deref().unwrap_or_default(),
            raw.author.as_deref().unwrap_or_default(),
            raw.publisher.as_deref().unwrap_or_default(),
        )
    }

    /// A record is matchable when it has a valid ISBN or a non-empty title.
    pub fn is_usable(&self) -> bool {
        self.isbn.is_some() || !self.title.is_empty()
    }
}

/// A price-list item paired with its keys; only constructible when usable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedItem {
    item: PriceListItem,
    keys: NormalizedKeys,
}

impl NormalizedItem {
    pub fn try_new(item: PriceListItem) -> Result<Self, NormalizeError> {
        let keys = NormalizedKeys::for_item(&item);
        if !keys.is_usable() {
            return Err(NormalizeError::MissingKey { row: item.row });
        }
        Ok(Self { item, keys })
    }

    /// Convert a raw row, deriving its keys once. A keyless row is reported
    /// as malformed before its price or currency is looked at.
    pub fn from_raw(raw: &RawPriceRow, default_currency: &Currency) -> Result<Self, RowError> {
        let keys = NormalizedKeys::for_raw(raw);
        if !keys.is_usable() {
            return Err(NormalizeError::MissingKey { row: raw.row }.into());
        }
        let item = raw.to_item(default_currency)?;
        Ok(Self { item, keys })
    }

    pub fn item(&self) -> &PriceListItem {
        &self.item
    }

    pub fn keys(&self) -> &NormalizedKeys {
        &self.keys
    }

    pub fn into_item(self) -> PriceListItem {
        self.item
    }
}

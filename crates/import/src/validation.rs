//! Dry validation of raw price-list rows before an import.
//!
//! Reports problems without touching the catalog. Errors and warnings are
//! each listed in row order, so the same input always yields the same report.

use std::collections::HashMap;

use serde::Serialize;

use pricesync_catalog::RawPriceRow;
use pricesync_core::Currency;
use pricesync_matching::{CandidateIndex, Matcher, NormalizedKeys, normalize_isbn};

use crate::config::ImportPolicy;

/// Longest title accepted before the row is considered corrupt.
pub const MAX_TITLE_CHARS: usize = 500;

const SPECIAL_CHARACTERS: &[char] = &['<', '>', '{', '}', '[', ']', '|', '\\', '^', '~', '`', '@', '$', '*', '_'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MissingPrice,
    InvalidPrice,
    MissingKey,
    MalformedIsbn,
    UnknownCurrency,
    FieldTooLong,
    DuplicateIsbn,
    SpecialCharacters,
    PriceDeviation,
}

impl IssueKind {
    pub fn is_error(self) -> bool {
        !matches!(
            self,
            Self::DuplicateIsbn | Self::SpecialCharacters | Self::PriceDeviation
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub row: usize,
    pub kind: IssueKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub total_rows: usize,
    /// Rows with at least one error.
    pub invalid_rows: usize,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn push(&mut self, row: usize, kind: IssueKind, message: String) {
        let issue = ValidationIssue { row, kind, message };
        if kind.is_error() {
            self.errors.push(issue);
        } else {
            self.warnings.push(issue);
        }
    }
}

/// Validate `rows`. With an index, rows whose price deviates from their best
/// match by more than `import.max_price_deviation` get a warning.
pub fn validate_rows(
    rows: &[RawPriceRow],
    policy: &ImportPolicy,
    index: Option<&CandidateIndex>,
) -> ValidationReport {
    let matcher = Matcher::new(policy.matching.clone());
    let mut report = ValidationReport {
        total_rows: rows.len(),
        ..ValidationReport::default()
    };
    let mut first_row_by_isbn: HashMap<String, usize> = HashMap::new();

    for raw in rows {
        let errors_before = report.errors.len();
        let row = raw.row;

        let keys = NormalizedKeys::for_raw(raw);
        if !keys.is_usable() {
            report.push(row, IssueKind::MissingKey, "neither a valid ISBN nor a title is present".into());
        }

        if let Some(isbn) = present(&raw.isbn) {
            if normalize_isbn(isbn).is_none() {
                report.push(row, IssueKind::MalformedIsbn, format!("ISBN '{isbn}' is malformed"));
            }
        }

        let title = present(&raw.title).unwrap_or_default();
        if title.chars().count() > MAX_TITLE_CHARS {
            report.push(
                row,
                IssueKind::FieldTooLong,
                format!("title exceeds {MAX_TITLE_CHARS} characters"),
            );
        }

        match present(&raw.price) {
            None => report.push(row, IssueKind::MissingPrice, "price is missing".into()),
            Some(price) if pricesync_catalog::parse_price(price).is_none() => report.push(
                row,
                IssueKind::InvalidPrice,
                format!("price '{price}' is not a non-negative number"),
            ),
            Some(_) => {}
        }

        let currency = match present(&raw.currency) {
            None => Some(policy.import.default_currency.clone()),
            Some(code) => match Currency::parse(code) {
                Ok(currency) if policy.import.currency_allowed(&currency) => Some(currency),
                _ => {
                    report.push(row, IssueKind::UnknownCurrency, format!("currency '{code}' is not accepted"));
                    None
                }
            },
        };

        if let Some(isbn) = &keys.isbn {
            match first_row_by_isbn.get(isbn) {
                Some(first) => report.push(
                    row,
                    IssueKind::DuplicateIsbn,
                    format!("ISBN {isbn} already appears in row {first}"),
                ),
                None => {
                    first_row_by_isbn.insert(isbn.clone(), row);
                }
            }
        }

        if title.chars().any(|c| c.is_control() || SPECIAL_CHARACTERS.contains(&c)) {
            report.push(row, IssueKind::SpecialCharacters, "title contains special characters".into());
        }

        let row_is_valid = report.errors.len() == errors_before;
        if let (true, Some(index), Some(currency)) = (row_is_valid, index, currency) {
            if let Ok(item) = raw.to_item(&currency) {
                if let Some(entry) = matcher.find_best_match(index, &item) {
                    let current = index
                        .catalog()
                        .current_price(entry.id_typed())
                        .unwrap_or_else(|_| entry.price().clone());
                    if let Some(change) = current.relative_change_to(&item.price) {
                        if change.abs() > policy.import.max_price_deviation {
                            report.push(
                                row,
                                IssueKind::PriceDeviation,
                                format!(
                                    "price {} differs from catalog price {} of entry {} by {:.0}%",
                                    item.price,
                                    current,
                                    entry.id_typed(),
                                    change * 100.0
                                ),
                            );
                        }
                    }
                }
            }
        }

        if !row_is_valid {
            report.invalid_rows += 1;
        }
    }

    report
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

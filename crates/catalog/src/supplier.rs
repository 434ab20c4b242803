//! Supplier profiles: how a supplier's price-list columns map onto item fields.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use pricesync_core::{Currency, EngineError, EngineResult};

use crate::item::RawPriceRow;

/// Item field a supplier column can feed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceField {
    Sku,
    Isbn,
    Title,
    Author,
    Publisher,
    Price,
    Currency,
    Stock,
}

/// A supplier and its column layout.
///
/// `columns` maps the supplier's header text (e.g. `"Название"`) to the field
/// it carries. Header comparison ignores surrounding whitespace and case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierProfile {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub default_currency: Option<Currency>,
    pub columns: BTreeMap<String, PriceField>,
}

impl SupplierProfile {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: String::new(),
            default_currency: None,
            columns: BTreeMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_default_currency(mut self, currency: Currency) -> Self {
        self.default_currency = Some(currency);
        self
    }

    pub fn with_column(mut self, header: impl Into<String>, field: PriceField) -> Self {
        self.columns.insert(header.into(), field);
        self
    }

    /// Check the mapping can produce importable rows.
    pub fn validate(&self) -> EngineResult<()> {
        if self.code.trim().is_empty() {
            return Err(EngineError::validation("supplier code cannot be empty"));
        }

        let mut seen_headers = BTreeSet::new();
        let mut seen_fields = BTreeSet::new();
        for (header, field) in &self.columns {
            if !seen_headers.insert(header_key(header)) {
                return Err(EngineError::validation(format!(
                    "supplier '{}': header '{}' is mapped more than once",
                    self.code,
                    header.trim()
                )));
            }
            if !seen_fields.insert(*field) {
                return Err(EngineError::validation(format!(
                    "supplier '{}': field {field:?} is mapped by more than one column",
                    self.code
                )));
            }
        }

        if !seen_fields.contains(&PriceField::Price) {
            return Err(EngineError::validation(format!(
                "supplier '{}': no column is mapped to price",
                self.code
            )));
        }
        if !seen_fields.contains(&PriceField::Title) && !seen_fields.contains(&PriceField::Isbn) {
            return Err(EngineError::validation(format!(
                "supplier '{}': a title or ISBN column is required",
                self.code
            )));
        }
        Ok(())
    }

    /// Map one header-keyed record onto a raw row. Unmapped headers are ignored.
    pub fn map_row<I, K, V>(&self, row: usize, record: I) -> RawPriceRow
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let lookup: BTreeMap<String, PriceField> = self
            .columns
            .iter()
            .map(|(header, field)| (header_key(header), *field))
            .collect();

        let mut raw = RawPriceRow::new(row);
        for (header, value) in record {
            let Some(field) = lookup.get(&header_key(header.as_ref())) else {
                continue;
            };
            let value = Some(value.as_ref().to_string());
            match field {
                PriceField::Sku => raw.sku = value,
                PriceField::Isbn => raw.isbn = value,
                PriceField::Title => raw.title = value,
                PriceField::Author => raw.author = value,
                PriceField::Publisher => raw.publisher = value,
                PriceField::Price => raw.price = value,
                PriceField::Currency => raw.currency = value,
                PriceField::Stock => raw.stock = value,
            }
        }
        raw
    }
}

fn header_key(header: &str) -> String {
    header.trim().to_lowercase()
}

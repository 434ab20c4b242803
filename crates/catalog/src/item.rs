use serde::{Deserialize, Serialize};

use pricesync_core::{Currency, Money, RowError};

/// One row of a supplier price list, after field extraction.
///
/// Created per import row and discarded once reconciled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceListItem {
    /// 1-based position of the row in the import stream.
    pub row: usize,
    /// Supplier's own article code, if the price list has one.
    pub sku: Option<String>,
    pub isbn: Option<String>,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub price: Money,
    pub stock: u32,
}

impl PriceListItem {
    pub fn new(row: usize, title: impl Into<String>, price: Money) -> Self {
        Self {
            row,
            sku: None,
            isbn: None,
            title: title.into(),
            author: String::new(),
            publisher: String::new(),
            price,
            stock: 0,
        }
    }

    pub fn with_isbn(mut self, isbn: impl Into<String>) -> Self {
        self.isbn = Some(isbn.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = publisher.into();
        self
    }

    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = Some(sku.into());
        self
    }

    pub fn with_stock(mut self, stock: u32) -> Self {
        self.stock = stock;
        self
    }
}

/// Raw field record as delivered by a row source (file decoding happens upstream).
///
/// Every field is optional text; nothing has been validated yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPriceRow {
    pub row: usize,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub stock: Option<String>,
}

impl RawPriceRow {
    pub fn new(row: usize) -> Self {
        Self {
            row,
            ..Self::default()
        }
    }

    /// Convert into a typed item, falling back to `default_currency` when the
    /// row carries none.
    pub fn to_item(&self, default_currency: &Currency) -> Result<PriceListItem, RowError> {
        let amount = match non_blank(&self.price) {
            None => return Err(RowError::invalid_price(self.row, "price is missing")),
            Some(raw) => parse_price(raw).ok_or_else(|| {
                RowError::invalid_price(self.row, format!("price '{raw}' is not a non-negative number"))
            })?,
        };

        let currency = match non_blank(&self.currency) {
            None => default_currency.clone(),
            Some(raw) => Currency::parse(raw)
                .map_err(|e| RowError::invalid_currency(self.row, e.to_string()))?,
        };

        Ok(PriceListItem {
            row: self.row,
            sku: non_blank(&self.sku).map(str::to_string),
            isbn: non_blank(&self.isbn).map(str::to_string),
            title: text(&self.title),
            author: text(&self.author),
            publisher: text(&self.publisher),
            price: Money::new(amount, currency),
            stock: non_blank(&self.stock).and_then(parse_stock).unwrap_or(0),
        })
    }
}

/// Parse a supplier price: surrounding and grouping whitespace is ignored and
/// `,` is accepted as the decimal separator ("1 250,50").
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    let value = cleaned.parse::<f64>().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

fn parse_stock(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok()
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn text(field: &Option<String>) -> String {
    non_blank(field).unwrap_or_default().to_string()
}

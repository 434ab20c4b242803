use serde::{Deserialize, Serialize};

use pricesync_core::{CatalogId, Money};

/// Snapshot of one catalog product.
///
/// Owned by the catalog store; the engine only reads it. A new price is
/// produced as a new snapshot (`with_price`), never by mutating a shared one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    id: CatalogId,
    #[serde(default)]
    isbn: Option<String>,
    title: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    publisher: String,
    price: Money,
    #[serde(default)]
    publication_year: Option<i32>,
}

impl CatalogEntry {
    pub fn new(id: CatalogId, title: impl Into<String>, price: Money) -> Self {
        Self {
            id,
            isbn: None,
            title: title.into(),
            author: String::new(),
            publisher: String::new(),
            price,
            publication_year: None,
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

    pub fn with_publication_year(mut self, year: i32) -> Self {
        self.publication_year = Some(year);
        self
    }

    /// Copy of this snapshot carrying `price`.
    pub fn with_price(&self, price: Money) -> Self {
        Self {
            price,
            ..self.clone()
        }
    }

    pub fn id_typed(&self) -> CatalogId {
        self.id
    }

    pub fn isbn(&self) -> Option<&str> {
        self.isbn.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn publisher(&self) -> &str {
        &self.publisher
    }

    pub fn price(&self) -> &Money {
        &self.price
    }

    pub fn publication_year(&self) -> Option<i32> {
        self.publication_year
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricesync_core::Currency;

    fn rub(amount: f64) -> Money {
        Money::new(amount, Currency::parse("RUB").unwrap())
    }

    #[test]
    fn builder_sets_optional_fields() {
        let entry = CatalogEntry::new(CatalogId::new(42), "War and Peace", rub(750.0))
            .with_isbn("978-5-699-12345-6")
            .with_author("Leo Tolstoy")
            .with_publisher("Eksmo")
            .with_publication_year(2020);

        assert_eq!(entry.id_typed(), CatalogId::new(42));
        assert_eq!(entry.isbn(), Some("978-5-699-12345-6"));
        assert_eq!(entry.author(), "Leo Tolstoy");
        assert_eq!(entry.publisher(), "Eksmo");
        assert_eq!(entry.publication_year(), Some(2020));
    }

    #[test]
    fn with_price_leaves_original_untouched() {
        let entry = CatalogEntry::new(CatalogId::new(42), "War and Peace", rub(750.0));
        let repriced = entry.with_price(rub(850.0));

        assert_eq!(entry.price().amount, 750.0);
        assert_eq!(repriced.price().amount, 850.0);
        assert_eq!(repriced.id_typed(), entry.id_typed());
    }

    #[test]
    fn deserializes_minimal_snapshot() {
        let entry: CatalogEntry = serde_json::from_str(
            r#"{"id": 7, "title": "Dead Souls", "price": {"amount": 410.0, "currency": "rub"}}"#,
        )
        .unwrap();
        assert_eq!(entry.id_typed().get(), 7);
        assert_eq!(entry.isbn(), None);
        assert_eq!(entry.price().currency.code(), "RUB");
    }
}

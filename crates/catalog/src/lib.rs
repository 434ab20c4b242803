//! Catalog domain module.
//!
//! Catalog entries, supplier price-list rows and supplier column layouts,
//! plus the arena that holds a catalog snapshot during a reconciliation pass.
//! Deterministic domain logic only (no IO, no file decoding, no storage).

pub mod entry;
pub mod item;
pub mod store;
pub mod supplier;

pub use entry::CatalogEntry;
pub use item::{PriceListItem, RawPriceRow, parse_price};
pub use store::{Catalog, PriceUpdate};
pub use supplier::{PriceField, SupplierProfile};

//! `pricesync-core` — engine foundation building blocks.
//!
//! This crate contains **pure** primitives shared by the catalog, matching,
//! reconciliation and import crates (no IO, no threads).

pub mod error;
pub mod id;
pub mod value_object;

pub use error::{EngineError, EngineResult, RowError, RowErrorKind};
pub use id::{BatchId, CatalogId};
pub use value_object::{Currency, Money};

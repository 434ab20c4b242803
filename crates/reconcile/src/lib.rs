//! Reconciliation module.
//!
//! Decides, per price-list item, whether a ranked candidate list justifies an
//! automatic price update, needs a human, or is rejected. The only catalog
//! mutation in the engine happens here, through [`Reconciler::reconcile`]
//! (or the explicit [`update_price`] helper).

pub mod decision;
pub mod policy;
pub mod reconciler;

pub use decision::{DecisionKind, ReconciliationDecision, RejectReason, ReviewReason};
pub use policy::ReconcilePolicy;
pub use reconciler::{Reconciler, update_price};

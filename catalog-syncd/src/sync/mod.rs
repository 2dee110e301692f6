//! Reconciliation of desired registrations against the catalog.
//!
//! Each run reads the entries scoped by the required tags, classifies every
//! desired definition (in sync, kept, update, add) while consuming its match,
//! and deregisters whatever is left over.

pub mod engine;
pub mod identity;
pub mod plan;

#[cfg(test)]
mod fake_catalog;

pub use engine::{sync, SyncError, SyncReport, Syncer};
pub use plan::{ObservedSet, Step};

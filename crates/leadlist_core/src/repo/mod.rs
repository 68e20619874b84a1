//! Repository layer: record store contract and SQLite implementations.
//!
//! # Responsibility
//! - Define the narrow query/write contracts the list engine consumes.
//! - Keep SQL details out of services and the segmentation engine.
//!
//! # Invariants
//! - Repositories only accept fully migrated connections.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod lead_repo;
pub mod list_repo;
pub mod record_store;

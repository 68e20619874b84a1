//! List segmentation engine.
//!
//! # Responsibility
//! - Validate and compile smart-list criteria into conjunctive predicates.
//! - Resolve static and smart list membership through one entry point.
//! - Stage per-lead membership edits before they are committed.
//!
//! # Invariants
//! - Catalog, validation and compilation are pure.
//! - Criteria support exactly one flat AND of rules.

pub mod catalog;
pub mod clock;
pub mod pending;
pub mod predicate;
pub mod resolver;
pub mod validation;

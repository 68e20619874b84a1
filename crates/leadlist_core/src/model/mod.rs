//! Domain model for leads, lists and list criteria.
//!
//! # Invariants
//! - Every lead and list is identified by a stable `Uuid`.
//! - A smart list carries at least one rule; a static list carries none.

pub mod lead;
pub mod list;
pub mod rule;

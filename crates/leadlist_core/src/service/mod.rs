//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository and engine calls into use-case level APIs.
//! - Return results and typed errors only; presenting them to users is the
//!   caller's job.

pub mod list_service;
pub mod membership_service;

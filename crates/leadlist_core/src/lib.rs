//! Lead list segmentation core.
//!
//! Decides which leads belong to a list: static lists by explicit
//! membership rows, smart lists by evaluating a conjunctive rule set against
//! the live lead store. Also stages and commits a lead's membership edits.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod segment;
pub mod service;

pub use config::CoreConfig;
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::lead::{Lead, LeadId, OrganizationId};
pub use model::list::{LeadList, ListId, ListKind};
pub use model::rule::{FieldClass, LeadField, OperatorName, Rule};
pub use repo::lead_repo::{LeadRepository, SqliteLeadRepository};
pub use repo::list_repo::{ListRepository, SqliteListRepository};
pub use repo::record_store::{
    MembershipId, MembershipRow, RecordStore, SqliteRecordStore, StoreError, StoreResult,
};
pub use segment::catalog::{default_operator, operators_for};
pub use segment::clock::{Clock, FixedClock, SystemClock};
pub use segment::pending::{ChangeAction, MembershipChange, PendingChangeSet};
pub use segment::predicate::{compile_criteria, LeadPredicate};
pub use segment::resolver::{AddedBy, MembershipResolver, ResolutionError, ResolvedMember};
pub use segment::validation::{validate_criteria, LiteralProblem, ValidationError};
pub use service::list_service::{ListService, ListServiceError, ListUpdate, NewList};
pub use service::membership_service::{
    CommitError, CommitReport, FailedChange, MembershipService, MutationError,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

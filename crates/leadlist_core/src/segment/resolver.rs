//! Membership resolver.
//!
//! # Responsibility
//! - Answer "who is in this list right now" for static and smart lists
//!   through one entry point.
//!
//! # Invariants
//! - Resolution never writes to the store.
//! - Nothing is cached between calls; smart lists are recompiled against
//!   the clock on every call.
//! - A store failure is an error, never an empty member set.
//! - Members are ordered by lead id.

use crate::model::lead::Lead;
use crate::model::list::{LeadList, ListId, ListKind};
use crate::repo::record_store::{MembershipId, RecordStore, StoreError};
use crate::segment::clock::Clock;
use crate::segment::predicate::compile_criteria;
use crate::segment::validation::ValidationError;
use log::{error, info};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Who put a lead into a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "user", rename_all = "snake_case")]
pub enum AddedBy {
    /// Explicit static membership added by this user.
    User(String),
    /// Synthetic membership produced by a smart list's criteria.
    SmartRule,
}

/// One member of a resolved list.
///
/// Smart members carry `AddedBy::SmartRule`, no membership id and the
/// lead's own creation time as `added_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedMember {
    pub lead: Lead,
    pub membership_id: Option<MembershipId>,
    pub added_by: AddedBy,
    pub added_at: i64,
}

/// Resolution failure, distinct from an empty member set.
#[derive(Debug)]
pub enum ResolutionError {
    /// No list with this id exists.
    ListNotFound(ListId),
    /// Persisted smart criteria no longer validate.
    InvalidCriteria(ValidationError),
    /// Record store query failed.
    StoreUnavailable(StoreError),
}

impl Display for ResolutionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ListNotFound(id) => write!(f, "list not found: {id}"),
            Self::InvalidCriteria(err) => write!(f, "list criteria cannot be compiled: {err}"),
            Self::StoreUnavailable(err) => write!(f, "could not load members: {err}"),
        }
    }
}

impl Error for ResolutionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ListNotFound(_) => None,
            Self::InvalidCriteria(err) => Some(err),
            Self::StoreUnavailable(err) => Some(err),
        }
    }
}

impl From<ValidationError> for ResolutionError {
    fn from(value: ValidationError) -> Self {
        Self::InvalidCriteria(value)
    }
}

impl From<StoreError> for ResolutionError {
    fn from(value: StoreError) -> Self {
        Self::StoreUnavailable(value)
    }
}

/// Resolves list membership against a record store.
pub struct MembershipResolver<S: RecordStore, C: Clock> {
    store: S,
    clock: C,
}

impl<S: RecordStore, C: Clock> MembershipResolver<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    /// Returns the current members of `list`.
    pub fn resolve(&self, list: &LeadList) -> Result<Vec<ResolvedMember>, ResolutionError> {
        let started_at = Instant::now();
        let rule_count = list.effective_criteria().len();
        let result = match list.kind {
            ListKind::Static => self.resolve_static(list),
            ListKind::Smart => self.resolve_smart(list),
        };

        match &result {
            Ok(members) => info!(
                "event=membership_resolve module=segment status=ok list_id={} kind={} rule_count={} member_count={} duration_ms={}",
                list.id,
                list.kind.as_str(),
                rule_count,
                members.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=membership_resolve module=segment status=error list_id={} kind={} rule_count={} duration_ms={} error={}",
                list.id,
                list.kind.as_str(),
                rule_count,
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    fn resolve_static(&self, list: &LeadList) -> Result<Vec<ResolvedMember>, ResolutionError> {
        let mut members = self
            .store
            .memberships_for_list(list.id)?
            .into_iter()
            .map(|row| ResolvedMember {
                lead: row.lead,
                membership_id: Some(row.id),
                added_by: AddedBy::User(row.added_by),
                added_at: row.added_at,
            })
            .collect::<Vec<_>>();
        members.sort_by(|a, b| a.lead.id.cmp(&b.lead.id));
        Ok(members)
    }

    fn resolve_smart(&self, list: &LeadList) -> Result<Vec<ResolvedMember>, ResolutionError> {
        let predicate =
            compile_criteria(list.organization_id, &list.criteria, self.clock.now_ms())?;
        let mut members = self
            .store
            .query_leads(&predicate)?
            .into_iter()
            .map(|lead| ResolvedMember {
                added_at: lead.created_at,
                lead,
                membership_id: None,
                added_by: AddedBy::SmartRule,
            })
            .collect::<Vec<_>>();
        members.sort_by(|a, b| a.lead.id.cmp(&b.lead.id));
        Ok(members)
    }
}

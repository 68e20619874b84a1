//! List definition use-case service.
//!
//! # Responsibility
//! - Create, update, read and delete list definitions.
//! - Resolve a list's current members by id.
//!
//! # Invariants
//! - Nothing is persisted unless the name is non-blank and the criteria
//!   validate for the list's kind.
//! - Static lists are stored without criteria.
//! - Switching a list to smart drops its static membership rows.

use crate::model::lead::OrganizationId;
use crate::model::list::{LeadList, ListId, ListKind};
use crate::model::rule::Rule;
use crate::repo::list_repo::ListRepository;
use crate::repo::record_store::{RecordStore, StoreError};
use crate::segment::clock::Clock;
use crate::segment::resolver::{MembershipResolver, ResolutionError, ResolvedMember};
use crate::segment::validation::{validate_criteria, ValidationError};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Service error for list definition use-cases.
#[derive(Debug)]
pub enum ListServiceError {
    /// List name is blank after trim.
    BlankName,
    /// Criteria rejected for the requested kind.
    Validation(ValidationError),
    /// Target list does not exist.
    ListNotFound(ListId),
    /// Persistence-layer failure.
    Store(StoreError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for ListServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "list name must not be blank"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::ListNotFound(id) => write!(f, "list not found: {id}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent list state: {details}"),
        }
    }
}

impl Error for ListServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for ListServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for ListServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(id) => Self::ListNotFound(id),
            other => Self::Store(other),
        }
    }
}

/// Request model for creating a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewList {
    pub organization_id: OrganizationId,
    pub name: String,
    pub description: Option<String>,
    pub kind: ListKind,
    /// Required non-empty for smart lists; ignored for static lists.
    pub criteria: Vec<Rule>,
}

/// Partial update for a list; `None` leaves the attribute unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListUpdate {
    pub name: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub kind: Option<ListKind>,
    pub criteria: Option<Vec<Rule>>,
}

/// List definition service facade.
pub struct ListService<L: ListRepository, S: RecordStore, C: Clock> {
    lists: L,
    store: S,
    clock: C,
}

impl<L: ListRepository, S: RecordStore, C: Clock> ListService<L, S, C> {
    pub fn new(lists: L, store: S, clock: C) -> Self {
        Self {
            lists,
            store,
            clock,
        }
    }

    /// Validates and persists a new list.
    pub fn create_list(&self, request: NewList) -> Result<LeadList, ListServiceError> {
        let name = normalize_name(&request.name)?;
        if let Err(err) = validate_criteria(request.kind, &request.criteria) {
            warn!(
                "event=list_create module=service status=rejected kind={} error={}",
                request.kind.as_str(),
                err
            );
            return Err(err.into());
        }

        let now_ms = self.clock.now_ms();
        let list = LeadList {
            id: Uuid::new_v4(),
            organization_id: request.organization_id,
            name,
            description: normalize_description(request.description),
            kind: request.kind,
            criteria: criteria_for(request.kind, request.criteria),
            created_at: now_ms,
            updated_at: now_ms,
        };

        let list_id = self.lists.create_list(&list)?;
        info!(
            "event=list_create module=service status=ok list_id={} kind={} rule_count={}",
            list_id,
            list.kind.as_str(),
            list.criteria.len()
        );
        self.lists
            .get_list(list_id)?
            .ok_or(ListServiceError::InconsistentState(
                "created list not found in read-back",
            ))
    }

    /// Applies a partial update; the previous definition is kept on error.
    pub fn update_list(
        &self,
        list_id: ListId,
        update: ListUpdate,
    ) -> Result<LeadList, ListServiceError> {
        let mut list = self
            .lists
            .get_list(list_id)?
            .ok_or(ListServiceError::ListNotFound(list_id))?;
        let previous_kind = list.kind;

        if let Some(name) = update.name {
            list.name = normalize_name(&name)?;
        }
        if let Some(description) = update.description {
            list.description = normalize_description(description);
        }
        if let Some(kind) = update.kind {
            list.kind = kind;
        }
        if let Some(criteria) = update.criteria {
            list.criteria = criteria;
        }

        if let Err(err) = validate_criteria(list.kind, &list.criteria) {
            warn!(
                "event=list_update module=service status=rejected list_id={} kind={} error={}",
                list_id,
                list.kind.as_str(),
                err
            );
            return Err(err.into());
        }
        list.criteria = criteria_for(list.kind, list.criteria);
        list.updated_at = self.clock.now_ms();

        let dropped_members = self.lists.update_list(&list)?;
        info!(
            "event=list_update module=service status=ok list_id={} kind={} previous_kind={} rule_count={} dropped_members={}",
            list_id,
            list.kind.as_str(),
            previous_kind.as_str(),
            list.criteria.len(),
            dropped_members
        );
        self.lists
            .get_list(list_id)?
            .ok_or(ListServiceError::InconsistentState(
                "updated list not found in read-back",
            ))
    }

    pub fn get_list(&self, list_id: ListId) -> Result<Option<LeadList>, ListServiceError> {
        Ok(self.lists.get_list(list_id)?)
    }

    pub fn list_lists(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Vec<LeadList>, ListServiceError> {
        Ok(self.lists.list_lists(organization_id)?)
    }

    /// Deletes a list and, through the cascade, its static memberships.
    pub fn delete_list(&self, list_id: ListId) -> Result<(), ListServiceError> {
        self.lists.delete_list(list_id)?;
        info!("event=list_delete module=service status=ok list_id={list_id}");
        Ok(())
    }

    /// Resolves the current members of a stored list.
    pub fn resolve_membership(
        &self,
        list_id: ListId,
    ) -> Result<Vec<ResolvedMember>, ResolutionError> {
        let list = self
            .lists
            .get_list(list_id)
            .map_err(ResolutionError::StoreUnavailable)?
            .ok_or(ResolutionError::ListNotFound(list_id))?;
        self.resolve_list(&list)
    }

    /// Resolves the members of an already loaded list definition.
    pub fn resolve_list(&self, list: &LeadList) -> Result<Vec<ResolvedMember>, ResolutionError> {
        MembershipResolver::new(&self.store, &self.clock).resolve(list)
    }
}

fn normalize_name(name: &str) -> Result<String, ListServiceError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ListServiceError::BlankName);
    }
    Ok(trimmed.to_string())
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn criteria_for(kind: ListKind, criteria: Vec<Rule>) -> Vec<Rule> {
    match kind {
        ListKind::Smart => criteria,
        ListKind::Static => Vec::new(),
    }
}

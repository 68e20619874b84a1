//! Static membership use-case service.
//!
//! # Responsibility
//! - Add and remove leads on static lists.
//! - Apply a lead's [`PendingChangeSet`] as one batch.
//!
//! # Invariants
//! - Smart lists never receive membership writes.
//! - Adding an existing member is idempotent; removing a non-member is a
//!   no-op.
//! - A commit applies entries one by one without rollback and reports every
//!   entry that failed.
//! - A staged entry on a smart or missing list fails; it is never skipped.

use crate::model::lead::LeadId;
use crate::model::list::{ListId, ListKind};
use crate::repo::list_repo::ListRepository;
use crate::repo::record_store::{MembershipId, RecordStore, StoreError};
use crate::segment::clock::Clock;
use crate::segment::pending::{ChangeAction, MembershipChange, PendingChangeSet};
use log::{error, info, warn};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Failure of one membership mutation.
#[derive(Debug)]
pub enum MutationError {
    /// Target list does not exist.
    ListNotFound(ListId),
    /// Target list is smart; its membership cannot be edited.
    WrongListType(ListId),
    /// Reading the list or current memberships failed.
    StoreReadFailed(StoreError),
    /// Underlying insert/delete failed.
    StoreWriteFailed(StoreError),
}

impl Display for MutationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ListNotFound(id) => write!(f, "list not found: {id}"),
            Self::WrongListType(id) => {
                write!(f, "list {id} is smart; membership is computed from its rules")
            }
            Self::StoreReadFailed(err) => write!(f, "membership read failed: {err}"),
            Self::StoreWriteFailed(err) => write!(f, "membership write failed: {err}"),
        }
    }
}

impl Error for MutationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StoreReadFailed(err) | Self::StoreWriteFailed(err) => Some(err),
            _ => None,
        }
    }
}

/// One staged change that could not be applied.
#[derive(Debug)]
pub struct FailedChange {
    pub change: MembershipChange,
    pub error: MutationError,
}

/// Outcome of a fully successful commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Changes written to the store, in issue order.
    pub applied: Vec<MembershipChange>,
    /// Changes dropped because they already held.
    pub skipped: Vec<MembershipChange>,
}

/// Commit that left some entries unapplied.
///
/// `applied` entries stay applied; nothing is rolled back.
#[derive(Debug)]
pub struct CommitError {
    pub lead_id: LeadId,
    pub report: CommitReport,
    pub failed: Vec<FailedChange>,
}

impl CommitError {
    /// Change set holding only the failed entries, ready to retry.
    pub fn restage(&self) -> PendingChangeSet {
        PendingChangeSet::from_changes(self.failed.iter().map(|failed| failed.change))
    }
}

impl Display for CommitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} of {} membership change(s) failed for lead {}",
            self.failed.len(),
            self.failed.len() + self.report.applied.len(),
            self.lead_id
        )?;
        if let Some(first) = self.failed.first() {
            write!(f, "; first failure: {}", first.error)?;
        }
        Ok(())
    }
}

impl Error for CommitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.failed
            .first()
            .map(|failed| &failed.error as &(dyn Error + 'static))
    }
}

/// Static membership service facade.
pub struct MembershipService<L: ListRepository, S: RecordStore, C: Clock> {
    lists: L,
    store: S,
    clock: C,
}

impl<L: ListRepository, S: RecordStore, C: Clock> MembershipService<L, S, C> {
    pub fn new(lists: L, store: S, clock: C) -> Self {
        Self {
            lists,
            store,
            clock,
        }
    }

    /// Adds `lead_id` to a static list on behalf of `acting_user`.
    ///
    /// Returns the existing membership id when the lead is already a member.
    pub fn add_member(
        &self,
        list_id: ListId,
        lead_id: LeadId,
        acting_user: &str,
    ) -> Result<MembershipId, MutationError> {
        self.ensure_static(list_id)?;
        self.insert_member(list_id, lead_id, acting_user)
    }

    /// Removes `lead_id` from a static list; removing a non-member succeeds.
    pub fn remove_member(&self, list_id: ListId, lead_id: LeadId) -> Result<(), MutationError> {
        self.ensure_static(list_id)?;
        self.delete_member(list_id, lead_id)
    }

    fn insert_member(
        &self,
        list_id: ListId,
        lead_id: LeadId,
        acting_user: &str,
    ) -> Result<MembershipId, MutationError> {
        match self
            .store
            .insert_membership(list_id, lead_id, acting_user, self.clock.now_ms())
        {
            Ok(membership_id) => {
                info!(
                    "event=member_add module=service status=ok list_id={list_id} lead_id={lead_id} membership_id={membership_id}"
                );
                Ok(membership_id)
            }
            Err(err) => {
                error!(
                    "event=member_add module=service status=error list_id={list_id} lead_id={lead_id} error={err}"
                );
                Err(MutationError::StoreWriteFailed(err))
            }
        }
    }

    fn delete_member(&self, list_id: ListId, lead_id: LeadId) -> Result<(), MutationError> {
        match self.store.delete_membership(list_id, lead_id) {
            Ok(removed) => {
                info!(
                    "event=member_remove module=service status=ok list_id={list_id} lead_id={lead_id} removed={removed}"
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=member_remove module=service status=error list_id={list_id} lead_id={lead_id} error={err}"
                );
                Err(MutationError::StoreWriteFailed(err))
            }
        }
    }

    /// Static lists `lead_id` currently belongs to.
    pub fn current_lists(&self, lead_id: LeadId) -> Result<BTreeSet<ListId>, MutationError> {
        self.store
            .lists_for_lead(lead_id)
            .map(|list_ids| list_ids.into_iter().collect())
            .map_err(MutationError::StoreReadFailed)
    }

    /// Applies staged changes for `lead_id`.
    ///
    /// Every staged entry is checked against its list first: a missing or
    /// smart list fails the entry. Entries on static lists that already hold
    /// against current memberships are reported as skipped. Remaining
    /// entries are issued sequentially (adds, then removes) and a failing
    /// entry does not stop later ones.
    pub fn commit(
        &self,
        pending: PendingChangeSet,
        lead_id: LeadId,
        acting_user: &str,
    ) -> Result<CommitReport, CommitError> {
        let mut report = CommitReport::default();
        let mut failed = Vec::new();

        let planned = match self.current_lists(lead_id) {
            Ok(current) => Some(pending.plan(&current)),
            Err(err) => {
                warn!(
                    "event=pending_commit module=service status=degraded lead_id={lead_id} error={err}"
                );
                None
            }
        };

        for change in pending.changes() {
            if let Err(error) = self.ensure_static(change.list_id) {
                failed.push(FailedChange { change, error });
                continue;
            }
            if planned
                .as_ref()
                .is_some_and(|planned| !planned.changes().any(|kept| kept == change))
            {
                report.skipped.push(change);
                continue;
            }

            let outcome = match change.action {
                ChangeAction::Add => self
                    .insert_member(change.list_id, lead_id, acting_user)
                    .map(|_| ()),
                ChangeAction::Remove => self.delete_member(change.list_id, lead_id),
            };
            match outcome {
                Ok(()) => report.applied.push(change),
                Err(error) => failed.push(FailedChange { change, error }),
            }
        }

        if failed.is_empty() {
            info!(
                "event=pending_commit module=service status=ok lead_id={lead_id} applied={} skipped={} failed=0",
                report.applied.len(),
                report.skipped.len()
            );
            return Ok(report);
        }

        error!(
            "event=pending_commit module=service status=error lead_id={lead_id} applied={} skipped={} failed={}",
            report.applied.len(),
            report.skipped.len(),
            failed.len()
        );
        Err(CommitError {
            lead_id,
            report,
            failed,
        })
    }

    fn ensure_static(&self, list_id: ListId) -> Result<(), MutationError> {
        let list = self
            .lists
            .get_list(list_id)
            .map_err(MutationError::StoreReadFailed)?
            .ok_or(MutationError::ListNotFound(list_id))?;
        match list.kind {
            ListKind::Static => Ok(()),
            ListKind::Smart => Err(MutationError::WrongListType(list_id)),
        }
    }
}

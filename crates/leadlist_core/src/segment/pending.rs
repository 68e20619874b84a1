//! Pending membership changes for one lead.
//!
//! # Responsibility
//! - Stage add/remove intentions across lists while a lead's memberships
//!   are being edited, before anything is written.
//! - Compose the optimistic "current + staged" view the editor renders.
//!
//! # Invariants
//! - `to_add` and `to_remove` are disjoint at all times.
//! - Staging the same intention twice is a no-op.
//! - Nothing here touches the store; dropping a change set discards it.

use crate::model::list::ListId;
use serde::Serialize;
use std::collections::BTreeSet;

/// Direction of one membership change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Add,
    Remove,
}

/// One staged membership change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MembershipChange {
    pub list_id: ListId,
    pub action: ChangeAction,
}

/// Staged, uncommitted membership edits for one lead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingChangeSet {
    to_add: BTreeSet<ListId>,
    to_remove: BTreeSet<ListId>,
}

impl PendingChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a change set from individual changes, later entries winning.
    pub fn from_changes(changes: impl IntoIterator<Item = MembershipChange>) -> Self {
        let mut pending = Self::new();
        for change in changes {
            pending.stage(change);
        }
        pending
    }

    /// Stages adding the lead to `list_id`, cancelling a staged removal.
    pub fn stage_add(&mut self, list_id: ListId) -> &mut Self {
        self.to_remove.remove(&list_id);
        self.to_add.insert(list_id);
        self
    }

    /// Stages removing the lead from `list_id`, cancelling a staged add.
    pub fn stage_remove(&mut self, list_id: ListId) -> &mut Self {
        self.to_add.remove(&list_id);
        self.to_remove.insert(list_id);
        self
    }

    pub fn stage(&mut self, change: MembershipChange) -> &mut Self {
        match change.action {
            ChangeAction::Add => self.stage_add(change.list_id),
            ChangeAction::Remove => self.stage_remove(change.list_id),
        }
    }

    /// Drops any staged intention for `list_id`.
    pub fn unstage(&mut self, list_id: ListId) -> &mut Self {
        self.to_add.remove(&list_id);
        self.to_remove.remove(&list_id);
        self
    }

    /// Abandons the edit session without applying anything.
    pub fn discard(self) {}

    pub fn to_add(&self) -> &BTreeSet<ListId> {
        &self.to_add
    }

    pub fn to_remove(&self) -> &BTreeSet<ListId> {
        &self.to_remove
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    pub fn len(&self) -> usize {
        self.to_add.len() + self.to_remove.len()
    }

    /// Memberships to render while editing: `current ∪ to_add ∖ to_remove`.
    pub fn effective_lists(&self, current: &BTreeSet<ListId>) -> BTreeSet<ListId> {
        current
            .union(&self.to_add)
            .filter(|list_id| !self.to_remove.contains(*list_id))
            .copied()
            .collect()
    }

    /// Drops entries that would not change `current`: adds for lists the
    /// lead is already in and removes for lists it is not in.
    pub fn plan(&self, current: &BTreeSet<ListId>) -> PendingChangeSet {
        PendingChangeSet {
            to_add: self.to_add.difference(current).copied().collect(),
            to_remove: self.to_remove.intersection(current).copied().collect(),
        }
    }

    /// Changes in commit order: adds, then removes, each by list id.
    pub fn changes(&self) -> impl Iterator<Item = MembershipChange> + '_ {
        let adds = self.to_add.iter().map(|list_id| MembershipChange {
            list_id: *list_id,
            action: ChangeAction::Add,
        });
        let removes = self.to_remove.iter().map(|list_id| MembershipChange {
            list_id: *list_id,
            action: ChangeAction::Remove,
        });
        adds.chain(removes)
    }
}

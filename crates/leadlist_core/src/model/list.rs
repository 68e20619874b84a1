//! Lead list model.
//!
//! # Invariants
//! - `name` is non-blank.
//! - `criteria` is meaningful only for `ListKind::Smart`; static lists keep
//!   it empty and resolution ignores it.

use crate::model::lead::OrganizationId;
use crate::model::rule::Rule;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable list identifier.
pub type ListId = Uuid;

/// How a list's membership is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    /// Membership is an explicit, curated set of `list_members` rows.
    Static,
    /// Membership is computed from `criteria` on every resolution.
    Smart,
}

impl ListKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ListKind::Static => "static",
            ListKind::Smart => "smart",
        }
    }
}

/// Persisted list definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadList {
    pub id: ListId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: ListKind,
    /// Conjunctive rule sequence, in editor order.
    pub criteria: Vec<Rule>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl LeadList {
    pub fn is_smart(&self) -> bool {
        self.kind == ListKind::Smart
    }

    /// Criteria that resolution actually evaluates.
    ///
    /// Always empty for static lists, whatever `criteria` holds.
    pub fn effective_criteria(&self) -> &[Rule] {
        match self.kind {
            ListKind::Smart => &self.criteria,
            ListKind::Static => &[],
        }
    }
}

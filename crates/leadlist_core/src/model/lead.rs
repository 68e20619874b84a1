//! Lead record model.
//!
//! Leads are owned by the surrounding CRM; this crate only reads their
//! attributes to evaluate list criteria and links them to static lists.
//!
//! # Invariants
//! - `id` is stable and never reused for another lead.
//! - `created_at`/`updated_at` are Unix epoch milliseconds.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable lead identifier.
pub type LeadId = Uuid;

/// Organization scope shared by leads and lists.
pub type OrganizationId = Uuid;

/// Queryable lead attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub organization_id: OrganizationId,
    /// Display name; required.
    pub name: String,
    pub email: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub industry: Option<String>,
    pub location: Option<String>,
    /// Pipeline status label, e.g. `New`, `Qualified`, `Lost`.
    pub status: String,
    pub source: Option<String>,
    /// Lead score; `None` when the lead was never scored.
    pub score: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Lead {
    /// Creates a lead with status `New` and both timestamps set to
    /// `created_at`.
    pub fn new(organization_id: OrganizationId, name: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id,
            name: name.into(),
            email: None,
            company: None,
            title: None,
            industry: None,
            location: None,
            status: "New".to_string(),
            source: None,
            score: None,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_score(mut self, score: i64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

//! Lead repository contracts and SQLite implementation.
//!
//! Lead CRUD belongs to the surrounding CRM; this repository exists so the
//! engine (and its tests) can populate and read the `leads` table the
//! record store queries.
//!
//! # Invariants
//! - Reads reject rows whose ids do not parse instead of masking them.
//! - `list_leads` is ordered by `id ASC`.

use crate::model::lead::{Lead, LeadId, OrganizationId};
use crate::repo::record_store::{ensure_connection_ready, StoreError, StoreResult};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

pub(crate) const LEAD_COLUMNS: &str = "leads.id,
    leads.organization_id,
    leads.name,
    leads.email,
    leads.company,
    leads.title,
    leads.industry,
    leads.location,
    leads.status,
    leads.source,
    leads.score,
    leads.created_at,
    leads.updated_at";

/// Repository interface for lead rows.
pub trait LeadRepository {
    fn create_lead(&self, lead: &Lead) -> StoreResult<LeadId>;
    fn update_lead(&self, lead: &Lead) -> StoreResult<()>;
    fn get_lead(&self, id: LeadId) -> StoreResult<Option<Lead>>;
    fn list_leads(&self, organization_id: OrganizationId) -> StoreResult<Vec<Lead>>;
}

/// SQLite-backed lead repository.
pub struct SqliteLeadRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLeadRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl LeadRepository for SqliteLeadRepository<'_> {
    fn create_lead(&self, lead: &Lead) -> StoreResult<LeadId> {
        if lead.name.trim().is_empty() {
            return Err(StoreError::InvalidData("lead name must not be blank".to_string()));
        }

        self.conn.execute(
            "INSERT INTO leads (
                id,
                organization_id,
                name,
                email,
                company,
                title,
                industry,
                location,
                status,
                source,
                score,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);",
            params![
                lead.id.to_string(),
                lead.organization_id.to_string(),
                lead.name.as_str(),
                lead.email.as_deref(),
                lead.company.as_deref(),
                lead.title.as_deref(),
                lead.industry.as_deref(),
                lead.location.as_deref(),
                lead.status.as_str(),
                lead.source.as_deref(),
                lead.score,
                lead.created_at,
                lead.updated_at,
            ],
        )?;

        Ok(lead.id)
    }

    fn update_lead(&self, lead: &Lead) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE leads
             SET
                name = ?2,
                email = ?3,
                company = ?4,
                title = ?5,
                industry = ?6,
                location = ?7,
                status = ?8,
                source = ?9,
                score = ?10,
                updated_at = ?11
             WHERE id = ?1;",
            params![
                lead.id.to_string(),
                lead.name.as_str(),
                lead.email.as_deref(),
                lead.company.as_deref(),
                lead.title.as_deref(),
                lead.industry.as_deref(),
                lead.location.as_deref(),
                lead.status.as_str(),
                lead.source.as_deref(),
                lead.score,
                lead.updated_at,
            ],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound(lead.id));
        }
        Ok(())
    }

    fn get_lead(&self, id: LeadId) -> StoreResult<Option<Lead>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_lead_row(row)?));
        }
        Ok(None)
    }

    fn list_leads(&self, organization_id: OrganizationId) -> StoreResult<Vec<Lead>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {LEAD_COLUMNS}
             FROM leads
             WHERE organization_id = ?1
             ORDER BY id ASC;"
        ))?;
        let mut rows = stmt.query([organization_id.to_string()])?;
        let mut leads = Vec::new();
        while let Some(row) = rows.next()? {
            leads.push(parse_lead_row(row)?);
        }
        Ok(leads)
    }
}

/// Parses one row selected with [`LEAD_COLUMNS`].
pub(crate) fn parse_lead_row(row: &Row<'_>) -> StoreResult<Lead> {
    Ok(Lead {
        id: parse_uuid(&row.get::<_, String>("id")?, "leads.id")?,
        organization_id: parse_uuid(
            &row.get::<_, String>("organization_id")?,
            "leads.organization_id",
        )?,
        name: row.get("name")?,
        email: row.get("email")?,
        company: row.get("company")?,
        title: row.get("title")?,
        industry: row.get("industry")?,
        location: row.get("location")?,
        status: row.get("status")?,
        source: row.get("source")?,
        score: row.get("score")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| StoreError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

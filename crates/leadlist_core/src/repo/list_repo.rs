//! List definition repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist list definitions, with smart criteria encoded as JSON.
//! - Keep static membership rows consistent with the list's kind.
//!
//! # Invariants
//! - Static lists persist `criteria_json = NULL`.
//! - Saving a list as smart drops its static membership rows in the same
//!   transaction.
//! - Deleting a list cascades to its membership rows.

use crate::model::lead::OrganizationId;
use crate::model::list::{LeadList, ListId, ListKind};
use crate::model::rule::Rule;
use crate::repo::lead_repo::parse_uuid;
use crate::repo::record_store::{ensure_connection_ready, StoreError, StoreResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const LIST_SELECT_SQL: &str = "SELECT
    id,
    organization_id,
    name,
    description,
    kind,
    criteria_json,
    created_at,
    updated_at
FROM lists";

/// Repository interface for list definitions.
pub trait ListRepository {
    fn create_list(&self, list: &LeadList) -> StoreResult<ListId>;
    /// Replaces name, description, kind and criteria.
    ///
    /// Returns how many static membership rows were dropped because the list
    /// switched from static to smart.
    fn update_list(&self, list: &LeadList) -> StoreResult<usize>;
    fn get_list(&self, id: ListId) -> StoreResult<Option<LeadList>>;
    /// Lists an organization's lists ordered by name, then id.
    fn list_lists(&self, organization_id: OrganizationId) -> StoreResult<Vec<LeadList>>;
    fn delete_list(&self, id: ListId) -> StoreResult<()>;
}

/// SQLite-backed list repository.
pub struct SqliteListRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteListRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ListRepository for SqliteListRepository<'_> {
    fn create_list(&self, list: &LeadList) -> StoreResult<ListId> {
        self.conn.execute(
            "INSERT INTO lists (
                id,
                organization_id,
                name,
                description,
                kind,
                criteria_json,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                list.id.to_string(),
                list.organization_id.to_string(),
                list.name.as_str(),
                list.description.as_deref(),
                list.kind.as_str(),
                encode_criteria(list)?,
                list.created_at,
                list.updated_at,
            ],
        )?;

        Ok(list.id)
    }

    fn update_list(&self, list: &LeadList) -> StoreResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let list_id = list.id.to_string();
        let previous_kind = tx
            .query_row(
                "SELECT kind FROM lists WHERE id = ?1;",
                [list_id.as_str()],
                |row| row.get::<_, String>(0),
            )
            .optional()?
            .ok_or(StoreError::NotFound(list.id))?;

        tx.execute(
            "UPDATE lists
             SET
                name = ?2,
                description = ?3,
                kind = ?4,
                criteria_json = ?5,
                updated_at = ?6
             WHERE id = ?1;",
            params![
                list_id.as_str(),
                list.name.as_str(),
                list.description.as_deref(),
                list.kind.as_str(),
                encode_criteria(list)?,
                list.updated_at,
            ],
        )?;

        let dropped = if list.kind == ListKind::Smart && previous_kind == ListKind::Static.as_str()
        {
            tx.execute(
                "DELETE FROM list_members WHERE list_id = ?1;",
                [list_id.as_str()],
            )?
        } else {
            0
        };

        tx.commit()?;
        Ok(dropped)
    }

    fn get_list(&self, id: ListId) -> StoreResult<Option<LeadList>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{LIST_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_list_row(row)?));
        }
        Ok(None)
    }

    fn list_lists(&self, organization_id: OrganizationId) -> StoreResult<Vec<LeadList>> {
        let mut stmt = self.conn.prepare(&format!(
            "{LIST_SELECT_SQL}
             WHERE organization_id = ?1
             ORDER BY name COLLATE NOCASE ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([organization_id.to_string()])?;
        let mut lists = Vec::new();
        while let Some(row) = rows.next()? {
            lists.push(parse_list_row(row)?);
        }
        Ok(lists)
    }

    fn delete_list(&self, id: ListId) -> StoreResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM lists WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

fn encode_criteria(list: &LeadList) -> StoreResult<Option<String>> {
    match list.kind {
        ListKind::Static => Ok(None),
        ListKind::Smart => serde_json::to_string(&list.criteria)
            .map(Some)
            .map_err(|err| StoreError::InvalidData(format!("cannot encode criteria: {err}"))),
    }
}

fn parse_list_row(row: &Row<'_>) -> StoreResult<LeadList> {
    let kind_text: String = row.get("kind")?;
    let kind = parse_list_kind(&kind_text).ok_or_else(|| {
        StoreError::InvalidData(format!("invalid list kind `{kind_text}` in lists.kind"))
    })?;

    let criteria = match (kind, row.get::<_, Option<String>>("criteria_json")?) {
        (ListKind::Smart, Some(json)) => serde_json::from_str::<Vec<Rule>>(&json).map_err(|err| {
            StoreError::InvalidData(format!("invalid criteria in lists.criteria_json: {err}"))
        })?,
        (ListKind::Smart, None) => {
            return Err(StoreError::InvalidData(
                "smart list without lists.criteria_json".to_string(),
            ));
        }
        (ListKind::Static, _) => Vec::new(),
    };

    Ok(LeadList {
        id: parse_uuid(&row.get::<_, String>("id")?, "lists.id")?,
        organization_id: parse_uuid(
            &row.get::<_, String>("organization_id")?,
            "lists.organization_id",
        )?,
        name: row.get("name")?,
        description: row.get("description")?,
        kind,
        criteria,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_list_kind(value: &str) -> Option<ListKind> {
    match value {
        "static" => Some(ListKind::Static),
        "smart" => Some(ListKind::Smart),
        _ => None,
    }
}

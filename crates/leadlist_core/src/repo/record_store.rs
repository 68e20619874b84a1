//! Record store contract and SQLite implementation.
//!
//! # Responsibility
//! - Execute compiled [`LeadPredicate`]s against the `leads` table.
//! - Own reads and writes of static `list_members` rows.
//!
//! # Invariants
//! - Query results are ordered by lead id so pagination stays stable.
//! - `(list_id, lead_id)` is unique; inserting an existing pair returns the
//!   existing membership id instead of creating a duplicate.
//! - Deleting a missing pair is not an error.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::lead::{Lead, LeadId};
use crate::model::list::ListId;
use crate::model::rule::LeadField;
use crate::repo::lead_repo::{parse_lead_row, parse_uuid, LEAD_COLUMNS};
use crate::segment::catalog::{fold_text, NumericOperator, TextOperator};
use crate::segment::predicate::{DateTest, FieldFilter, FilterTest, LeadPredicate};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one static membership row.
pub type MembershipId = Uuid;

pub type StoreResult<T> = Result<T, StoreError>;

/// SQL scalar applying [`fold_text`]; NULL folds to `''`.
const FOLD_FUNCTION: &str = "leadlist_fold";

/// Record store failure.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target row does not exist.
    NotFound(Uuid),
    /// Persisted data cannot be converted into the read model.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Store could not be reached (transport, timeout, shutdown).
    Unavailable(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid record data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "record store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::Unavailable(message) => write!(f, "record store unavailable: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Static membership row joined with its lead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipRow {
    pub id: MembershipId,
    pub list_id: ListId,
    pub lead: Lead,
    /// Acting user who added the lead.
    pub added_by: String,
    /// Epoch ms of the add.
    pub added_at: i64,
}

/// Narrow query/write capability the list engine consumes.
pub trait RecordStore {
    /// Returns leads matching `predicate`, ordered by lead id.
    fn query_leads(&self, predicate: &LeadPredicate) -> StoreResult<Vec<Lead>>;
    /// Links a lead to a list; idempotent per `(list_id, lead_id)`.
    fn insert_membership(
        &self,
        list_id: ListId,
        lead_id: LeadId,
        added_by: &str,
        added_at: i64,
    ) -> StoreResult<MembershipId>;
    /// Unlinks a lead from a list. Returns whether a row was removed.
    fn delete_membership(&self, list_id: ListId, lead_id: LeadId) -> StoreResult<bool>;
    fn memberships_for_list(&self, list_id: ListId) -> StoreResult<Vec<MembershipRow>>;
    /// Reverse lookup: static lists the lead belongs to, ordered by list id.
    fn lists_for_lead(&self, lead_id: LeadId) -> StoreResult<Vec<ListId>>;
}

impl<S: RecordStore + ?Sized> RecordStore for &S {
    fn query_leads(&self, predicate: &LeadPredicate) -> StoreResult<Vec<Lead>> {
        (**self).query_leads(predicate)
    }

    fn insert_membership(
        &self,
        list_id: ListId,
        lead_id: LeadId,
        added_by: &str,
        added_at: i64,
    ) -> StoreResult<MembershipId> {
        (**self).insert_membership(list_id, lead_id, added_by, added_at)
    }

    fn delete_membership(&self, list_id: ListId, lead_id: LeadId) -> StoreResult<bool> {
        (**self).delete_membership(list_id, lead_id)
    }

    fn memberships_for_list(&self, list_id: ListId) -> StoreResult<Vec<MembershipRow>> {
        (**self).memberships_for_list(list_id)
    }

    fn lists_for_lead(&self, lead_id: LeadId) -> StoreResult<Vec<ListId>> {
        (**self).lists_for_lead(lead_id)
    }
}

/// SQLite-backed record store.
pub struct SqliteRecordStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRecordStore<'conn> {
    /// Constructs a store from a migrated connection.
    ///
    /// Registers the text folding function its queries depend on.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_connection_ready(conn)?;
        register_fold_function(conn)?;
        Ok(Self { conn })
    }
}

impl RecordStore for SqliteRecordStore<'_> {
    fn query_leads(&self, predicate: &LeadPredicate) -> StoreResult<Vec<Lead>> {
        let (where_sql, bind_values) = render_predicate(predicate);
        let sql = format!("SELECT {LEAD_COLUMNS} FROM leads WHERE {where_sql} ORDER BY leads.id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut leads = Vec::new();
        while let Some(row) = rows.next()? {
            leads.push(parse_lead_row(row)?);
        }
        Ok(leads)
    }

    fn insert_membership(
        &self,
        list_id: ListId,
        lead_id: LeadId,
        added_by: &str,
        added_at: i64,
    ) -> StoreResult<MembershipId> {
        let list_id_text = list_id.to_string();
        let lead_id_text = lead_id.to_string();
        self.conn.execute(
            "INSERT INTO list_members (id, list_id, lead_id, added_by, added_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (list_id, lead_id) DO NOTHING;",
            params![
                Uuid::new_v4().to_string(),
                list_id_text.as_str(),
                lead_id_text.as_str(),
                added_by,
                added_at,
            ],
        )?;

        let id_text: String = self.conn.query_row(
            "SELECT id FROM list_members WHERE list_id = ?1 AND lead_id = ?2;",
            params![list_id_text.as_str(), lead_id_text.as_str()],
            |row| row.get(0),
        )?;
        parse_uuid(&id_text, "list_members.id")
    }

    fn delete_membership(&self, list_id: ListId, lead_id: LeadId) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM list_members WHERE list_id = ?1 AND lead_id = ?2;",
            params![list_id.to_string(), lead_id.to_string()],
        )?;
        Ok(changed > 0)
    }

    fn memberships_for_list(&self, list_id: ListId) -> StoreResult<Vec<MembershipRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT
                {LEAD_COLUMNS},
                list_members.id AS membership_id,
                list_members.added_by AS added_by,
                list_members.added_at AS added_at
             FROM list_members
             INNER JOIN leads ON leads.id = list_members.lead_id
             WHERE list_members.list_id = ?1
             ORDER BY leads.id ASC;"
        ))?;
        let mut rows = stmt.query([list_id.to_string()])?;
        let mut memberships = Vec::new();
        while let Some(row) = rows.next()? {
            let membership_id: String = row.get("membership_id")?;
            memberships.push(MembershipRow {
                id: parse_uuid(&membership_id, "list_members.id")?,
                list_id,
                lead: parse_lead_row(row)?,
                added_by: row.get("added_by")?,
                added_at: row.get("added_at")?,
            });
        }
        Ok(memberships)
    }

    fn lists_for_lead(&self, lead_id: LeadId) -> StoreResult<Vec<ListId>> {
        let mut stmt = self.conn.prepare(
            "SELECT list_id
             FROM list_members
             WHERE lead_id = ?1
             ORDER BY list_id ASC;",
        )?;
        let mut rows = stmt.query([lead_id.to_string()])?;
        let mut list_ids = Vec::new();
        while let Some(row) = rows.next()? {
            let value: String = row.get(0)?;
            list_ids.push(parse_uuid(&value, "list_members.list_id")?);
        }
        Ok(list_ids)
    }
}

/// Rejects connections whose schema is not fully migrated.
pub(crate) fn ensure_connection_ready(conn: &Connection) -> StoreResult<()> {
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let expected_version = latest_version();
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}

fn register_fold_function(conn: &Connection) -> StoreResult<()> {
    conn.create_scalar_function(
        FOLD_FUNCTION,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value = ctx.get::<Option<String>>(0)?;
            Ok(value.as_deref().map(fold_text).unwrap_or_default())
        },
    )?;
    Ok(())
}

/// Renders a predicate into a SQL `WHERE` body plus bind values.
///
/// Text columns go through [`FOLD_FUNCTION`] and needles are bound already
/// folded, so both sides agree with the in-memory evaluator.
fn render_predicate(predicate: &LeadPredicate) -> (String, Vec<Value>) {
    let mut clauses = vec!["leads.organization_id = ?".to_string()];
    let mut bind_values = vec![Value::Text(predicate.organization_id.to_string())];

    for filter in &predicate.filters {
        clauses.push(render_filter(filter, &mut bind_values));
    }

    (clauses.join(" AND "), bind_values)
}

fn render_filter(filter: &FieldFilter, bind_values: &mut Vec<Value>) -> String {
    let column = column_for(filter.field);
    match &filter.test {
        FilterTest::Text { op, needle } => {
            let lhs = format!("{FOLD_FUNCTION}({column})");
            if needle.is_empty() {
                return match op {
                    TextOperator::Equals => format!("{lhs} = ''"),
                    TextOperator::NotEquals => format!("{lhs} <> ''"),
                    TextOperator::Contains | TextOperator::StartsWith | TextOperator::EndsWith => {
                        "1 = 1".to_string()
                    }
                };
            }
            let needle = Value::Text(fold_text(needle));
            match op {
                TextOperator::Equals => {
                    bind_values.push(needle);
                    format!("{lhs} = ?")
                }
                TextOperator::NotEquals => {
                    bind_values.push(needle);
                    format!("{lhs} <> ?")
                }
                TextOperator::Contains => {
                    bind_values.push(needle);
                    format!("instr({lhs}, ?) > 0")
                }
                TextOperator::StartsWith => {
                    bind_values.push(needle);
                    format!("instr({lhs}, ?) = 1")
                }
                TextOperator::EndsWith => {
                    bind_values.push(needle.clone());
                    bind_values.push(needle.clone());
                    bind_values.push(needle);
                    format!("(length({lhs}) >= length(?) AND substr({lhs}, -length(?)) = ?)")
                }
            }
        }
        FilterTest::Numeric { op, value } => {
            bind_values.push(Value::Real(*value));
            let symbol = match op {
                NumericOperator::Equals => "=",
                NumericOperator::GreaterThan => ">",
                NumericOperator::LessThan => "<",
                NumericOperator::GreaterEqual => ">=",
                NumericOperator::LessEqual => "<=",
            };
            format!("({column} IS NOT NULL AND {column} {symbol} ?)")
        }
        FilterTest::Date(test) => match *test {
            DateTest::Within { start_ms, end_ms } => {
                bind_values.push(Value::Integer(start_ms));
                bind_values.push(Value::Integer(end_ms));
                format!("({column} >= ? AND {column} < ?)")
            }
            DateTest::AtOrAfter(bound_ms) => {
                bind_values.push(Value::Integer(bound_ms));
                format!("{column} >= ?")
            }
            DateTest::Before(bound_ms) => {
                bind_values.push(Value::Integer(bound_ms));
                format!("{column} < ?")
            }
        },
    }
}

fn column_for(field: LeadField) -> &'static str {
    match field {
        LeadField::Name => "leads.name",
        LeadField::Email => "leads.email",
        LeadField::Company => "leads.company",
        LeadField::Title => "leads.title",
        LeadField::Industry => "leads.industry",
        LeadField::Location => "leads.location",
        LeadField::Status => "leads.status",
        LeadField::Source => "leads.source",
        LeadField::Score => "leads.score",
        LeadField::CreatedAt => "leads.created_at",
        LeadField::UpdatedAt => "leads.updated_at",
    }
}

#[cfg(test)]
mod tests {
    use super::render_predicate;
    use crate::model::rule::{LeadField, OperatorName, Rule};
    use crate::segment::predicate::compile_criteria;
    use rusqlite::types::Value;
    use uuid::Uuid;

    #[test]
    fn render_binds_values_in_clause_order() {
        let org = Uuid::new_v4();
        let rules = vec![
            Rule::new(LeadField::Status, OperatorName::Equals, "Qualified"),
            Rule::new(LeadField::Score, OperatorName::GreaterEqual, "50"),
        ];
        let predicate = compile_criteria(org, &rules, 0).expect("compile");
        let (sql, binds) = render_predicate(&predicate);
        assert_eq!(sql.matches('?').count(), binds.len());
        assert_eq!(binds[0], Value::Text(org.to_string()));
        assert_eq!(binds[1], Value::Text("qualified".to_string()));
        assert_eq!(binds[2], Value::Real(50.0));
    }

    #[test]
    fn empty_needle_contains_renders_without_binding() {
        let org = Uuid::new_v4();
        let rules = vec![Rule::new(LeadField::Company, OperatorName::Contains, "")];
        let predicate = compile_criteria(org, &rules, 0).expect("compile");
        let (sql, binds) = render_predicate(&predicate);
        assert!(sql.ends_with("1 = 1"));
        assert_eq!(binds.len(), 1);
    }
}

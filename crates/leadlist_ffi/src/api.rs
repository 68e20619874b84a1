//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose list definition, membership resolution and membership editing
//!   use-cases to Dart via FRB.
//! - Translate core results into flat envelopes the UI can render.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - A member load failure is reported as `MemberLoadState::Failed`, never
//!   as an empty member list.
//! - IDs cross the boundary as hyphenated UUID strings.

use leadlist_core::{
    core_version as core_version_inner, default_operator, init_logging as init_logging_inner,
    operators_for, AddedBy, ChangeAction, CommitError, CoreConfig, FieldClass, LeadField,
    LeadList, ListKind, ListService, MembershipService, NewList, OperatorName, PendingChangeSet,
    ResolvedMember, Rule, SqliteListRepository, SqliteRecordStore, SystemClock,
};
use log::warn;
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::OnceLock;
use uuid::Uuid;

static DB_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Operator picker content for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldOperators {
    /// Field name, e.g. `status`.
    pub field: String,
    /// Comparison class (`text|numeric|date`).
    pub class: String,
    /// Legal operator names in picker order.
    pub operators: Vec<String>,
    /// Operator preselected for a fresh rule row.
    pub default_operator: String,
}

/// Returns the operator picker content for every lead field.
///
/// # FFI contract
/// - Sync call, pure; no DB access.
#[flutter_rust_bridge::frb(sync)]
pub fn field_operators() -> Vec<FieldOperators> {
    LeadField::ALL
        .iter()
        .map(|field| {
            let class = field.class();
            FieldOperators {
                field: field.as_str().to_string(),
                class: class_label(class).to_string(),
                operators: operators_for(class)
                    .iter()
                    .map(|operator| operator.as_str().to_string())
                    .collect(),
                default_operator: default_operator(class).as_str().to_string(),
            }
        })
        .collect()
}

/// One criterion as edited in the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleInput {
    pub field: String,
    pub operator: String,
    pub value: String,
}

/// Action response envelope for list definition calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// List ID on success.
    pub list_id: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl ListActionResponse {
    fn success(message: impl Into<String>, list_id: String) -> Self {
        Self {
            ok: true,
            list_id: Some(list_id),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            list_id: None,
            message: message.into(),
        }
    }
}

/// Creates a list.
///
/// Input semantics:
/// - `kind`: `static` or `smart`.
/// - `criteria`: ignored for static lists; at least one rule for smart lists.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn create_list(
    organization_id: String,
    name: String,
    description: Option<String>,
    kind: String,
    criteria: Vec<RuleInput>,
) -> ListActionResponse {
    let request = match build_new_list(organization_id, name, description, &kind, criteria) {
        Ok(request) => request,
        Err(message) => {
            return ListActionResponse::failure(format!("create_list failed: {message}"));
        }
    };
    let result = with_connection(|conn| {
        list_service(conn)?
            .create_list(request)
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(list) => ListActionResponse::success(created_message(&list), list.id.to_string()),
        Err(err) => ListActionResponse::failure(format!("create_list failed: {err}")),
    }
}

/// Deletes a list together with its static memberships.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn delete_list(list_id: String) -> ListActionResponse {
    let result = parse_id(&list_id, "list_id").and_then(|id| {
        with_connection(|conn| {
            list_service(conn)?
                .delete_list(id)
                .map_err(|err| err.to_string())
        })
        .map(|()| id)
    });
    match result {
        Ok(id) => ListActionResponse::success("List deleted.", id.to_string()),
        Err(err) => ListActionResponse::failure(format!("delete_list failed: {err}")),
    }
}

/// Whether a member list could be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberLoadState {
    /// Members loaded; an empty `items` means the list has no members.
    Loaded,
    /// Members could not be loaded; `items` carries no meaning.
    Failed,
}

/// One resolved list member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberItem {
    pub lead_id: String,
    pub name: String,
    pub email: Option<String>,
    pub company: Option<String>,
    pub status: String,
    /// Acting user for static members; `None` for smart members.
    pub added_by: Option<String>,
    pub added_at: i64,
}

/// Member list response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberListResponse {
    pub state: MemberLoadState,
    pub items: Vec<MemberItem>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

/// Resolves the current members of a list.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - Smart lists are re-evaluated against the wall clock on every call.
#[flutter_rust_bridge::frb(sync)]
pub fn list_members(list_id: String) -> MemberListResponse {
    let result = parse_id(&list_id, "list_id").and_then(|id| {
        with_connection(|conn| {
            list_service(conn)?
                .resolve_membership(id)
                .map_err(|err| err.to_string())
        })
    });
    match result {
        Ok(members) => {
            let items = members.into_iter().map(to_member_item).collect::<Vec<_>>();
            let message = if items.is_empty() {
                "No members.".to_string()
            } else {
                format!("Found {} member(s).", items.len())
            };
            MemberListResponse {
                state: MemberLoadState::Loaded,
                items,
                message,
            }
        }
        Err(err) => MemberListResponse {
            state: MemberLoadState::Failed,
            items: Vec::new(),
            message: format!("list_members failed: {err}"),
        },
    }
}

/// Static lists a lead currently belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadListsResponse {
    pub ok: bool,
    pub list_ids: Vec<String>,
    pub message: String,
}

/// Returns the static lists `lead_id` belongs to, ordered by list id.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn lead_lists(lead_id: String) -> LeadListsResponse {
    let result = parse_id(&lead_id, "lead_id").and_then(|id| {
        with_connection(|conn| {
            membership_service(conn)?
                .current_lists(id)
                .map_err(|err| err.to_string())
        })
    });
    match result {
        Ok(list_ids) => LeadListsResponse {
            ok: true,
            message: format!("Lead is in {} list(s).", list_ids.len()),
            list_ids: list_ids.iter().map(Uuid::to_string).collect(),
        },
        Err(err) => LeadListsResponse {
            ok: false,
            list_ids: Vec::new(),
            message: format!("lead_lists failed: {err}"),
        },
    }
}

/// One change that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedChangeItem {
    pub list_id: String,
    /// `add` or `remove`.
    pub action: String,
    pub message: String,
}

/// Commit response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitResponse {
    /// Whether every staged change was applied or already held.
    pub ok: bool,
    pub applied_count: u32,
    pub skipped_count: u32,
    /// Entries to offer for retry; empty when `ok`.
    pub failed: Vec<FailedChangeItem>,
    pub message: String,
}

/// Applies staged membership changes for one lead.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - Partially applied commits are not rolled back; `failed` lists what is
///   still pending.
#[flutter_rust_bridge::frb(sync)]
pub fn commit_membership_changes(
    lead_id: String,
    acting_user: String,
    to_add: Vec<String>,
    to_remove: Vec<String>,
) -> CommitResponse {
    let staged = parse_id(&lead_id, "lead_id").and_then(|lead| {
        let mut pending = PendingChangeSet::new();
        for list_id in &to_add {
            pending.stage_add(parse_id(list_id, "to_add")?);
        }
        for list_id in &to_remove {
            pending.stage_remove(parse_id(list_id, "to_remove")?);
        }
        Ok((lead, pending))
    });
    let (lead, pending) = match staged {
        Ok(staged) => staged,
        Err(err) => return commit_failure(format!("commit_membership_changes failed: {err}")),
    };

    let acting_user = acting_user.trim().to_string();
    let outcome = with_connection(|conn| {
        Ok(membership_service(conn)?.commit(pending, lead, &acting_user))
    });
    match outcome {
        Ok(Ok(report)) => CommitResponse {
            ok: true,
            applied_count: count(report.applied.len()),
            skipped_count: count(report.skipped.len()),
            failed: Vec::new(),
            message: format!("Applied {} change(s).", report.applied.len()),
        },
        Ok(Err(err)) => partial_commit_response(&err),
        Err(err) => commit_failure(format!("commit_membership_changes failed: {err}")),
    }
}

type FfiListService<'conn> =
    ListService<SqliteListRepository<'conn>, SqliteRecordStore<'conn>, SystemClock>;
type FfiMembershipService<'conn> =
    MembershipService<SqliteListRepository<'conn>, SqliteRecordStore<'conn>, SystemClock>;

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| CoreConfig::from_env().db_path)
        .clone()
}

fn with_connection<T>(f: impl FnOnce(&Connection) -> Result<T, String>) -> Result<T, String> {
    let db_path = resolve_db_path();
    let conn = leadlist_core::db::open_db(&db_path).map_err(|err| {
        warn!(
            "event=ffi_db_open module=ffi status=error path={} error={}",
            db_path.display(),
            err
        );
        format!("DB open failed: {err}")
    })?;
    f(&conn)
}

fn list_service(conn: &Connection) -> Result<FfiListService<'_>, String> {
    Ok(ListService::new(
        SqliteListRepository::try_new(conn).map_err(|err| format!("repo init failed: {err}"))?,
        SqliteRecordStore::try_new(conn).map_err(|err| format!("store init failed: {err}"))?,
        SystemClock,
    ))
}

fn membership_service(conn: &Connection) -> Result<FfiMembershipService<'_>, String> {
    Ok(MembershipService::new(
        SqliteListRepository::try_new(conn).map_err(|err| format!("repo init failed: {err}"))?,
        SqliteRecordStore::try_new(conn).map_err(|err| format!("store init failed: {err}"))?,
        SystemClock,
    ))
}

fn build_new_list(
    organization_id: String,
    name: String,
    description: Option<String>,
    kind: &str,
    criteria: Vec<RuleInput>,
) -> Result<NewList, String> {
    let kind = match kind.trim() {
        "static" => ListKind::Static,
        "smart" => ListKind::Smart,
        other => return Err(format!("unsupported list kind `{other}`")),
    };
    let criteria = match kind {
        ListKind::Static => Vec::new(),
        ListKind::Smart => criteria
            .into_iter()
            .map(parse_rule)
            .collect::<Result<Vec<_>, _>>()?,
    };
    Ok(NewList {
        organization_id: parse_id(&organization_id, "organization_id")?,
        name,
        description,
        kind,
        criteria,
    })
}

fn parse_rule(input: RuleInput) -> Result<Rule, String> {
    let field = LeadField::ALL
        .into_iter()
        .find(|field| field.as_str() == input.field.trim())
        .ok_or_else(|| format!("unknown field `{}`", input.field))?;
    let operator = parse_operator(input.operator.trim())
        .ok_or_else(|| format!("unknown operator `{}`", input.operator))?;
    Ok(Rule::new(field, operator, input.value))
}

fn parse_operator(name: &str) -> Option<OperatorName> {
    [FieldClass::Text, FieldClass::Numeric, FieldClass::Date]
        .into_iter()
        .flat_map(operators_for)
        .copied()
        .find(|operator| operator.as_str() == name)
}

fn parse_id(raw: &str, what: &str) -> Result<Uuid, String> {
    Uuid::parse_str(raw.trim()).map_err(|err| format!("invalid {what} `{raw}`: {err}"))
}

fn created_message(list: &LeadList) -> String {
    match list.kind {
        ListKind::Static => "Static list created.".to_string(),
        ListKind::Smart => format!("Smart list created with {} rule(s).", list.criteria.len()),
    }
}

fn to_member_item(member: ResolvedMember) -> MemberItem {
    MemberItem {
        lead_id: member.lead.id.to_string(),
        name: member.lead.name,
        email: member.lead.email,
        company: member.lead.company,
        status: member.lead.status,
        added_by: match member.added_by {
            AddedBy::User(user) => Some(user),
            AddedBy::SmartRule => None,
        },
        added_at: member.added_at,
    }
}

fn partial_commit_response(err: &CommitError) -> CommitResponse {
    CommitResponse {
        ok: false,
        applied_count: count(err.report.applied.len()),
        skipped_count: count(err.report.skipped.len()),
        failed: err
            .failed
            .iter()
            .map(|failed| FailedChangeItem {
                list_id: failed.change.list_id.to_string(),
                action: action_label(failed.change.action).to_string(),
                message: failed.error.to_string(),
            })
            .collect(),
        message: err.to_string(),
    }
}

fn commit_failure(message: String) -> CommitResponse {
    CommitResponse {
        ok: false,
        applied_count: 0,
        skipped_count: 0,
        failed: Vec::new(),
        message,
    }
}

fn count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

fn action_label(action: ChangeAction) -> &'static str {
    match action {
        ChangeAction::Add => "add",
        ChangeAction::Remove => "remove",
    }
}

fn class_label(class: FieldClass) -> &'static str {
    match class {
        FieldClass::Text => "text",
        FieldClass::Numeric => "numeric",
        FieldClass::Date => "date",
    }
}

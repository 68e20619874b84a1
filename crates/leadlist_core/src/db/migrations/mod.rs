//! Ordered schema steps for the lead store.
//!
//! Version 1 creates leads and lists, version 2 adds explicit list members
//! with one row per `(list_id, lead_id)`.
//!
//! # Invariants
//! - Each step's `version` is one above the previous step's.
//! - Either every pending step lands or none does; `PRAGMA user_version`
//!   names the last step that landed.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "leads_and_lists",
        sql: include_str!("0001_init.sql"),
    },
    Migration {
        version: 2,
        name: "list_members",
        sql: include_str!("0002_list_members.sql"),
    },
];

/// Schema version a fully migrated lead store reports.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Upgrades `conn` to [`latest_version`], logging one `db_migrate` event per
/// step.
///
/// Returns how many steps ran; `0` for a store that was already current.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<usize> {
    let current_version = schema_version(conn)?;
    let latest = latest_version();
    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    let pending: Vec<&Migration> = MIGRATIONS
        .iter()
        .skip_while(|migration| migration.version <= current_version)
        .collect();
    if pending.is_empty() {
        return Ok(0);
    }

    let tx = conn.transaction()?;
    for migration in &pending {
        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
        info!(
            "event=db_migrate module=db status=ok version={} name={}",
            migration.version, migration.name
        );
    }
    tx.commit()?;

    Ok(pending.len())
}

fn schema_version(conn: &Connection) -> DbResult<u32> {
    conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))
        .map_err(DbError::from)
}

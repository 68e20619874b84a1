#![allow(dead_code)]

use leadlist_core::db::open_db_in_memory;
use leadlist_core::segment::catalog::DAY_MS;
use leadlist_core::{
    FixedClock, Lead, LeadId, LeadPredicate, LeadRepository, ListId, ListService,
    MembershipId, MembershipRow, MembershipService, OrganizationId, RecordStore,
    SqliteLeadRepository, SqliteListRepository, SqliteRecordStore, StoreError, StoreResult,
};
use rusqlite::Connection;
use std::cell::Cell;
use std::collections::HashSet;

/// 2024-07-03T09:46:40Z
pub const NOW: i64 = 1_720_000_000_000;

pub fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

pub fn days_ago(days: i64) -> i64 {
    NOW - days * DAY_MS
}

pub fn insert_lead(conn: &Connection, lead: &Lead) -> LeadId {
    SqliteLeadRepository::try_new(conn)
        .unwrap()
        .create_lead(lead)
        .unwrap()
}

pub fn list_service<'a>(
    conn: &'a Connection,
    clock: &'a FixedClock,
) -> ListService<SqliteListRepository<'a>, SqliteRecordStore<'a>, &'a FixedClock> {
    ListService::new(
        SqliteListRepository::try_new(conn).unwrap(),
        SqliteRecordStore::try_new(conn).unwrap(),
        clock,
    )
}

pub fn membership_service<'a, S: RecordStore>(
    conn: &'a Connection,
    store: S,
    clock: &'a FixedClock,
) -> MembershipService<SqliteListRepository<'a>, S, &'a FixedClock> {
    MembershipService::new(SqliteListRepository::try_new(conn).unwrap(), store, clock)
}

pub fn member_row_count(conn: &Connection, list_id: ListId) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM list_members WHERE list_id = ?1;",
        [list_id.to_string()],
        |row| row.get(0),
    )
    .unwrap()
}

/// Record store wrapper that fails on demand and counts writes.
pub struct ScriptedStore<S: RecordStore> {
    inner: S,
    failing_lists: HashSet<ListId>,
    fail_queries: bool,
    writes: Cell<usize>,
}

impl<S: RecordStore> ScriptedStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            failing_lists: HashSet::new(),
            fail_queries: false,
            writes: Cell::new(0),
        }
    }

    /// Writes touching `list_id` fail with `StoreError::Unavailable`.
    pub fn failing_writes_for(mut self, list_id: ListId) -> Self {
        self.failing_lists.insert(list_id);
        self
    }

    /// Every read fails with `StoreError::Unavailable`.
    pub fn failing_queries(mut self) -> Self {
        self.fail_queries = true;
        self
    }

    pub fn write_count(&self) -> usize {
        self.writes.get()
    }

    fn check_write(&self, list_id: ListId) -> StoreResult<()> {
        self.writes.set(self.writes.get() + 1);
        if self.failing_lists.contains(&list_id) {
            return Err(StoreError::Unavailable(format!("write to {list_id} timed out")));
        }
        Ok(())
    }

    fn check_read(&self) -> StoreResult<()> {
        if self.fail_queries {
            return Err(StoreError::Unavailable("connection reset".to_string()));
        }
        Ok(())
    }
}

impl<S: RecordStore> RecordStore for ScriptedStore<S> {
    fn query_leads(&self, predicate: &LeadPredicate) -> StoreResult<Vec<Lead>> {
        self.check_read()?;
        self.inner.query_leads(predicate)
    }

    fn insert_membership(
        &self,
        list_id: ListId,
        lead_id: LeadId,
        added_by: &str,
        added_at: i64,
    ) -> StoreResult<MembershipId> {
        self.check_write(list_id)?;
        self.inner
            .insert_membership(list_id, lead_id, added_by, added_at)
    }

    fn delete_membership(&self, list_id: ListId, lead_id: LeadId) -> StoreResult<bool> {
        self.check_write(list_id)?;
        self.inner.delete_membership(list_id, lead_id)
    }

    fn memberships_for_list(&self, list_id: ListId) -> StoreResult<Vec<MembershipRow>> {
        self.check_read()?;
        self.inner.memberships_for_list(list_id)
    }

    fn lists_for_lead(&self, lead_id: LeadId) -> StoreResult<Vec<ListId>> {
        self.check_read()?;
        self.inner.lists_for_lead(lead_id)
    }
}

/// Seeds the shared lead fixture used by the resolution suites.
///
/// | name | status    | source   | score | company   | created          |
/// |------|-----------|----------|-------|-----------|------------------|
/// | Ada  | Qualified | Referral | 80    | Acme Corp | 1 day ago        |
/// | Bob  | qualified | Website  | 80    | -         | 10 days ago      |
/// | Cy   | New       | Referral | 50    | Globex    | 40 days ago      |
/// | Di   | Lost      | -        | -     | acme labs | 2 days ago       |
/// | Ed   | Qualified | Referral | 49    | Initech   | 2024-03-01 12:00 |
pub fn seed_leads(conn: &Connection, org: OrganizationId) -> Vec<Lead> {
    let leads = vec![
        Lead::new(org, "Ada", days_ago(1))
            .with_status("Qualified")
            .with_source("Referral")
            .with_score(80)
            .with_company("Acme Corp")
            .with_email("ada@acme.io"),
        Lead::new(org, "Bob", days_ago(10))
            .with_status("qualified")
            .with_source("Website")
            .with_score(80)
            .with_email("bob@example.com"),
        Lead::new(org, "Cy", days_ago(40))
            .with_status("New")
            .with_source("Referral")
            .with_score(50)
            .with_company("Globex"),
        Lead::new(org, "Di", days_ago(2))
            .with_status("Lost")
            .with_company("acme labs"),
        Lead::new(org, "Ed", 1_709_294_400_000)
            .with_status("Qualified")
            .with_source("Referral")
            .with_score(49)
            .with_company("Initech"),
    ];
    for lead in &leads {
        insert_lead(conn, lead);
    }
    leads
}

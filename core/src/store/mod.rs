//! Tabular persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The study service calls `StudyStore` methods; it never executes SQL directly.
//!
//! `LiftStore` is the SQLite implementation; `MemoryStudyStore` is the
//! in-process double used by tests.

mod groups;
mod memory;
mod study;

pub use memory::MemoryStudyStore;

use crate::{
    error::{LiftError, LiftResult},
    study::{GroupAssignment, Study, StudyField},
    types::{GroupName, StudyId, StudyStatus},
};
use chrono::NaiveDate;
use rusqlite::Connection;
use std::time::Duration;

/// The tabular-store collaborator consumed by the study service.
pub trait StudyStore {
    fn insert_study(&self, study: &Study) -> LiftResult<()>;
    fn study(&self, study_id: &str) -> LiftResult<Option<Study>>;
    fn all_studies(&self) -> LiftResult<Vec<Study>>;
    fn study_exists(&self, study_id: &str) -> LiftResult<bool>;
    fn update_study_field(&self, study_id: &str, field: &StudyField) -> LiftResult<()>;

    /// The study that is `active` with `today` inside its date window.
    /// More than one such study is a data error.
    fn active_study_id(&self, today: NaiveDate) -> LiftResult<Option<StudyId>>;

    fn group_assignments(&self, study_id: &str) -> LiftResult<Vec<GroupAssignment>>;
    fn group_of(&self, study_id: &str, phone_number: &str) -> LiftResult<Option<GroupName>>;

    /// Record the assignment and bump the arm's size together.
    fn assign_to_group(&self, study_id: &str, phone_number: &str, group: GroupName)
        -> LiftResult<()>;

    fn increment_messages_count(&self, study_id: &str) -> LiftResult<()>;

    /// Insert `study` unless another study is currently active.
    ///
    /// The default is a plain read-then-write: two concurrent callers can
    /// both pass the check. Stores that can serialize override it.
    fn insert_study_exclusive(&self, study: &Study, today: NaiveDate) -> LiftResult<()> {
        if self.active_study_id(today)?.is_some() {
            return Err(LiftError::Conflict("There is an active study running.".into()));
        }
        self.insert_study(study)
    }

    /// Set `study_id` active unless a different study is currently active.
    /// Same race caveat as `insert_study_exclusive`.
    fn activate_exclusive(&self, study_id: &str, today: NaiveDate) -> LiftResult<()> {
        if let Some(active) = self.active_study_id(today)? {
            if active != study_id {
                return Err(LiftError::Conflict(
                    "There is already an active study running.".into(),
                ));
            }
        }
        self.update_study_field(study_id, &StudyField::Status(StudyStatus::Active))
    }
}

pub struct LiftStore {
    conn: Connection,
}

impl LiftStore {
    pub fn open(path: &str) -> LiftResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        // Exclusive writers queue behind each other instead of failing fast.
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> LiftResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order. Idempotent.
    pub fn migrate(&self) -> LiftResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_lift_studies.sql"))?;
        Ok(())
    }

    pub fn schema_version(&self) -> LiftResult<i64> {
        let version = self.conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM db_version",
            [],
            |row| row.get(0),
        )?;
        Ok(version)
    }
}

impl StudyStore for LiftStore {
    fn insert_study(&self, study: &Study) -> LiftResult<()> {
        study::insert_study(&self.conn, study)
    }

    fn study(&self, study_id: &str) -> LiftResult<Option<Study>> {
        study::select_study(&self.conn, study_id)
    }

    fn all_studies(&self) -> LiftResult<Vec<Study>> {
        study::select_all_studies(&self.conn)
    }

    fn study_exists(&self, study_id: &str) -> LiftResult<bool> {
        study::study_exists(&self.conn, study_id)
    }

    fn update_study_field(&self, study_id: &str, field: &StudyField) -> LiftResult<()> {
        study::update_study_field(&self.conn, study_id, field)
    }

    fn active_study_id(&self, today: NaiveDate) -> LiftResult<Option<StudyId>> {
        study::active_study_id(&self.conn, today)
    }

    fn group_assignments(&self, study_id: &str) -> LiftResult<Vec<GroupAssignment>> {
        groups::group_assignments(&self.conn, study_id)
    }

    fn group_of(&self, study_id: &str, phone_number: &str) -> LiftResult<Option<GroupName>> {
        groups::group_of(&self.conn, study_id, phone_number)
    }

    fn assign_to_group(
        &self,
        study_id: &str,
        phone_number: &str,
        group: GroupName,
    ) -> LiftResult<()> {
        groups::assign_to_group(&self.conn, study_id, phone_number, group)
    }

    fn increment_messages_count(&self, study_id: &str) -> LiftResult<()> {
        groups::increment_messages_count(&self.conn, study_id)
    }

    fn insert_study_exclusive(&self, study: &Study, today: NaiveDate) -> LiftResult<()> {
        study::insert_study_exclusive(&self.conn, study, today)
    }

    fn activate_exclusive(&self, study_id: &str, today: NaiveDate) -> LiftResult<()> {
        study::activate_exclusive(&self.conn, study_id, today)
    }
}

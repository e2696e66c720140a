//! `lift_studies` queries.

use crate::{
    error::{LiftError, LiftResult},
    study::{Study, StudyField},
    types::{StudyId, StudyStatus},
};
use chrono::NaiveDate;
use rusqlite::{
    params, types::Type, Connection, OptionalExtension, Row, Transaction, TransactionBehavior,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

const STUDY_COLUMNS: &str = "id, name, start_date, end_date, sample_size, template_names,
     control_group_size, test_group_size, messages_count, avg_message_cost, status";

pub(super) fn insert_study(conn: &Connection, s: &Study) -> LiftResult<()> {
    conn.execute(
        "INSERT INTO lift_studies (
            id, name, start_date, end_date, sample_size, template_names,
            control_group_size, test_group_size, messages_count, avg_message_cost, status
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            &s.id,
            &s.name,
            s.start_date.format(DATE_FORMAT).to_string(),
            s.end_date.format(DATE_FORMAT).to_string(),
            s.sample_size,
            &s.template_names,
            s.control_group_size,
            s.test_group_size,
            s.messages_count,
            s.avg_message_cost,
            s.status.as_str(),
        ],
    )?;
    Ok(())
}

pub(super) fn select_study(conn: &Connection, study_id: &str) -> LiftResult<Option<Study>> {
    let study = conn
        .query_row(
            &format!("SELECT {STUDY_COLUMNS} FROM lift_studies WHERE id = ?1"),
            params![study_id],
            study_from_row,
        )
        .optional()?;
    Ok(study)
}

pub(super) fn select_all_studies(conn: &Connection) -> LiftResult<Vec<Study>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {STUDY_COLUMNS} FROM lift_studies ORDER BY start_date ASC, id ASC"
    ))?;
    let studies = stmt
        .query_map([], study_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(studies)
}

pub(super) fn study_exists(conn: &Connection, study_id: &str) -> LiftResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM lift_studies WHERE id = ?1)",
        params![study_id],
        |row| row.get(0),
    )?;
    Ok(exists != 0)
}

pub(super) fn update_study_field(
    conn: &Connection,
    study_id: &str,
    field: &StudyField,
) -> LiftResult<()> {
    let changed = match field {
        StudyField::Status(status) => conn.execute(
            "UPDATE lift_studies SET status = ?1 WHERE id = ?2",
            params![status.as_str(), study_id],
        )?,
        StudyField::AvgMessageCost(cost) => conn.execute(
            "UPDATE lift_studies SET avg_message_cost = ?1 WHERE id = ?2",
            params![cost, study_id],
        )?,
        StudyField::TemplateNames(names) => conn.execute(
            "UPDATE lift_studies SET template_names = ?1 WHERE id = ?2",
            params![names, study_id],
        )?,
    };
    if changed == 0 {
        return Err(LiftError::NotFound {
            study_id: study_id.to_string(),
        });
    }
    Ok(())
}

pub(super) fn active_study_id(conn: &Connection, today: NaiveDate) -> LiftResult<Option<StudyId>> {
    let mut stmt = conn.prepare(
        "SELECT id FROM lift_studies
         WHERE status = 'active'
           AND start_date <= ?1
           AND end_date >= ?1",
    )?;
    let ids = stmt
        .query_map(params![today.format(DATE_FORMAT).to_string()], |row| {
            row.get::<_, String>(0)
        })?
        .collect::<Result<Vec<_>, _>>()?;

    match ids.len() {
        0 => Ok(None),
        1 => Ok(ids.into_iter().next()),
        n => Err(LiftError::Data(format!("More than one active study found ({n})."))),
    }
}

/// Check-and-insert inside one IMMEDIATE transaction, so a concurrent
/// writer cannot slip a second active study in between.
pub(super) fn insert_study_exclusive(
    conn: &Connection,
    study: &Study,
    today: NaiveDate,
) -> LiftResult<()> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    if active_study_id(&tx, today)?.is_some() {
        return Err(LiftError::Conflict("There is an active study running.".into()));
    }
    insert_study(&tx, study)?;
    tx.commit()?;
    Ok(())
}

pub(super) fn activate_exclusive(
    conn: &Connection,
    study_id: &str,
    today: NaiveDate,
) -> LiftResult<()> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    if let Some(active) = active_study_id(&tx, today)? {
        if active != study_id {
            return Err(LiftError::Conflict(
                "There is already an active study running.".into(),
            ));
        }
    }
    update_study_field(&tx, study_id, &StudyField::Status(StudyStatus::Active))?;
    tx.commit()?;
    Ok(())
}

fn study_from_row(row: &Row<'_>) -> rusqlite::Result<Study> {
    let status: String = row.get(10)?;
    Ok(Study {
        id: row.get(0)?,
        name: row.get(1)?,
        start_date: date_column(row, 2)?,
        end_date: date_column(row, 3)?,
        sample_size: row.get(4)?,
        template_names: row.get(5)?,
        control_group_size: row.get(6)?,
        test_group_size: row.get(7)?,
        messages_count: row.get(8)?,
        avg_message_cost: row.get(9)?,
        status: StudyStatus::parse(&status)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(10, Type::Text, Box::new(e)))?,
    })
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

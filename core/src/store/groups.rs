//! `lift_studies_groups` queries and the counters they drive.

use crate::{
    error::{LiftError, LiftResult},
    study::GroupAssignment,
    types::{normalize_phone, GroupName},
};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Transaction, TransactionBehavior};

pub(super) fn group_assignments(
    conn: &Connection,
    study_id: &str,
) -> LiftResult<Vec<GroupAssignment>> {
    let mut stmt = conn.prepare(
        "SELECT phone_number, group_name FROM lift_studies_groups
         WHERE study_id = ?1
         ORDER BY phone_number ASC",
    )?;
    let rows = stmt
        .query_map(params![study_id], |row| {
            let phone: String = row.get(0)?;
            let group: String = row.get(1)?;
            let group_name = GroupName::parse(&group).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e))
            })?;
            Ok(GroupAssignment::new(&phone, group_name))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub(super) fn group_of(
    conn: &Connection,
    study_id: &str,
    phone_number: &str,
) -> LiftResult<Option<GroupName>> {
    let group: Option<String> = conn
        .query_row(
            "SELECT group_name FROM lift_studies_groups
             WHERE study_id = ?1 AND phone_number = ?2",
            params![study_id, normalize_phone(phone_number)],
            |row| row.get(0),
        )
        .optional()?;
    group.as_deref().map(GroupName::parse).transpose()
}

pub(super) fn assign_to_group(
    conn: &Connection,
    study_id: &str,
    phone_number: &str,
    group: GroupName,
) -> LiftResult<()> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    tx.execute(
        "INSERT INTO lift_studies_groups (study_id, phone_number, group_name)
         VALUES (?1, ?2, ?3)",
        params![study_id, normalize_phone(phone_number), group.as_str()],
    )?;
    let sql = match group {
        GroupName::Control => {
            "UPDATE lift_studies SET control_group_size = control_group_size + 1 WHERE id = ?1"
        }
        GroupName::Test => {
            "UPDATE lift_studies SET test_group_size = test_group_size + 1 WHERE id = ?1"
        }
    };
    if tx.execute(sql, params![study_id])? == 0 {
        return Err(LiftError::NotFound {
            study_id: study_id.to_string(),
        });
    }
    tx.commit()?;
    Ok(())
}

pub(super) fn increment_messages_count(conn: &Connection, study_id: &str) -> LiftResult<()> {
    let changed = conn.execute(
        "UPDATE lift_studies SET messages_count = messages_count + 1 WHERE id = ?1",
        params![study_id],
    )?;
    if changed == 0 {
        return Err(LiftError::NotFound {
            study_id: study_id.to_string(),
        });
    }
    Ok(())
}

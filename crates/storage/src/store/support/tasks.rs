#![forbid(unsafe_code)]

use super::super::StoreError;
use super::sqlite::bool_to_i64;
use pf_core::{DepartmentTask, TaskProvenance};
use rusqlite::{Transaction, params};

pub(in crate::store) fn insert_task_tx(
    tx: &Transaction<'_>,
    task: &DepartmentTask,
) -> Result<(), StoreError> {
    let (initiated_by, escalated_from) = match &task.provenance {
        TaskProvenance::Original => (None, None),
        TaskProvenance::Escalated {
            initiated_by,
            escalated_from,
        } => (Some(initiated_by), escalated_from.as_ref()),
    };
    tx.execute(
        r#"
        INSERT INTO department_tasks(
          id, post_id, department_code, department_name, status, requires_signoff, is_original,
          initiated_by_id, initiated_by_name, escalated_from, created_at_ms, updated_at_ms)
        VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)
        "#,
        params![
            task.id.as_str(),
            task.post_id.as_str(),
            task.department_code.as_str(),
            task.department_name,
            task.status.as_str(),
            bool_to_i64(task.requires_signoff),
            bool_to_i64(task.is_original()),
            initiated_by.map(|actor| actor.id.as_str()),
            initiated_by.map(|actor| actor.display_name.as_str()),
            escalated_from.map(|code| code.as_str()),
            task.created_at_ms,
            task.updated_at_ms
        ],
    )?;
    Ok(())
}

/// Writes back the mutable part of a task: status, completion and sign-off stamps, form
/// and module reference.
pub(in crate::store) fn update_task_tx(
    tx: &Transaction<'_>,
    task: &DepartmentTask,
) -> Result<(), StoreError> {
    let (reference_type, reference_id) = match &task.module_reference {
        Some(reference) => (Some(reference.kind.as_str()), Some(reference.id.as_str())),
        None => (None, None),
    };
    tx.execute(
        r#"
        UPDATE department_tasks
        SET status = ?2,
            completed_by_id = ?3, completed_by_name = ?4, completed_at_ms = ?5,
            completion_notes = ?6,
            signed_off_by_id = ?7, signed_off_by_name = ?8, signed_off_at_ms = ?9,
            form_type = ?10, module_reference_type = ?11, module_reference_id = ?12,
            updated_at_ms = ?13
        WHERE id = ?1
        "#,
        params![
            task.id.as_str(),
            task.status.as_str(),
            task.completed_by.as_ref().map(|actor| actor.id.as_str()),
            task.completed_by
                .as_ref()
                .map(|actor| actor.display_name.as_str()),
            task.completed_at_ms,
            task.completion_notes,
            task.signed_off_by.as_ref().map(|actor| actor.id.as_str()),
            task.signed_off_by
                .as_ref()
                .map(|actor| actor.display_name.as_str()),
            task.signed_off_at_ms,
            task.form_type,
            reference_type,
            reference_id,
            task.updated_at_ms
        ],
    )?;
    Ok(())
}

#![forbid(unsafe_code)]

use super::super::*;
use pf_core::{DepartmentTask, EventKind, TaskId, TaskProvenance, TaskStatus};
use serde_json::json;

impl SqliteStore {
    /// Adds a department that was not part of the original assignment.
    ///
    /// Any existing task for the department, original or escalated, makes this fail with
    /// `AlreadyAssigned`; a post never holds two tasks for one department.
    pub fn escalate(&mut self, request: EscalateRequest) -> Result<TaskWrite, StoreError> {
        let EscalateRequest {
            post_id,
            department,
            initiated_by,
            escalated_from,
            expected_revision,
            at_ms,
        } = request;

        let tx = self.write_tx()?;
        let Some(post) = load_post(&tx, post_id.as_str())? else {
            return Err(StoreError::UnknownId);
        };
        if let Some(expected) = expected_revision
            && expected != post.revision
        {
            return Err(StoreError::RevisionMismatch {
                expected,
                actual: post.revision,
            });
        }

        let existing = load_post_tasks(&tx, post_id.as_str())?;
        if let Some(task) = existing
            .iter()
            .find(|task| task.department_code == department)
        {
            return Err(StoreError::AlreadyAssigned {
                post_id: post_id.into_string(),
                department: department.as_str().to_string(),
                original: task.is_original(),
            });
        }

        let task_seq = next_counter_tx(&tx, "task_seq")?;
        let task = DepartmentTask {
            id: TaskId::from_seq(task_seq),
            post_id: post_id.clone(),
            department_name: department.display_name(),
            requires_signoff: post.template_snapshot.requires_signoff(&department),
            department_code: department,
            status: TaskStatus::Pending,
            provenance: TaskProvenance::Escalated {
                initiated_by,
                escalated_from,
            },
            completed_by: None,
            completed_at_ms: None,
            completion_notes: None,
            signed_off_by: None,
            signed_off_at_ms: None,
            form_type: None,
            module_reference: None,
            created_at_ms: at_ms,
            updated_at_ms: at_ms,
        };
        if let Err(err) = insert_task_tx(&tx, &task) {
            return Err(match err {
                StoreError::Sql(sql) if is_constraint_violation(&sql) => {
                    StoreError::AlreadyAssigned {
                        post_id: post_id.into_string(),
                        department: task.department_code.as_str().to_string(),
                        original: false,
                    }
                }
                other => other,
            });
        }

        let initiated_by = task.provenance.initiated_by();
        let escalated_from = match &task.provenance {
            TaskProvenance::Escalated { escalated_from, .. } => {
                escalated_from.as_ref().map(|code| code.as_str())
            }
            TaskProvenance::Original => None,
        };
        let mut events = vec![insert_event_tx(
            &tx,
            EventInsert {
                ts_ms: at_ms,
                post_id: Some(post_id.as_str()),
                task_id: Some(task.id.as_str()),
                kind: EventKind::DepartmentEscalated,
                payload: json!({
                    "post_number": post.post_number,
                    "department": task.department_code.as_str(),
                    "requires_signoff": task.requires_signoff,
                    "initiated_by": initiated_by.map(|actor| actor.id.as_str()),
                    "initiated_by_name": initiated_by.map(|actor| actor.display_name.as_str()),
                    "escalated_from": escalated_from,
                }),
            },
        )?];

        let (post, _tasks, rollup) = recompute_post_tx(&tx, post, at_ms)?;
        events.extend(rollup);

        tx.commit()?;
        Ok(TaskWrite { task, post, events })
    }
}

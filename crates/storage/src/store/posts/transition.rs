#![forbid(unsafe_code)]

use super::super::*;
use pf_core::{EventKind, TransitionCheck, apply_transition, check_transition};
use serde_json::json;

impl SqliteStore {
    /// Moves one department task forward and recomputes its post in the same transaction.
    ///
    /// Re-applying the current status is a no-op that returns the stored state (even with a
    /// stale `expected_revision`), so a retried request after a lost response does not fail.
    pub fn transition(&mut self, request: TransitionRequest) -> Result<TaskWrite, StoreError> {
        let TransitionRequest {
            task_id,
            status,
            actor,
            notes,
            form_type,
            module_reference,
            expected_revision,
            at_ms,
        } = request;

        let tx = self.write_tx()?;
        let Some(mut task) = load_task(&tx, task_id.as_str())? else {
            return Err(StoreError::UnknownId);
        };
        let Some(post) = load_post(&tx, task.post_id.as_str())? else {
            return Err(StoreError::UnknownId);
        };
        let from = task.status;
        match check_transition(&task, status, &actor) {
            Ok(TransitionCheck::Unchanged) => {
                return Ok(TaskWrite {
                    task,
                    post,
                    events: Vec::new(),
                });
            }
            Ok(TransitionCheck::Apply) => {}
            Err(rejection) => {
                return Err(StoreError::InvalidTransition {
                    task_id: task_id.into_string(),
                    from: from.as_str(),
                    to: status.as_str(),
                    reason: rejection.reason(),
                });
            }
        }
        if let Some(expected) = expected_revision
            && expected != post.revision
        {
            return Err(StoreError::RevisionMismatch {
                expected,
                actual: post.revision,
            });
        }

        apply_transition(&mut task, status, &actor, notes, at_ms);
        if form_type.is_some() {
            task.form_type = form_type;
        }
        if module_reference.is_some() {
            task.module_reference = module_reference;
        }
        update_task_tx(&tx, &task)?;

        let mut events = vec![insert_event_tx(
            &tx,
            EventInsert {
                ts_ms: at_ms,
                post_id: Some(task.post_id.as_str()),
                task_id: Some(task.id.as_str()),
                kind: EventKind::TaskTransitioned,
                payload: json!({
                    "post_number": post.post_number,
                    "department": task.department_code.as_str(),
                    "from": from.as_str(),
                    "to": status.as_str(),
                    "actor": actor.id,
                    "actor_name": actor.display_name,
                    "resolved": task.is_resolved(),
                }),
            },
        )?];

        let (post, _tasks, rollup) = recompute_post_tx(&tx, post, at_ms)?;
        events.extend(rollup);

        tx.commit()?;
        Ok(TaskWrite { task, post, events })
    }
}

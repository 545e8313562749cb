#![forbid(unsafe_code)]

use crate::model::{Actor, DepartmentTask, TaskStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionCheck {
    /// Status already equals the target; nothing to write.
    Unchanged,
    Apply,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransitionRejection {
    Backward,
    SignOffBeforeCompletion,
    SignOffBySameActor { completed_by: String },
}

impl TransitionRejection {
    pub fn reason(&self) -> String {
        match self {
            Self::Backward => "department task status cannot move backward".to_string(),
            Self::SignOffBeforeCompletion => {
                "sign-off is only allowed once the task is completed".to_string()
            }
            Self::SignOffBySameActor { completed_by } => format!(
                "sign-off requires an actor other than the one who completed the task ({completed_by})"
            ),
        }
    }
}

/// Validates `task.status -> to` for `actor`.
///
/// Order is pending < in_progress < completed < signed_off. Skipping forward is allowed
/// except into `signed_off`, which needs `completed` first. Tasks that require sign-off
/// must be signed off by someone other than the completer.
pub fn check_transition(
    task: &DepartmentTask,
    to: TaskStatus,
    actor: &Actor,
) -> Result<TransitionCheck, TransitionRejection> {
    let from = task.status;
    if from == to {
        return Ok(TransitionCheck::Unchanged);
    }
    if to.rank() < from.rank() {
        return Err(TransitionRejection::Backward);
    }
    if to == TaskStatus::SignedOff {
        if from != TaskStatus::Completed {
            return Err(TransitionRejection::SignOffBeforeCompletion);
        }
        if task.requires_signoff
            && let Some(completed_by) = task.completed_by.as_ref()
            && completed_by.id == actor.id
        {
            return Err(TransitionRejection::SignOffBySameActor {
                completed_by: completed_by.id.clone(),
            });
        }
    }
    Ok(TransitionCheck::Apply)
}

/// Applies an already-checked transition, stamping the completion or sign-off fields.
pub fn apply_transition(
    task: &mut DepartmentTask,
    to: TaskStatus,
    actor: &Actor,
    notes: Option<String>,
    now_ms: i64,
) {
    match to {
        TaskStatus::Completed => {
            task.completed_by = Some(actor.clone());
            task.completed_at_ms = Some(now_ms);
            if notes.is_some() {
                task.completion_notes = notes;
            }
        }
        TaskStatus::SignedOff => {
            task.signed_off_by = Some(actor.clone());
            task.signed_off_at_ms = Some(now_ms);
            if notes.is_some() && task.completion_notes.is_none() {
                task.completion_notes = notes;
            }
        }
        TaskStatus::Pending | TaskStatus::InProgress => {}
    }
    task.status = to;
    task.updated_at_ms = now_ms;
}

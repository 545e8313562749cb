#![forbid(unsafe_code)]

use crate::model::{DepartmentTask, PostStatus, TaskStatus};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aggregate {
    pub total_departments: u32,
    pub completed_count: u32,
    pub rate: f64,
    pub all_resolved: bool,
    pub status: PostStatus,
}

/// Rolls a post's department tasks up into counters and a derived post status.
///
/// The denominator is the task count itself: every assigned or escalated department has
/// exactly one task row, so the two never disagree once the fan-out has committed.
pub fn aggregate(tasks: &[DepartmentTask]) -> Aggregate {
    let total_departments = u32::try_from(tasks.len()).unwrap_or(u32::MAX);
    let completed_count =
        u32::try_from(tasks.iter().filter(|task| task.is_resolved()).count()).unwrap_or(u32::MAX);
    let rate = if total_departments == 0 {
        0.0
    } else {
        f64::from(completed_count) / f64::from(total_departments)
    };
    let all_resolved = total_departments > 0 && completed_count == total_departments;

    let any_started = tasks.iter().any(|task| task.status != TaskStatus::Pending);
    let status = if all_resolved {
        PostStatus::Completed
    } else if completed_count > 0 || any_started {
        PostStatus::InProgress
    } else {
        PostStatus::Pending
    };

    Aggregate {
        total_departments,
        completed_count,
        rate,
        all_resolved,
        status,
    }
}

/// `completed_at` tracks the most recent full clear: it is re-stamped whenever the post
/// moves from unresolved to resolved and left alone otherwise.
pub fn next_completed_at(
    previous_status: PostStatus,
    previous_completed_at_ms: Option<i64>,
    next: &Aggregate,
    now_ms: i64,
) -> Option<i64> {
    if next.all_resolved && previous_status != PostStatus::Completed {
        return Some(now_ms);
    }
    previous_completed_at_ms
}

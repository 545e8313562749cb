#![forbid(unsafe_code)]

use super::super::{EventRow, StoreError};
use super::events::{EventInsert, insert_event_tx};
use super::rows::load_post_tasks;
use pf_core::{
    DepartmentTask, IncidentPost, aggregate, evaluate_hold, next_completed_at, rollup_events,
};
use rusqlite::{Transaction, params};
use serde_json::json;

/// Refreshes a post's rolled-up counters from a fresh read of all of its tasks, bumps
/// its revision, and records any resolution or hold edge as events.
///
/// Must run inside the transaction that mutated the task rows.
pub(in crate::store) fn recompute_post_tx(
    tx: &Transaction<'_>,
    mut post: IncidentPost,
    now_ms: i64,
) -> Result<(IncidentPost, Vec<DepartmentTask>, Vec<EventRow>), StoreError> {
    let tasks = load_post_tasks(tx, post.id.as_str())?;
    let next = aggregate(&tasks);
    let completed_at_ms = next_completed_at(post.status, post.completed_at_ms, &next, now_ms);
    let hold = evaluate_hold(
        post.template_snapshot.is_production_hold,
        next.all_resolved,
        completed_at_ms.is_some(),
    );
    let edges = rollup_events(post.status, post.hold_status, &next, hold);

    let new_revision = post.revision + 1;
    tx.execute(
        r#"
        UPDATE posts
        SET status = ?2, total_departments = ?3, completed_departments = ?4,
            completion_rate = ?5, completed_at_ms = ?6, hold_status = ?7,
            revision = ?8, updated_at_ms = ?9
        WHERE id = ?1
        "#,
        params![
            post.id.as_str(),
            next.status.as_str(),
            i64::from(next.total_departments),
            i64::from(next.completed_count),
            next.rate,
            completed_at_ms,
            hold.as_str(),
            new_revision,
            now_ms
        ],
    )?;

    post.status = next.status;
    post.total_departments = next.total_departments;
    post.completed_departments = next.completed_count;
    post.completion_rate = next.rate;
    post.completed_at_ms = completed_at_ms;
    post.hold_status = hold;
    post.revision = new_revision;
    post.updated_at_ms = now_ms;

    let mut events = Vec::with_capacity(edges.len());
    for kind in edges {
        events.push(insert_event_tx(
            tx,
            EventInsert {
                ts_ms: now_ms,
                post_id: Some(post.id.as_str()),
                task_id: None,
                kind,
                payload: json!({
                    "post_number": post.post_number,
                    "facility": post.facility,
                    "location": post.location,
                    "status": post.status.as_str(),
                    "completed_departments": post.completed_departments,
                    "total_departments": post.total_departments,
                    "hold_status": post.hold_status.as_str(),
                }),
            },
        )?);
    }

    Ok((post, tasks, events))
}

#![forbid(unsafe_code)]

use super::super::{EventRow, StoreError};
use pf_core::EventKind;
use rusqlite::{Transaction, params};
use serde_json::Value;

pub(in crate::store) struct EventInsert<'a> {
    pub(in crate::store) ts_ms: i64,
    pub(in crate::store) post_id: Option<&'a str>,
    pub(in crate::store) task_id: Option<&'a str>,
    pub(in crate::store) kind: EventKind,
    pub(in crate::store) payload: Value,
}

pub(in crate::store) fn insert_event_tx(
    tx: &Transaction<'_>,
    event: EventInsert<'_>,
) -> Result<EventRow, StoreError> {
    let EventInsert {
        ts_ms,
        post_id,
        task_id,
        kind,
        payload,
    } = event;
    let payload_json = payload.to_string();
    tx.execute(
        r#"
        INSERT INTO events(ts_ms, post_id, task_id, type, payload_json)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![ts_ms, post_id, task_id, kind.as_str(), payload_json],
    )?;
    let seq = tx.last_insert_rowid();
    Ok(EventRow {
        seq,
        ts_ms,
        post_id: post_id.map(str::to_string),
        task_id: task_id.map(str::to_string),
        event_type: kind.as_str().to_string(),
        payload_json,
    })
}

pub(in crate::store) fn parse_event_id(event_id: &str) -> Option<i64> {
    let digits = event_id.strip_prefix("evt_")?;
    digits.parse::<i64>().ok()
}

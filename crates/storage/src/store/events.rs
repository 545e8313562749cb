#![forbid(unsafe_code)]

use super::*;
use rusqlite::params;

impl SqliteStore {
    /// Events strictly after `since` (an `evt_…` id), oldest first.
    pub fn list_events(
        &self,
        since: Option<&str>,
        limit: usize,
    ) -> Result<Vec<EventRow>, StoreError> {
        let since_seq = match since {
            None => 0,
            Some(event_id) => parse_event_id(event_id)
                .ok_or(StoreError::InvalidInput("since must be an event id"))?,
        };
        let mut stmt = self.conn.prepare(
            "SELECT seq, ts_ms, post_id, task_id, type, payload_json FROM events \
             WHERE seq > ?1 ORDER BY seq ASC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![since_seq, to_sqlite_i64(limit)?], |row| {
            Ok(EventRow {
                seq: row.get(0)?,
                ts_ms: row.get(1)?,
                post_id: row.get(2)?,
                task_id: row.get(3)?,
                event_type: row.get(4)?,
                payload_json: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

#![forbid(unsafe_code)]

use super::super::*;
use pf_core::{DepartmentTask, PostSummary, filter_recent};
use rusqlite::params;

impl SqliteStore {
    pub fn get_task(&self, task_id: &str) -> Result<Option<DepartmentTask>, StoreError> {
        load_task(&self.conn, task_id)
    }

    pub fn list_post_tasks(&self, post_id: &str) -> Result<Vec<DepartmentTask>, StoreError> {
        load_post_tasks(&self.conn, post_id)
    }

    /// Recent canonical posts filtered by a case-insensitive substring over number,
    /// template name, location and author. Only the `window` most recent posts are
    /// considered; at most `limit` are returned.
    pub fn search_posts(
        &self,
        query: &str,
        limit: usize,
        window: usize,
    ) -> Result<Vec<PostSummary>, StoreError> {
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM posts ORDER BY created_at_ms DESC, seq DESC LIMIT ?1"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let raws = stmt
            .query_map(params![to_sqlite_i64(window)?], summary_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        let recent = raws
            .into_iter()
            .map(SummaryRaw::into_summary)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(filter_recent(recent, query, limit))
    }

    /// Posts of a facility whose production hold is currently blocking.
    pub fn active_holds(&self, facility: &str) -> Result<Vec<PostSummary>, StoreError> {
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM posts \
             WHERE facility = ?1 AND hold_status IN ('active', 'reinstated') \
             ORDER BY created_at_ms ASC, seq ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let raws = stmt
            .query_map(params![facility], summary_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raws.into_iter().map(SummaryRaw::into_summary).collect()
    }

    /// Gate consulted by the production-run subsystem. With `location = None` any blocking
    /// hold in the facility counts.
    pub fn production_blocked(
        &self,
        facility: &str,
        location: Option<&str>,
    ) -> Result<bool, StoreError> {
        let blocking: i64 = self.conn.query_row(
            "SELECT COUNT(1) FROM posts \
             WHERE facility = ?1 AND (?2 IS NULL OR location = ?2) \
               AND hold_status IN ('active', 'reinstated')",
            params![facility, location],
            |row| row.get(0),
        )?;
        Ok(blocking > 0)
    }
}

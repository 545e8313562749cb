#![forbid(unsafe_code)]

use super::super::detail::legacy_work_order_ids;
use super::super::*;
use pf_core::{DepartmentTask, IncidentPost, ModuleReferenceKind};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeSet;

const WORK_ORDER_COLUMNS: &str = "id, title, description, status, source_post_id, created_at_ms";

impl SqliteStore {
    /// Work orders attached to an incident through any join path, each id once.
    pub fn resolve_work_orders(&self, post_id: &str) -> Result<Vec<WorkOrderLink>, StoreError> {
        match self.get_detail(post_id)? {
            Some(detail) => Ok(detail.work_orders),
            None => Err(StoreError::UnknownId),
        }
    }

    /// Union of task references, legacy verification links, source-post links and
    /// description mentions of the post number, in that order. The first path that
    /// yields an id is the one reported.
    pub(in crate::store) fn work_orders_for(
        &self,
        post: &IncidentPost,
        tasks: &[DepartmentTask],
    ) -> Result<Vec<WorkOrderLink>, StoreError> {
        let mut candidates: Vec<(String, WorkOrderVia)> = tasks
            .iter()
            .filter_map(|task| task.module_reference.as_ref())
            .filter(|reference| reference.kind == ModuleReferenceKind::WorkOrder)
            .map(|reference| (reference.id.clone(), WorkOrderVia::TaskReference))
            .collect();

        for id in legacy_work_order_ids(&self.conn, post.id.as_str(), &post.post_number)? {
            candidates.push((id, WorkOrderVia::LegacyVerification));
        }
        for id in ids_by_source_post(&self.conn, post.id.as_str())? {
            candidates.push((id, WorkOrderVia::SourcePost));
        }
        if !post.post_number.trim().is_empty() {
            for id in ids_by_description(&self.conn, &post.post_number)? {
                candidates.push((id, WorkOrderVia::DescriptionMatch));
            }
        }

        let mut seen = BTreeSet::new();
        let mut links = Vec::new();
        for (id, via) in candidates {
            let id = id.trim().to_string();
            if id.is_empty() || !seen.insert(id.clone()) {
                continue;
            }
            let row = load_work_order(&self.conn, &id)?;
            links.push(WorkOrderLink { id, via, row });
        }
        Ok(links)
    }
}

fn ids_by_source_post(conn: &Connection, post_id: &str) -> Result<Vec<String>, StoreError> {
    let query = || -> rusqlite::Result<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT id FROM work_orders WHERE source_post_id = ?1 ORDER BY created_at_ms ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![post_id], |row| row.get::<_, String>(0))?;
        rows.collect()
    };
    tolerate_missing_table(query())
}

fn ids_by_description(conn: &Connection, post_number: &str) -> Result<Vec<String>, StoreError> {
    let query = || -> rusqlite::Result<Vec<(String, String)>> {
        let mut stmt = conn.prepare(
            "SELECT id, description FROM work_orders \
             WHERE description IS NOT NULL AND instr(description, ?1) > 0 \
             ORDER BY created_at_ms ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![post_number], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        rows.collect()
    };
    let rows = tolerate_missing_table(query())?;
    Ok(rows
        .into_iter()
        .filter(|(_, description)| mentions_post_number(description, post_number))
        .map(|(id, _)| id)
        .collect())
}

/// `INC-1000` must not match inside `INC-10000`: an occurrence only counts when the next
/// character is not a digit.
fn mentions_post_number(description: &str, post_number: &str) -> bool {
    description.match_indices(post_number).any(|(at, _)| {
        !description[at + post_number.len()..]
            .chars()
            .next()
            .is_some_and(|next| next.is_ascii_digit())
    })
}

fn load_work_order(conn: &Connection, id: &str) -> Result<Option<WorkOrderRow>, StoreError> {
    let sql = format!("SELECT {WORK_ORDER_COLUMNS} FROM work_orders WHERE id = ?1");
    tolerate_missing_table(
        conn.query_row(&sql, params![id], |row| {
            Ok(WorkOrderRow {
                id: row.get(0)?,
                title: row.get(1)?,
                description: row.get(2)?,
                status: row.get(3)?,
                source_post_id: row.get(4)?,
                created_at_ms: row.get(5)?,
            })
        })
        .optional(),
    )
}

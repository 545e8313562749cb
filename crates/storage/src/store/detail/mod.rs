#![forbid(unsafe_code)]

mod legacy;

use super::*;
use pf_core::{
    DepartmentTask, IncidentPost, aggregate, evaluate_hold, next_completed_at,
};

pub(in crate::store) use legacy::legacy_work_order_ids;

impl SqliteStore {
    /// Uniform detail read for an incident id.
    ///
    /// Canonical posts win. Only when the id is unknown to the canonical tables (or those
    /// tables are absent) is the legacy single-record verification consulted. Any other
    /// store error propagates.
    ///
    /// All reads share one deferred transaction so the post row, its tasks and the joins
    /// come from a single snapshot even while another process writes.
    pub fn get_detail(&self, post_id: &str) -> Result<Option<IncidentDetail>, StoreError> {
        let read = self.conn.unchecked_transaction()?;
        let detail = self.detail_in_snapshot(post_id)?;
        read.commit()?;
        Ok(detail)
    }

    fn detail_in_snapshot(&self, post_id: &str) -> Result<Option<IncidentDetail>, StoreError> {
        if let Some((post, tasks)) = self.canonical_detail(post_id)? {
            let work_orders = self.work_orders_for(&post, &tasks)?;
            return Ok(Some(IncidentDetail {
                hold: post.hold_status,
                post,
                tasks,
                work_orders,
                source: DetailSource::Canonical,
            }));
        }

        let Some((post, tasks)) = legacy::load_legacy_detail(&self.conn, post_id)? else {
            return Ok(None);
        };
        let work_orders = self.work_orders_for(&post, &tasks)?;
        Ok(Some(IncidentDetail {
            hold: post.hold_status,
            post,
            tasks,
            work_orders,
            source: DetailSource::LegacyVerification,
        }))
    }

    /// Stored counters are a cache; the returned post always reflects the current task set.
    fn canonical_detail(
        &self,
        post_id: &str,
    ) -> Result<Option<(IncidentPost, Vec<DepartmentTask>)>, StoreError> {
        let loaded = match load_post(&self.conn, post_id) {
            Ok(value) => value,
            Err(StoreError::Sql(err)) if is_missing_table(&err) => None,
            Err(err) => return Err(err),
        };
        let Some(mut post) = loaded else {
            return Ok(None);
        };
        let tasks = load_post_tasks(&self.conn, post_id)?;

        let next = aggregate(&tasks);
        post.completed_at_ms =
            next_completed_at(post.status, post.completed_at_ms, &next, post.updated_at_ms);
        post.total_departments = next.total_departments;
        post.completed_departments = next.completed_count;
        post.completion_rate = next.rate;
        post.status = next.status;
        post.hold_status = evaluate_hold(
            post.template_snapshot.is_production_hold,
            next.all_resolved,
            post.completed_at_ms.is_some(),
        );
        Ok(Some((post, tasks)))
    }
}

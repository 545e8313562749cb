#![forbid(unsafe_code)]

//! Read-only bridge from the single-record `task_verifications` table to the canonical
//! post/task model. Nothing here is ever written back.

use super::super::StoreError;
use super::super::support::tolerate_missing_table;
use pf_core::{
    Actor, DepartmentCode, DepartmentTask, IncidentPost, IncidentTemplate, PostId, TaskId,
    TaskProvenance, TaskStatus, aggregate, evaluate_hold,
};
use rusqlite::{Connection, OptionalExtension, Row, params};

const FALLBACK_DEPARTMENT: &str = "GENERAL";
const FALLBACK_TASK_NAME: &str = "Task Verification";

const VERIFICATION_COLUMNS: &str = "id, reference_id, task_name, department_code, \
     department_name, status, verified_by, verified_at_ms, created_by, facility, location, \
     notes, photo_url, created_at_ms";

struct LegacyVerification {
    id: String,
    reference_id: Option<String>,
    task_name: Option<String>,
    department_code: Option<String>,
    department_name: Option<String>,
    status: Option<String>,
    verified_by: Option<String>,
    verified_at_ms: Option<i64>,
    created_by: Option<String>,
    facility: Option<String>,
    location: Option<String>,
    notes: Option<String>,
    photo_url: Option<String>,
    created_at_ms: Option<i64>,
}

impl LegacyVerification {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            reference_id: row.get(1)?,
            task_name: row.get(2)?,
            department_code: row.get(3)?,
            department_name: row.get(4)?,
            status: row.get(5)?,
            verified_by: row.get(6)?,
            verified_at_ms: row.get(7)?,
            created_by: row.get(8)?,
            facility: row.get(9)?,
            location: row.get(10)?,
            notes: row.get(11)?,
            photo_url: row.get(12)?,
            created_at_ms: row.get(13)?,
        })
    }

    fn task_status(&self) -> TaskStatus {
        match self.status.as_deref().map(str::trim) {
            Some("verified") => TaskStatus::SignedOff,
            Some("in_progress") => TaskStatus::InProgress,
            _ => TaskStatus::Pending,
        }
    }
}

/// Looks the record up by its own id first, then by the secondary reference; the most
/// recently created record wins when several share a reference.
fn find_verification(
    conn: &Connection,
    key: &str,
) -> Result<Option<LegacyVerification>, StoreError> {
    let by_id = format!("SELECT {VERIFICATION_COLUMNS} FROM task_verifications WHERE id = ?1");
    let found = tolerate_missing_table(
        conn.query_row(&by_id, params![key], LegacyVerification::from_row)
            .optional(),
    )?;
    if found.is_some() {
        return Ok(found);
    }
    let by_reference = format!(
        "SELECT {VERIFICATION_COLUMNS} FROM task_verifications WHERE reference_id = ?1 \
         ORDER BY created_at_ms DESC, id DESC LIMIT 1"
    );
    tolerate_missing_table(
        conn.query_row(&by_reference, params![key], LegacyVerification::from_row)
            .optional(),
    )
}

pub(super) fn load_legacy_detail(
    conn: &Connection,
    key: &str,
) -> Result<Option<(IncidentPost, Vec<DepartmentTask>)>, StoreError> {
    let Some(record) = find_verification(conn, key)? else {
        return Ok(None);
    };
    synthesize(record).map(Some)
}

fn synthesize(record: LegacyVerification) -> Result<(IncidentPost, Vec<DepartmentTask>), StoreError> {
    const INVALID: StoreError = StoreError::Corrupt("invalid task verification row");

    let department = record
        .department_code
        .as_deref()
        .and_then(|raw| DepartmentCode::try_new(raw).ok())
        .map_or_else(|| DepartmentCode::try_new(FALLBACK_DEPARTMENT), Ok)
        .map_err(|_| INVALID)?;
    let department_name = record
        .department_name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| department.display_name());
    let task_name = record
        .task_name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_TASK_NAME.to_string());
    let template = IncidentTemplate::new(task_name, "").with_department(department.clone(), Vec::new());

    let created_at_ms = record.created_at_ms.unwrap_or(0);
    let status = record.task_status();
    let resolved_at_ms = record.verified_at_ms.or(record.created_at_ms);
    let verifier = record
        .verified_by
        .as_deref()
        .map(|id| Actor::new(id, id));
    let author = record
        .created_by
        .as_deref()
        .map_or_else(|| Actor::new("unknown", "Unknown"), |id| Actor::new(id, id));

    let post_id = PostId::from_foreign(record.id.clone());
    let signed_off = status == TaskStatus::SignedOff;
    let task = DepartmentTask {
        id: TaskId::from_foreign(record.id.clone()),
        post_id: post_id.clone(),
        department_code: department,
        department_name,
        status,
        requires_signoff: signed_off,
        provenance: TaskProvenance::Original,
        completed_by: verifier.clone().filter(|_| signed_off),
        completed_at_ms: resolved_at_ms.filter(|_| signed_off),
        completion_notes: record.notes.clone().filter(|_| signed_off),
        signed_off_by: verifier.filter(|_| signed_off),
        signed_off_at_ms: resolved_at_ms.filter(|_| signed_off),
        form_type: None,
        module_reference: None,
        created_at_ms,
        updated_at_ms: resolved_at_ms.unwrap_or(created_at_ms),
    };
    let tasks = vec![task];
    let rollup = aggregate(&tasks);

    let post = IncidentPost {
        id: post_id,
        post_number: record.reference_id.clone().unwrap_or_else(|| record.id.clone()),
        template_id: template.id.clone(),
        hold_status: evaluate_hold(template.is_production_hold, rollup.all_resolved, false),
        template_snapshot: template,
        created_by: author,
        facility: record.facility.unwrap_or_default(),
        location: record.location,
        form_data_json: "{}".to_string(),
        photo_url: record.photo_url,
        notes: record.notes,
        status: rollup.status,
        total_departments: rollup.total_departments,
        completed_departments: rollup.completed_count,
        completion_rate: rollup.rate,
        completed_at_ms: resolved_at_ms.filter(|_| rollup.all_resolved),
        revision: 0,
        created_at_ms,
        updated_at_ms: resolved_at_ms.unwrap_or(created_at_ms),
    };
    Ok((post, tasks))
}

/// Work orders linked directly from verification records that belong to this incident,
/// matched on either the record id or its secondary reference.
pub(in crate::store) fn legacy_work_order_ids(
    conn: &Connection,
    post_id: &str,
    post_number: &str,
) -> Result<Vec<String>, StoreError> {
    let query = || -> rusqlite::Result<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT work_order_id FROM task_verifications \
             WHERE (id = ?1 OR reference_id = ?1 OR reference_id = ?2) \
               AND work_order_id IS NOT NULL AND work_order_id <> '' \
             ORDER BY created_at_ms DESC, id DESC",
        )?;
        let rows = stmt.query_map(params![post_id, post_number], |row| row.get::<_, String>(0))?;
        rows.collect()
    };
    tolerate_missing_table(query())
}

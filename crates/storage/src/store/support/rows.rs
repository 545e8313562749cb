#![forbid(unsafe_code)]

use super::super::StoreError;
use super::snapshot::template_from_json;
use pf_core::{
    Actor, DepartmentCode, DepartmentTask, HoldStatus, IncidentPost, ModuleReference,
    ModuleReferenceKind, PostId, PostStatus, PostSummary, TaskId, TaskProvenance, TaskStatus,
};
use rusqlite::{Connection, OptionalExtension, Row, params};

pub(in crate::store) const POST_COLUMNS: &str = "id, post_number, template_id, template_json, \
     created_by_id, created_by_name, facility, location, form_data_json, photo_url, notes, \
     status, total_departments, completed_departments, completion_rate, completed_at_ms, \
     hold_status, revision, created_at_ms, updated_at_ms";

pub(in crate::store) const TASK_COLUMNS: &str = "id, post_id, department_code, department_name, \
     status, requires_signoff, is_original, initiated_by_id, initiated_by_name, escalated_from, \
     completed_by_id, completed_by_name, completed_at_ms, completion_notes, signed_off_by_id, \
     signed_off_by_name, signed_off_at_ms, form_type, module_reference_type, module_reference_id, \
     created_at_ms, updated_at_ms";

pub(in crate::store) const SUMMARY_COLUMNS: &str = "id, post_number, template_name, facility, \
     location, created_by_name, status, completion_rate, hold_status, created_at_ms";

/// Raw post columns, decoded into domain types by [`PostRaw::into_post`].
pub(in crate::store) struct PostRaw {
    id: String,
    post_number: String,
    template_id: String,
    template_json: String,
    created_by_id: String,
    created_by_name: String,
    facility: String,
    location: Option<String>,
    form_data_json: String,
    photo_url: Option<String>,
    notes: Option<String>,
    status: String,
    total_departments: i64,
    completed_departments: i64,
    completion_rate: f64,
    completed_at_ms: Option<i64>,
    hold_status: String,
    revision: i64,
    created_at_ms: i64,
    updated_at_ms: i64,
}

impl PostRaw {
    pub(in crate::store) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            post_number: row.get(1)?,
            template_id: row.get(2)?,
            template_json: row.get(3)?,
            created_by_id: row.get(4)?,
            created_by_name: row.get(5)?,
            facility: row.get(6)?,
            location: row.get(7)?,
            form_data_json: row.get(8)?,
            photo_url: row.get(9)?,
            notes: row.get(10)?,
            status: row.get(11)?,
            total_departments: row.get(12)?,
            completed_departments: row.get(13)?,
            completion_rate: row.get(14)?,
            completed_at_ms: row.get(15)?,
            hold_status: row.get(16)?,
            revision: row.get(17)?,
            created_at_ms: row.get(18)?,
            updated_at_ms: row.get(19)?,
        })
    }

    pub(in crate::store) fn into_post(self) -> Result<IncidentPost, StoreError> {
        const INVALID: StoreError = StoreError::Corrupt("invalid post row");
        Ok(IncidentPost {
            id: PostId::try_new(self.id).map_err(|_| INVALID)?,
            post_number: self.post_number,
            template_id: self.template_id,
            template_snapshot: template_from_json(&self.template_json)?,
            created_by: Actor::new(self.created_by_id, self.created_by_name),
            facility: self.facility,
            location: self.location,
            form_data_json: self.form_data_json,
            photo_url: self.photo_url,
            notes: self.notes,
            status: PostStatus::parse(&self.status).ok_or(INVALID)?,
            total_departments: u32::try_from(self.total_departments).map_err(|_| INVALID)?,
            completed_departments: u32::try_from(self.completed_departments)
                .map_err(|_| INVALID)?,
            completion_rate: self.completion_rate,
            completed_at_ms: self.completed_at_ms,
            hold_status: HoldStatus::parse(&self.hold_status).ok_or(INVALID)?,
            revision: self.revision,
            created_at_ms: self.created_at_ms,
            updated_at_ms: self.updated_at_ms,
        })
    }
}

pub(in crate::store) struct TaskRaw {
    id: String,
    post_id: String,
    department_code: String,
    department_name: String,
    status: String,
    requires_signoff: bool,
    is_original: bool,
    initiated_by_id: Option<String>,
    initiated_by_name: Option<String>,
    escalated_from: Option<String>,
    completed_by_id: Option<String>,
    completed_by_name: Option<String>,
    completed_at_ms: Option<i64>,
    completion_notes: Option<String>,
    signed_off_by_id: Option<String>,
    signed_off_by_name: Option<String>,
    signed_off_at_ms: Option<i64>,
    form_type: Option<String>,
    module_reference_type: Option<String>,
    module_reference_id: Option<String>,
    created_at_ms: i64,
    updated_at_ms: i64,
}

fn actor_from(id: Option<String>, name: Option<String>) -> Option<Actor> {
    let id = id?;
    let display_name = name.unwrap_or_else(|| id.clone());
    Some(Actor { id, display_name })
}

impl TaskRaw {
    pub(in crate::store) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            post_id: row.get(1)?,
            department_code: row.get(2)?,
            department_name: row.get(3)?,
            status: row.get(4)?,
            requires_signoff: row.get::<_, i64>(5)? != 0,
            is_original: row.get::<_, i64>(6)? != 0,
            initiated_by_id: row.get(7)?,
            initiated_by_name: row.get(8)?,
            escalated_from: row.get(9)?,
            completed_by_id: row.get(10)?,
            completed_by_name: row.get(11)?,
            completed_at_ms: row.get(12)?,
            completion_notes: row.get(13)?,
            signed_off_by_id: row.get(14)?,
            signed_off_by_name: row.get(15)?,
            signed_off_at_ms: row.get(16)?,
            form_type: row.get(17)?,
            module_reference_type: row.get(18)?,
            module_reference_id: row.get(19)?,
            created_at_ms: row.get(20)?,
            updated_at_ms: row.get(21)?,
        })
    }

    pub(in crate::store) fn into_task(self) -> Result<DepartmentTask, StoreError> {
        const INVALID: StoreError = StoreError::Corrupt("invalid department task row");
        let provenance = if self.is_original {
            TaskProvenance::Original
        } else {
            TaskProvenance::Escalated {
                initiated_by: actor_from(self.initiated_by_id, self.initiated_by_name)
                    .ok_or(INVALID)?,
                escalated_from: self
                    .escalated_from
                    .map(DepartmentCode::try_new)
                    .transpose()
                    .map_err(|_| INVALID)?,
            }
        };
        let module_reference = match (self.module_reference_type, self.module_reference_id) {
            (Some(kind), Some(id)) => Some(ModuleReference {
                kind: ModuleReferenceKind::parse(&kind),
                id,
            }),
            _ => None,
        };
        Ok(DepartmentTask {
            id: TaskId::try_new(self.id).map_err(|_| INVALID)?,
            post_id: PostId::try_new(self.post_id).map_err(|_| INVALID)?,
            department_code: DepartmentCode::try_new(&self.department_code)
                .map_err(|_| INVALID)?,
            department_name: self.department_name,
            status: TaskStatus::parse(&self.status).ok_or(INVALID)?,
            requires_signoff: self.requires_signoff,
            provenance,
            completed_by: actor_from(self.completed_by_id, self.completed_by_name),
            completed_at_ms: self.completed_at_ms,
            completion_notes: self.completion_notes,
            signed_off_by: actor_from(self.signed_off_by_id, self.signed_off_by_name),
            signed_off_at_ms: self.signed_off_at_ms,
            form_type: self.form_type,
            module_reference,
            created_at_ms: self.created_at_ms,
            updated_at_ms: self.updated_at_ms,
        })
    }
}

pub(in crate::store) fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<SummaryRaw> {
    Ok(SummaryRaw {
        id: row.get(0)?,
        post_number: row.get(1)?,
        template_name: row.get(2)?,
        facility: row.get(3)?,
        location: row.get(4)?,
        author: row.get(5)?,
        status: row.get(6)?,
        completion_rate: row.get(7)?,
        hold_status: row.get(8)?,
        created_at_ms: row.get(9)?,
    })
}

pub(in crate::store) struct SummaryRaw {
    id: String,
    post_number: String,
    template_name: String,
    facility: String,
    location: Option<String>,
    author: String,
    status: String,
    completion_rate: f64,
    hold_status: String,
    created_at_ms: i64,
}

impl SummaryRaw {
    pub(in crate::store) fn into_summary(self) -> Result<PostSummary, StoreError> {
        const INVALID: StoreError = StoreError::Corrupt("invalid post row");
        Ok(PostSummary {
            id: PostId::try_new(self.id).map_err(|_| INVALID)?,
            post_number: self.post_number,
            template_name: self.template_name,
            facility: self.facility,
            location: self.location,
            author: self.author,
            status: PostStatus::parse(&self.status).ok_or(INVALID)?,
            completion_rate: self.completion_rate,
            hold_status: HoldStatus::parse(&self.hold_status).ok_or(INVALID)?,
            created_at_ms: self.created_at_ms,
        })
    }
}

pub(in crate::store) fn load_post(
    conn: &Connection,
    post_id: &str,
) -> Result<Option<IncidentPost>, StoreError> {
    let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1");
    let raw = conn
        .query_row(&sql, params![post_id], PostRaw::from_row)
        .optional()?;
    raw.map(PostRaw::into_post).transpose()
}

pub(in crate::store) fn load_task(
    conn: &Connection,
    task_id: &str,
) -> Result<Option<DepartmentTask>, StoreError> {
    let sql = format!("SELECT {TASK_COLUMNS} FROM department_tasks WHERE id = ?1");
    let raw = conn
        .query_row(&sql, params![task_id], TaskRaw::from_row)
        .optional()?;
    raw.map(TaskRaw::into_task).transpose()
}

/// Every task of a post, in creation order. Always read fresh; never cached.
pub(in crate::store) fn load_post_tasks(
    conn: &Connection,
    post_id: &str,
) -> Result<Vec<DepartmentTask>, StoreError> {
    let sql = format!(
        "SELECT {TASK_COLUMNS} FROM department_tasks WHERE post_id = ?1 \
         ORDER BY created_at_ms ASC, id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let raws = stmt
        .query_map(params![post_id], TaskRaw::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    raws.into_iter().map(TaskRaw::into_task).collect()
}

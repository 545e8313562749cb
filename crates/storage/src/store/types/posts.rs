#![forbid(unsafe_code)]

use super::{EventRow, WorkOrderLink};
use pf_core::{
    Actor, DepartmentCode, DepartmentTask, HoldStatus, IncidentPost, IncidentTemplate,
    ModuleReference, PostId, TaskId, TaskStatus,
};

#[derive(Clone, Debug)]
pub struct CreatePostRequest {
    pub template: IncidentTemplate,
    /// Replaces the template's department set for this one incident.
    pub departments: Option<Vec<DepartmentCode>>,
    pub actor: Actor,
    pub facility: String,
    pub location: Option<String>,
    pub form_data_json: Option<String>,
    pub photo_url: Option<String>,
    pub notes: Option<String>,
    pub at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct EscalateRequest {
    pub post_id: PostId,
    pub department: DepartmentCode,
    pub initiated_by: Actor,
    pub escalated_from: Option<DepartmentCode>,
    pub expected_revision: Option<i64>,
    pub at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct TransitionRequest {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub actor: Actor,
    pub notes: Option<String>,
    pub form_type: Option<String>,
    pub module_reference: Option<ModuleReference>,
    pub expected_revision: Option<i64>,
    pub at_ms: i64,
}

/// Result of a committed post creation.
#[derive(Clone, Debug)]
pub struct PostWrite {
    pub post: IncidentPost,
    pub tasks: Vec<DepartmentTask>,
    pub events: Vec<EventRow>,
}

/// Result of a committed escalation or transition.
#[derive(Clone, Debug)]
pub struct TaskWrite {
    pub task: DepartmentTask,
    pub post: IncidentPost,
    pub events: Vec<EventRow>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetailSource {
    Canonical,
    LegacyVerification,
}

impl DetailSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Canonical => "canonical",
            Self::LegacyVerification => "legacy_verification",
        }
    }
}

/// Uniform read model for one incident, whichever schema it was recorded under.
#[derive(Clone, Debug)]
pub struct IncidentDetail {
    pub post: IncidentPost,
    pub tasks: Vec<DepartmentTask>,
    pub hold: HoldStatus,
    pub work_orders: Vec<WorkOrderLink>,
    pub source: DetailSource,
}

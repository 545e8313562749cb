#![forbid(unsafe_code)]

use crate::ids::{DepartmentCode, PostId, TaskId};
use crate::template::IncidentTemplate;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub display_name: String,
}

impl Actor {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PostStatus {
    Pending,
    InProgress,
    Completed,
}

impl PostStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// Department task status. Declaration order is the only legal direction of travel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    SignedOff,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::SignedOff => "signed_off",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "signed_off" => Some(Self::SignedOff),
            _ => None,
        }
    }

    pub fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::InProgress => 1,
            Self::Completed => 2,
            Self::SignedOff => 3,
        }
    }
}

/// Why a department task exists on a post.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskProvenance {
    Original,
    Escalated {
        initiated_by: Actor,
        escalated_from: Option<DepartmentCode>,
    },
}

impl TaskProvenance {
    pub fn is_original(&self) -> bool {
        matches!(self, Self::Original)
    }

    pub fn initiated_by(&self) -> Option<&Actor> {
        match self {
            Self::Original => None,
            Self::Escalated { initiated_by, .. } => Some(initiated_by),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModuleReferenceKind {
    WorkOrder,
    Other,
}

impl ModuleReferenceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WorkOrder => "work_order",
            Self::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "work_order" => Self::WorkOrder,
            _ => Self::Other,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleReference {
    pub kind: ModuleReferenceKind,
    pub id: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DepartmentTask {
    pub id: TaskId,
    pub post_id: PostId,
    pub department_code: DepartmentCode,
    pub department_name: String,
    pub status: TaskStatus,
    pub requires_signoff: bool,
    pub provenance: TaskProvenance,
    pub completed_by: Option<Actor>,
    pub completed_at_ms: Option<i64>,
    pub completion_notes: Option<String>,
    pub signed_off_by: Option<Actor>,
    pub signed_off_at_ms: Option<i64>,
    pub form_type: Option<String>,
    pub module_reference: Option<ModuleReference>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl DepartmentTask {
    pub fn is_original(&self) -> bool {
        self.provenance.is_original()
    }

    /// Terminal for aggregation: signed off, or completed when no sign-off is required.
    pub fn is_resolved(&self) -> bool {
        match self.status {
            TaskStatus::SignedOff => true,
            TaskStatus::Completed => !self.requires_signoff,
            TaskStatus::Pending | TaskStatus::InProgress => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct IncidentPost {
    pub id: PostId,
    pub post_number: String,
    pub template_id: String,
    pub template_snapshot: IncidentTemplate,
    pub created_by: Actor,
    pub facility: String,
    pub location: Option<String>,
    /// Free-form form payload, kept as raw JSON text.
    pub form_data_json: String,
    pub photo_url: Option<String>,
    pub notes: Option<String>,
    pub status: PostStatus,
    pub total_departments: u32,
    pub completed_departments: u32,
    pub completion_rate: f64,
    pub completed_at_ms: Option<i64>,
    pub hold_status: crate::hold::HoldStatus,
    pub revision: i64,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

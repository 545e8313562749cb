#![forbid(unsafe_code)]

pub mod aggregate;
pub mod event;
pub mod evidence;
pub mod hold;
pub mod ids;
pub mod model;
pub mod search;
pub mod template;
pub mod transition;

pub use aggregate::{Aggregate, aggregate, next_completed_at};
pub use event::{EventKind, rollup_events};
pub use evidence::{EvidenceLink, FormRef};
pub use hold::{HoldStatus, evaluate_hold};
pub use ids::{DepartmentCode, DepartmentCodeError, PostId, RecordIdError, TaskId};
pub use model::{
    Actor, DepartmentTask, IncidentPost, ModuleReference, ModuleReferenceKind, PostStatus,
    TaskProvenance, TaskStatus,
};
pub use search::{PostSummary, filter_recent, matches_query};
pub use template::{IncidentTemplate, SuggestedForm, TemplateLookupError, TemplateRegistry};
pub use transition::{TransitionCheck, TransitionRejection, apply_transition, check_transition};

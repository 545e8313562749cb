#![forbid(unsafe_code)]

use super::EventRow;
use pf_core::{Actor, EvidenceLink, FormRef, PostId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkOrderRow {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub source_post_id: Option<String>,
    pub created_at_ms: Option<i64>,
}

/// Join path through which a work order was found for a post.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkOrderVia {
    TaskReference,
    LegacyVerification,
    SourcePost,
    DescriptionMatch,
}

impl WorkOrderVia {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TaskReference => "task_reference",
            Self::LegacyVerification => "legacy_verification",
            Self::SourcePost => "source_post",
            Self::DescriptionMatch => "description_match",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkOrderLink {
    pub id: String,
    /// First join path that produced this id.
    pub via: WorkOrderVia,
    /// `None` when the reference points at a work order that is not in the store.
    pub row: Option<WorkOrderRow>,
}

#[derive(Clone, Debug)]
pub struct SetEvidenceLinkRequest {
    pub form: FormRef,
    /// `None` clears the link.
    pub post_id: Option<PostId>,
    pub actor: Actor,
    pub at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct EvidenceWrite {
    pub link: EvidenceLink,
    pub events: Vec<EventRow>,
}

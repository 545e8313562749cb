#![forbid(unsafe_code)]

use crate::ids::PostId;

/// Identity of a form that may cite a post as supporting evidence.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FormRef {
    pub form_type: String,
    pub form_id: String,
}

impl FormRef {
    pub fn new(form_type: impl Into<String>, form_id: impl Into<String>) -> Self {
        Self {
            form_type: form_type.into(),
            form_id: form_id.into(),
        }
    }
}

/// Evidence toggle stored on the linking form. The post itself never learns about it.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum EvidenceLink {
    #[default]
    Disabled,
    Enabled {
        post_id: PostId,
        post_number: String,
    },
}

impl EvidenceLink {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled { .. })
    }

    pub fn post_id(&self) -> Option<&PostId> {
        match self {
            Self::Disabled => None,
            Self::Enabled { post_id, .. } => Some(post_id),
        }
    }
}

#![forbid(unsafe_code)]

use crate::aggregate::Aggregate;
use crate::hold::HoldStatus;
use crate::model::PostStatus;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    PostCreated,
    DepartmentAssigned,
    DepartmentEscalated,
    TaskTransitioned,
    PostResolved,
    PostReopened,
    HoldActivated,
    HoldCleared,
    HoldReinstated,
    EvidenceLinked,
    EvidenceUnlinked,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PostCreated => "post_created",
            Self::DepartmentAssigned => "department_assigned",
            Self::DepartmentEscalated => "department_escalated",
            Self::TaskTransitioned => "task_transitioned",
            Self::PostResolved => "post_resolved",
            Self::PostReopened => "post_reopened",
            Self::HoldActivated => "hold_activated",
            Self::HoldCleared => "hold_cleared",
            Self::HoldReinstated => "hold_reinstated",
            Self::EvidenceLinked => "evidence_linked",
            Self::EvidenceUnlinked => "evidence_unlinked",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let kind = match value.trim() {
            "post_created" => Self::PostCreated,
            "department_assigned" => Self::DepartmentAssigned,
            "department_escalated" => Self::DepartmentEscalated,
            "task_transitioned" => Self::TaskTransitioned,
            "post_resolved" => Self::PostResolved,
            "post_reopened" => Self::PostReopened,
            "hold_activated" => Self::HoldActivated,
            "hold_cleared" => Self::HoldCleared,
            "hold_reinstated" => Self::HoldReinstated,
            "evidence_linked" => Self::EvidenceLinked,
            "evidence_unlinked" => Self::EvidenceUnlinked,
            _ => return None,
        };
        Some(kind)
    }
}

/// Post-level events implied by a recomputation (resolution edges and hold changes).
pub fn rollup_events(
    previous_status: PostStatus,
    previous_hold: HoldStatus,
    next: &Aggregate,
    next_hold: HoldStatus,
) -> Vec<EventKind> {
    let mut out = Vec::new();
    let was_resolved = previous_status == PostStatus::Completed;
    if next.all_resolved && !was_resolved {
        out.push(EventKind::PostResolved);
    } else if !next.all_resolved && was_resolved {
        out.push(EventKind::PostReopened);
    }
    if next_hold != previous_hold {
        match next_hold {
            HoldStatus::Active => out.push(EventKind::HoldActivated),
            HoldStatus::Cleared => out.push(EventKind::HoldCleared),
            HoldStatus::Reinstated => out.push(EventKind::HoldReinstated),
            HoldStatus::None => {}
        }
    }
    out
}

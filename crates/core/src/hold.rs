#![forbid(unsafe_code)]

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HoldStatus {
    None,
    Active,
    Reinstated,
    Cleared,
}

impl HoldStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Active => "active",
            Self::Reinstated => "reinstated",
            Self::Cleared => "cleared",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "none" => Some(Self::None),
            "active" => Some(Self::Active),
            "reinstated" => Some(Self::Reinstated),
            "cleared" => Some(Self::Cleared),
            _ => None,
        }
    }

    /// Production stays blocked while a hold is active or reinstated.
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::Active | Self::Reinstated)
    }
}

/// Derives the production-hold state of one post.
///
/// `ever_cleared` is true once the post has reached a full clear at least once
/// (i.e. it carries a `completed_at` stamp). An unresolved post that was cleared
/// before can only have been reopened by an escalation, so it reports `Reinstated`
/// rather than `Active`.
pub fn evaluate_hold(is_production_hold: bool, all_resolved: bool, ever_cleared: bool) -> HoldStatus {
    if !is_production_hold {
        return HoldStatus::None;
    }
    if all_resolved {
        HoldStatus::Cleared
    } else if ever_cleared {
        HoldStatus::Reinstated
    } else {
        HoldStatus::Active
    }
}

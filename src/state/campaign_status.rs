/// Campaign lifecycle states
///
/// A campaign moves from `Pending` to `Active` when its seeds are dispatched,
/// and from `Active` to exactly one of the terminal or suspended states.
/// `Paused` is the only state that can re-enter `Active`.
use std::fmt;

/// Represents the lifecycle state of a crawl campaign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CampaignStatus {
    /// Campaign has been created but its seeds are not yet dispatched
    Pending,

    /// Campaign is collecting pages
    Active,

    /// Campaign is suspended; no new work is enqueued but in-flight
    /// results are still recorded
    Paused,

    /// Campaign reached its page budget or drained its frontier
    Completed,

    /// Campaign was invalid at creation or exceeded the failure threshold
    Failed,
}

impl CampaignStatus {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if the campaign may accept newly enqueued URLs
    pub fn accepts_work(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns true if `to` is a legal next state from `self`
    ///
    /// Pending campaigns activate or fail (creation-time validation).
    /// Active campaigns may pause, complete, or fail. Paused campaigns
    /// may only re-activate. Terminal states accept nothing.
    pub fn can_transition_to(&self, to: CampaignStatus) -> bool {
        match (self, to) {
            (Self::Pending, Self::Active) => true,
            (Self::Pending, Self::Failed) => true,
            (Self::Active, Self::Paused) => true,
            (Self::Active, Self::Completed) => true,
            (Self::Active, Self::Failed) => true,
            (Self::Paused, Self::Active) => true,
            _ => false,
        }
    }

    /// Converts the status to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from a database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "active" => Some(Self::Active),
            "paused" => Some(Self::Paused),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all possible campaign statuses
    pub fn all_statuses() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::Active,
            Self::Paused,
            Self::Completed,
            Self::Failed,
        ]
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

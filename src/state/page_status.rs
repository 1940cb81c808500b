/// Terminal outcome of a single crawled page
///
/// Every page a campaign touches ends up in exactly one of these states.
/// Blocked is a logical outcome, not an error: the server answered, but
/// with a challenge or denial rather than content.
use std::fmt;

/// Outcome recorded for a crawled page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageStatus {
    /// Page was fetched and its content extracted
    Success,

    /// Page could not be fetched (transport failure or non-block HTTP error)
    Failed,

    /// Page was refused by anti-bot measures (403/429/503 or challenge body)
    Blocked,
}

impl PageStatus {
    /// Returns true if the page counts toward the campaign budget
    pub fn is_collected(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Converts the status to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Blocked => "blocked",
        }
    }

    /// Parses a status from a database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            "blocked" => Some(Self::Blocked),
            _ => None,
        }
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

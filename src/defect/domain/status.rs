//! Defect lifecycle status and priority.

use super::{ParseDefectStatusError, ParsePriorityError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a defect.
///
/// The enumeration is closed: there is no null or "unknown" status. Legacy
/// data carrying `reopened` is mapped to [`DefectStatus::Open`] when parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefectStatus {
    /// Reported and awaiting action.
    Open,
    /// Waiting on information or a third party.
    Pending,
    /// Remedial work is underway.
    InProgress,
    /// Work reported complete by the responsible party.
    Resolved,
    /// Completion confirmed on site.
    Verified,
    /// Fix accepted by the inspecting party.
    Accepted,
    /// Fix or report rejected by the inspecting party.
    Rejected,
    /// Administratively closed.
    Closed,
}

impl DefectStatus {
    /// Every status, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Open,
        Self::Pending,
        Self::InProgress,
        Self::Resolved,
        Self::Verified,
        Self::Accepted,
        Self::Rejected,
        Self::Closed,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Verified => "verified",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Closed => "closed",
        }
    }

    /// Returns `true` for statuses that stop the overdue clock and count as
    /// no longer active.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        matches!(
            self,
            Self::Closed | Self::Accepted | Self::Rejected | Self::Verified | Self::Resolved
        )
    }
}

impl fmt::Display for DefectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for DefectStatus {
    type Error = ParseDefectStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "open" | "reopened" => Ok(Self::Open),
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "resolved" => Ok(Self::Resolved),
            "verified" => Ok(Self::Verified),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "closed" => Ok(Self::Closed),
            _ => Err(ParseDefectStatusError(value.to_owned())),
        }
    }
}

/// Defect priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Cosmetic or deferrable.
    Low,
    /// Default priority for new reports.
    Medium,
    /// Needs attention ahead of routine work.
    High,
    /// Blocks handover or poses a safety risk.
    Critical,
}

impl Priority {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Returns a rank where higher values are more urgent.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::Critical => 4,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Priority {
    type Error = ParsePriorityError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(ParsePriorityError(value.to_owned())),
        }
    }
}

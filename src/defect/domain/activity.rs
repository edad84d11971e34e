//! Assignment records and the append-only activity trail.

use super::{DefectId, ParseActivityActionError, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The single current user assignment for a defect.
///
/// Replacing an assignment always produces a new record with a fresh
/// timestamp; records are never edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Assigned defect.
    pub defect_id: DefectId,
    /// User now responsible for the defect.
    pub assignee_id: UserId,
    /// User who made the routing decision.
    pub assigned_by: UserId,
    /// Time of the routing decision.
    pub assigned_at: DateTime<Utc>,
}

/// Action tag recorded on each activity entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityAction {
    /// Defect assigned to a user.
    Assign,
    /// Responsible contractor set or changed.
    ContractorAssign,
    /// Responsible contractor removed.
    ContractorUnassign,
    /// Defect accepted.
    Accept,
    /// Defect rejected.
    Reject,
    /// Defect reopened.
    Reopen,
    /// Work started.
    StartWork,
    /// Defect parked as pending.
    MarkPending,
    /// Work reported complete.
    Resolve,
    /// Defect closed.
    Close,
}

impl ActivityAction {
    /// Returns the tag stored in the activity log.
    #[must_use]
    pub const fn as_tag(self) -> &'static str {
        match self {
            Self::Assign => "ASSIGN",
            Self::ContractorAssign => "CONTRACTOR_ASSIGN",
            Self::ContractorUnassign => "CONTRACTOR_UNASSIGN",
            Self::Accept => "ACCEPT",
            Self::Reject => "REJECT",
            Self::Reopen => "REOPEN",
            Self::StartWork => "START_WORK",
            Self::MarkPending => "MARK_PENDING",
            Self::Resolve => "RESOLVE",
            Self::Close => "CLOSE",
        }
    }
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl TryFrom<&str> for ActivityAction {
    type Error = ParseActivityActionError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "ASSIGN" => Ok(Self::Assign),
            "CONTRACTOR_ASSIGN" => Ok(Self::ContractorAssign),
            "CONTRACTOR_UNASSIGN" => Ok(Self::ContractorUnassign),
            "ACCEPT" => Ok(Self::Accept),
            "REJECT" => Ok(Self::Reject),
            "REOPEN" => Ok(Self::Reopen),
            "START_WORK" => Ok(Self::StartWork),
            "MARK_PENDING" => Ok(Self::MarkPending),
            "RESOLVE" => Ok(Self::Resolve),
            "CLOSE" => Ok(Self::Close),
            _ => Err(ParseActivityActionError(value.to_owned())),
        }
    }
}

/// An activity entry that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActivityEntry {
    /// Defect the entry describes.
    pub defect_id: DefectId,
    /// User who performed the mutation.
    pub actor_id: UserId,
    /// Action tag.
    pub action: ActivityAction,
    /// Pre-rendered, human-readable description.
    pub detail: String,
    /// Time of the mutation.
    pub recorded_at: DateTime<Utc>,
}

/// A stored, immutable activity entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    /// Store-assigned sequence identifier.
    pub id: i64,
    /// Defect the entry describes.
    pub defect_id: DefectId,
    /// User who performed the mutation.
    pub actor_id: UserId,
    /// Action tag.
    pub action: ActivityAction,
    /// Human-readable description.
    pub detail: String,
    /// Time of the mutation.
    pub recorded_at: DateTime<Utc>,
}

impl ActivityEntry {
    /// Builds the stored form of a new entry.
    #[must_use]
    pub fn from_new(id: i64, entry: NewActivityEntry) -> Self {
        Self {
            id,
            defect_id: entry.defect_id,
            actor_id: entry.actor_id,
            action: entry.action,
            detail: entry.detail,
            recorded_at: entry.recorded_at,
        }
    }
}

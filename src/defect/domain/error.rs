//! Error types for defect domain validation and parsing.

use super::{DefectStatus, TransitionAction};
use thiserror::Error;

/// Validation errors raised before any store access takes place.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DefectDomainError {
    /// A required identifier was not supplied.
    #[error("{0} is required")]
    MissingIdentifier(&'static str),

    /// An identifier could not be parsed as an integer.
    #[error("{field} must be numeric, got '{value}'")]
    MalformedIdentifier {
        /// Name of the offending field.
        field: &'static str,
        /// The raw value supplied by the caller.
        value: String,
    },

    /// An identifier was zero or negative.
    #[error("{field} must be a positive integer, got {value}")]
    NonPositiveIdentifier {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: i64,
    },

    /// A transition that needs a comment was requested without one.
    #[error("a comment is required to {0}")]
    EmptyComment(TransitionAction),

    /// A bulk operation was requested with no defects selected.
    #[error("select at least one defect")]
    EmptySelection,

    /// The listing page size is outside the accepted range.
    #[error("page size must be at least 1, got {0}")]
    InvalidPageSize(u32),

    /// The action selector is not recognised.
    #[error("unknown action '{0}'")]
    UnknownAction(String),
}

/// Guard failures raised by the lifecycle transition table.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    /// The action is not legal from the defect's current status.
    #[error("cannot {action} a defect that is {from}")]
    NotPermittedFrom {
        /// Requested action.
        action: TransitionAction,
        /// Status the defect is currently in.
        from: DefectStatus,
    },

    /// The acting user's role may not perform this action.
    #[error("your role may not {action} defects")]
    RoleNotPermitted {
        /// Requested action.
        action: TransitionAction,
    },

    /// The transition table has no rule for this action.
    #[error("the {0} action is disabled")]
    ActionDisabled(TransitionAction),
}

/// Error returned while parsing defect statuses from persistence or input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown defect status: {0}")]
pub struct ParseDefectStatusError(pub String);

/// Error returned while parsing defect priorities.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown defect priority: {0}")]
pub struct ParsePriorityError(pub String);

/// Error returned while parsing activity action tags.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown activity action: {0}")]
pub struct ParseActivityActionError(pub String);

/// Error returned while parsing actor roles.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown actor role: {0}")]
pub struct ParseActorRoleError(pub String);

//! Service-level errors and caller-facing messages.

use crate::defect::{
    domain::{ContractorId, DefectDomainError, DefectId, PreflightError, TransitionError, UserId},
    ports::StoreError,
};
use thiserror::Error;

/// Message returned to callers when the store fails. Raw failure detail is
/// logged for operators but never surfaced.
pub const GENERIC_FAILURE_MESSAGE: &str = "The operation could not be completed. Please try again.";

/// Errors raised by lifecycle transitions.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The request is malformed.
    #[error(transparent)]
    Validation(#[from] DefectDomainError),
    /// The transition table forbids the request.
    #[error(transparent)]
    Guard(#[from] TransitionError),
    /// The defect does not exist or has been deleted.
    #[error("defect #{0} was not found")]
    DefectNotFound(DefectId),
    /// The acting user does not exist.
    #[error("acting user #{0} was not found")]
    ActorNotFound(UserId),
    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<PreflightError> for LifecycleError {
    fn from(err: PreflightError) -> Self {
        match err {
            PreflightError::Validation(inner) => Self::Validation(inner),
            PreflightError::Guard(inner) => Self::Guard(inner),
        }
    }
}

impl LifecycleError {
    /// Returns the text shown to the requesting user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Store(_) => GENERIC_FAILURE_MESSAGE.to_owned(),
            other => capitalise(&other.to_string()),
        }
    }

    /// Returns `true` when the failure originated in the store.
    #[must_use]
    pub const fn is_store_failure(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Errors raised by assignment operations.
#[derive(Debug, Error)]
pub enum AssignmentError {
    /// The request is malformed.
    #[error(transparent)]
    Validation(#[from] DefectDomainError),
    /// The defect does not exist or has been deleted.
    #[error("defect #{0} was not found")]
    DefectNotFound(DefectId),
    /// The acting user does not exist.
    #[error("acting user #{0} was not found")]
    ActorNotFound(UserId),
    /// The target user does not exist.
    #[error("user #{0} was not found")]
    UserNotFound(UserId),
    /// The target user is inactive.
    #[error("user #{0} is inactive and cannot be assigned defects")]
    UserInactive(UserId),
    /// The target contractor does not exist.
    #[error("contractor #{0} was not found")]
    ContractorNotFound(ContractorId),
    /// The target contractor is inactive.
    #[error("contractor #{0} is inactive and cannot be assigned defects")]
    ContractorInactive(ContractorId),
    /// The defect has no contractor to remove.
    #[error("defect #{0} has no contractor assigned")]
    NoContractorAssigned(DefectId),
    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AssignmentError {
    /// Returns the text shown to the requesting user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Store(_) => GENERIC_FAILURE_MESSAGE.to_owned(),
            other => capitalise(&other.to_string()),
        }
    }

    /// Returns `true` when the failure originated in the store.
    #[must_use]
    pub const fn is_store_failure(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

/// Result type for assignment operations.
pub type AssignmentResult<T> = Result<T, AssignmentError>;

/// Errors raised by read-only queries.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The request is malformed.
    #[error(transparent)]
    Validation(#[from] DefectDomainError),
    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Upper-cases the first character of an error message.
pub(super) fn capitalise(text: &str) -> String {
    let mut chars = text.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Logs a failed mutation at a level matching its cause.
pub(super) fn log_failure(operation: &'static str, store_failure: bool, error: &dyn std::error::Error) {
    if store_failure {
        tracing::error!(operation, error = %error, "store failure; transaction rolled back");
    } else {
        tracing::warn!(operation, error = %error, "request rejected");
    }
}

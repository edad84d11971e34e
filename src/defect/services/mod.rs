//! Application services for defect lifecycle and assignment.

mod activity;
mod assignment;
mod dispatch;
mod error;
mod lifecycle;
mod projection;
mod query;

pub use activity::ActivityLogger;
pub use assignment::{
    AssignContractorRequest, AssignUserRequest, AssignmentService, BulkAssignContractorRequest,
    BulkAssignUserRequest, BulkAssignmentOutcome,
};
pub use dispatch::{ActionDispatcher, ActionKind, ActionOutcome, ActionRequest};
pub use error::{
    AssignmentError, AssignmentResult, GENERIC_FAILURE_MESSAGE, LifecycleError, LifecycleResult,
    QueryError, QueryResult,
};
pub use lifecycle::{LifecycleService, TransitionRequest};
pub use projection::{DefectProjection, PartySummary};
pub use query::DefectQueryService;

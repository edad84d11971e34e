//! Domain model for defect lifecycle and assignment.
//!
//! Everything here is free of infrastructure: the store, the clock source,
//! and the request layer stay outside the domain boundary. Timestamps are
//! passed in by callers so that the same values can be reused across every
//! write in one transaction.

mod activity;
mod defect;
mod error;
mod ids;
mod listing;
mod party;
mod status;
mod transition;

pub use activity::{ActivityAction, ActivityEntry, Assignment, NewActivityEntry};
pub use defect::{
    Defect, DefectDraft, LifecycleStamps, PersistedDefectData, Stamp, is_overdue,
};
pub use error::{
    DefectDomainError, ParseActivityActionError, ParseActorRoleError, ParseDefectStatusError,
    ParsePriorityError, TransitionError,
};
pub use ids::{ContractorId, DefectId, ProjectId, UserId};
pub use listing::{
    DefectFilter, DefectListing, DefectMetrics, DefectSort, Page, PageWindow, SortDirection,
    SortField,
};
pub use party::{Contractor, User};
pub use status::{DefectStatus, Priority};
pub use transition::{
    Actor, ActorRole, PreflightError, TransitionAction, TransitionPolicy, TransitionRule,
};

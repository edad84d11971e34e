//! Defect aggregate root.

use super::{ContractorId, DefectId, DefectStatus, Priority, ProjectId, TransitionAction, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Who performed a lifecycle transition, when, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamp {
    /// Acting user.
    pub actor_id: UserId,
    /// Transition time.
    pub at: DateTime<Utc>,
    /// Comment or reason supplied with the transition.
    pub comment: Option<String>,
}

/// The most recent stamp for each sign-off transition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleStamps {
    /// Last acceptance.
    pub accepted: Option<Stamp>,
    /// Last rejection.
    pub rejected: Option<Stamp>,
    /// Last reopen.
    pub reopened: Option<Stamp>,
    /// Last closure.
    pub closed: Option<Stamp>,
}

impl LifecycleStamps {
    fn slot_mut(&mut self, action: TransitionAction) -> Option<&mut Option<Stamp>> {
        match action {
            TransitionAction::Accept => Some(&mut self.accepted),
            TransitionAction::Reject => Some(&mut self.rejected),
            TransitionAction::Reopen => Some(&mut self.reopened),
            TransitionAction::Close => Some(&mut self.closed),
            TransitionAction::StartWork
            | TransitionAction::MarkPending
            | TransitionAction::Resolve => None,
        }
    }
}

/// Fields supplied when a defect is first reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefectDraft {
    /// Owning project.
    pub project_id: ProjectId,
    /// Short title.
    pub title: String,
    /// Longer description.
    pub description: String,
    /// Priority.
    pub priority: Priority,
    /// Optional due date.
    pub due_date: Option<NaiveDate>,
    /// Reporting user.
    pub created_by: UserId,
}

impl DefectDraft {
    /// Creates a draft with medium priority, no description, and no due date.
    #[must_use]
    pub fn new(project_id: ProjectId, title: impl Into<String>, created_by: UserId) -> Self {
        Self {
            project_id,
            title: title.into(),
            description: String::new(),
            priority: Priority::Medium,
            due_date: None,
            created_by,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the due date.
    #[must_use]
    pub const fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }
}

/// Defect aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defect {
    id: DefectId,
    project_id: ProjectId,
    title: String,
    description: String,
    priority: Priority,
    status: DefectStatus,
    due_date: Option<NaiveDate>,
    contractor_id: Option<ContractorId>,
    created_by: UserId,
    stamps: LifecycleStamps,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

/// Parameter object for reconstructing a persisted defect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedDefectData {
    /// Persisted identifier.
    pub id: DefectId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Priority.
    pub priority: Priority,
    /// Lifecycle status.
    pub status: DefectStatus,
    /// Due date.
    pub due_date: Option<NaiveDate>,
    /// Responsible contractor.
    pub contractor_id: Option<ContractorId>,
    /// Reporting user.
    pub created_by: UserId,
    /// Sign-off stamps.
    pub stamps: LifecycleStamps,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Defect {
    /// Creates a newly reported defect in the `open` status.
    #[must_use]
    pub fn report(id: DefectId, draft: DefectDraft, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id,
            project_id: draft.project_id,
            title: draft.title,
            description: draft.description,
            priority: draft.priority,
            status: DefectStatus::Open,
            due_date: draft.due_date,
            contractor_id: None,
            created_by: draft.created_by,
            stamps: LifecycleStamps::default(),
            created_at: timestamp,
            updated_at: timestamp,
            deleted_at: None,
        }
    }

    /// Reconstructs a defect from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedDefectData) -> Self {
        Self {
            id: data.id,
            project_id: data.project_id,
            title: data.title,
            description: data.description,
            priority: data.priority,
            status: data.status,
            due_date: data.due_date,
            contractor_id: data.contractor_id,
            created_by: data.created_by,
            stamps: data.stamps,
            created_at: data.created_at,
            updated_at: data.updated_at,
            deleted_at: data.deleted_at,
        }
    }

    /// Returns the defect identifier.
    #[must_use]
    pub const fn id(&self) -> DefectId {
        self.id
    }

    /// Returns the owning project.
    #[must_use]
    pub const fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> DefectStatus {
        self.status
    }

    /// Returns the due date, if any.
    #[must_use]
    pub const fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    /// Returns the responsible contractor, if any.
    #[must_use]
    pub const fn contractor_id(&self) -> Option<ContractorId> {
        self.contractor_id
    }

    /// Returns the reporting user.
    #[must_use]
    pub const fn created_by(&self) -> UserId {
        self.created_by
    }

    /// Returns the sign-off stamps.
    #[must_use]
    pub const fn stamps(&self) -> &LifecycleStamps {
        &self.stamps
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last mutation timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the soft-delete marker, if set.
    #[must_use]
    pub const fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    /// Returns `true` when the defect has been soft-deleted.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns `true` when the defect is past due on `today`.
    #[must_use]
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        is_overdue(self.due_date, self.status, today)
    }

    /// Moves the defect to `target` and stamps the transition.
    ///
    /// The caller is responsible for checking the transition table first.
    pub fn apply_transition(
        &mut self,
        action: TransitionAction,
        target: DefectStatus,
        stamp: Stamp,
    ) {
        self.updated_at = stamp.at;
        if let Some(slot) = self.stamps.slot_mut(action) {
            *slot = Some(stamp);
        }
        self.status = target;
    }

    /// Replaces the responsible contractor.
    pub fn set_contractor(&mut self, contractor_id: Option<ContractorId>, at: DateTime<Utc>) {
        self.contractor_id = contractor_id;
        self.updated_at = at;
    }
}

/// Returns `true` when `due_date` has passed and `status` is still active.
///
/// Overdue is always derived at read time and never persisted.
#[must_use]
pub fn is_overdue(due_date: Option<NaiveDate>, status: DefectStatus, today: NaiveDate) -> bool {
    due_date.is_some_and(|due| due < today) && !status.is_settled()
}

//! Inbound request contract for the request-handling layer.
//!
//! The dispatcher accepts raw, string-typed input exactly as a form or API
//! layer would supply it, rejects malformed identifiers before any
//! transaction is opened, routes to the lifecycle or assignment engine, and
//! reduces every outcome to a success flag, a user-facing message, and the
//! affected defects' projections.

use super::{
    assignment::{
        AssignContractorRequest, AssignUserRequest, AssignmentService, BulkAssignContractorRequest,
        BulkAssignUserRequest, BulkAssignmentOutcome,
    },
    error::{AssignmentError, LifecycleError, capitalise},
    lifecycle::{LifecycleService, TransitionRequest},
    projection::DefectProjection,
};
use crate::config::TrackerConfig;
use crate::defect::{
    domain::{Actor, ContractorId, DefectDomainError, DefectId, TransitionAction, UserId},
    ports::DefectStore,
};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Operation selected by an inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Assign one defect to a user.
    AssignUser,
    /// Assign many defects to a user.
    BulkAssignUser,
    /// Set one defect's contractor.
    AssignContractor,
    /// Set many defects' contractor.
    BulkAssignContractor,
    /// Remove one defect's contractor.
    UnassignContractor,
    /// Apply a lifecycle transition.
    Transition(TransitionAction),
}

impl TryFrom<&str> for ActionKind {
    type Error = DefectDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "assign_user" => Ok(Self::AssignUser),
            "bulk_assign_user" => Ok(Self::BulkAssignUser),
            "assign_contractor" => Ok(Self::AssignContractor),
            "bulk_assign_contractor" => Ok(Self::BulkAssignContractor),
            "unassign_contractor" => Ok(Self::UnassignContractor),
            "accept" => Ok(Self::Transition(TransitionAction::Accept)),
            "reject" => Ok(Self::Transition(TransitionAction::Reject)),
            "reopen" => Ok(Self::Transition(TransitionAction::Reopen)),
            "start_work" => Ok(Self::Transition(TransitionAction::StartWork)),
            "mark_pending" => Ok(Self::Transition(TransitionAction::MarkPending)),
            "resolve" => Ok(Self::Transition(TransitionAction::Resolve)),
            "close" => Ok(Self::Transition(TransitionAction::Close)),
            _ => Err(DefectDomainError::UnknownAction(value.to_owned())),
        }
    }
}

/// Raw inbound request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ActionRequest {
    /// Action selector, e.g. `assign_user` or `accept`.
    pub action: String,
    /// Acting user, resolved by the caller's session handling.
    pub actor: Actor,
    /// Target defect for single-defect actions.
    #[serde(default)]
    pub defect_id: Option<String>,
    /// Target defects for bulk actions.
    #[serde(default)]
    pub defect_ids: Vec<String>,
    /// Target user or contractor.
    #[serde(default)]
    pub target_id: Option<String>,
    /// Comment or reason for lifecycle transitions.
    #[serde(default)]
    pub comment: Option<String>,
}

impl ActionRequest {
    /// Creates a request with only the selector and actor set.
    #[must_use]
    pub fn new(action: impl Into<String>, actor: Actor) -> Self {
        Self {
            action: action.into(),
            actor,
            defect_id: None,
            defect_ids: Vec::new(),
            target_id: None,
            comment: None,
        }
    }

    /// Sets the single target defect.
    #[must_use]
    pub fn with_defect(mut self, defect_id: impl Into<String>) -> Self {
        self.defect_id = Some(defect_id.into());
        self
    }

    /// Sets the bulk target defects.
    #[must_use]
    pub fn with_defects<I, T>(mut self, defect_ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.defect_ids = defect_ids.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the target user or contractor.
    #[must_use]
    pub fn with_target(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }

    /// Sets the comment.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Reply returned to the request layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    /// Whether the action committed.
    pub success: bool,
    /// Human-readable message suitable for display.
    pub message: String,
    /// Current state of each affected defect; empty on failure.
    pub projections: Vec<DefectProjection>,
}

impl ActionOutcome {
    fn succeeded(message: String, projections: Vec<DefectProjection>) -> Self {
        Self {
            success: true,
            message,
            projections,
        }
    }

    fn failed(message: String) -> Self {
        Self {
            success: false,
            message,
            projections: Vec::new(),
        }
    }
}

enum DispatchError {
    Validation(DefectDomainError),
    Assignment(AssignmentError),
    Lifecycle(LifecycleError),
}

impl DispatchError {
    fn user_message(&self) -> String {
        match self {
            Self::Validation(err) => capitalise(&err.to_string()),
            Self::Assignment(err) => err.user_message(),
            Self::Lifecycle(err) => err.user_message(),
        }
    }
}

impl From<DefectDomainError> for DispatchError {
    fn from(err: DefectDomainError) -> Self {
        Self::Validation(err)
    }
}

impl From<AssignmentError> for DispatchError {
    fn from(err: AssignmentError) -> Self {
        Self::Assignment(err)
    }
}

impl From<LifecycleError> for DispatchError {
    fn from(err: LifecycleError) -> Self {
        Self::Lifecycle(err)
    }
}

/// Routes raw requests to the lifecycle and assignment engines.
#[derive(Clone)]
pub struct ActionDispatcher<S, C>
where
    S: DefectStore,
    C: Clock + Send + Sync,
{
    lifecycle: LifecycleService<S, C>,
    assignment: AssignmentService<S, C>,
}

impl<S, C> ActionDispatcher<S, C>
where
    S: DefectStore,
    C: Clock + Send + Sync,
{
    /// Creates a dispatcher whose engines share one store and clock.
    #[must_use]
    pub fn new(store: Arc<S>, clock: Arc<C>, config: &TrackerConfig) -> Self {
        Self {
            lifecycle: LifecycleService::new(Arc::clone(&store), Arc::clone(&clock))
                .with_policy(config.transitions.clone()),
            assignment: AssignmentService::new(store, clock),
        }
    }

    /// Executes one request. Never fails: every error is reduced to an
    /// unsuccessful outcome with a user-facing message.
    pub async fn dispatch(&self, request: ActionRequest) -> ActionOutcome {
        match self.execute(request).await {
            Ok((message, projections)) => ActionOutcome::succeeded(message, projections),
            Err(err) => ActionOutcome::failed(err.user_message()),
        }
    }

    async fn execute(
        &self,
        request: ActionRequest,
    ) -> Result<(String, Vec<DefectProjection>), DispatchError> {
        let kind = ActionKind::try_from(request.action.as_str())?;
        let actor = request.actor;
        match kind {
            ActionKind::AssignUser => {
                let parsed = AssignUserRequest::parse(
                    request.defect_id.as_deref(),
                    request.target_id.as_deref(),
                    actor.user_id,
                )?;
                let projection = self.assignment.assign_user(parsed).await?;
                let message = format!(
                    "Defect #{} assigned to {}",
                    projection.defect_id,
                    assignee_name(&projection)
                );
                Ok((message, vec![projection]))
            }
            ActionKind::BulkAssignUser => {
                let defect_ids = parse_defect_ids(&request.defect_ids)?;
                let user_id = UserId::parse_required(request.target_id.as_deref())?;
                let outcome = self
                    .assignment
                    .bulk_assign_user(BulkAssignUserRequest::new(
                        defect_ids,
                        user_id,
                        actor.user_id,
                    ))
                    .await?;
                Ok(bulk_reply(outcome, assignee_name))
            }
            ActionKind::AssignContractor => {
                let defect_id = DefectId::parse_required(request.defect_id.as_deref())?;
                let contractor_id = ContractorId::parse_required(request.target_id.as_deref())?;
                let projection = self
                    .assignment
                    .assign_contractor(AssignContractorRequest::new(
                        defect_id,
                        contractor_id,
                        actor.user_id,
                    ))
                    .await?;
                let message = format!(
                    "Defect #{} assigned to contractor {}",
                    projection.defect_id,
                    contractor_name(&projection)
                );
                Ok((message, vec![projection]))
            }
            ActionKind::BulkAssignContractor => {
                let defect_ids = parse_defect_ids(&request.defect_ids)?;
                let contractor_id = ContractorId::parse_required(request.target_id.as_deref())?;
                let outcome = self
                    .assignment
                    .bulk_assign_contractor(BulkAssignContractorRequest::new(
                        defect_ids,
                        contractor_id,
                        actor.user_id,
                    ))
                    .await?;
                Ok(bulk_reply(outcome, |projection| {
                    format!("contractor {}", contractor_name(projection))
                }))
            }
            ActionKind::UnassignContractor => {
                let defect_id = DefectId::parse_required(request.defect_id.as_deref())?;
                let projection = self
                    .assignment
                    .unassign_contractor(defect_id, actor.user_id)
                    .await?;
                let message = format!("Contractor removed from defect #{defect_id}");
                Ok((message, vec![projection]))
            }
            ActionKind::Transition(action) => {
                let defect_id = DefectId::parse_required(request.defect_id.as_deref())?;
                let mut transition = TransitionRequest::new(defect_id, actor);
                if let Some(comment) = request.comment {
                    transition = transition.with_comment(comment);
                }
                let projection = self.lifecycle.transition(action, transition).await?;
                let message = format!("Defect #{defect_id} is now {}", projection.status);
                Ok((message, vec![projection]))
            }
        }
    }
}

fn parse_defect_ids(raw: &[String]) -> Result<Vec<DefectId>, DefectDomainError> {
    if raw.is_empty() {
        return Err(DefectDomainError::EmptySelection);
    }
    raw.iter().map(|id| DefectId::parse(id)).collect()
}

fn assignee_name(projection: &DefectProjection) -> String {
    projection
        .assignee
        .as_ref()
        .map_or_else(|| "nobody".to_owned(), |party| party.name.clone())
}

fn contractor_name(projection: &DefectProjection) -> String {
    projection
        .contractor
        .as_ref()
        .map_or_else(|| "none".to_owned(), |party| party.name.clone())
}

fn bulk_reply(
    outcome: BulkAssignmentOutcome,
    target_name: impl Fn(&DefectProjection) -> String,
) -> (String, Vec<DefectProjection>) {
    let target = outcome
        .projections
        .first()
        .map_or_else(String::new, &target_name);
    let noun = if outcome.assigned == 1 { "defect" } else { "defects" };
    let message = format!("{} {noun} assigned to {target}", outcome.assigned);
    (message, outcome.projections)
}

//! Lifecycle engine: guarded status transitions with an audit entry.

use super::{
    activity::ActivityLogger,
    error::{LifecycleError, LifecycleResult, log_failure},
    projection::{DefectProjection, live_defect, project},
};
use crate::defect::{
    domain::{
        Actor, DefectId, DefectStatus, NewActivityEntry, Stamp, TransitionAction, TransitionPolicy,
    },
    ports::{DefectStore, StoreTransaction},
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::sync::Arc;

/// Request payload for a lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    defect_id: DefectId,
    actor: Actor,
    comment: Option<String>,
}

impl TransitionRequest {
    /// Creates a request without a comment.
    #[must_use]
    pub const fn new(defect_id: DefectId, actor: Actor) -> Self {
        Self {
            defect_id,
            actor,
            comment: None,
        }
    }

    /// Sets the comment or reason.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Returns the target defect.
    #[must_use]
    pub const fn defect_id(&self) -> DefectId {
        self.defect_id
    }
}

/// Everything a transition needs once preflight checks have passed.
struct TransitionCommand {
    action: TransitionAction,
    defect_id: DefectId,
    actor: Actor,
    comment: Option<String>,
    at: DateTime<Utc>,
}

/// Lifecycle orchestration service.
#[derive(Clone)]
pub struct LifecycleService<S, C>
where
    S: DefectStore,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    clock: Arc<C>,
    policy: Arc<TransitionPolicy>,
    logger: ActivityLogger,
}

impl<S, C> LifecycleService<S, C>
where
    S: DefectStore,
    C: Clock + Send + Sync,
{
    /// Creates a service using the default transition table.
    #[must_use]
    pub fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self {
            store,
            clock,
            policy: Arc::new(TransitionPolicy::default()),
            logger: ActivityLogger::new(),
        }
    }

    /// Replaces the transition table.
    #[must_use]
    pub fn with_policy(mut self, policy: TransitionPolicy) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Returns the transition table in force.
    #[must_use]
    pub fn policy(&self) -> &TransitionPolicy {
        &self.policy
    }

    /// Accepts a defect. A comment is required.
    ///
    /// # Errors
    ///
    /// See [`Self::transition`].
    pub async fn accept(&self, request: TransitionRequest) -> LifecycleResult<DefectProjection> {
        self.transition(TransitionAction::Accept, request).await
    }

    /// Rejects a defect. A comment is required.
    ///
    /// # Errors
    ///
    /// See [`Self::transition`].
    pub async fn reject(&self, request: TransitionRequest) -> LifecycleResult<DefectProjection> {
        self.transition(TransitionAction::Reject, request).await
    }

    /// Reopens an accepted or rejected defect. A reason is required.
    ///
    /// # Errors
    ///
    /// See [`Self::transition`].
    pub async fn reopen(&self, request: TransitionRequest) -> LifecycleResult<DefectProjection> {
        self.transition(TransitionAction::Reopen, request).await
    }

    /// Starts remedial work.
    ///
    /// # Errors
    ///
    /// See [`Self::transition`].
    pub async fn start_work(
        &self,
        request: TransitionRequest,
    ) -> LifecycleResult<DefectProjection> {
        self.transition(TransitionAction::StartWork, request).await
    }

    /// Parks a defect as pending.
    ///
    /// # Errors
    ///
    /// See [`Self::transition`].
    pub async fn mark_pending(
        &self,
        request: TransitionRequest,
    ) -> LifecycleResult<DefectProjection> {
        self.transition(TransitionAction::MarkPending, request).await
    }

    /// Reports remedial work complete.
    ///
    /// # Errors
    ///
    /// See [`Self::transition`].
    pub async fn resolve(&self, request: TransitionRequest) -> LifecycleResult<DefectProjection> {
        self.transition(TransitionAction::Resolve, request).await
    }

    /// Closes a defect.
    ///
    /// # Errors
    ///
    /// See [`Self::transition`].
    pub async fn close(&self, request: TransitionRequest) -> LifecycleResult<DefectProjection> {
        self.transition(TransitionAction::Close, request).await
    }

    /// Applies `action` to the requested defect in one transaction.
    ///
    /// Comment and role checks run before the store is touched. The status
    /// guard runs against the status read under a row lock inside the
    /// transaction, so concurrent transitions of one defect are serialized;
    /// when the guard fails nothing is written.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Validation`] for a missing comment,
    /// [`LifecycleError::Guard`] for an illegal transition or role,
    /// [`LifecycleError::ActorNotFound`] for an unknown acting user,
    /// [`LifecycleError::DefectNotFound`] for an absent or deleted defect,
    /// and [`LifecycleError::Store`] when the store fails.
    pub async fn transition(
        &self,
        action: TransitionAction,
        request: TransitionRequest,
    ) -> LifecycleResult<DefectProjection> {
        let TransitionRequest {
            defect_id,
            actor,
            comment,
        } = request;

        let comment = self
            .policy
            .preflight(action, &actor, comment.as_deref())
            .map_err(LifecycleError::from)
            .inspect_err(|err| log_failure("transition", false, err))?;

        let command = TransitionCommand {
            action,
            defect_id,
            actor,
            comment,
            at: self.clock.utc(),
        };
        let policy = Arc::clone(&self.policy);
        let logger = self.logger;
        let result: LifecycleResult<DefectProjection> = self
            .store
            .transaction(move |tx| apply_transition(tx, &policy, logger, command))
            .await;

        match &result {
            Ok(projection) => tracing::info!(
                defect_id = %defect_id,
                actor_id = %actor.user_id,
                action = %action.activity_action(),
                status = %projection.status,
                "defect status changed"
            ),
            Err(err) => log_failure("transition", err.is_store_failure(), err),
        }
        result
    }
}

fn apply_transition(
    tx: &mut dyn StoreTransaction,
    policy: &TransitionPolicy,
    logger: ActivityLogger,
    command: TransitionCommand,
) -> LifecycleResult<DefectProjection> {
    let TransitionCommand {
        action,
        defect_id,
        actor,
        comment,
        at,
    } = command;

    let actor_name = tx
        .find_user(actor.user_id)?
        .ok_or(LifecycleError::ActorNotFound(actor.user_id))?
        .display_name()
        .to_owned();
    let mut defect =
        live_defect(tx, defect_id, true)?.ok_or(LifecycleError::DefectNotFound(defect_id))?;
    let from = defect.status();
    let target = policy.target_for(action, from)?;
    let detail = transition_detail(&actor_name, from, target, comment.as_deref());

    defect.apply_transition(
        action,
        target,
        Stamp {
            actor_id: actor.user_id,
            at,
            comment,
        },
    );
    tx.update_defect(&defect)?;
    logger.record(
        tx,
        &NewActivityEntry {
            defect_id,
            actor_id: actor.user_id,
            action: action.activity_action(),
            detail,
            recorded_at: at,
        },
    )?;
    Ok(project(tx, &defect)?)
}

fn transition_detail(
    actor_name: &str,
    from: DefectStatus,
    to: DefectStatus,
    comment: Option<&str>,
) -> String {
    comment.map_or_else(
        || format!("{actor_name} changed status from {from} to {to}"),
        |text| format!("{actor_name} changed status from {from} to {to}: {text}"),
    )
}

//! Assignment engine: routes defects to a user and to a contractor.
//!
//! User assignment replaces the defect's single assignment row by deleting
//! and re-inserting it inside one transaction, so the assignment timestamp
//! always reflects the latest routing decision. Contractor reassignment reads
//! the defect under a row lock so that concurrent reassignments of the same
//! defect are serialized and each audit entry names the true predecessor.
//! Bulk variants run the whole batch in one transaction: one failure rolls
//! back every defect in it.

use super::{
    activity::ActivityLogger,
    error::{AssignmentError, AssignmentResult, log_failure},
    projection::{DefectProjection, contractor_label, live_defect, project},
};
use crate::defect::{
    domain::{
        ActivityAction, ActivityEntry, Assignment, Contractor, ContractorId, Defect,
        DefectDomainError, DefectId, NewActivityEntry, User, UserId,
    },
    ports::{DefectStore, StoreResult, StoreTransaction},
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::collections::HashSet;
use std::sync::Arc;

/// Request payload for assigning one defect to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignUserRequest {
    /// Defect to route.
    pub defect_id: DefectId,
    /// New assignee.
    pub user_id: UserId,
    /// User making the routing decision.
    pub actor_id: UserId,
}

impl AssignUserRequest {
    /// Creates a request from validated identifiers.
    #[must_use]
    pub const fn new(defect_id: DefectId, user_id: UserId, actor_id: UserId) -> Self {
        Self {
            defect_id,
            user_id,
            actor_id,
        }
    }

    /// Creates a request from raw caller input.
    ///
    /// # Errors
    ///
    /// Returns [`DefectDomainError`] when either identifier is missing or
    /// not a positive integer.
    pub fn parse(
        defect_id: Option<&str>,
        user_id: Option<&str>,
        actor_id: UserId,
    ) -> Result<Self, DefectDomainError> {
        Ok(Self::new(
            DefectId::parse_required(defect_id)?,
            UserId::parse_required(user_id)?,
            actor_id,
        ))
    }
}

/// Request payload for assigning many defects to one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkAssignUserRequest {
    defect_ids: Vec<DefectId>,
    user_id: UserId,
    actor_id: UserId,
}

impl BulkAssignUserRequest {
    /// Creates a request. Duplicate defect identifiers are dropped, keeping
    /// the first occurrence.
    #[must_use]
    pub fn new(
        defect_ids: impl IntoIterator<Item = DefectId>,
        user_id: UserId,
        actor_id: UserId,
    ) -> Self {
        Self {
            defect_ids: dedupe(defect_ids),
            user_id,
            actor_id,
        }
    }

    /// Returns the selected defects in request order.
    #[must_use]
    pub fn defect_ids(&self) -> &[DefectId] {
        &self.defect_ids
    }
}

/// Request payload for setting one defect's contractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignContractorRequest {
    /// Defect to route.
    pub defect_id: DefectId,
    /// New responsible contractor.
    pub contractor_id: ContractorId,
    /// User making the routing decision.
    pub actor_id: UserId,
}

impl AssignContractorRequest {
    /// Creates a request from validated identifiers.
    #[must_use]
    pub const fn new(defect_id: DefectId, contractor_id: ContractorId, actor_id: UserId) -> Self {
        Self {
            defect_id,
            contractor_id,
            actor_id,
        }
    }
}

/// Request payload for setting many defects' contractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkAssignContractorRequest {
    defect_ids: Vec<DefectId>,
    contractor_id: ContractorId,
    actor_id: UserId,
}

impl BulkAssignContractorRequest {
    /// Creates a request. Duplicate defect identifiers are dropped, keeping
    /// the first occurrence.
    #[must_use]
    pub fn new(
        defect_ids: impl IntoIterator<Item = DefectId>,
        contractor_id: ContractorId,
        actor_id: UserId,
    ) -> Self {
        Self {
            defect_ids: dedupe(defect_ids),
            contractor_id,
            actor_id,
        }
    }

    /// Returns the selected defects in request order.
    #[must_use]
    pub fn defect_ids(&self) -> &[DefectId] {
        &self.defect_ids
    }
}

/// Result of a committed bulk operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkAssignmentOutcome {
    /// Number of defects routed.
    pub assigned: usize,
    /// Post-commit projection of each routed defect, in request order.
    pub projections: Vec<DefectProjection>,
}

/// Assignment orchestration service.
#[derive(Clone)]
pub struct AssignmentService<S, C>
where
    S: DefectStore,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    clock: Arc<C>,
    logger: ActivityLogger,
}

impl<S, C> AssignmentService<S, C>
where
    S: DefectStore,
    C: Clock + Send + Sync,
{
    /// Creates a new assignment service.
    #[must_use]
    pub const fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self {
            store,
            clock,
            logger: ActivityLogger::new(),
        }
    }

    /// Makes `user_id` the single current assignee of a defect.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentError::ActorNotFound`],
    /// [`AssignmentError::DefectNotFound`],
    /// [`AssignmentError::UserNotFound`], or
    /// [`AssignmentError::UserInactive`] after rolling back, and
    /// [`AssignmentError::Store`] when the store fails.
    pub async fn assign_user(
        &self,
        request: AssignUserRequest,
    ) -> AssignmentResult<DefectProjection> {
        let logger = self.logger;
        let at = self.clock.utc();
        let result: AssignmentResult<DefectProjection> = self
            .store
            .transaction(move |tx| {
                require_actor(tx, request.actor_id)?;
                let assignee = require_assignee(tx, request.user_id)?;
                route_to_user(tx, logger, request.defect_id, &assignee, request.actor_id, at)
            })
            .await;

        match &result {
            Ok(_) => tracing::info!(
                defect_id = %request.defect_id,
                assignee_id = %request.user_id,
                actor_id = %request.actor_id,
                "defect assigned"
            ),
            Err(err) => log_failure("assign_user", err.is_store_failure(), err),
        }
        result
    }

    /// Assigns every selected defect to one user, all or nothing.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentError::Validation`] for an empty selection before
    /// opening a transaction. An unknown actor, or any not-found or store
    /// failure on any defect, rolls back the whole batch and is returned
    /// as-is.
    pub async fn bulk_assign_user(
        &self,
        request: BulkAssignUserRequest,
    ) -> AssignmentResult<BulkAssignmentOutcome> {
        let BulkAssignUserRequest {
            defect_ids,
            user_id,
            actor_id,
        } = request;
        if defect_ids.is_empty() {
            let err = AssignmentError::from(DefectDomainError::EmptySelection);
            log_failure("bulk_assign_user", false, &err);
            return Err(err);
        }

        let logger = self.logger;
        let at = self.clock.utc();
        let result: AssignmentResult<BulkAssignmentOutcome> = self
            .store
            .transaction(move |tx| {
                require_actor(tx, actor_id)?;
                let assignee = require_assignee(tx, user_id)?;
                let mut projections = Vec::with_capacity(defect_ids.len());
                for defect_id in defect_ids {
                    projections.push(route_to_user(
                        tx, logger, defect_id, &assignee, actor_id, at,
                    )?);
                }
                Ok(BulkAssignmentOutcome {
                    assigned: projections.len(),
                    projections,
                })
            })
            .await;

        match &result {
            Ok(outcome) => tracing::info!(
                assigned = outcome.assigned,
                assignee_id = %user_id,
                actor_id = %actor_id,
                "defects bulk assigned"
            ),
            Err(err) => log_failure("bulk_assign_user", err.is_store_failure(), err),
        }
        result
    }

    /// Sets a defect's responsible contractor under a row lock.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentError::ActorNotFound`],
    /// [`AssignmentError::DefectNotFound`],
    /// [`AssignmentError::ContractorNotFound`], or
    /// [`AssignmentError::ContractorInactive`] after rolling back, and
    /// [`AssignmentError::Store`] when the store fails.
    pub async fn assign_contractor(
        &self,
        request: AssignContractorRequest,
    ) -> AssignmentResult<DefectProjection> {
        let logger = self.logger;
        let at = self.clock.utc();
        let result: AssignmentResult<DefectProjection> = self
            .store
            .transaction(move |tx| {
                require_actor(tx, request.actor_id)?;
                let defect = lock_live_defect(tx, request.defect_id)?;
                let contractor = require_contractor(tx, request.contractor_id)?;
                route_to_contractor(tx, logger, defect, &contractor, request.actor_id, at)
            })
            .await;

        match &result {
            Ok(_) => tracing::info!(
                defect_id = %request.defect_id,
                contractor_id = %request.contractor_id,
                actor_id = %request.actor_id,
                "defect contractor changed"
            ),
            Err(err) => log_failure("assign_contractor", err.is_store_failure(), err),
        }
        result
    }

    /// Sets the contractor of every selected defect, all or nothing.
    ///
    /// Row locks are taken in ascending defect order so that overlapping
    /// batches cannot deadlock.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentError::Validation`] for an empty selection before
    /// opening a transaction. An unknown actor, or any not-found or store
    /// failure, rolls back the whole batch.
    pub async fn bulk_assign_contractor(
        &self,
        request: BulkAssignContractorRequest,
    ) -> AssignmentResult<BulkAssignmentOutcome> {
        let BulkAssignContractorRequest {
            defect_ids,
            contractor_id,
            actor_id,
        } = request;
        if defect_ids.is_empty() {
            let err = AssignmentError::from(DefectDomainError::EmptySelection);
            log_failure("bulk_assign_contractor", false, &err);
            return Err(err);
        }

        let logger = self.logger;
        let at = self.clock.utc();
        let result: AssignmentResult<BulkAssignmentOutcome> = self
            .store
            .transaction(move |tx| {
                require_actor(tx, actor_id)?;
                let contractor = require_contractor(tx, contractor_id)?;
                let mut lock_order = defect_ids.clone();
                lock_order.sort_unstable();
                let mut locked = Vec::with_capacity(lock_order.len());
                for defect_id in lock_order {
                    locked.push(lock_live_defect(tx, defect_id)?);
                }

                let mut projections = Vec::with_capacity(defect_ids.len());
                for defect_id in &defect_ids {
                    let position = locked
                        .iter()
                        .position(|defect| defect.id() == *defect_id)
                        .ok_or(AssignmentError::DefectNotFound(*defect_id))?;
                    let defect = locked.swap_remove(position);
                    projections.push(route_to_contractor(
                        tx,
                        logger,
                        defect,
                        &contractor,
                        actor_id,
                        at,
                    )?);
                }
                Ok(BulkAssignmentOutcome {
                    assigned: projections.len(),
                    projections,
                })
            })
            .await;

        match &result {
            Ok(outcome) => tracing::info!(
                assigned = outcome.assigned,
                contractor_id = %contractor_id,
                actor_id = %actor_id,
                "defects bulk assigned to contractor"
            ),
            Err(err) => log_failure("bulk_assign_contractor", err.is_store_failure(), err),
        }
        result
    }

    /// Removes a defect's responsible contractor under a row lock.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentError::ActorNotFound`],
    /// [`AssignmentError::DefectNotFound`], or
    /// [`AssignmentError::NoContractorAssigned`] after rolling back, and
    /// [`AssignmentError::Store`] when the store fails.
    pub async fn unassign_contractor(
        &self,
        defect_id: DefectId,
        actor_id: UserId,
    ) -> AssignmentResult<DefectProjection> {
        let logger = self.logger;
        let at = self.clock.utc();
        let result: AssignmentResult<DefectProjection> = self
            .store
            .transaction(move |tx| {
                require_actor(tx, actor_id)?;
                let mut defect = lock_live_defect(tx, defect_id)?;
                let previous_id = defect
                    .contractor_id()
                    .ok_or(AssignmentError::NoContractorAssigned(defect_id))?;
                let previous = contractor_label(tx, previous_id)?;
                defect.set_contractor(None, at);
                tx.update_defect(&defect)?;
                logger.record(
                    tx,
                    &NewActivityEntry {
                        defect_id,
                        actor_id,
                        action: ActivityAction::ContractorUnassign,
                        detail: format!("Contractor {previous} removed"),
                        recorded_at: at,
                    },
                )?;
                Ok(project(tx, &defect)?)
            })
            .await;

        match &result {
            Ok(_) => tracing::info!(
                defect_id = %defect_id,
                actor_id = %actor_id,
                "defect contractor removed"
            ),
            Err(err) => log_failure("unassign_contractor", err.is_store_failure(), err),
        }
        result
    }

    /// Returns a defect's activity trail, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentError::Store`] when the store fails.
    pub async fn activity_for(&self, defect_id: DefectId) -> AssignmentResult<Vec<ActivityEntry>> {
        let result: StoreResult<Vec<ActivityEntry>> = self.store.activity_for(defect_id).await;
        Ok(result?)
    }
}

fn dedupe(defect_ids: impl IntoIterator<Item = DefectId>) -> Vec<DefectId> {
    let mut seen = HashSet::new();
    defect_ids
        .into_iter()
        .filter(|id| seen.insert(*id))
        .collect()
}

fn require_actor(tx: &mut dyn StoreTransaction, actor_id: UserId) -> AssignmentResult<()> {
    tx.find_user(actor_id)?
        .map(|_| ())
        .ok_or(AssignmentError::ActorNotFound(actor_id))
}

fn require_assignee(tx: &mut dyn StoreTransaction, user_id: UserId) -> AssignmentResult<User> {
    let user = tx
        .find_user(user_id)?
        .ok_or(AssignmentError::UserNotFound(user_id))?;
    if !user.is_active() {
        return Err(AssignmentError::UserInactive(user_id));
    }
    Ok(user)
}

fn require_contractor(
    tx: &mut dyn StoreTransaction,
    contractor_id: ContractorId,
) -> AssignmentResult<Contractor> {
    let contractor = tx
        .find_contractor(contractor_id)?
        .ok_or(AssignmentError::ContractorNotFound(contractor_id))?;
    if !contractor.is_active() {
        return Err(AssignmentError::ContractorInactive(contractor_id));
    }
    Ok(contractor)
}

fn lock_live_defect(tx: &mut dyn StoreTransaction, defect_id: DefectId) -> AssignmentResult<Defect> {
    live_defect(tx, defect_id, true)?.ok_or(AssignmentError::DefectNotFound(defect_id))
}

fn route_to_user(
    tx: &mut dyn StoreTransaction,
    logger: ActivityLogger,
    defect_id: DefectId,
    assignee: &User,
    actor_id: UserId,
    at: DateTime<Utc>,
) -> AssignmentResult<DefectProjection> {
    let defect =
        live_defect(tx, defect_id, false)?.ok_or(AssignmentError::DefectNotFound(defect_id))?;

    tx.delete_assignment(defect_id)?;
    tx.insert_assignment(&Assignment {
        defect_id,
        assignee_id: assignee.id(),
        assigned_by: actor_id,
        assigned_at: at,
    })?;

    let contractor = match defect.contractor_id() {
        Some(id) => contractor_label(tx, id)?,
        None => "no contractor".to_owned(),
    };
    logger.record(
        tx,
        &NewActivityEntry {
            defect_id,
            actor_id,
            action: ActivityAction::Assign,
            detail: format!(
                "Assigned to {} (contractor: {contractor})",
                assignee.display_name()
            ),
            recorded_at: at,
        },
    )?;
    Ok(project(tx, &defect)?)
}

fn route_to_contractor(
    tx: &mut dyn StoreTransaction,
    logger: ActivityLogger,
    mut defect: Defect,
    contractor: &Contractor,
    actor_id: UserId,
    at: DateTime<Utc>,
) -> AssignmentResult<DefectProjection> {
    let previous = match defect.contractor_id() {
        Some(id) => contractor_label(tx, id)?,
        None => "no contractor".to_owned(),
    };
    defect.set_contractor(Some(contractor.id()), at);
    tx.update_defect(&defect)?;
    logger.record(
        tx,
        &NewActivityEntry {
            defect_id: defect.id(),
            actor_id,
            action: ActivityAction::ContractorAssign,
            detail: format!(
                "Contractor changed from {previous} to {}",
                contractor.name()
            ),
            recorded_at: at,
        },
    )?;
    Ok(project(tx, &defect)?)
}

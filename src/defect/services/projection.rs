//! Caller-facing projection of a defect after a mutation.

use crate::defect::{
    domain::{ContractorId, Defect, DefectId, DefectStatus, UserId},
    ports::{StoreResult, StoreTransaction},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier and display name of a responsible party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartySummary<I> {
    /// Party identifier.
    pub id: I,
    /// Display name at the time of the projection.
    pub name: String,
}

/// Current assignee, contractor, and status of a defect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefectProjection {
    /// Defect identifier.
    pub defect_id: DefectId,
    /// Current status.
    pub status: DefectStatus,
    /// Current user assignee.
    pub assignee: Option<PartySummary<UserId>>,
    /// Current responsible contractor.
    pub contractor: Option<PartySummary<ContractorId>>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Builds the projection from within an open transaction.
pub(super) fn project(
    tx: &mut dyn StoreTransaction,
    defect: &Defect,
) -> StoreResult<DefectProjection> {
    let assignee = match tx.current_assignment(defect.id())? {
        Some(assignment) => Some(PartySummary {
            id: assignment.assignee_id,
            name: user_label(tx, assignment.assignee_id)?,
        }),
        None => None,
    };
    let contractor = match defect.contractor_id() {
        Some(id) => Some(PartySummary {
            id,
            name: contractor_label(tx, id)?,
        }),
        None => None,
    };
    Ok(DefectProjection {
        defect_id: defect.id(),
        status: defect.status(),
        assignee,
        contractor,
        updated_at: defect.updated_at(),
    })
}

/// Resolves a user's display name, falling back to the identifier.
pub(super) fn user_label(tx: &mut dyn StoreTransaction, id: UserId) -> StoreResult<String> {
    Ok(tx
        .find_user(id)?
        .map_or_else(|| format!("user #{id}"), |user| user.display_name().to_owned()))
}

/// Resolves a contractor's display name, falling back to the identifier.
pub(super) fn contractor_label(
    tx: &mut dyn StoreTransaction,
    id: ContractorId,
) -> StoreResult<String> {
    Ok(tx.find_contractor(id)?.map_or_else(
        || format!("contractor #{id}"),
        |contractor| contractor.name().to_owned(),
    ))
}

/// Reads a defect that is present and not soft-deleted.
pub(super) fn live_defect(
    tx: &mut dyn StoreTransaction,
    id: DefectId,
    lock: bool,
) -> StoreResult<Option<Defect>> {
    let found = if lock {
        tx.lock_defect(id)?
    } else {
        tx.find_defect(id)?
    };
    Ok(found.filter(|defect| !defect.is_deleted()))
}

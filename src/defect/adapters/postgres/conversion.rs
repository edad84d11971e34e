//! Conversions between Diesel rows and domain types.

use super::models::{
    ActivityRow, AssignmentRow, ContractorRow, DefectChangeset, DefectRow, NewActivityRow, UserRow,
};
use crate::defect::{
    domain::{
        ActivityAction, ActivityEntry, Assignment, Contractor, ContractorId, Defect, DefectId,
        DefectStatus, LifecycleStamps, NewActivityEntry, PersistedDefectData, Priority, ProjectId,
        Stamp, User, UserId,
    },
    ports::{StoreError, StoreResult},
};
use chrono::{DateTime, Utc};

/// Reconstructs a domain defect from its stored row.
///
/// # Errors
///
/// Returns [`StoreError::Persistence`] when an identifier, status, or
/// priority column holds a value the domain does not accept.
pub(super) fn row_to_defect(row: DefectRow) -> StoreResult<Defect> {
    let stamps = LifecycleStamps {
        accepted: stamp(row.accepted_by, row.accepted_at, row.acceptance_comment)?,
        rejected: stamp(row.rejected_by, row.rejected_at, row.rejection_comment)?,
        reopened: stamp(row.reopened_by, row.reopened_at, row.reopen_reason)?,
        closed: stamp(row.closed_by, row.closed_at, row.closing_comment)?,
    };
    let data = PersistedDefectData {
        id: DefectId::new(row.id).map_err(StoreError::persistence)?,
        project_id: ProjectId::new(row.project_id).map_err(StoreError::persistence)?,
        title: row.title,
        description: row.description,
        priority: Priority::try_from(row.priority.as_str()).map_err(StoreError::persistence)?,
        status: DefectStatus::try_from(row.status.as_str()).map_err(StoreError::persistence)?,
        due_date: row.due_date,
        contractor_id: row
            .contractor_id
            .map(ContractorId::new)
            .transpose()
            .map_err(StoreError::persistence)?,
        created_by: UserId::new(row.created_by).map_err(StoreError::persistence)?,
        stamps,
        created_at: row.created_at,
        updated_at: row.updated_at,
        deleted_at: row.deleted_at,
    };
    Ok(Defect::from_persisted(data))
}

// A stamp only exists when both the actor and the time were written.
fn stamp(
    actor_column: Option<i64>,
    at_column: Option<DateTime<Utc>>,
    comment: Option<String>,
) -> StoreResult<Option<Stamp>> {
    let (Some(actor), Some(at)) = (actor_column, at_column) else {
        return Ok(None);
    };
    Ok(Some(Stamp {
        actor_id: UserId::new(actor).map_err(StoreError::persistence)?,
        at,
        comment,
    }))
}

/// Builds the changeset for the columns engine operations may modify.
pub(super) fn defect_changeset(defect: &Defect) -> DefectChangeset {
    let stamps = defect.stamps();
    let (accepted_by, accepted_at, acceptance_comment) = stamp_columns(stamps.accepted.as_ref());
    let (rejected_by, rejected_at, rejection_comment) = stamp_columns(stamps.rejected.as_ref());
    let (reopened_by, reopened_at, reopen_reason) = stamp_columns(stamps.reopened.as_ref());
    let (closed_by, closed_at, closing_comment) = stamp_columns(stamps.closed.as_ref());
    DefectChangeset {
        status: defect.status().as_str().to_owned(),
        contractor_id: defect.contractor_id().map(ContractorId::value),
        accepted_by,
        accepted_at,
        acceptance_comment,
        rejected_by,
        rejected_at,
        rejection_comment,
        reopened_by,
        reopened_at,
        reopen_reason,
        closed_by,
        closed_at,
        closing_comment,
        updated_at: defect.updated_at(),
    }
}

type StampColumns = (Option<i64>, Option<DateTime<Utc>>, Option<String>);

fn stamp_columns(stamp: Option<&Stamp>) -> StampColumns {
    stamp.map_or((None, None, None), |recorded| {
        (
            Some(recorded.actor_id.value()),
            Some(recorded.at),
            recorded.comment.clone(),
        )
    })
}

pub(super) fn row_to_user(row: UserRow) -> StoreResult<User> {
    let mut user = User::new(
        UserId::new(row.id).map_err(StoreError::persistence)?,
        row.display_name,
    );
    if let Some(contractor_id) = row.contractor_id {
        user = user.with_contractor(
            ContractorId::new(contractor_id).map_err(StoreError::persistence)?,
        );
    }
    Ok(if row.is_active { user } else { user.deactivated() })
}

pub(super) fn row_to_contractor(row: ContractorRow) -> StoreResult<Contractor> {
    let contractor = Contractor::new(
        ContractorId::new(row.id).map_err(StoreError::persistence)?,
        row.name,
        row.trade,
    );
    Ok(if row.is_active {
        contractor
    } else {
        contractor.deactivated()
    })
}

pub(super) fn row_to_assignment(row: AssignmentRow) -> StoreResult<Assignment> {
    Ok(Assignment {
        defect_id: DefectId::new(row.defect_id).map_err(StoreError::persistence)?,
        assignee_id: UserId::new(row.assignee_id).map_err(StoreError::persistence)?,
        assigned_by: UserId::new(row.assigned_by).map_err(StoreError::persistence)?,
        assigned_at: row.assigned_at,
    })
}

pub(super) fn assignment_row(assignment: &Assignment) -> AssignmentRow {
    AssignmentRow {
        defect_id: assignment.defect_id.value(),
        assignee_id: assignment.assignee_id.value(),
        assigned_by: assignment.assigned_by.value(),
        assigned_at: assignment.assigned_at,
    }
}

pub(super) fn row_to_activity(row: ActivityRow) -> StoreResult<ActivityEntry> {
    Ok(ActivityEntry {
        id: row.id,
        defect_id: DefectId::new(row.defect_id).map_err(StoreError::persistence)?,
        actor_id: UserId::new(row.actor_id).map_err(StoreError::persistence)?,
        action: ActivityAction::try_from(row.action.as_str()).map_err(StoreError::persistence)?,
        detail: row.detail,
        recorded_at: row.recorded_at,
    })
}

pub(super) fn new_activity_row(entry: &NewActivityEntry) -> NewActivityRow {
    NewActivityRow {
        defect_id: entry.defect_id.value(),
        actor_id: entry.actor_id.value(),
        action: entry.action.as_tag().to_owned(),
        detail: entry.detail.clone(),
        recorded_at: entry.recorded_at,
    }
}

/// Escapes `LIKE` metacharacters so search input matches literally.
pub(super) fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

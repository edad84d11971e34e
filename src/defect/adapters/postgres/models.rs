//! Diesel row models for defect persistence.

use super::schema::{activity_log, contractors, defect_assignments, defects, users};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;

/// Query result row for defect records. Field order matches the table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = defects)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DefectRow {
    /// Defect identifier.
    pub id: i64,
    /// Owning project.
    pub project_id: i64,
    /// Title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Priority name.
    pub priority: String,
    /// Status name.
    pub status: String,
    /// Due date.
    pub due_date: Option<NaiveDate>,
    /// Responsible contractor.
    pub contractor_id: Option<i64>,
    /// Reporting user.
    pub created_by: i64,
    /// Last accepting user.
    pub accepted_by: Option<i64>,
    /// Last acceptance time.
    pub accepted_at: Option<DateTime<Utc>>,
    /// Last acceptance comment.
    pub acceptance_comment: Option<String>,
    /// Last rejecting user.
    pub rejected_by: Option<i64>,
    /// Last rejection time.
    pub rejected_at: Option<DateTime<Utc>>,
    /// Last rejection comment.
    pub rejection_comment: Option<String>,
    /// Last reopening user.
    pub reopened_by: Option<i64>,
    /// Last reopen time.
    pub reopened_at: Option<DateTime<Utc>>,
    /// Last reopen reason.
    pub reopen_reason: Option<String>,
    /// Last closing user.
    pub closed_by: Option<i64>,
    /// Last closure time.
    pub closed_at: Option<DateTime<Utc>>,
    /// Last closure comment.
    pub closing_comment: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Mutable defect columns written by the engines.
///
/// `None` clears a column rather than skipping it, so removing a contractor
/// persists as `NULL`.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = defects)]
#[diesel(treat_none_as_null = true)]
pub struct DefectChangeset {
    /// Status name.
    pub status: String,
    /// Responsible contractor.
    pub contractor_id: Option<i64>,
    /// Last accepting user.
    pub accepted_by: Option<i64>,
    /// Last acceptance time.
    pub accepted_at: Option<DateTime<Utc>>,
    /// Last acceptance comment.
    pub acceptance_comment: Option<String>,
    /// Last rejecting user.
    pub rejected_by: Option<i64>,
    /// Last rejection time.
    pub rejected_at: Option<DateTime<Utc>>,
    /// Last rejection comment.
    pub rejection_comment: Option<String>,
    /// Last reopening user.
    pub reopened_by: Option<i64>,
    /// Last reopen time.
    pub reopened_at: Option<DateTime<Utc>>,
    /// Last reopen reason.
    pub reopen_reason: Option<String>,
    /// Last closing user.
    pub closed_by: Option<i64>,
    /// Last closure time.
    pub closed_at: Option<DateTime<Utc>>,
    /// Last closure comment.
    pub closing_comment: Option<String>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Query result row for users.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    /// User identifier.
    pub id: i64,
    /// Display name.
    pub display_name: String,
    /// Contractor affiliation.
    pub contractor_id: Option<i64>,
    /// Active flag.
    pub is_active: bool,
}

/// Query result row for contractors.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = contractors)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ContractorRow {
    /// Contractor identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Trade or specialism.
    pub trade: String,
    /// Active flag.
    pub is_active: bool,
}

/// Row for the current assignment of a defect.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = defect_assignments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AssignmentRow {
    /// Assigned defect.
    pub defect_id: i64,
    /// Assignee.
    pub assignee_id: i64,
    /// Assigning user.
    pub assigned_by: i64,
    /// Assignment time.
    pub assigned_at: DateTime<Utc>,
}

/// Query result row for activity entries.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = activity_log)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ActivityRow {
    /// Sequence identifier.
    pub id: i64,
    /// Described defect.
    pub defect_id: i64,
    /// Acting user.
    pub actor_id: i64,
    /// Action tag.
    pub action: String,
    /// Human-readable detail.
    pub detail: String,
    /// Mutation time.
    pub recorded_at: DateTime<Utc>,
}

/// Insert model for activity entries; the identifier is store-assigned.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = activity_log)]
pub struct NewActivityRow {
    /// Described defect.
    pub defect_id: i64,
    /// Acting user.
    pub actor_id: i64,
    /// Action tag.
    pub action: String,
    /// Human-readable detail.
    pub detail: String,
    /// Mutation time.
    pub recorded_at: DateTime<Utc>,
}

//! Diesel schema for defect persistence.

diesel::table! {
    /// Reported defects with lifecycle stamps.
    defects (id) {
        /// Defect identifier.
        id -> Int8,
        /// Owning project.
        project_id -> Int8,
        /// Short title.
        #[max_length = 255]
        title -> Varchar,
        /// Longer description.
        description -> Text,
        /// Priority name.
        #[max_length = 20]
        priority -> Varchar,
        /// Lifecycle status name.
        #[max_length = 20]
        status -> Varchar,
        /// Optional due date.
        due_date -> Nullable<Date>,
        /// Responsible contractor.
        contractor_id -> Nullable<Int8>,
        /// Reporting user.
        created_by -> Int8,
        /// Last accepting user.
        accepted_by -> Nullable<Int8>,
        /// Last acceptance time.
        accepted_at -> Nullable<Timestamptz>,
        /// Last acceptance comment.
        acceptance_comment -> Nullable<Text>,
        /// Last rejecting user.
        rejected_by -> Nullable<Int8>,
        /// Last rejection time.
        rejected_at -> Nullable<Timestamptz>,
        /// Last rejection comment.
        rejection_comment -> Nullable<Text>,
        /// Last reopening user.
        reopened_by -> Nullable<Int8>,
        /// Last reopen time.
        reopened_at -> Nullable<Timestamptz>,
        /// Last reopen reason.
        reopen_reason -> Nullable<Text>,
        /// Last closing user.
        closed_by -> Nullable<Int8>,
        /// Last closure time.
        closed_at -> Nullable<Timestamptz>,
        /// Last closure comment.
        closing_comment -> Nullable<Text>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last mutation timestamp.
        updated_at -> Timestamptz,
        /// Soft-delete marker.
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Users who act on or are assigned defects.
    users (id) {
        /// User identifier.
        id -> Int8,
        /// Display name.
        #[max_length = 255]
        display_name -> Varchar,
        /// Contractor affiliation.
        contractor_id -> Nullable<Int8>,
        /// Whether the user may be assigned defects.
        is_active -> Bool,
    }
}

diesel::table! {
    /// Contracting companies.
    contractors (id) {
        /// Contractor identifier.
        id -> Int8,
        /// Display name.
        #[max_length = 255]
        name -> Varchar,
        /// Trade or specialism.
        #[max_length = 255]
        trade -> Varchar,
        /// Whether the contractor may be assigned defects.
        is_active -> Bool,
    }
}

diesel::table! {
    /// Current user assignment, at most one row per defect.
    defect_assignments (defect_id) {
        /// Assigned defect.
        defect_id -> Int8,
        /// Assignee.
        assignee_id -> Int8,
        /// Assigning user.
        assigned_by -> Int8,
        /// Assignment time.
        assigned_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only audit trail.
    activity_log (id) {
        /// Sequence identifier.
        id -> Int8,
        /// Described defect.
        defect_id -> Int8,
        /// Acting user.
        actor_id -> Int8,
        /// Action tag.
        #[max_length = 50]
        action -> Varchar,
        /// Human-readable detail.
        detail -> Text,
        /// Mutation time.
        recorded_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    activity_log,
    contractors,
    defect_assignments,
    defects,
    users,
);

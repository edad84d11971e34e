//! `PostgreSQL` read-side queries for listings and dashboard metrics.

use super::{
    conversion::{escape_like, row_to_assignment, row_to_contractor, row_to_defect, row_to_user},
    models::{AssignmentRow, ContractorRow, DefectRow, UserRow},
    schema::{contractors, defect_assignments, defects, users},
    store::{PostgresDefectStore, TransactionFailure},
};
use crate::defect::{
    domain::{
        Assignment, Contractor, DefectFilter, DefectId, DefectListing, DefectMetrics, DefectSort,
        DefectStatus, PageWindow, Priority, SortDirection, SortField, User,
    },
    ports::{DefectQueryRepository, ListingSlice, StoreError, StoreResult},
};
use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::dsl::sql;
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use diesel::sql_types::Integer;
use std::collections::HashMap;

type BoxedDefects = defects::BoxedQuery<'static, Pg>;

const PRIORITY_RANK: &str = "CASE priority \
    WHEN 'critical' THEN 4 WHEN 'high' THEN 3 WHEN 'medium' THEN 2 ELSE 1 END";

/// Builds the base query for non-deleted defects matching `filter`.
fn filtered(filter: &DefectFilter) -> BoxedDefects {
    let mut query = defects::table
        .filter(defects::deleted_at.is_null())
        .into_boxed();
    if let Some(project_id) = filter.project_id {
        query = query.filter(defects::project_id.eq(project_id.value()));
    }
    if let Some(contractor_id) = filter.contractor_id {
        query = query.filter(defects::contractor_id.eq(contractor_id.value()));
    }
    if let Some(status) = filter.status {
        query = query.filter(defects::status.eq(status.as_str()));
    }
    if let Some(priority) = filter.priority {
        query = query.filter(defects::priority.eq(priority.as_str()));
    }
    if let Some(term) = filter.search_term() {
        let pattern = format!("%{}%", escape_like(term));
        query = query.filter(
            defects::title
                .ilike(pattern.clone())
                .or(defects::description.ilike(pattern)),
        );
    }
    query
}

fn ordered(query: BoxedDefects, sort: DefectSort) -> BoxedDefects {
    use SortDirection::{Ascending, Descending};
    let sorted = match (sort.field, sort.direction) {
        (SortField::CreatedAt, Ascending) => query.order_by(defects::created_at.asc()),
        (SortField::CreatedAt, Descending) => query.order_by(defects::created_at.desc()),
        (SortField::UpdatedAt, Ascending) => query.order_by(defects::updated_at.asc()),
        (SortField::UpdatedAt, Descending) => query.order_by(defects::updated_at.desc()),
        // PostgreSQL sorts NULL last ascending and first descending, matching
        // the in-memory ordering of missing due dates.
        (SortField::DueDate, Ascending) => query.order_by(defects::due_date.asc()),
        (SortField::DueDate, Descending) => query.order_by(defects::due_date.desc()),
        (SortField::Priority, Ascending) => query.order_by(sql::<Integer>(PRIORITY_RANK).asc()),
        (SortField::Priority, Descending) => query.order_by(sql::<Integer>(PRIORITY_RANK).desc()),
        (SortField::Status, Ascending) => query.order_by(defects::status.asc()),
        (SortField::Status, Descending) => query.order_by(defects::status.desc()),
        (SortField::Title, Ascending) => query.order_by(defects::title.asc()),
        (SortField::Title, Descending) => query.order_by(defects::title.desc()),
    };
    sorted.then_order_by(defects::id.asc())
}

fn count(query: BoxedDefects, connection: &mut PgConnection) -> StoreResult<u64> {
    let total = query
        .count()
        .get_result::<i64>(connection)
        .map_err(StoreError::persistence)?;
    u64::try_from(total).map_err(StoreError::persistence)
}

/// Runs several reads against one snapshot so counts and rows agree.
fn read_consistent<T>(
    connection: &mut PgConnection,
    read: impl FnOnce(&mut PgConnection) -> StoreResult<T>,
) -> StoreResult<T> {
    connection
        .build_transaction()
        .read_only()
        .repeatable_read()
        .run::<T, TransactionFailure<StoreError>, _>(|conn| {
            read(conn).map_err(TransactionFailure::Work)
        })
        .map_err(TransactionFailure::into_inner)
}

fn settled_statuses() -> Vec<&'static str> {
    DefectStatus::ALL
        .into_iter()
        .filter(|status| status.is_settled())
        .map(DefectStatus::as_str)
        .collect()
}

fn load_metrics(
    connection: &mut PgConnection,
    filter: &DefectFilter,
    today: NaiveDate,
) -> StoreResult<DefectMetrics> {
    let total = count(filtered(filter), connection)?;
    let assigned_ids = defect_assignments::table.select(defect_assignments::defect_id);
    let assigned = count(
        filtered(filter).filter(defects::id.eq_any(assigned_ids)),
        connection,
    )?;
    let critical = count(
        filtered(filter).filter(defects::priority.eq(Priority::Critical.as_str())),
        connection,
    )?;
    let overdue = count(
        filtered(filter)
            .filter(defects::due_date.lt(today))
            .filter(defects::status.ne_all(settled_statuses())),
        connection,
    )?;
    let active = count(
        filtered(filter).filter(defects::status.ne_all(settled_statuses())),
        connection,
    )?;
    Ok(DefectMetrics {
        total,
        assigned,
        unassigned: total.saturating_sub(assigned),
        critical,
        overdue,
        active,
    })
}

fn load_listing(
    connection: &mut PgConnection,
    filter: &DefectFilter,
    sort: DefectSort,
    window: PageWindow,
    today: NaiveDate,
) -> StoreResult<ListingSlice> {
    let total = count(filtered(filter), connection)?;
    let limit = i64::try_from(window.limit()).map_err(StoreError::persistence)?;
    let offset = i64::try_from(window.offset()).map_err(StoreError::persistence)?;
    let page_rows = ordered(filtered(filter), sort)
        .limit(limit)
        .offset(offset)
        .load::<DefectRow>(connection)
        .map_err(StoreError::persistence)?;

    let ids: Vec<i64> = page_rows.iter().map(|row| row.id).collect();
    let assignees: HashMap<DefectId, Assignment> = defect_assignments::table
        .filter(defect_assignments::defect_id.eq_any(ids))
        .select(AssignmentRow::as_select())
        .load::<AssignmentRow>(connection)
        .map_err(StoreError::persistence)?
        .into_iter()
        .map(|row| row_to_assignment(row).map(|assignment| (assignment.defect_id, assignment)))
        .collect::<StoreResult<_>>()?;

    let rows = page_rows
        .into_iter()
        .map(|row| {
            let defect = row_to_defect(row)?;
            Ok(DefectListing {
                assignee_id: assignees
                    .get(&defect.id())
                    .map(|assignment| assignment.assignee_id),
                overdue: defect.is_overdue(today),
                defect,
            })
        })
        .collect::<StoreResult<Vec<_>>>()?;
    Ok(ListingSlice { rows, total })
}

#[async_trait]
impl DefectQueryRepository for PostgresDefectStore {
    async fn metrics(
        &self,
        filter: &DefectFilter,
        today: NaiveDate,
    ) -> StoreResult<DefectMetrics> {
        let owned = filter.clone();
        self.run_blocking(move |connection| {
            read_consistent(connection, |conn| load_metrics(conn, &owned, today))
        })
        .await
    }

    async fn list(
        &self,
        filter: &DefectFilter,
        sort: DefectSort,
        window: PageWindow,
        today: NaiveDate,
    ) -> StoreResult<ListingSlice> {
        let owned = filter.clone();
        self.run_blocking(move |connection| {
            read_consistent(connection, |conn| {
                load_listing(conn, &owned, sort, window, today)
            })
        })
        .await
    }

    async fn current_assignment(&self, defect_id: DefectId) -> StoreResult<Option<Assignment>> {
        self.run_blocking(move |connection| {
            let row = defect_assignments::table
                .filter(defect_assignments::defect_id.eq(defect_id.value()))
                .select(AssignmentRow::as_select())
                .first::<AssignmentRow>(connection)
                .optional()
                .map_err(StoreError::persistence)?;
            row.map(row_to_assignment).transpose()
        })
        .await
    }

    async fn active_users(&self) -> StoreResult<Vec<User>> {
        self.run_blocking(|connection| {
            users::table
                .filter(users::is_active.eq(true))
                .order((users::display_name.asc(), users::id.asc()))
                .select(UserRow::as_select())
                .load::<UserRow>(connection)
                .map_err(StoreError::persistence)?
                .into_iter()
                .map(row_to_user)
                .collect()
        })
        .await
    }

    async fn active_contractors(&self) -> StoreResult<Vec<Contractor>> {
        self.run_blocking(|connection| {
            contractors::table
                .filter(contractors::is_active.eq(true))
                .order((contractors::name.asc(), contractors::id.asc()))
                .select(ContractorRow::as_select())
                .load::<ContractorRow>(connection)
                .map_err(StoreError::persistence)?
                .into_iter()
                .map(row_to_contractor)
                .collect()
        })
        .await
    }
}

//! Read-only port backing listings and dashboard metrics.

use super::StoreResult;
use crate::defect::domain::{
    Assignment, Contractor, DefectFilter, DefectId, DefectListing, DefectMetrics, DefectSort,
    PageWindow, User,
};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Rows for one listing page plus the filtered total.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingSlice {
    /// Rows in the requested window.
    pub rows: Vec<DefectListing>,
    /// Rows matching the filter across all windows.
    pub total: u64,
}

/// Read-only defect queries. Implementations never open write transactions.
#[async_trait]
pub trait DefectQueryRepository: Send + Sync {
    /// Counts matching defects, evaluating overdue against `today`.
    async fn metrics(&self, filter: &DefectFilter, today: NaiveDate)
    -> StoreResult<DefectMetrics>;

    /// Returns one window of matching defects in `sort` order.
    async fn list(
        &self,
        filter: &DefectFilter,
        sort: DefectSort,
        window: PageWindow,
        today: NaiveDate,
    ) -> StoreResult<ListingSlice>;

    /// Returns the current assignment of a defect.
    async fn current_assignment(&self, defect_id: DefectId) -> StoreResult<Option<Assignment>>;

    /// Returns active users ordered by display name.
    async fn active_users(&self) -> StoreResult<Vec<User>>;

    /// Returns active contractors ordered by name.
    async fn active_contractors(&self) -> StoreResult<Vec<Contractor>>;
}

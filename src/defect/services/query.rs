//! Read-only listing and dashboard metrics.

use super::error::QueryResult;
use crate::config::TrackerConfig;
use crate::defect::{
    domain::{
        Assignment, Contractor, DefectFilter, DefectId, DefectListing, DefectMetrics, DefectSort,
        Page, PageWindow, User,
    },
    ports::DefectQueryRepository,
};
use mockable::Clock;
use std::sync::Arc;

/// Query service over the read-only repository port.
///
/// Overdue is evaluated against the clock's current UTC date on every call.
#[derive(Clone)]
pub struct DefectQueryService<Q, C>
where
    Q: DefectQueryRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<Q>,
    clock: Arc<C>,
    page_size: u32,
}

impl<Q, C> DefectQueryService<Q, C>
where
    Q: DefectQueryRepository,
    C: Clock + Send + Sync,
{
    /// Creates a service with the page size from `config`.
    #[must_use]
    pub const fn new(repository: Arc<Q>, clock: Arc<C>, config: &TrackerConfig) -> Self {
        Self {
            repository,
            clock,
            page_size: config.page_size,
        }
    }

    /// Returns the fixed page size.
    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Counts defects matching `filter`. An empty match yields all zeros.
    ///
    /// # Errors
    ///
    /// Returns [`super::QueryError::Store`] when the store fails.
    pub async fn metrics(&self, filter: &DefectFilter) -> QueryResult<DefectMetrics> {
        let today = self.clock.utc().date_naive();
        Ok(self.repository.metrics(filter, today).await?)
    }

    /// Returns one page of defects matching `filter`.
    ///
    /// The filter is applied identically for every page number; pages past
    /// the end are empty but report the same total.
    ///
    /// # Errors
    ///
    /// Returns [`super::QueryError::Validation`] for a zero page size and
    /// [`super::QueryError::Store`] when the store fails.
    pub async fn list(
        &self,
        filter: &DefectFilter,
        sort: DefectSort,
        page: u32,
    ) -> QueryResult<Page<DefectListing>> {
        let window = PageWindow::new(page, self.page_size)?;
        let today = self.clock.utc().date_naive();
        let slice = self.repository.list(filter, sort, window, today).await?;
        Ok(Page::new(slice.rows, slice.total, window))
    }

    /// Returns the users that may be offered as assignees.
    ///
    /// # Errors
    ///
    /// Returns [`super::QueryError::Store`] when the store fails.
    pub async fn assignable_users(&self) -> QueryResult<Vec<User>> {
        Ok(self.repository.active_users().await?)
    }

    /// Returns the contractors that may be offered as assignees.
    ///
    /// # Errors
    ///
    /// Returns [`super::QueryError::Store`] when the store fails.
    pub async fn selectable_contractors(&self) -> QueryResult<Vec<Contractor>> {
        Ok(self.repository.active_contractors().await?)
    }

    /// Returns a defect's current assignment.
    ///
    /// # Errors
    ///
    /// Returns [`super::QueryError::Store`] when the store fails.
    pub async fn current_assignment(&self, defect_id: DefectId) -> QueryResult<Option<Assignment>> {
        Ok(self.repository.current_assignment(defect_id).await?)
    }
}

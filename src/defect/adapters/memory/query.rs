//! Read-only queries over the in-memory store.

use async_trait::async_trait;
use chrono::NaiveDate;

use super::store::InMemoryDefectStore;
use crate::defect::{
    domain::{
        Assignment, Contractor, DefectFilter, DefectId, DefectListing, DefectMetrics, DefectSort,
        PageWindow, User,
    },
    ports::{DefectQueryRepository, ListingSlice, StoreError, StoreResult},
};

#[async_trait]
impl DefectQueryRepository for InMemoryDefectStore {
    async fn metrics(
        &self,
        filter: &DefectFilter,
        today: NaiveDate,
    ) -> StoreResult<DefectMetrics> {
        let state = self.lock()?;
        let mut metrics = DefectMetrics::default();
        for defect in state.defects.values().filter(|defect| filter.matches(defect)) {
            let has_assignee = state.assignments.contains_key(&defect.id());
            metrics.record(defect, has_assignee, today);
        }
        Ok(metrics)
    }

    async fn list(
        &self,
        filter: &DefectFilter,
        sort: DefectSort,
        window: PageWindow,
        today: NaiveDate,
    ) -> StoreResult<ListingSlice> {
        let state = self.lock()?;
        let mut matching: Vec<_> = state
            .defects
            .values()
            .filter(|defect| filter.matches(defect))
            .collect();
        matching.sort_by(|left, right| sort.compare(left, right));

        let total = u64::try_from(matching.len()).map_err(StoreError::persistence)?;
        let skip = usize::try_from(window.offset()).unwrap_or(usize::MAX);
        let take = usize::try_from(window.limit()).unwrap_or(usize::MAX);
        let rows = matching
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|defect| DefectListing {
                defect: defect.clone(),
                assignee_id: state
                    .assignments
                    .get(&defect.id())
                    .map(|assignment| assignment.assignee_id),
                overdue: defect.is_overdue(today),
            })
            .collect();
        Ok(ListingSlice { rows, total })
    }

    async fn current_assignment(&self, defect_id: DefectId) -> StoreResult<Option<Assignment>> {
        Ok(self.lock()?.assignments.get(&defect_id).cloned())
    }

    async fn active_users(&self) -> StoreResult<Vec<User>> {
        let state = self.lock()?;
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|user| user.is_active())
            .cloned()
            .collect();
        users.sort_by(|left, right| left.display_name().cmp(right.display_name()));
        Ok(users)
    }

    async fn active_contractors(&self) -> StoreResult<Vec<Contractor>> {
        let state = self.lock()?;
        let mut contractors: Vec<Contractor> = state
            .contractors
            .values()
            .filter(|contractor| contractor.is_active())
            .cloned()
            .collect();
        contractors.sort_by(|left, right| left.name().cmp(right.name()));
        Ok(contractors)
    }
}

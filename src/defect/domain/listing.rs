//! Read-side filter, sort, pagination, and metric values.

use super::{ContractorId, Defect, DefectDomainError, DefectStatus, Priority, ProjectId, UserId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Optional equality and substring predicates over defects.
///
/// Soft-deleted defects never match, whatever the predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefectFilter {
    /// Restrict to one project.
    pub project_id: Option<ProjectId>,
    /// Restrict to one responsible contractor.
    pub contractor_id: Option<ContractorId>,
    /// Restrict to one status.
    pub status: Option<DefectStatus>,
    /// Restrict to one priority.
    pub priority: Option<Priority>,
    /// Case-insensitive substring matched against title and description.
    pub search: Option<String>,
}

impl DefectFilter {
    /// Creates a filter matching every live defect.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to a project.
    #[must_use]
    pub const fn with_project(mut self, project_id: ProjectId) -> Self {
        self.project_id = Some(project_id);
        self
    }

    /// Restricts to a contractor.
    #[must_use]
    pub const fn with_contractor(mut self, contractor_id: ContractorId) -> Self {
        self.contractor_id = Some(contractor_id);
        self
    }

    /// Restricts to a status.
    #[must_use]
    pub const fn with_status(mut self, status: DefectStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restricts to a priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Adds a free-text search term. Blank terms are ignored.
    #[must_use]
    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        let raw = term.into();
        let trimmed = raw.trim();
        self.search = (!trimmed.is_empty()).then(|| trimmed.to_owned());
        self
    }

    /// Returns the search term, if one is set and non-blank.
    #[must_use]
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }

    /// Returns `true` when the defect satisfies every predicate.
    #[must_use]
    pub fn matches(&self, defect: &Defect) -> bool {
        if defect.is_deleted() {
            return false;
        }
        let project_ok = self.project_id.is_none_or(|id| defect.project_id() == id);
        let contractor_ok = self
            .contractor_id
            .is_none_or(|id| defect.contractor_id() == Some(id));
        let status_ok = self.status.is_none_or(|status| defect.status() == status);
        let priority_ok = self
            .priority
            .is_none_or(|priority| defect.priority() == priority);
        let search_ok = self.search_term().is_none_or(|term| {
            let needle = term.to_lowercase();
            defect.title().to_lowercase().contains(&needle)
                || defect.description().to_lowercase().contains(&needle)
        });
        project_ok && contractor_ok && status_ok && priority_ok && search_ok
    }
}

/// Column a defect listing is ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    /// Report time.
    #[default]
    CreatedAt,
    /// Last mutation time.
    UpdatedAt,
    /// Due date; defects without one sort last ascending and first
    /// descending.
    DueDate,
    /// Priority rank.
    Priority,
    /// Status name.
    Status,
    /// Title.
    Title,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Smallest first.
    Ascending,
    /// Largest first.
    #[default]
    Descending,
}

/// Listing order. Ties are broken by defect id, ascending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefectSort {
    /// Ordering column.
    pub field: SortField,
    /// Ordering direction.
    pub direction: SortDirection,
}

impl DefectSort {
    /// Creates a sort order.
    #[must_use]
    pub const fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Compares two defects under this order.
    #[must_use]
    pub fn compare(&self, left: &Defect, right: &Defect) -> Ordering {
        let primary = match self.field {
            SortField::CreatedAt => left.created_at().cmp(&right.created_at()),
            SortField::UpdatedAt => left.updated_at().cmp(&right.updated_at()),
            SortField::DueDate => compare_due_dates(left.due_date(), right.due_date()),
            SortField::Priority => left.priority().rank().cmp(&right.priority().rank()),
            SortField::Status => left.status().as_str().cmp(right.status().as_str()),
            SortField::Title => left.title().cmp(right.title()),
        };
        let directed = match self.direction {
            SortDirection::Ascending => primary,
            SortDirection::Descending => primary.reverse(),
        };
        directed.then_with(|| left.id().cmp(&right.id()))
    }
}

fn compare_due_dates(left: Option<NaiveDate>, right: Option<NaiveDate>) -> Ordering {
    match (left, right) {
        (Some(l), Some(r)) => l.cmp(&r),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Offset and limit for one page of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    page: u32,
    page_size: u32,
}

impl PageWindow {
    /// Creates a window for a one-based page number.
    ///
    /// Page numbers below one are treated as the first page.
    ///
    /// # Errors
    ///
    /// Returns [`DefectDomainError::InvalidPageSize`] when `page_size` is zero.
    pub fn new(page: u32, page_size: u32) -> Result<Self, DefectDomainError> {
        if page_size == 0 {
            return Err(DefectDomainError::InvalidPageSize(page_size));
        }
        Ok(Self {
            page: page.max(1),
            page_size,
        })
    }

    /// Returns the one-based page number.
    #[must_use]
    pub const fn page(self) -> u32 {
        self.page
    }

    /// Returns the page size.
    #[must_use]
    pub const fn page_size(self) -> u32 {
        self.page_size
    }

    /// Returns the number of rows to skip.
    #[must_use]
    pub fn offset(self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    /// Returns the maximum number of rows on the page.
    #[must_use]
    pub fn limit(self) -> u64 {
        u64::from(self.page_size)
    }

    /// Returns the number of pages needed for `total` rows.
    #[must_use]
    pub fn page_count(self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.page_size))
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Rows on this page.
    pub rows: Vec<T>,
    /// Rows matching the filter across all pages.
    pub total: u64,
    /// One-based page number.
    pub page: u32,
    /// Page size.
    pub page_size: u32,
    /// Number of pages for `total`.
    pub page_count: u64,
}

impl<T> Page<T> {
    /// Assembles a page from its rows and the filtered total.
    #[must_use]
    pub fn new(rows: Vec<T>, total: u64, window: PageWindow) -> Self {
        Self {
            rows,
            total,
            page: window.page(),
            page_size: window.page_size(),
            page_count: window.page_count(total),
        }
    }
}

/// One row of a defect listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefectListing {
    /// The defect.
    pub defect: Defect,
    /// Current assignee, if any.
    pub assignee_id: Option<UserId>,
    /// Whether the defect is overdue as of the query date.
    pub overdue: bool,
}

/// Dashboard counts over a filtered defect set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefectMetrics {
    /// Matching defects.
    pub total: u64,
    /// Matching defects with a current assignee.
    pub assigned: u64,
    /// Matching defects without a current assignee.
    pub unassigned: u64,
    /// Matching defects with critical priority.
    pub critical: u64,
    /// Matching defects that are overdue.
    pub overdue: u64,
    /// Matching defects whose status is not settled.
    pub active: u64,
}

impl DefectMetrics {
    /// Adds one defect to the tally.
    pub fn record(&mut self, defect: &Defect, has_assignee: bool, today: NaiveDate) {
        self.total += 1;
        if has_assignee {
            self.assigned += 1;
        } else {
            self.unassigned += 1;
        }
        if defect.priority() == Priority::Critical {
            self.critical += 1;
        }
        if defect.is_overdue(today) {
            self.overdue += 1;
        }
        if !defect.status().is_settled() {
            self.active += 1;
        }
    }
}

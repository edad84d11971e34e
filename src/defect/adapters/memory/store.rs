//! In-memory entity store with snapshot transactions.
//!
//! A transaction works on a private copy of the whole state while holding the
//! store mutex. Committing swaps the copy in; rolling back drops it. Holding
//! the mutex for the whole transaction serializes all writers, which also
//! satisfies the row-lock contract of [`StoreTransaction::lock_defect`].

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::defect::{
    domain::{
        ActivityEntry, Assignment, Contractor, ContractorId, Defect, DefectId, NewActivityEntry,
        User, UserId,
    },
    ports::{DefectStore, StoreError, StoreResult, StoreTransaction},
};

/// Thread-safe in-memory defect store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDefectStore {
    state: Arc<Mutex<StoreState>>,
    fail_activity_appends: Arc<AtomicBool>,
}

#[derive(Debug, Clone, Default)]
pub(super) struct StoreState {
    pub(super) defects: BTreeMap<DefectId, Defect>,
    pub(super) users: BTreeMap<UserId, User>,
    pub(super) contractors: BTreeMap<ContractorId, Contractor>,
    pub(super) assignments: BTreeMap<DefectId, Assignment>,
    pub(super) activity: Vec<ActivityEntry>,
    next_activity_id: i64,
}

impl InMemoryDefectStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a defect outside any engine transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store lock is poisoned.
    pub fn seed_defect(&self, defect: Defect) -> StoreResult<()> {
        self.lock()?.defects.insert(defect.id(), defect);
        Ok(())
    }

    /// Inserts or replaces a user.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store lock is poisoned.
    pub fn seed_user(&self, user: User) -> StoreResult<()> {
        self.lock()?.users.insert(user.id(), user);
        Ok(())
    }

    /// Inserts or replaces a contractor.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store lock is poisoned.
    pub fn seed_contractor(&self, contractor: Contractor) -> StoreResult<()> {
        self.lock()?.contractors.insert(contractor.id(), contractor);
        Ok(())
    }

    /// Makes every later activity append fail with a persistence error until
    /// switched off again. Used to exercise rollback paths.
    pub fn fail_activity_appends(&self, enabled: bool) {
        self.fail_activity_appends.store(enabled, Ordering::SeqCst);
    }

    /// Returns a committed defect as currently stored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store lock is poisoned.
    pub fn defect(&self, id: DefectId) -> StoreResult<Option<Defect>> {
        Ok(self.lock()?.defects.get(&id).cloned())
    }

    /// Returns every committed assignment row, ordered by defect.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store lock is poisoned.
    pub fn assignments(&self) -> StoreResult<Vec<Assignment>> {
        Ok(self.lock()?.assignments.values().cloned().collect())
    }

    /// Returns the total number of committed activity entries.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store lock is poisoned.
    pub fn activity_count(&self) -> StoreResult<usize> {
        Ok(self.lock()?.activity.len())
    }

    pub(super) fn lock(&self) -> StoreResult<MutexGuard<'_, StoreState>> {
        self.state
            .lock()
            .map_err(|err| StoreError::persistence(std::io::Error::other(err.to_string())))
    }

    fn run_transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTransaction) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut committed = self.lock()?;
        let mut working = committed.clone();
        let mut tx = MemoryTransaction {
            state: &mut working,
            fail_activity_appends: self.fail_activity_appends.load(Ordering::SeqCst),
        };
        let value = work(&mut tx)?;
        *committed = working;
        Ok(value)
    }
}

struct MemoryTransaction<'a> {
    state: &'a mut StoreState,
    fail_activity_appends: bool,
}

impl MemoryTransaction<'_> {
    /// Mirrors the relational foreign keys from assignment and activity rows
    /// to users.
    fn require_user(&self, id: UserId, role: &str) -> StoreResult<()> {
        if self.state.users.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::constraint(format!(
                "{role} references missing user {id}"
            )))
        }
    }
}

impl StoreTransaction for MemoryTransaction<'_> {
    fn find_defect(&mut self, id: DefectId) -> StoreResult<Option<Defect>> {
        Ok(self.state.defects.get(&id).cloned())
    }

    fn lock_defect(&mut self, id: DefectId) -> StoreResult<Option<Defect>> {
        self.find_defect(id)
    }

    fn find_user(&mut self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.state.users.get(&id).cloned())
    }

    fn find_contractor(&mut self, id: ContractorId) -> StoreResult<Option<Contractor>> {
        Ok(self.state.contractors.get(&id).cloned())
    }

    fn current_assignment(&mut self, defect_id: DefectId) -> StoreResult<Option<Assignment>> {
        Ok(self.state.assignments.get(&defect_id).cloned())
    }

    fn delete_assignment(&mut self, defect_id: DefectId) -> StoreResult<usize> {
        Ok(usize::from(self.state.assignments.remove(&defect_id).is_some()))
    }

    fn insert_assignment(&mut self, assignment: &Assignment) -> StoreResult<()> {
        if !self.state.defects.contains_key(&assignment.defect_id) {
            return Err(StoreError::constraint(format!(
                "assignment references missing defect {}",
                assignment.defect_id
            )));
        }
        self.require_user(assignment.assignee_id, "assignment assignee")?;
        self.require_user(assignment.assigned_by, "assignment actor")?;
        if self.state.assignments.contains_key(&assignment.defect_id) {
            return Err(StoreError::constraint(format!(
                "defect {} already has an assignment",
                assignment.defect_id
            )));
        }
        self.state
            .assignments
            .insert(assignment.defect_id, assignment.clone());
        Ok(())
    }

    fn update_defect(&mut self, defect: &Defect) -> StoreResult<()> {
        if let Some(contractor_id) = defect
            .contractor_id()
            .filter(|id| !self.state.contractors.contains_key(id))
        {
            return Err(StoreError::constraint(format!(
                "defect {} references missing contractor {contractor_id}",
                defect.id()
            )));
        }
        let slot = self.state.defects.get_mut(&defect.id()).ok_or_else(|| {
            StoreError::constraint(format!("defect {} does not exist", defect.id()))
        })?;
        *slot = defect.clone();
        Ok(())
    }

    fn append_activity(&mut self, entry: &NewActivityEntry) -> StoreResult<ActivityEntry> {
        if self.fail_activity_appends {
            return Err(StoreError::persistence(std::io::Error::other(
                "activity log unavailable",
            )));
        }
        if !self.state.defects.contains_key(&entry.defect_id) {
            return Err(StoreError::constraint(format!(
                "activity references missing defect {}",
                entry.defect_id
            )));
        }
        self.require_user(entry.actor_id, "activity actor")?;
        self.state.next_activity_id += 1;
        let stored = ActivityEntry::from_new(self.state.next_activity_id, entry.clone());
        self.state.activity.push(stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl DefectStore for InMemoryDefectStore {
    async fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTransaction) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
    {
        self.run_transaction(work)
    }

    async fn activity_for(&self, defect_id: DefectId) -> StoreResult<Vec<ActivityEntry>> {
        let state = self.lock()?;
        Ok(state
            .activity
            .iter()
            .filter(|entry| entry.defect_id == defect_id)
            .cloned()
            .collect())
    }
}

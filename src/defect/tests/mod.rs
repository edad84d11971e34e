//! Unit tests for the defect module.


use crate::defect::{
    adapters::memory::InMemoryDefectStore,
    domain::{
        ActivityEntry, Assignment, Contractor, ContractorId, Defect, DefectId, DefectStatus,
        LifecycleStamps, NewActivityEntry, PersistedDefectData, Priority, ProjectId, User, UserId,
    },
    ports::{DefectStore, StoreError, StoreResult, StoreTransaction},
};
use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Clock frozen at a settable instant.
pub(super) struct TestClock {
    now: Mutex<DateTime<Utc>>,
}

impl TestClock {
    pub(super) fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub(super) fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().expect("clock lock") = now;
    }
}

impl Clock for TestClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock")
    }
}

pub(super) fn instant(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn defect_id(value: i64) -> DefectId {
    DefectId::new(value).expect("valid defect id")
}

pub(super) fn user_id(value: i64) -> UserId {
    UserId::new(value).expect("valid user id")
}

pub(super) fn contractor_id(value: i64) -> ContractorId {
    ContractorId::new(value).expect("valid contractor id")
}

pub(super) fn defect(id: i64, status: DefectStatus) -> Defect {
    Defect::from_persisted(persisted(id, status))
}

pub(super) fn soft_deleted(id: i64) -> Defect {
    Defect::from_persisted(PersistedDefectData {
        deleted_at: Some(instant(2026, 1, 6)),
        ..persisted(id, DefectStatus::Open)
    })
}

fn persisted(id: i64, status: DefectStatus) -> PersistedDefectData {
    let created = instant(2026, 1, 5);
    PersistedDefectData {
        id: defect_id(id),
        project_id: ProjectId::new(1).expect("valid project id"),
        title: format!("Defect {id}"),
        description: String::new(),
        priority: Priority::Medium,
        status,
        due_date: None,
        contractor_id: None,
        created_by: user_id(1),
        stamps: LifecycleStamps::default(),
        created_at: created,
        updated_at: created,
        deleted_at: None,
    }
}

/// Store with users 1 (Alice), 7 (Bob), 9 (Carol), inactive user 11 (Dan),
/// contractors 3 (Acme Tiling), 4 (Northside Plumbing), inactive
/// contractor 5 (Gone Ltd), and the given defects.
pub(super) fn seeded_store(defects: impl IntoIterator<Item = Defect>) -> InMemoryDefectStore {
    let store = InMemoryDefectStore::new();
    for (id, name) in [(1, "Alice"), (7, "Bob"), (9, "Carol")] {
        store
            .seed_user(User::new(user_id(id), name))
            .expect("seed user");
    }
    store
        .seed_user(User::new(user_id(11), "Dan").deactivated())
        .expect("seed user");
    store
        .seed_contractor(Contractor::new(contractor_id(3), "Acme Tiling", "tiling"))
        .expect("seed contractor");
    store
        .seed_contractor(Contractor::new(
            contractor_id(4),
            "Northside Plumbing",
            "plumbing",
        ))
        .expect("seed contractor");
    store
        .seed_contractor(Contractor::new(contractor_id(5), "Gone Ltd", "joinery").deactivated())
        .expect("seed contractor");
    for defect in defects {
        store.seed_defect(defect).expect("seed defect");
    }
    store
}

/// Store wrapper counting row-lock requests made through its transactions.
pub(super) struct LockCountingStore {
    inner: InMemoryDefectStore,
    locks: Arc<AtomicUsize>,
}

impl LockCountingStore {
    pub(super) fn wrap(inner: InMemoryDefectStore) -> Self {
        Self {
            inner,
            locks: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(super) fn locks(&self) -> usize {
        self.locks.load(Ordering::SeqCst)
    }

    pub(super) fn inner(&self) -> &InMemoryDefectStore {
        &self.inner
    }
}

struct LockCountingTransaction<'a> {
    inner: &'a mut dyn StoreTransaction,
    locks: &'a AtomicUsize,
}

impl StoreTransaction for LockCountingTransaction<'_> {
    fn find_defect(&mut self, id: DefectId) -> StoreResult<Option<Defect>> {
        self.inner.find_defect(id)
    }

    fn lock_defect(&mut self, id: DefectId) -> StoreResult<Option<Defect>> {
        self.locks.fetch_add(1, Ordering::SeqCst);
        self.inner.lock_defect(id)
    }

    fn find_user(&mut self, id: UserId) -> StoreResult<Option<User>> {
        self.inner.find_user(id)
    }

    fn find_contractor(&mut self, id: ContractorId) -> StoreResult<Option<Contractor>> {
        self.inner.find_contractor(id)
    }

    fn current_assignment(&mut self, defect_id: DefectId) -> StoreResult<Option<Assignment>> {
        self.inner.current_assignment(defect_id)
    }

    fn delete_assignment(&mut self, defect_id: DefectId) -> StoreResult<usize> {
        self.inner.delete_assignment(defect_id)
    }

    fn insert_assignment(&mut self, assignment: &Assignment) -> StoreResult<()> {
        self.inner.insert_assignment(assignment)
    }

    fn update_defect(&mut self, defect: &Defect) -> StoreResult<()> {
        self.inner.update_defect(defect)
    }

    fn append_activity(&mut self, entry: &NewActivityEntry) -> StoreResult<ActivityEntry> {
        self.inner.append_activity(entry)
    }
}

#[async_trait]
impl DefectStore for LockCountingStore {
    async fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTransaction) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
    {
        let locks = Arc::clone(&self.locks);
        self.inner
            .transaction(move |tx| {
                let mut counting = LockCountingTransaction {
                    inner: tx,
                    locks: &locks,
                };
                work(&mut counting)
            })
            .await
    }

    async fn activity_for(&self, defect_id: DefectId) -> StoreResult<Vec<ActivityEntry>> {
        self.inner.activity_for(defect_id).await
    }
}

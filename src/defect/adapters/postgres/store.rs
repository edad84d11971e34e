//! `PostgreSQL` unit-of-work store for defect engines.

use super::{
    conversion::{
        assignment_row, defect_changeset, new_activity_row, row_to_activity, row_to_assignment,
        row_to_contractor, row_to_defect, row_to_user,
    },
    models::{ActivityRow, AssignmentRow, ContractorRow, DefectRow, UserRow},
    schema::{activity_log, contractors, defect_assignments, defects, users},
};
use crate::defect::{
    domain::{
        ActivityEntry, Assignment, Contractor, ContractorId, Defect, DefectId, NewActivityEntry,
        User, UserId,
    },
    ports::{DefectStore, StoreError, StoreResult, StoreTransaction},
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL` connection pool type used by defect adapters.
pub type DefectPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed defect store.
#[derive(Debug, Clone)]
pub struct PostgresDefectStore {
    pool: DefectPgPool,
}

impl PostgresDefectStore {
    /// Creates a new store from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: DefectPgPool) -> Self {
        Self { pool }
    }

    pub(super) async fn run_blocking<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(StoreError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(StoreError::persistence)?
    }
}

/// Failure of a Diesel transaction: either the work closure failed or the
/// database refused to begin, commit, or roll back.
pub(super) enum TransactionFailure<E> {
    Work(E),
    Database(DieselError),
}

impl<E> From<DieselError> for TransactionFailure<E> {
    fn from(err: DieselError) -> Self {
        Self::Database(err)
    }
}

impl<E: From<StoreError>> TransactionFailure<E> {
    pub(super) fn into_inner(self) -> E {
        match self {
            Self::Work(err) => err,
            Self::Database(err) => E::from(StoreError::persistence(err)),
        }
    }
}

/// Maps key violations on writes to [`StoreError::Constraint`].
fn map_write_error(err: DieselError) -> StoreError {
    match err {
        DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation | DatabaseErrorKind::ForeignKeyViolation,
            ref info,
        ) => StoreError::constraint(info.message().to_owned()),
        other => StoreError::persistence(other),
    }
}

struct PgStoreTransaction<'a> {
    conn: &'a mut PgConnection,
}

impl PgStoreTransaction<'_> {
    fn load_defect(&mut self, id: DefectId, lock: bool) -> StoreResult<Option<Defect>> {
        let query = defects::table
            .filter(defects::id.eq(id.value()))
            .select(DefectRow::as_select());
        let row = if lock {
            query.for_update().first::<DefectRow>(self.conn).optional()
        } else {
            query.first::<DefectRow>(self.conn).optional()
        }
        .map_err(StoreError::persistence)?;
        row.map(row_to_defect).transpose()
    }
}

impl StoreTransaction for PgStoreTransaction<'_> {
    fn find_defect(&mut self, id: DefectId) -> StoreResult<Option<Defect>> {
        self.load_defect(id, false)
    }

    fn lock_defect(&mut self, id: DefectId) -> StoreResult<Option<Defect>> {
        self.load_defect(id, true)
    }

    fn find_user(&mut self, id: UserId) -> StoreResult<Option<User>> {
        let row = users::table
            .filter(users::id.eq(id.value()))
            .select(UserRow::as_select())
            .first::<UserRow>(self.conn)
            .optional()
            .map_err(StoreError::persistence)?;
        row.map(row_to_user).transpose()
    }

    fn find_contractor(&mut self, id: ContractorId) -> StoreResult<Option<Contractor>> {
        let row = contractors::table
            .filter(contractors::id.eq(id.value()))
            .select(ContractorRow::as_select())
            .first::<ContractorRow>(self.conn)
            .optional()
            .map_err(StoreError::persistence)?;
        row.map(row_to_contractor).transpose()
    }

    fn current_assignment(&mut self, defect_id: DefectId) -> StoreResult<Option<Assignment>> {
        let row = defect_assignments::table
            .filter(defect_assignments::defect_id.eq(defect_id.value()))
            .select(AssignmentRow::as_select())
            .first::<AssignmentRow>(self.conn)
            .optional()
            .map_err(StoreError::persistence)?;
        row.map(row_to_assignment).transpose()
    }

    fn delete_assignment(&mut self, defect_id: DefectId) -> StoreResult<usize> {
        diesel::delete(
            defect_assignments::table.filter(defect_assignments::defect_id.eq(defect_id.value())),
        )
        .execute(self.conn)
        .map_err(StoreError::persistence)
    }

    fn insert_assignment(&mut self, assignment: &Assignment) -> StoreResult<()> {
        diesel::insert_into(defect_assignments::table)
            .values(&assignment_row(assignment))
            .execute(self.conn)
            .map_err(map_write_error)?;
        Ok(())
    }

    fn update_defect(&mut self, defect: &Defect) -> StoreResult<()> {
        let updated = diesel::update(defects::table.filter(defects::id.eq(defect.id().value())))
            .set(&defect_changeset(defect))
            .execute(self.conn)
            .map_err(map_write_error)?;
        if updated == 0 {
            return Err(StoreError::constraint(format!(
                "defect {} does not exist",
                defect.id()
            )));
        }
        Ok(())
    }

    fn append_activity(&mut self, entry: &NewActivityEntry) -> StoreResult<ActivityEntry> {
        let row = diesel::insert_into(activity_log::table)
            .values(&new_activity_row(entry))
            .returning(ActivityRow::as_returning())
            .get_result::<ActivityRow>(self.conn)
            .map_err(map_write_error)?;
        row_to_activity(row)
    }
}

#[async_trait]
impl DefectStore for PostgresDefectStore {
    async fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTransaction) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut pooled = pool
                .get()
                .map_err(|err| E::from(StoreError::persistence(err)))?;
            let connection: &mut PgConnection = &mut pooled;
            connection
                .transaction::<T, TransactionFailure<E>, _>(|conn| {
                    let mut tx = PgStoreTransaction { conn };
                    work(&mut tx).map_err(TransactionFailure::Work)
                })
                .map_err(TransactionFailure::into_inner)
        })
        .await
        .map_err(|err| E::from(StoreError::persistence(err)))?
    }

    async fn activity_for(&self, defect_id: DefectId) -> StoreResult<Vec<ActivityEntry>> {
        self.run_blocking(move |connection| {
            activity_log::table
                .filter(activity_log::defect_id.eq(defect_id.value()))
                .order(activity_log::id.asc())
                .select(ActivityRow::as_select())
                .load::<ActivityRow>(connection)
                .map_err(StoreError::persistence)?
                .into_iter()
                .map(row_to_activity)
                .collect()
        })
        .await
    }
}

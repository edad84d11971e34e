//! Shared helpers for `PostgreSQL` integration tests.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_types::{BigInt, Date, Nullable, Text, Timestamptz};
use pg_embedded_setup_unpriv::TestCluster;
use snaglist::defect::{
    adapters::postgres::PostgresDefectStore,
    domain::{
        ContractorId, Defect, DefectId, DefectStatus, LifecycleStamps, PersistedDefectData,
        Priority, ProjectId, UserId,
    },
};
use std::sync::Arc;
use tokio::runtime::Runtime;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// SQL creating the defect schema.
pub const CREATE_SCHEMA_SQL: &str =
    include_str!("../../migrations/2026-10-01-000000_create_defect_tables/up.sql");

/// Users and contractors shared by every test database.
///
/// Contractors 3 (Acme Tiling), 4 (Northside Plumbing), inactive 5 (Gone
/// Ltd); users 1 (Alice Mercer), 7 (Bob Okafor, of contractor 3),
/// 9 (Carol Singh), inactive 11 (Dan Ward).
const SEED_PARTIES_SQL: &str = "
    INSERT INTO contractors (id, name, trade, is_active) VALUES
        (3, 'Acme Tiling', 'tiling', TRUE),
        (4, 'Northside Plumbing', 'plumbing', TRUE),
        (5, 'Gone Ltd', 'joinery', FALSE);
    INSERT INTO users (id, display_name, contractor_id, is_active) VALUES
        (1, 'Alice Mercer', NULL, TRUE),
        (7, 'Bob Okafor', 3, TRUE),
        (9, 'Carol Singh', NULL, TRUE),
        (11, 'Dan Ward', NULL, FALSE);
";

/// Template database name for the pre-migrated, pre-seeded schema.
pub const TEMPLATE_DB: &str = "snaglist_test_template";

/// Creates a multi-threaded runtime so spawned work keeps running while a
/// test thread holds a competing transaction open.
pub fn test_runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to create test runtime")
}

/// Ensures the template database exists with the schema and parties applied.
fn ensure_template(cluster: &TestCluster) -> Result<(), BoxError> {
    cluster
        .ensure_template_exists(TEMPLATE_DB, |db_name| {
            let url = cluster.connection().database_url(db_name);
            let mut conn = PgConnection::establish(&url).map_err(|e| eyre::eyre!("{e}"))?;
            conn.batch_execute(CREATE_SCHEMA_SQL)
                .map_err(|e| eyre::eyre!("schema: {e}"))?;
            conn.batch_execute(SEED_PARTIES_SQL)
                .map_err(|e| eyre::eyre!("seed parties: {e}"))?;
            Ok(())
        })
        .map_err(|e| Box::new(e) as BoxError)?;
    Ok(())
}

/// Drops the test database even if the test panics.
struct CleanupGuard {
    cluster: &'static TestCluster,
    db_name: String,
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        if let Err(e) = self.cluster.drop_database(self.db_name.as_str()) {
            eprintln!("Warning: failed to drop test database {}: {e}", self.db_name);
        }
    }
}

/// A fresh database cloned from the template, with a store over it.
///
/// Field order matters: the pool and runtime are dropped before the guard
/// drops the database.
pub struct PgContext {
    /// Store under test.
    pub store: Arc<PostgresDefectStore>,
    /// Runtime driving the async store API.
    pub runtime: Runtime,
    url: String,
    _guard: CleanupGuard,
}

impl PgContext {
    /// Opens a raw connection outside the store's pool.
    pub fn connect(&self) -> PgConnection {
        PgConnection::establish(&self.url).expect("raw connection")
    }

    /// Inserts defects directly, bypassing the engine.
    pub fn seed(&self, defects: &[DefectSeed]) {
        let mut conn = self.connect();
        for seed in defects {
            diesel::sql_query(concat!(
                "INSERT INTO defects (id, project_id, title, description, priority, status, ",
                "due_date, created_by, created_at, updated_at, deleted_at) ",
                "VALUES ($1, 1, $2, $3, $4, $5, $6, 1, $7, $7, $8)",
            ))
            .bind::<BigInt, _>(seed.id)
            .bind::<Text, _>(&seed.title)
            .bind::<Text, _>(&seed.description)
            .bind::<Text, _>(seed.priority.as_str())
            .bind::<Text, _>(seed.status.as_str())
            .bind::<Nullable<Date>, _>(seed.due_date)
            .bind::<Timestamptz, _>(seed.created_at)
            .bind::<Nullable<Timestamptz>, _>(seed.deleted_at)
            .execute(&mut conn)
            .expect("seed defect");
        }
    }

    /// Counts committed rows in `table`.
    pub fn count_rows(&self, table: &str) -> i64 {
        #[derive(QueryableByName)]
        struct CountRow {
            #[diesel(sql_type = BigInt)]
            total: i64,
        }

        let mut conn = self.connect();
        diesel::sql_query(format!("SELECT COUNT(*) AS total FROM {table}"))
            .get_result::<CountRow>(&mut conn)
            .expect("count rows")
            .total
    }
}

/// Creates a database from the template and a store whose pool holds up to
/// `pool_size` connections.
///
/// # Errors
///
/// Returns an error if template creation, database creation, or pool
/// construction fails.
pub fn prepare(
    cluster: &'static TestCluster,
    label: &str,
    pool_size: u32,
) -> Result<PgContext, BoxError> {
    ensure_template(cluster)?;
    let db_name = format!("test_{label}_{}", uuid::Uuid::new_v4().simple());
    cluster
        .create_database_from_template(db_name.as_str(), TEMPLATE_DB)
        .map_err(|e| Box::new(e) as BoxError)?;
    let guard = CleanupGuard {
        cluster,
        db_name: db_name.clone(),
    };
    let url = cluster.connection().database_url(&db_name);
    let manager = ConnectionManager::<PgConnection>::new(url.clone());
    let pool = Pool::builder()
        .max_size(pool_size)
        .build(manager)
        .map_err(|e| Box::new(e) as BoxError)?;
    Ok(PgContext {
        store: Arc::new(PostgresDefectStore::new(pool)),
        runtime: test_runtime(),
        url,
        _guard: guard,
    })
}

/// Defect row inserted directly for a test.
#[derive(Debug, Clone)]
pub struct DefectSeed {
    id: i64,
    title: String,
    description: String,
    priority: Priority,
    status: DefectStatus,
    due_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl DefectSeed {
    /// An open, medium-priority defect without a contractor, reported on
    /// 5 January 2026 plus `id` hours.
    pub fn new(id: i64, title: &str) -> Self {
        Self {
            id,
            title: title.to_owned(),
            description: String::new(),
            priority: Priority::Medium,
            status: DefectStatus::Open,
            due_date: None,
            created_at: reported_at(id),
            deleted_at: None,
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        description.clone_into(&mut self.description);
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn status(mut self, status: DefectStatus) -> Self {
        self.status = status;
        self
    }

    pub fn due(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn deleted(mut self) -> Self {
        self.deleted_at = Some(self.created_at);
        self
    }

    /// The same row as a domain defect, for seeding the in-memory store.
    pub fn to_defect(&self) -> Defect {
        Defect::from_persisted(PersistedDefectData {
            id: defect_id(self.id),
            project_id: ProjectId::new(1).expect("valid project id"),
            title: self.title.clone(),
            description: self.description.clone(),
            priority: self.priority,
            status: self.status,
            due_date: self.due_date,
            contractor_id: None,
            created_by: user_id(1),
            stamps: LifecycleStamps::default(),
            created_at: self.created_at,
            updated_at: self.created_at,
            deleted_at: self.deleted_at,
        })
    }
}

fn reported_at(id: i64) -> DateTime<Utc> {
    let base = Utc
        .with_ymd_and_hms(2026, 1, 5, 0, 0, 0)
        .single()
        .expect("valid timestamp");
    base + chrono::Duration::hours(id)
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub fn defect_id(value: i64) -> DefectId {
    DefectId::new(value).expect("valid defect id")
}

pub fn user_id(value: i64) -> UserId {
    UserId::new(value).expect("valid user id")
}

pub fn contractor_id(value: i64) -> ContractorId {
    ContractorId::new(value).expect("valid contractor id")
}

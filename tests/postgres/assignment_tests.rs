//! Assignment engine tests against `PostgreSQL`.

use super::helpers::{DefectSeed, contractor_id, defect_id, prepare, user_id};
use diesel::connection::SimpleConnection;
use mockable::DefaultClock;
use pg_embedded_setup_unpriv::{TestCluster, test_support::shared_test_cluster};
use rstest::rstest;
use snaglist::defect::{
    adapters::postgres::PostgresDefectStore,
    domain::ActivityAction,
    ports::{DefectQueryRepository, DefectStore, StoreError},
    services::{
        AssignContractorRequest, AssignUserRequest, AssignmentError, AssignmentService,
        BulkAssignUserRequest,
    },
};
use std::sync::Arc;
use std::time::Duration;

type PgAssignments = AssignmentService<PostgresDefectStore, DefaultClock>;

fn service(store: &Arc<PostgresDefectStore>) -> PgAssignments {
    AssignmentService::new(Arc::clone(store), Arc::new(DefaultClock))
}

fn route(defect: i64, contractor: i64) -> AssignContractorRequest {
    AssignContractorRequest::new(defect_id(defect), contractor_id(contractor), user_id(1))
}

#[rstest]
fn reassignment_replaces_the_single_row(shared_test_cluster: &'static TestCluster) {
    let ctx = prepare(shared_test_cluster, "reassign", 1).expect("database setup");
    ctx.seed(&[DefectSeed::new(42, "Cracked tile")]);
    let assignments = service(&ctx.store);

    ctx.runtime
        .block_on(assignments.assign_user(AssignUserRequest::new(
            defect_id(42),
            user_id(7),
            user_id(1),
        )))
        .expect("first assignment should succeed");
    let projection = ctx
        .runtime
        .block_on(assignments.assign_user(AssignUserRequest::new(
            defect_id(42),
            user_id(9),
            user_id(1),
        )))
        .expect("reassignment should succeed");

    assert_eq!(
        projection.assignee.map(|party| party.name),
        Some("Carol Singh".to_owned())
    );
    assert_eq!(ctx.count_rows("defect_assignments"), 1);
    let current = ctx
        .runtime
        .block_on(ctx.store.current_assignment(defect_id(42)))
        .expect("assignment readable")
        .expect("assignment present");
    assert_eq!(current.assignee_id, user_id(9));

    let trail = ctx
        .runtime
        .block_on(ctx.store.activity_for(defect_id(42)))
        .expect("trail readable");
    let details: Vec<&str> = trail.iter().map(|entry| entry.detail.as_str()).collect();
    assert_eq!(
        details,
        vec![
            "Assigned to Bob Okafor (contractor: no contractor)",
            "Assigned to Carol Singh (contractor: no contractor)",
        ]
    );
}

#[rstest]
fn failed_bulk_assignment_commits_nothing(shared_test_cluster: &'static TestCluster) {
    let ctx = prepare(shared_test_cluster, "bulk_rollback", 1).expect("database setup");
    ctx.seed(&[
        DefectSeed::new(1, "Loose handrail"),
        DefectSeed::new(2, "Chipped skirting"),
    ]);

    let err = ctx
        .runtime
        .block_on(service(&ctx.store).bulk_assign_user(BulkAssignUserRequest::new(
            [defect_id(1), defect_id(2), defect_id(999)],
            user_id(7),
            user_id(1),
        )))
        .expect_err("batch with a missing defect should fail");

    assert!(matches!(err, AssignmentError::DefectNotFound(id) if id == defect_id(999)));
    assert_eq!(ctx.count_rows("defect_assignments"), 0);
    assert_eq!(ctx.count_rows("activity_log"), 0);
}

#[rstest]
fn unknown_actor_is_rejected_before_writing(shared_test_cluster: &'static TestCluster) {
    let ctx = prepare(shared_test_cluster, "unknown_actor", 1).expect("database setup");
    ctx.seed(&[DefectSeed::new(42, "Cracked tile")]);

    let err = ctx
        .runtime
        .block_on(service(&ctx.store).assign_contractor(AssignContractorRequest::new(
            defect_id(42),
            contractor_id(3),
            user_id(99),
        )))
        .expect_err("unknown actor should fail");

    assert!(matches!(err, AssignmentError::ActorNotFound(id) if id == user_id(99)));
    assert_eq!(ctx.count_rows("activity_log"), 0);
}

#[rstest]
fn contractor_change_waits_for_a_competing_writer(shared_test_cluster: &'static TestCluster) {
    let ctx = prepare(shared_test_cluster, "contractor_wait", 1).expect("database setup");
    ctx.seed(&[DefectSeed::new(42, "Cracked tile")]);
    let assignments = Arc::new(service(&ctx.store));

    let mut competitor = ctx.connect();
    competitor
        .batch_execute("BEGIN; UPDATE defects SET contractor_id = 4 WHERE id = 42;")
        .expect("competing write");

    let worker = Arc::clone(&assignments);
    let handle = ctx
        .runtime
        .spawn(async move { worker.assign_contractor(route(42, 3)).await });
    std::thread::sleep(Duration::from_millis(300));
    assert!(
        !handle.is_finished(),
        "assignment should block on the competing row lock"
    );

    competitor.batch_execute("COMMIT;").expect("commit competing write");
    let projection = ctx
        .runtime
        .block_on(handle)
        .expect("task should join")
        .expect("assignment should succeed");

    assert_eq!(
        projection.contractor.map(|party| party.id),
        Some(contractor_id(3))
    );
    let trail = ctx
        .runtime
        .block_on(ctx.store.activity_for(defect_id(42)))
        .expect("trail readable");
    let entry = trail.first().expect("one entry");
    assert_eq!(entry.action, ActivityAction::ContractorAssign);
    assert_eq!(
        entry.detail,
        "Contractor changed from Northside Plumbing to Acme Tiling"
    );
}

#[rstest]
fn concurrent_contractor_changes_name_true_predecessors(
    shared_test_cluster: &'static TestCluster,
) {
    let ctx = prepare(shared_test_cluster, "contractor_race", 2).expect("database setup");
    ctx.seed(&[DefectSeed::new(42, "Cracked tile")]);
    let first = Arc::new(service(&ctx.store));
    let second = Arc::new(service(&ctx.store));

    let tasks = [(first, 3), (second, 4)].map(|(worker, contractor)| {
        ctx.runtime
            .spawn(async move { worker.assign_contractor(route(42, contractor)).await })
    });
    for task in tasks {
        ctx.runtime
            .block_on(task)
            .expect("task should join")
            .expect("assignment should succeed");
    }

    let trail = ctx
        .runtime
        .block_on(ctx.store.activity_for(defect_id(42)))
        .expect("trail readable");
    let details: Vec<&str> = trail.iter().map(|entry| entry.detail.as_str()).collect();
    let stored = ctx
        .runtime
        .block_on(
            ctx.store
                .transaction::<_, StoreError, _>(|tx| tx.find_defect(defect_id(42))),
        )
        .expect("defect readable")
        .expect("defect present");
    let (earlier, later) = if stored.contractor_id() == Some(contractor_id(3)) {
        ("Northside Plumbing", "Acme Tiling")
    } else {
        ("Acme Tiling", "Northside Plumbing")
    };
    assert_eq!(
        details,
        vec![
            format!("Contractor changed from no contractor to {earlier}"),
            format!("Contractor changed from {earlier} to {later}"),
        ]
    );
}

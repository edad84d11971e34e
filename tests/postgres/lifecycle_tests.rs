//! Lifecycle transition tests against `PostgreSQL`.

use super::helpers::{DefectSeed, defect_id, prepare, user_id};
use diesel::connection::SimpleConnection;
use mockable::DefaultClock;
use pg_embedded_setup_unpriv::{TestCluster, test_support::shared_test_cluster};
use rstest::rstest;
use snaglist::defect::{
    adapters::postgres::PostgresDefectStore,
    domain::{ActivityAction, Actor, ActorRole, DefectStatus, TransitionAction, TransitionError},
    ports::{DefectStore, StoreError},
    services::{LifecycleError, LifecycleService, TransitionRequest},
};
use std::sync::Arc;
use std::time::Duration;

type PgLifecycle = LifecycleService<PostgresDefectStore, DefaultClock>;

fn service(store: &Arc<PostgresDefectStore>) -> PgLifecycle {
    LifecycleService::new(Arc::clone(store), Arc::new(DefaultClock))
}

fn sign_off(id: i64, comment: &str) -> TransitionRequest {
    TransitionRequest::new(defect_id(id), Actor::new(user_id(1), ActorRole::Inspector))
        .with_comment(comment)
}

#[rstest]
fn accept_persists_status_stamp_and_entry(shared_test_cluster: &'static TestCluster) {
    let ctx = prepare(shared_test_cluster, "accept", 1).expect("database setup");
    ctx.seed(&[DefectSeed::new(42, "Cracked tile")]);
    let lifecycle = service(&ctx.store);

    let projection = ctx
        .runtime
        .block_on(lifecycle.accept(sign_off(42, "Regrouted and sealed")))
        .expect("accept should succeed");
    assert_eq!(projection.status, DefectStatus::Accepted);

    let stored = ctx
        .runtime
        .block_on(
            ctx.store
                .transaction::<_, StoreError, _>(|tx| tx.find_defect(defect_id(42))),
        )
        .expect("defect readable")
        .expect("defect present");
    assert_eq!(stored.status(), DefectStatus::Accepted);
    let stamp = stored.stamps().accepted.as_ref().expect("acceptance stamp");
    assert_eq!(stamp.actor_id, user_id(1));
    assert_eq!(stamp.comment.as_deref(), Some("Regrouted and sealed"));

    let err = ctx
        .runtime
        .block_on(lifecycle.accept(sign_off(42, "again")))
        .expect_err("second accept should fail");
    assert!(matches!(
        err,
        LifecycleError::Guard(TransitionError::NotPermittedFrom {
            from: DefectStatus::Accepted,
            ..
        })
    ));

    let trail = ctx
        .runtime
        .block_on(ctx.store.activity_for(defect_id(42)))
        .expect("trail readable");
    assert_eq!(trail.len(), 1);
    let entry = trail.first().expect("one entry");
    assert_eq!(entry.action, ActivityAction::Accept);
    assert_eq!(
        entry.detail,
        "Alice Mercer changed status from open to accepted: Regrouted and sealed"
    );
}

#[rstest]
fn transition_guard_sees_a_competing_commit(shared_test_cluster: &'static TestCluster) {
    let ctx = prepare(shared_test_cluster, "accept_race", 1).expect("database setup");
    ctx.seed(&[DefectSeed::new(42, "Cracked tile")]);
    let lifecycle = Arc::new(service(&ctx.store));

    let mut competitor = ctx.connect();
    competitor
        .batch_execute("BEGIN; UPDATE defects SET status = 'accepted' WHERE id = 42;")
        .expect("competing write");

    let worker = Arc::clone(&lifecycle);
    let handle = ctx
        .runtime
        .spawn(async move { worker.transition(TransitionAction::Accept, sign_off(42, "ok")).await });
    std::thread::sleep(Duration::from_millis(300));
    assert!(
        !handle.is_finished(),
        "transition should block on the competing row lock"
    );

    competitor.batch_execute("COMMIT;").expect("commit competing write");
    let err = ctx
        .runtime
        .block_on(handle)
        .expect("task should join")
        .expect_err("accept of an accepted defect should fail");

    assert!(matches!(
        err,
        LifecycleError::Guard(TransitionError::NotPermittedFrom {
            action: TransitionAction::Accept,
            from: DefectStatus::Accepted,
        })
    ));
    assert_eq!(ctx.count_rows("activity_log"), 0);
}

#[rstest]
fn unknown_actor_cannot_transition(shared_test_cluster: &'static TestCluster) {
    let ctx = prepare(shared_test_cluster, "lifecycle_actor", 1).expect("database setup");
    ctx.seed(&[DefectSeed::new(42, "Cracked tile")]);

    let err = ctx
        .runtime
        .block_on(service(&ctx.store).reject(
            TransitionRequest::new(defect_id(42), Actor::new(user_id(99), ActorRole::Inspector))
                .with_comment("not to drawing"),
        ))
        .expect_err("unknown actor should fail");

    assert!(matches!(err, LifecycleError::ActorNotFound(id) if id == user_id(99)));
    assert_eq!(ctx.count_rows("activity_log"), 0);
}

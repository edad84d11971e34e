//! Constraint mapping and rollback tests for the `PostgreSQL` store.

use super::helpers::{DefectSeed, contractor_id, defect_id, prepare, user_id};
use chrono::Utc;
use pg_embedded_setup_unpriv::{TestCluster, test_support::shared_test_cluster};
use rstest::rstest;
use snaglist::defect::{
    domain::{ActivityAction, Assignment, NewActivityEntry},
    ports::{DefectStore, StoreError},
};

fn assignment(assignee: i64, assigned_by: i64) -> Assignment {
    Assignment {
        defect_id: defect_id(42),
        assignee_id: user_id(assignee),
        assigned_by: user_id(assigned_by),
        assigned_at: Utc::now(),
    }
}

#[rstest]
fn duplicate_assignment_is_a_constraint_and_rolls_back(
    shared_test_cluster: &'static TestCluster,
) {
    let ctx = prepare(shared_test_cluster, "duplicate_assignment", 1).expect("database setup");
    ctx.seed(&[DefectSeed::new(42, "Cracked tile")]);

    let err = ctx
        .runtime
        .block_on(ctx.store.transaction::<_, StoreError, _>(|tx| {
            tx.insert_assignment(&assignment(7, 1))?;
            tx.insert_assignment(&assignment(9, 1))
        }))
        .expect_err("second row for one defect should fail");

    assert!(matches!(err, StoreError::Constraint(_)), "{err}");
    assert_eq!(ctx.count_rows("defect_assignments"), 0);
}

#[rstest]
#[case(50, 1)]
#[case(7, 99)]
fn assignment_to_unknown_user_is_a_constraint(
    shared_test_cluster: &'static TestCluster,
    #[case] assignee: i64,
    #[case] assigned_by: i64,
) {
    let ctx = prepare(shared_test_cluster, "assignment_fk", 1).expect("database setup");
    ctx.seed(&[DefectSeed::new(42, "Cracked tile")]);

    let err = ctx
        .runtime
        .block_on(ctx.store.transaction::<_, StoreError, _>(move |tx| {
            tx.insert_assignment(&assignment(assignee, assigned_by))
        }))
        .expect_err("dangling user should fail");

    assert!(matches!(err, StoreError::Constraint(_)), "{err}");
}

#[rstest]
fn activity_from_unknown_actor_is_a_constraint(shared_test_cluster: &'static TestCluster) {
    let ctx = prepare(shared_test_cluster, "activity_fk", 1).expect("database setup");
    ctx.seed(&[DefectSeed::new(42, "Cracked tile")]);

    let err = ctx
        .runtime
        .block_on(ctx.store.transaction::<_, StoreError, _>(|tx| {
            tx.append_activity(&NewActivityEntry {
                defect_id: defect_id(42),
                actor_id: user_id(99),
                action: ActivityAction::Assign,
                detail: "Assigned to Bob Okafor (contractor: no contractor)".to_owned(),
                recorded_at: Utc::now(),
            })
        }))
        .expect_err("dangling actor should fail");

    assert!(matches!(err, StoreError::Constraint(_)), "{err}");
    assert_eq!(ctx.count_rows("activity_log"), 0);
}

#[rstest]
fn defect_updates_are_checked_against_the_schema(shared_test_cluster: &'static TestCluster) {
    let ctx = prepare(shared_test_cluster, "defect_update", 1).expect("database setup");
    ctx.seed(&[DefectSeed::new(42, "Cracked tile")]);

    let unknown_contractor = ctx
        .runtime
        .block_on(ctx.store.transaction::<_, StoreError, _>(|tx| {
            let mut stored = tx
                .lock_defect(defect_id(42))?
                .ok_or_else(|| StoreError::constraint("defect 42 missing"))?;
            stored.set_contractor(Some(contractor_id(77)), Utc::now());
            tx.update_defect(&stored)
        }))
        .expect_err("unknown contractor should fail");
    assert!(
        matches!(unknown_contractor, StoreError::Constraint(_)),
        "{unknown_contractor}"
    );

    let missing = ctx
        .runtime
        .block_on(ctx.store.transaction::<_, StoreError, _>(|tx| {
            let stored = DefectSeed::new(999, "Never stored").to_defect();
            tx.update_defect(&stored)
        }))
        .expect_err("absent defect should fail");
    assert!(matches!(missing, StoreError::Constraint(_)), "{missing}");
}

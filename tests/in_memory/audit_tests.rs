//! Activity trail consistency across mixed lifecycle and assignment work.

use super::helpers::{
    TestClock, contractor_id, defect_id, instant, report, site_manager, staffed_store, user_id,
};
use snaglist::defect::{
    domain::{ActivityAction, Priority},
    ports::DefectStore,
    services::{
        AssignContractorRequest, AssignUserRequest, AssignmentService, LifecycleService,
        TransitionRequest,
    },
};
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread")]
async fn every_mutation_leaves_exactly_one_entry() {
    let store = staffed_store();
    let clock = Arc::new(TestClock::at(instant(2026, 5, 1)));
    report(&store, &clock, 42, "Cracked tile", Priority::High, None);
    let lifecycle = LifecycleService::new(Arc::clone(&store), Arc::clone(&clock));
    let assignment = AssignmentService::new(Arc::clone(&store), Arc::clone(&clock));

    let mut expected = Vec::new();
    for (day, step) in (2..).zip(["assign", "contractor", "accept", "reopen", "assign"]) {
        clock.set(instant(2026, 5, day));
        match step {
            "assign" => {
                assignment
                    .assign_user(AssignUserRequest::new(
                        defect_id(42),
                        user_id(7),
                        user_id(1),
                    ))
                    .await
                    .expect("assignment should succeed");
                expected.push(ActivityAction::Assign);
            }
            "contractor" => {
                assignment
                    .assign_contractor(AssignContractorRequest::new(
                        defect_id(42),
                        contractor_id(3),
                        user_id(1),
                    ))
                    .await
                    .expect("contractor assignment should succeed");
                expected.push(ActivityAction::ContractorAssign);
            }
            "accept" => {
                lifecycle
                    .accept(
                        TransitionRequest::new(defect_id(42), site_manager())
                            .with_comment("Signed off"),
                    )
                    .await
                    .expect("accept should succeed");
                expected.push(ActivityAction::Accept);
            }
            _ => {
                lifecycle
                    .reopen(
                        TransitionRequest::new(defect_id(42), site_manager())
                            .with_comment("Hairline crack reappeared"),
                    )
                    .await
                    .expect("reopen should succeed");
                expected.push(ActivityAction::Reopen);
            }
        }

        let defect = store
            .defect(defect_id(42))
            .expect("store readable")
            .expect("defect present");
        let trail = store
            .activity_for(defect_id(42))
            .await
            .expect("trail readable");
        let newest = trail.last().expect("entry written");
        assert_eq!(trail.len(), expected.len());
        assert!(newest.recorded_at >= defect.updated_at());
        assert!(newest.recorded_at <= instant(2026, 5, day));
        assert_eq!(newest.actor_id, user_id(1));
    }

    let trail = store
        .activity_for(defect_id(42))
        .await
        .expect("trail readable");
    let actions: Vec<ActivityAction> = trail.iter().map(|entry| entry.action).collect();
    assert_eq!(actions, expected);
    let latest_detail = trail.last().map(|entry| entry.detail.clone());
    assert_eq!(
        latest_detail.as_deref(),
        Some("Assigned to Bob Okafor (contractor: Acme Tiling)")
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_operations_never_write_entries() {
    let store = staffed_store();
    let clock = Arc::new(TestClock::at(instant(2026, 5, 1)));
    report(&store, &clock, 42, "Cracked tile", Priority::High, None);
    let lifecycle = LifecycleService::new(Arc::clone(&store), Arc::clone(&clock));
    let assignment = AssignmentService::new(Arc::clone(&store), Arc::clone(&clock));

    lifecycle
        .reopen(TransitionRequest::new(defect_id(42), site_manager()).with_comment("why"))
        .await
        .expect_err("open defects cannot be reopened");
    assignment
        .assign_user(AssignUserRequest::new(
            defect_id(42),
            user_id(11),
            user_id(1),
        ))
        .await
        .expect_err("inactive users cannot be assigned");
    assignment
        .assign_contractor(AssignContractorRequest::new(
            defect_id(42),
            contractor_id(5),
            user_id(1),
        ))
        .await
        .expect_err("inactive contractors cannot be assigned");

    assert_eq!(store.activity_count().expect("store readable"), 0);
    let defect = store
        .defect(defect_id(42))
        .expect("store readable")
        .expect("defect present");
    assert_eq!(defect.updated_at(), instant(2026, 5, 1));
    assert_eq!(defect.contractor_id(), None);
}

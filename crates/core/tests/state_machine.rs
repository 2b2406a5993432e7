//! State machine behaviour against the in-memory store.
//!
//! Covers the case lifecycle scenarios, the event/case mirroring invariant,
//! the single-active-request rule and concurrent review decisions.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use aval_core::audit::WorkflowStage;
use aval_core::case::{ArtifactKind, CaseState};
use aval_core::error::CoreError;
use aval_core::event::EventState;
use aval_core::store::CaseStore;
use aval_core::transitions::is_mirrored;

use common::{fixture, payload, Fixture};

async fn assert_mirrored(f: &Fixture, case_id: i64) {
    let case = f.store.find_case(case_id).await.unwrap().unwrap();
    let event = f.store.find_event(case.event_id).await.unwrap().unwrap();
    assert!(
        is_mirrored(case.state, event.state),
        "case {} is {} but event is {}",
        case.id,
        case.state,
        event.state
    );
}

// ---------------------------------------------------------------------------
// open_case
// ---------------------------------------------------------------------------

#[tokio::test]
async fn open_case_creates_draft_and_leaves_event_available() {
    let f = fixture();
    let event = f.event("E1", 6, 4);

    let case = f.machine.open_case(event.id, "https://files/call.pdf").await.unwrap();

    assert_eq!(case.state, CaseState::Draft);
    assert_eq!(case.call_url.as_deref(), Some("https://files/call.pdf"));
    let event = f.store.find_event(event.id).await.unwrap().unwrap();
    assert_eq!(event.state, EventState::Available);
    assert!(f.machine.get_history(case.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn open_case_twice_fails() {
    let f = fixture();
    let event = f.event("E1", 1, 1);
    f.machine.open_case(event.id, "u1").await.unwrap();

    let err = f.machine.open_case(event.id, "u2").await.unwrap_err();
    assert_matches!(err, CoreError::CaseAlreadyExists(id) if id == event.id);
}

#[tokio::test]
async fn open_case_on_unknown_or_deleted_event_fails() {
    let f = fixture();
    assert_matches!(
        f.machine.open_case(999, "u").await,
        Err(CoreError::EventNotFound(999))
    );

    let event = f.event("E2", 1, 1);
    assert!(f.store.soft_delete_event(event.id).unwrap());
    assert_matches!(
        f.machine.open_case(event.id, "u").await,
        Err(CoreError::EventNotFound(_))
    );
}

#[tokio::test]
async fn open_case_requires_url() {
    let f = fixture();
    let event = f.event("E1", 1, 1);
    assert_matches!(
        f.machine.open_case(event.id, "  ").await,
        Err(CoreError::Validation(_))
    );
}

// ---------------------------------------------------------------------------
// submit_request
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_moves_case_and_event_to_requested() {
    let f = fixture();
    let event = f.event("E1", 6, 4);
    let case = f.machine.open_case(event.id, "u").await.unwrap();

    let case = f
        .machine
        .submit_request(case.id, &payload(6, 4), Some(11))
        .await
        .unwrap();

    assert_eq!(case.state, CaseState::Requested);
    let event = f.store.find_event(event.id).await.unwrap().unwrap();
    assert_eq!(event.state, EventState::Requested);

    let history = f.machine.get_history(case.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].stage, WorkflowStage::Submission);
    assert_eq!(history[0].state, CaseState::Requested);
    assert_eq!(history[0].user_id, Some(11));

    let active = f.store.active_request(case.id).await.unwrap().unwrap();
    assert_eq!(active.headcounts.athletes(), 10);
    assert_eq!(active.headcounts.coaches(), 2);
    assert_eq!(active.budget_total_cents, 12 * 52_000);
}

#[tokio::test]
async fn headcount_mismatch_creates_nothing() {
    let f = fixture();
    let event = f.event("E1", 6, 4);
    let case = f.machine.open_case(event.id, "u").await.unwrap();

    let err = f
        .machine
        .submit_request(case.id, &payload(5, 4), None)
        .await
        .unwrap_err();

    assert_matches!(err, CoreError::HeadcountMismatch { declared: 10, roster: 9 });
    assert!(f.store.requests_for_case(case.id).unwrap().is_empty());
    assert!(f.machine.get_history(case.id).await.unwrap().is_empty());
    let case = f.store.find_case(case.id).await.unwrap().unwrap();
    assert_eq!(case.state, CaseState::Draft);
    assert_mirrored(&f, case.id).await;
}

#[tokio::test]
async fn invalid_payload_is_rejected_before_any_write() {
    let f = fixture();
    let event = f.event("E1", 1, 0);
    let case = f.machine.open_case(event.id, "u").await.unwrap();
    let mut p = payload(1, 0);
    p.objectives.clear();

    assert_matches!(
        f.machine.submit_request(case.id, &p, None).await,
        Err(CoreError::Validation(_))
    );
    assert!(f.store.requests_for_case(case.id).unwrap().is_empty());
}

#[tokio::test]
async fn second_submission_with_active_request_fails() {
    let f = fixture();
    let event = f.event("E1", 1, 1);
    let case = f.machine.open_case(event.id, "u").await.unwrap();
    f.machine.submit_request(case.id, &payload(1, 1), None).await.unwrap();

    let err = f
        .machine
        .submit_request(case.id, &payload(1, 1), None)
        .await
        .unwrap_err();

    assert_matches!(err, CoreError::DuplicateActiveRequest(_));
    assert_eq!(f.machine.get_history(case.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn resubmission_after_withdrawal_succeeds() {
    let f = fixture();
    let event = f.event("E1", 1, 1);
    let case = f.machine.open_case(event.id, "u").await.unwrap();
    f.machine.submit_request(case.id, &payload(1, 1), None).await.unwrap();

    let withdrawn = f.machine.withdraw_request(case.id).await.unwrap();
    assert!(withdrawn.deleted_at.is_some());
    assert!(f.store.active_request(case.id).await.unwrap().is_none());

    f.machine.submit_request(case.id, &payload(1, 1), None).await.unwrap();

    let all = f.store.requests_for_case(case.id).unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all.iter().filter(|r| r.is_active()).count(), 1);
    let history = f.machine.get_history(case.id).await.unwrap();
    assert_eq!(
        history.iter().filter(|e| e.stage == WorkflowStage::Submission).count(),
        2,
        "one SUBMISSION entry per filed request"
    );
    assert_mirrored(&f, case.id).await;
}

#[tokio::test]
async fn overflowing_budget_fails_without_poisoning_the_store() {
    let f = fixture();
    let event = f.event("E1", 1, 1);
    let case = f.machine.open_case(event.id, "u").await.unwrap();
    let mut p = payload(1, 1);
    p.line_items[0].quantity = 3;
    p.line_items[0].unit_amount_cents = i64::MAX / 2;

    assert_matches!(
        f.machine.submit_request(case.id, &p, None).await,
        Err(CoreError::Validation(_))
    );
    // The store enforces the same check when called directly.
    assert_matches!(
        f.store.submit_request(case.id, &p, None).await,
        Err(CoreError::Validation(_))
    );

    assert!(f.machine.get_history(case.id).await.unwrap().is_empty());
    assert!(f.store.requests_for_case(case.id).unwrap().is_empty());
    f.machine.submit_request(case.id, &payload(1, 1), None).await.unwrap();
    assert_mirrored(&f, case.id).await;
}

#[tokio::test]
async fn submit_on_unknown_case_fails() {
    let f = fixture();
    assert_matches!(
        f.machine.submit_request(42, &payload(1, 1), None).await,
        Err(CoreError::CaseNotFound(42))
    );
}

// ---------------------------------------------------------------------------
// approve / reject
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reject_stores_reason_and_mirrors_state() {
    let f = fixture();
    let event = f.event("E1", 1, 1);
    let case = f.machine.open_case(event.id, "u").await.unwrap();
    f.machine.submit_request(case.id, &payload(1, 1), None).await.unwrap();

    let case = f
        .machine
        .reject(case.id, 5, Some("incomplete".to_string()))
        .await
        .unwrap();

    assert_eq!(case.state, CaseState::Rejected);
    assert_eq!(case.comment.as_deref(), Some("incomplete"));
    let event = f.store.find_event(event.id).await.unwrap().unwrap();
    assert_eq!(event.state, EventState::Rejected);

    let history = f.machine.get_history(case.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].stage, WorkflowStage::DtmReview);
    assert_eq!(history[0].comment.as_deref(), Some("incomplete"));
    assert_eq!(history[0].user_id, Some(5));
    assert_eq!(history[1].stage, WorkflowStage::Submission);
}

#[tokio::test]
async fn approve_from_non_requested_state_changes_nothing() {
    let f = fixture();
    let event = f.event("E1", 1, 1);
    let case = f.machine.open_case(event.id, "u").await.unwrap();

    let err = f.machine.approve(case.id, 5).await.unwrap_err();
    assert_matches!(
        err,
        CoreError::InvalidStateForTransition {
            required: CaseState::Requested,
            actual: CaseState::Draft,
            ..
        }
    );
    assert!(f.machine.get_history(case.id).await.unwrap().is_empty());

    f.machine.submit_request(case.id, &payload(1, 1), None).await.unwrap();
    f.machine.approve(case.id, 5).await.unwrap();

    for attempt in [
        f.machine.approve(case.id, 6).await,
        f.machine.reject(case.id, 6, None).await,
    ] {
        assert_matches!(
            attempt,
            Err(CoreError::InvalidStateForTransition { actual: CaseState::Accepted, .. })
        );
    }
    assert_eq!(f.machine.get_history(case.id).await.unwrap().len(), 2);
    assert_mirrored(&f, case.id).await;
}

#[tokio::test]
async fn decisions_on_withdrawn_request_fail_until_resubmitted() {
    let f = fixture();
    let event = f.event("E1", 1, 1);
    let case = f.machine.open_case(event.id, "u").await.unwrap();
    f.machine.submit_request(case.id, &payload(1, 1), None).await.unwrap();
    f.machine.withdraw_request(case.id).await.unwrap();

    assert_matches!(
        f.machine.approve(case.id, 9).await,
        Err(CoreError::NoActiveRequest(id)) if id == case.id
    );
    assert_matches!(
        f.machine.reject(case.id, 9, Some("late".to_string())).await,
        Err(CoreError::NoActiveRequest(_))
    );
    let current = f.store.find_case(case.id).await.unwrap().unwrap();
    assert_eq!(current.state, CaseState::Requested);
    assert!(current.comment.is_none());
    assert_eq!(f.machine.get_history(case.id).await.unwrap().len(), 1);
    assert_mirrored(&f, case.id).await;

    f.machine.submit_request(case.id, &payload(1, 1), None).await.unwrap();
    let case = f.machine.approve(case.id, 9).await.unwrap();
    assert_eq!(case.state, CaseState::Accepted);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_approvals_have_exactly_one_winner() {
    let f = fixture();
    let event = f.event("E1", 1, 1);
    let case = f.machine.open_case(event.id, "u").await.unwrap();
    f.machine.submit_request(case.id, &payload(1, 1), None).await.unwrap();

    let machine = Arc::new(f.machine.clone());
    let handles: Vec<_> = (0..8)
        .map(|user| {
            let machine = Arc::clone(&machine);
            tokio::spawn(async move { machine.approve(case.id, user).await })
        })
        .collect();

    let mut ok = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => ok += 1,
            Err(CoreError::InvalidStateForTransition { .. }) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(ok, 1);
    assert_eq!(conflicts, 7);
    let history = f.machine.get_history(case.id).await.unwrap();
    assert_eq!(
        history.iter().filter(|e| e.stage == WorkflowStage::DtmReview).count(),
        1
    );
}

// ---------------------------------------------------------------------------
// attach_artifact / history
// ---------------------------------------------------------------------------

#[tokio::test]
async fn attach_artifact_replaces_url_without_changing_state() {
    let f = fixture();
    let event = f.event("E1", 1, 1);
    let case = f.machine.open_case(event.id, "u").await.unwrap();

    f.machine
        .attach_artifact(case.id, ArtifactKind::Dtm, "https://files/dtm-1.pdf")
        .await
        .unwrap();
    let case = f
        .machine
        .attach_artifact(case.id, ArtifactKind::Dtm, "https://files/dtm-2.pdf")
        .await
        .unwrap();

    assert_eq!(case.dtm_url.as_deref(), Some("https://files/dtm-2.pdf"));
    assert_eq!(case.state, CaseState::Draft);
    assert!(f.machine.get_history(case.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn history_of_unknown_case_fails() {
    let f = fixture();
    assert_matches!(f.machine.get_history(3).await, Err(CoreError::CaseNotFound(3)));
}

mod common;

use common::{
    centered_face, matched, ready_state, sample_frame, temp_store, Reply, StubAnalyzer,
};
use faceguard::protocol::AnalysisResponse;
use faceguard::{Enroller, FaceGuardError, IdentityStore, VerificationOutcome, Verifier};

#[test]
fn service_rejection_without_candidate_logs_nothing() {
    let analyzer = StubAnalyzer::always(Reply::Ok(AnalysisResponse {
        face_detected: true,
        success: Some(false),
        message: Some("no match".into()),
        ..Default::default()
    }));
    let (store, _tmp) = temp_store();
    store.create_identity("Alice").unwrap();

    let outcome = Verifier::new(&analyzer, &store).verify(&sample_frame()).unwrap();

    assert!(!outcome.is_verified());
    assert_eq!(outcome.message(), "no match");
    assert!(store.login_attempts().unwrap().is_empty());
}

#[test]
fn confident_match_logs_an_attempt_and_advances_last_login() {
    let (store, _tmp) = temp_store();
    for name in ["a", "b", "c", "d", "e", "f", "Grace"] {
        store.create_identity(name).unwrap();
    }
    let earlier = store.log_login_attempt(7, true, 0.8).unwrap().occurred_at;
    std::thread::sleep(std::time::Duration::from_millis(10));
    let analyzer = StubAnalyzer::always(Reply::Ok(matched(7, "Grace", 0.92, true)));

    let outcome = Verifier::new(&analyzer, &store).verify(&sample_frame()).unwrap();

    match &outcome {
        VerificationOutcome::Verified { user, attempt, message } => {
            assert_eq!(user.id, 7);
            assert_eq!(message, "Welcome back, Grace!");
            assert!(attempt.success);
            assert_eq!(attempt.confidence, 0.92);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let attempts = store.login_attempts().unwrap();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[1].identity_id, 7);
    assert_eq!(attempts[1].confidence, 0.92);

    let grace = store.identity_profile(7).unwrap();
    let last_login = grace.identity.last_login_at.unwrap();
    assert!(last_login > earlier);
    assert_eq!(last_login, attempts[1].occurred_at);
    assert_eq!(grace.successful_logins, 2);
}

#[test]
fn weak_candidate_logs_a_failed_attempt() {
    let (store, _tmp) = temp_store();
    let alice = store.create_identity("Alice").unwrap();
    let analyzer = StubAnalyzer::always(Reply::Ok(matched(alice.id, "Alice", 0.41, false)));

    let outcome = Verifier::new(&analyzer, &store).verify(&sample_frame()).unwrap();

    match outcome {
        VerificationOutcome::Rejected { message, attempt: Some(attempt) } => {
            assert_eq!(message, "Face not recognized");
            assert!(!attempt.success);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let profile = store.identity_profile(alice.id).unwrap();
    assert_eq!(profile.identity.last_login_at, None);
    assert_eq!((profile.total_logins, profile.successful_logins), (1, 0));
}

#[test]
fn unreachable_service_logs_nothing() {
    let analyzer = StubAnalyzer::always(Reply::Unreachable);
    let (store, _tmp) = temp_store();

    let err = Verifier::new(&analyzer, &store).verify(&sample_frame()).unwrap_err();
    assert!(matches!(err, FaceGuardError::ServiceUnreachable(_)));
    assert!(store.login_attempts().unwrap().is_empty());
}

#[test]
fn match_without_success_flag_counts_as_verified() {
    let (store, _tmp) = temp_store();
    let alice = store.create_identity("Alice").unwrap();
    let analyzer = StubAnalyzer::always(Reply::Ok(AnalysisResponse {
        success: None,
        ..matched(alice.id, "Alice", 0.95, true)
    }));

    let outcome = Verifier::new(&analyzer, &store).verify(&sample_frame()).unwrap();

    assert!(outcome.is_verified(), "{outcome:?}");
    assert_eq!(outcome.message(), "Welcome back, Alice!");
    let attempts = store.login_attempts().unwrap();
    assert_eq!(attempts.len(), 1);
    assert!(attempts[0].success);
    assert!(store.identity_profile(alice.id).unwrap().identity.last_login_at.is_some());
}

#[test]
fn freshly_enrolled_identity_verifies_right_away() {
    let (store, _tmp) = temp_store();
    // First identity in an empty store gets id 1
    let analyzer = StubAnalyzer::scripted(
        vec![Reply::Ok(centered_face()), Reply::Ok(matched(1, "Alice", 0.97, true))],
        Reply::Ok(AnalysisResponse::default()),
    );

    let enrolled = Enroller::new(&analyzer, &store)
        .enroll("Alice", &sample_frame(), &ready_state())
        .unwrap();
    let outcome = Verifier::new(&analyzer, &store).verify(&sample_frame()).unwrap();

    match outcome {
        VerificationOutcome::Verified { user, attempt, .. } => {
            assert_eq!(user.id, enrolled.identity.id);
            assert_eq!(attempt.identity_id, enrolled.identity.id);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(analyzer.registrations(), 1);
    assert_eq!(store.login_attempts().unwrap().len(), 1);
}

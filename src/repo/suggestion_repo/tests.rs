use super::*;
use crate::gate::PlanAdjustment;
use crate::models::AdjustmentAction;
use crate::repo::{create_event_with_sessions, get_session, list_sessions_for_event, save_session};
use crate::test_utils::{event_fixture, fixed_now, session_fixture, setup_test_db};
use serde_json::json;

fn shorten(target: &str) -> PlanAdjustment {
    PlanAdjustment {
        action: AdjustmentAction::Shorten,
        target: target.to_string(),
        new_duration_minutes: Some(25),
        new_focus_mode: None,
        new_position: None,
        reason: None,
    }
}

fn seeded() -> (std::sync::Arc<DbPool>, crate::models::Event, Session, AdjustmentSuggestion) {
    let pool = setup_test_db();
    let event = event_fixture("alice", fixed_now(), 7, 10.0);
    let session = session_fixture(&event, fixed_now().date_naive(), 18, 40, "Vectors");
    create_event_with_sessions(&pool, &event, std::slice::from_ref(&session)).unwrap();
    let suggestion = AdjustmentSuggestion::new(
        &event.get_id(),
        "alice",
        "tasks_overrunning",
        json!({"triggers": ["tasks_overrunning"]}),
        &[shorten("Vectors")],
        "Sessions run long",
        fixed_now(),
    )
    .unwrap();
    create_suggestion(&pool, &suggestion).unwrap();
    (pool, event, session, suggestion)
}

#[test]
fn test_list_and_filter_suggestions() {
    let (pool, _event, _session, suggestion) = seeded();

    let pending = list_suggestions(&pool, "alice", Some(SuggestionStatus::Pending)).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].get_id(), suggestion.get_id());

    reject_suggestion(&pool, &suggestion.get_id(), fixed_now(), "not now").unwrap();
    assert!(list_suggestions(&pool, "alice", Some(SuggestionStatus::Pending)).unwrap().is_empty());
    assert_eq!(list_suggestions(&pool, "alice", None).unwrap().len(), 1);
    assert!(list_suggestions(&pool, "bob", None).unwrap().is_empty());
}

#[test]
fn test_pending_duplicate_detection() {
    let (pool, event, _session, suggestion) = seeded();
    assert!(pending_suggestion_exists(&pool, &event.get_id(), "tasks_overrunning").unwrap());
    assert!(!pending_suggestion_exists(&pool, &event.get_id(), "tasks_skipped").unwrap());

    reject_suggestion(&pool, &suggestion.get_id(), fixed_now(), "").unwrap();
    assert!(!pending_suggestion_exists(&pool, &event.get_id(), "tasks_overrunning").unwrap());
}

#[test]
fn test_accept_applies_changes_once() {
    let (pool, event, session, suggestion) = seeded();
    let mut shortened = session.clone();
    shortened.set_duration_minutes(25);
    let extra = session_fixture(&event, fixed_now().date_naive(), 20, 30, "Vectors part two");

    assert!(accept_suggestion(&pool, &suggestion.get_id(), fixed_now(), "ok", &[shortened.clone()], &[extra.clone()]).unwrap());
    // second acceptance is a no-op
    assert!(!accept_suggestion(&pool, &suggestion.get_id(), fixed_now(), "ok", &[shortened], &[extra]).unwrap());

    let sessions = list_sessions_for_event(&pool, &event.get_id()).unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].get_duration_minutes(), 25);

    let stored = get_suggestion(&pool, "alice", &suggestion.get_id()).unwrap().unwrap();
    assert_eq!(stored.get_status(), SuggestionStatus::Accepted);
    assert_eq!(stored.get_user_notes(), "ok");
    assert!(stored.get_reviewed_at().is_some());
}

#[test]
fn test_accept_rolls_back_when_session_moved_on() {
    let (pool, _event, session, suggestion) = seeded();
    let mut started = session.clone();
    started.begin(fixed_now()).unwrap();
    save_session(&pool, &started, SessionStatus::Pending).unwrap();

    let mut shortened = session.clone();
    shortened.set_duration_minutes(25);
    let err = accept_suggestion(&pool, &suggestion.get_id(), fixed_now(), "", &[shortened], &[]).unwrap_err();
    assert!(err.downcast_ref::<WriteConflict>().is_some());

    let stored = get_suggestion(&pool, "alice", &suggestion.get_id()).unwrap().unwrap();
    assert!(stored.is_pending());
    let unchanged = get_session(&pool, "alice", &session.get_id()).unwrap().unwrap();
    assert_eq!(unchanged.get_duration_minutes(), 40);
}

#[test]
fn test_reject_twice_is_noop() {
    let (pool, _event, _session, suggestion) = seeded();
    assert!(reject_suggestion(&pool, &suggestion.get_id(), fixed_now(), "first").unwrap());
    assert!(!reject_suggestion(&pool, &suggestion.get_id(), fixed_now(), "second").unwrap());
    let stored = get_suggestion(&pool, "alice", &suggestion.get_id()).unwrap().unwrap();
    assert_eq!(stored.get_user_notes(), "first");
}

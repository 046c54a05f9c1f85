use super::*;
use crate::errors::EngineError;
use crate::models::{EventUpdate, SessionStatus};
use crate::test_utils::{fixed_now, new_event_fixture, offline_engine, plan_fixture, test_engine};
use chrono::{Duration, NaiveDate, NaiveTime};
use serde_json::json;

fn today() -> NaiveDate {
    fixed_now().date_naive()
}

fn sorted_ids(sessions: &[crate::models::Session]) -> Vec<String> {
    let mut ids: Vec<String> = sessions.iter().map(|s| s.get_id()).collect();
    ids.sort();
    ids
}

fn at(hour: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, 0, 0).unwrap()
}

#[tokio::test]
async fn test_create_event_materializes_mock_plan() {
    let t = test_engine(fixed_now());
    let planned = t
        .engine
        .create_event("alice", new_event_fixture("Algebra Final", fixed_now(), 7, 6.0))
        .await
        .unwrap();

    assert_eq!(planned.source, Some(PlanSource::Advisor));
    assert_eq!(planned.sessions.len(), 12);
    for (i, session) in planned.sessions.iter().enumerate() {
        assert!((25..=45).contains(&session.get_duration_minutes()));
        assert!(session.get_suggested_content().starts_with(&format!("Task {}/12:", i + 1)));
        assert!(session.get_date() >= today() && session.get_date() <= today() + Duration::days(6));
    }

    let stored = t.engine.event_sessions("alice", &planned.event.get_id()).unwrap();
    assert_eq!(stored.len(), 12);
}

#[tokio::test]
async fn test_offline_event_uses_fallback() {
    let t = offline_engine(fixed_now());
    let planned = t
        .engine
        .create_event("alice", new_event_fixture("Quiz", fixed_now(), 5, 2.0))
        .await
        .unwrap();

    assert_eq!(planned.source, Some(PlanSource::Fallback));
    assert_eq!(planned.sessions.len(), 4);
    for (i, session) in planned.sessions.iter().enumerate() {
        assert_eq!(session.get_duration_minutes(), 25);
        assert_eq!(session.get_date(), today() + Duration::days(i as i64));
        assert_eq!(session.get_start_time(), at(18));
        assert_eq!(session.get_suggested_content(), format!("Study session {} of 4", i + 1));
    }
    assert_eq!(t.provider.call_count(), 0);
}

#[tokio::test]
async fn test_past_event_uses_default_horizon() {
    let t = test_engine(fixed_now());
    let plan = serde_json::to_string(&plan_fixture(&[45, 45, 45, 45])).unwrap();
    t.provider.queue_response(plan);

    let planned = t
        .engine
        .create_event("alice", new_event_fixture("Lab Report", fixed_now(), -1, 4.0))
        .await
        .unwrap();

    let days: Vec<NaiveDate> = planned.sessions.iter().map(|s| s.get_date()).collect();
    let expected: Vec<NaiveDate> = (0..4).map(|d| today() + Duration::days(d)).collect();
    assert_eq!(days, expected);
    assert!(planned.sessions.iter().all(|s| s.get_start_time() == at(18)));
}

#[tokio::test]
async fn test_unplaceable_plan_falls_back() {
    let t = test_engine(fixed_now());
    t.engine.set_preferences("alice", Some(30), None, None).unwrap();

    let planned = t
        .engine
        .create_event("alice", new_event_fixture("Quiz", fixed_now(), 5, 2.0))
        .await
        .unwrap();
    assert_eq!(planned.source, Some(PlanSource::Fallback));
    assert!(planned.sessions.iter().all(|s| s.get_duration_minutes() == 25));
}

#[tokio::test]
async fn test_offline_fallback_fits_small_capacity() {
    let t = offline_engine(fixed_now());
    t.engine.set_preferences("alice", Some(30), None, None).unwrap();

    let planned = t
        .engine
        .create_event("alice", new_event_fixture("Thesis Defense", fixed_now(), 5, 6.0))
        .await
        .unwrap();
    assert_eq!(planned.source, Some(PlanSource::Fallback));
    assert_eq!(planned.sessions.len(), 12);
    assert!(planned.sessions.iter().all(|s| s.get_duration_minutes() == 30));

    let mut per_day = std::collections::HashMap::new();
    for session in &planned.sessions {
        *per_day.entry(session.get_date()).or_insert(0) += session.get_duration_minutes();
    }
    assert!(per_day.values().all(|minutes| *minutes <= 30));
    assert_eq!(t.engine.event_sessions("alice", &planned.event.get_id()).unwrap().len(), 12);
}

#[tokio::test]
async fn test_rejected_plan_falls_back() {
    let t = test_engine(fixed_now());
    t.provider.queue_response(json!({"goal_summary": "", "tasks": []}).to_string());

    let planned = t
        .engine
        .create_event("alice", new_event_fixture("Quiz", fixed_now(), 5, 2.0))
        .await
        .unwrap();
    assert_eq!(planned.source, Some(PlanSource::Fallback));
}

#[tokio::test]
async fn test_invalid_event_stores_nothing() {
    let t = test_engine(fixed_now());
    let err = t
        .engine
        .create_event("alice", new_event_fixture("Quiz", fixed_now(), 5, 0.0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvariantViolation(_)));
    assert!(t.engine.events("alice").unwrap().is_empty());
}

#[tokio::test]
async fn test_priority_change_keeps_sessions() {
    let t = test_engine(fixed_now());
    let planned = t
        .engine
        .create_event("alice", new_event_fixture("Algebra Final", fixed_now(), 7, 6.0))
        .await
        .unwrap();
    let event_id = planned.event.get_id();

    let update = EventUpdate {
        priority: Some(crate::models::Level::Low),
        ..EventUpdate::default()
    };
    let outcome = t.engine.update_event("alice", &event_id, update).await.unwrap();
    assert_eq!(outcome.source, None);

    let stored = t.engine.event_sessions("alice", &event_id).unwrap();
    assert_eq!(sorted_ids(&stored), sorted_ids(&planned.sessions));
}

#[tokio::test]
async fn test_identical_update_keeps_pending_sessions() {
    let t = test_engine(fixed_now());
    let planned = t
        .engine
        .create_event("alice", new_event_fixture("Algebra Final", fixed_now(), 7, 6.0))
        .await
        .unwrap();
    let event_id = planned.event.get_id();

    let update = EventUpdate {
        title: Some("Algebra Final".to_string()),
        prep_hours: Some(6.0),
        ..EventUpdate::default()
    };
    t.engine.update_event("alice", &event_id, update).await.unwrap();
    let mut stored = t.engine.event_sessions("alice", &event_id).unwrap();
    let mut expected = planned.sessions.clone();
    stored.sort_by_key(|s| s.get_id());
    expected.sort_by_key(|s| s.get_id());
    assert_eq!(stored, expected);
}

#[tokio::test]
async fn test_budget_change_regenerates_only_pending() {
    let t = test_engine(fixed_now());
    let planned = t
        .engine
        .create_event("alice", new_event_fixture("Algebra Final", fixed_now(), 7, 6.0))
        .await
        .unwrap();
    let event_id = planned.event.get_id();
    let first = planned.sessions[0].get_id();
    t.engine.start_session("alice", &first).await.unwrap();
    t.clock.advance(Duration::minutes(30));
    t.engine.complete_session("alice", &first, None).await.unwrap();

    let update = EventUpdate {
        prep_hours: Some(8.0),
        ..EventUpdate::default()
    };
    let outcome = t.engine.update_event("alice", &event_id, update).await.unwrap();
    assert_eq!(outcome.removed, 11);
    assert_eq!(outcome.sessions.len(), 12);

    let stored = t.engine.event_sessions("alice", &event_id).unwrap();
    assert_eq!(stored.len(), 13);
    let kept = stored.iter().find(|s| s.get_id() == first).unwrap();
    assert_eq!(kept.get_status(), SessionStatus::Completed);
}

#[tokio::test]
async fn test_forced_replan_skips_cache() {
    let t = test_engine(fixed_now());
    let planned = t
        .engine
        .create_event("alice", new_event_fixture("Algebra Final", fixed_now(), 7, 6.0))
        .await
        .unwrap();
    let event_id = planned.event.get_id();

    t.engine.replan_event("alice", &event_id, false).await.unwrap();
    assert_eq!(t.provider.call_count(), 1);
    let replanned = t.engine.replan_event("alice", &event_id, true).await.unwrap();
    assert_eq!(t.provider.call_count(), 2);
    assert_eq!(replanned.removed, 12);
    assert_eq!(t.engine.event_sessions("alice", &event_id).unwrap().len(), 12);
}

#[tokio::test]
async fn test_other_owner_cannot_touch_event() {
    let t = test_engine(fixed_now());
    let planned = t
        .engine
        .create_event("alice", new_event_fixture("Algebra Final", fixed_now(), 7, 6.0))
        .await
        .unwrap();
    let event_id = planned.event.get_id();

    assert!(matches!(t.engine.delete_event("bob", &event_id), Err(EngineError::NotFound)));
    assert!(matches!(
        t.engine.replan_event("bob", &event_id, false).await,
        Err(EngineError::NotFound)
    ));
    t.engine.delete_event("alice", &event_id).unwrap();
    assert!(matches!(t.engine.event("alice", &event_id), Err(EngineError::NotFound)));
}

// ============================================================================
// Placement
// ============================================================================

#[test]
fn test_slot_start_stagger_and_cap() {
    assert_eq!(slot_start(0), at(18));
    assert_eq!(slot_start(1), at(20));
    assert_eq!(slot_start(2), at(22));
    assert_eq!(slot_start(7), at(22));
}

#[test]
fn test_horizon_defaults_for_past_events() {
    assert_eq!(horizon_days(today(), today() + Duration::days(5)), 5);
    assert_eq!(horizon_days(today(), today()), DEFAULT_HORIZON_DAYS);
    assert_eq!(horizon_days(today(), today() - Duration::days(3)), DEFAULT_HORIZON_DAYS);
}

#[test]
fn test_sessions_per_day_formula() {
    assert_eq!(sessions_per_day(440, 7, 480), 1);
    assert_eq!(sessions_per_day(600, 2, 480), 7);
    assert_eq!(sessions_per_day(600, 2, 100), 2);
    assert_eq!(sessions_per_day(30, 10, 480), 1);
}

#[test]
fn test_place_sessions_round_robin() {
    let placements = place_sessions(&[30, 30, 30, 30, 30], 2, 2, 480).unwrap();
    let pairs: Vec<(i64, u32)> = placements.iter().map(|p| (p.day, p.slot)).collect();
    assert_eq!(pairs, vec![(0, 0), (0, 1), (1, 0), (1, 1), (0, 2)]);
}

#[test]
fn test_place_sessions_extends_horizon_when_full() {
    let placements = place_sessions(&[60, 60, 60], 1, 1, 60).unwrap();
    let days: Vec<i64> = placements.iter().map(|p| p.day).collect();
    assert_eq!(days, vec![0, 1, 2]);
}

#[test]
fn test_place_sessions_rejects_impossible_input() {
    assert!(matches!(place_sessions(&[], 3, 1, 480), Err(EngineError::ScheduleInfeasible(_))));
    assert!(matches!(place_sessions(&[45], 3, 1, 30), Err(EngineError::ScheduleInfeasible(_))));
    assert!(matches!(place_sessions(&[90], 3, 1, 480), Err(EngineError::ScheduleInfeasible(_))));
}

#[test]
fn test_fallback_sizes() {
    assert_eq!((fallback_duration(120), fallback_count(120)), (25, 4));
    assert_eq!((fallback_duration(240), fallback_count(240)), (45, 5));
    assert_eq!((fallback_duration(600), fallback_count(600)), (60, 10));
    assert_eq!((fallback_duration(10), fallback_count(10)), (25, 1));
}

#[test]
fn test_fallback_size_respects_capacity() {
    assert_eq!(fallback_size(360, 480), (60, 6));
    assert_eq!(fallback_size(360, 30), (30, 12));
    assert_eq!(fallback_size(240, 20), (20, 12));
    assert_eq!(fallback_size(100, 30), (25, 4));
    assert_eq!(fallback_size(10, 20), (20, 1));
}

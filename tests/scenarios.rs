//! End-to-end scenarios over the public engine API

mod common;

use chrono::{Duration, NaiveTime};
use common::{exam, harness, now, plan_json, run_session, seed_event};
use studyflow::models::{Level, MoodLevels, NewQuestion, SessionStatus, SuggestionStatus};
use studyflow::planner::PlanSource;

fn at(hour: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, 0, 0).unwrap()
}

#[tokio::test]
async fn test_exam_plan_spreads_twelve_tasks_over_the_week() {
    let h = harness(true);
    let planned = h.engine.create_event("alice", exam("Algebra Final", 7, 6.0)).await.unwrap();

    assert_eq!(planned.source, Some(PlanSource::Advisor));
    assert_eq!(planned.sessions.len(), 12);
    let today = now().date_naive();
    for (k, session) in planned.sessions.iter().enumerate() {
        assert!((25..=45).contains(&session.get_duration_minutes()));
        assert!(session.get_date() >= today && session.get_date() <= today + Duration::days(6));
        let first_line = session.get_suggested_content();
        assert!(first_line.starts_with(&format!("Task {}/12:", k + 1)));
        assert_eq!(session.get_status(), SessionStatus::Pending);
    }

    let events = h.engine.events("alice").unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].get_title(), "Algebra Final");
}

#[tokio::test]
async fn test_offline_event_gets_daily_fallback_sessions() {
    let h = harness(false);
    let planned = h.engine.create_event("alice", exam("Quiz", 5, 2.0)).await.unwrap();

    assert_eq!(planned.source, Some(PlanSource::Fallback));
    assert_eq!(planned.sessions.len(), 4);
    for (day, session) in planned.sessions.iter().enumerate() {
        assert_eq!(session.get_duration_minutes(), 25);
        assert_eq!(session.get_date(), now().date_naive() + Duration::days(day as i64));
    }
    assert_eq!(h.provider.call_count(), 0);
}

#[tokio::test]
async fn test_past_event_is_planned_over_default_week() {
    let h = harness(true);
    h.provider.queue_response(plan_json(&[30, 30, 30, 30]));

    let planned = h.engine.create_event("alice", exam("Lab Report", -1, 4.0)).await.unwrap();

    assert_eq!(planned.source, Some(PlanSource::Advisor));
    let schedule: Vec<_> = planned.sessions.iter().map(|s| (s.get_date(), s.get_start_time())).collect();
    let expected: Vec<_> = (0..4).map(|d| (now().date_naive() + Duration::days(d), at(18))).collect();
    assert_eq!(schedule, expected);
}

#[tokio::test]
async fn test_overrunning_sessions_fire_once() {
    let h = harness(true);
    let (event, sessions) = seed_event(&h, "alice", 10, &[(0, 18, 50), (1, 18, 50), (2, 18, 50), (3, 18, 50)]);

    for (session, actual) in sessions.iter().zip([60, 66, 62, 70]) {
        let update = run_session(&h, "alice", &session.get_id(), actual).await;
        assert_eq!(update.session.get_actual_duration_minutes(), Some(actual as i32));
    }

    let pending = h.engine.suggestions("alice", Some(SuggestionStatus::Pending)).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].get_triggered_by(), "tasks_overrunning");
    assert_eq!(pending[0].get_event_id(), event.get_id());

    let progress = h.engine.event_progress("alice", &event.get_id()).unwrap();
    assert_eq!(progress.completed, 4);
    assert_eq!(progress.completion_percentage, 100);
}

#[tokio::test]
async fn test_drained_mood_caps_todays_sessions() {
    let h = harness(true);
    let (event, _) = seed_event(&h, "alice", 10, &[(0, 18, 45), (0, 20, 50), (0, 22, 60), (1, 18, 60)]);

    let levels = MoodLevels {
        energy: Level::Low,
        stress: Level::High,
        focus: Level::Low,
    };
    let logged = h.engine.log_mood("alice", levels, "after lectures", None).await.unwrap();

    assert!(logged.stored);
    assert_eq!(logged.adjusted.len(), 3);
    assert!(logged.adjusted.iter().all(|s| s.get_duration_minutes() == 20));

    let stored = h.engine.event_sessions("alice", &event.get_id()).unwrap();
    let today = now().date_naive();
    for session in &stored {
        if session.get_date() == today {
            assert_eq!(session.get_duration_minutes(), 20);
            assert!(session.get_suggested_content().contains("[Adjusted for "));
        } else {
            assert_eq!(session.get_duration_minutes(), 60);
        }
    }

    assert_eq!(logged.suggestions.len(), 1);
    assert_eq!(logged.suggestions[0].get_triggered_by(), "high_stress+low_energy+low_focus");

    let again = h.engine.log_mood("alice", levels, "evening", None).await.unwrap();
    assert!(!again.stored);
    assert!(again.notice.is_some());
}

#[tokio::test]
async fn test_diagnostic_finds_dominant_topic() {
    let h = harness(false);
    let planned = h.engine.create_event("alice", exam("Mechanics", 7, 4.0)).await.unwrap();
    let test = h.engine.create_diagnostic("alice", &planned.event.get_id(), None).unwrap();

    let answers = [
        ("Dynamics", "4", "2"),
        ("Units", "N", "N"),
        ("Dynamics", "9.8", "10"),
        ("Units", "J", "W"),
        ("Kinematics", "3", "3"),
    ];
    for (topic, correct, given) in answers {
        let question = NewQuestion {
            question_number: None,
            question_text: format!("A {topic} question"),
            correct_answer: correct.to_string(),
            user_answer: given.to_string(),
            topic: topic.to_string(),
        };
        h.engine.add_question("alice", &test.get_id(), question).unwrap();
    }

    let outcome = h.engine.analyze_diagnostic("alice", &test.get_id()).await.unwrap();
    assert!(!outcome.enriched);
    assert_eq!(outcome.analysis.total_questions, 5);
    assert_eq!(outcome.analysis.incorrect, 3);
    assert_eq!(outcome.analysis.score_percentage, 40);
    assert_eq!(outcome.analysis.dominant_error_topic.as_deref(), Some("Dynamics"));

    let report = h.engine.show_diagnostic("alice", &test.get_id()).unwrap();
    assert_eq!(report.questions.len(), 5);
    assert!(report.analysis.is_some());
}

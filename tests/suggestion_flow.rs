//! Suggestions raised by check-ins and diagnostics, then reviewed

mod common;

use common::{harness, seed_event};
use studyflow::EngineError;
use studyflow::models::{Level, MoodLevels, NewQuestion, SessionStatus, SuggestionStatus};

fn pending_minutes(h: &common::Harness, event_id: &str) -> Vec<i32> {
    h.engine
        .event_sessions("alice", event_id)
        .unwrap()
        .iter()
        .filter(|s| s.get_status() == SessionStatus::Pending)
        .map(|s| s.get_duration_minutes())
        .collect()
}

#[tokio::test]
async fn test_stressed_check_in_suggestion_is_accepted() {
    let h = harness(true);
    let (event, _) = seed_event(&h, "alice", 10, &[(1, 18, 45), (2, 18, 45)]);

    let levels = MoodLevels {
        energy: Level::Medium,
        stress: Level::High,
        focus: Level::Medium,
    };
    let logged = h.engine.log_mood("alice", levels, "deadline week", None).await.unwrap();
    assert!(logged.adjusted.is_empty());
    assert_eq!(logged.suggestions.len(), 1);

    let suggestion = &logged.suggestions[0];
    assert_eq!(suggestion.get_triggered_by(), "high_stress");
    assert!(suggestion.is_pending());
    assert!(h.provider.prompts().iter().any(|p| p.contains("plan_adjustment")));
    assert_eq!(pending_minutes(&h, &event.get_id()), vec![45, 45]);

    let accepted = h.engine.accept_suggestion("alice", &suggestion.get_id(), "thanks").unwrap();
    assert_eq!(accepted.get_status(), SuggestionStatus::Accepted);
    assert!(accepted.get_reviewed_at().is_some());

    assert_eq!(pending_minutes(&h, &event.get_id()), vec![25, 45]);
    let sessions = h.engine.event_sessions("alice", &event.get_id()).unwrap();
    assert!(sessions.iter().all(|s| s.get_focus_mode().as_deref() == Some("Pomodoro")));
    assert!(h.engine.suggestions("alice", Some(SuggestionStatus::Pending)).unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_diagnostic_suggestion_is_rejected() {
    let h = harness(true);
    let (event, _) = seed_event(&h, "alice", 10, &[(1, 18, 45), (2, 18, 45)]);
    let test = h.engine.create_diagnostic("alice", &event.get_id(), Some("Warm-up")).unwrap();
    for (topic, given) in [("Dynamics", "1"), ("Dynamics", "2"), ("Units", "kg")] {
        let question = NewQuestion {
            question_number: None,
            question_text: format!("{topic}?"),
            correct_answer: "x".to_string(),
            user_answer: given.to_string(),
            topic: topic.to_string(),
        };
        h.engine.add_question("alice", &test.get_id(), question).unwrap();
    }

    let outcome = h.engine.analyze_diagnostic("alice", &test.get_id()).await.unwrap();
    assert!(outcome.enriched);
    assert_eq!(outcome.analysis.score_percentage, 0);
    let suggestion = outcome.suggestion.expect("a low score raises a suggestion");
    assert_eq!(suggestion.get_triggered_by(), "low_diagnostic_score");

    let rejected = h.engine.reject_suggestion("alice", &suggestion.get_id(), "I'll review on my own").unwrap();
    assert_eq!(rejected.get_status(), SuggestionStatus::Rejected);
    assert_eq!(rejected.get_user_notes(), "I'll review on my own");
    assert_eq!(pending_minutes(&h, &event.get_id()), vec![45, 45]);

    let reviewed = h.engine.suggestions("alice", Some(SuggestionStatus::Rejected)).unwrap();
    assert_eq!(reviewed.len(), 1);
}

#[tokio::test]
async fn test_suggestions_are_private_to_their_owner() {
    let h = harness(true);
    seed_event(&h, "alice", 10, &[(1, 18, 45)]);
    let levels = MoodLevels {
        energy: Level::Low,
        stress: Level::Medium,
        focus: Level::Medium,
    };
    let logged = h.engine.log_mood("alice", levels, "", None).await.unwrap();
    let suggestion = &logged.suggestions[0];

    assert!(h.engine.suggestions("bob", None).unwrap().is_empty());
    assert!(matches!(h.engine.suggestion("bob", &suggestion.get_id()), Err(EngineError::NotFound)));
    assert!(matches!(
        h.engine.accept_suggestion("bob", &suggestion.get_id(), ""),
        Err(EngineError::NotFound)
    ));
    assert!(h.engine.suggestion("alice", &suggestion.get_id()).unwrap().is_pending());
}

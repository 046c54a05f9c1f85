//! Common test utilities for studyflow integration tests
//!
//! Every helper builds an engine over its own shared-cache in-memory
//! database, the mock advisor and a frozen clock, so tests are isolated and
//! deterministic.

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use std::sync::Arc;
use studyflow::advisor::{AdvisorClient, AdvisorSettings, MockProvider, PromptTemplates};
use studyflow::clock::FixedClock;
use studyflow::db;
use studyflow::models::{Event, EventType, Level, NewEvent, Session};
use studyflow::repo;
use studyflow::tracker::SessionUpdate;
use studyflow::{EngineDefaults, StudyEngine};

pub struct Harness {
    pub engine: StudyEngine,
    pub provider: Arc<MockProvider>,
    pub clock: Arc<FixedClock>,
}

/// Saturday 2025-03-01 09:00 UTC
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
}

/// Creates an engine with the mock advisor switched on or off
///
/// ### Arguments
///
/// * `advisor_enabled` - Whether the advisor is consulted
pub fn harness(advisor_enabled: bool) -> Harness {
    let url = format!("file:it_{}?mode=memory&cache=shared", uuid::Uuid::new_v4());
    let pool = Arc::new(db::open(&url).expect("Failed to open test database"));
    let provider = Arc::new(MockProvider::new());
    let clock = Arc::new(FixedClock::new(now()));
    let settings = AdvisorSettings {
        enabled: advisor_enabled,
        ..AdvisorSettings::default()
    };
    let advisor = AdvisorClient::new(provider.clone(), PromptTemplates::builtin(), settings);
    let engine = StudyEngine::new(pool, advisor, clock.clone(), EngineDefaults::default());
    Harness { engine, provider, clock }
}

/// Fields of an exam `days_ahead` days from now
pub fn exam(title: &str, days_ahead: i64, prep_hours: f64) -> NewEvent {
    NewEvent {
        title: title.to_string(),
        event_type: EventType::Exam,
        event_date: now() + Duration::days(days_ahead),
        subject: "Physics".to_string(),
        priority: Level::High,
        prep_hours,
        description: None,
    }
}

/// A plan response with the given task durations, as the advisor would send it
#[allow(dead_code)]
pub fn plan_json(durations: &[i32]) -> String {
    let tasks: Vec<serde_json::Value> = durations
        .iter()
        .enumerate()
        .map(|(i, minutes)| {
            serde_json::json!({
                "title": format!("Topic {}", i + 1),
                "task_type": "practice",
                "suggested_duration_minutes": minutes,
                "difficulty": "medium",
                "cognitive_load": "medium",
            })
        })
        .collect();
    serde_json::json!({ "goal_summary": "Be ready", "tasks": tasks }).to_string()
}

/// Stores an event with one pending session per `(day offset, hour, minutes)`
///
/// Bypasses the planner so a test controls the exact schedule.
#[allow(dead_code)]
pub fn seed_event(h: &Harness, owner: &str, days_ahead: i64, slots: &[(i64, u32, i32)]) -> (Event, Vec<Session>) {
    let event = Event::new(owner, exam("Physics Midterm", days_ahead, 10.0), now()).expect("valid event");
    let today = now().date_naive();
    let sessions: Vec<Session> = slots
        .iter()
        .enumerate()
        .map(|(i, (day, hour, minutes))| {
            Session::new(
                &event.get_id(),
                owner,
                today + Duration::days(*day),
                NaiveTime::from_hms_opt(*hour, 0, 0).expect("valid hour"),
                *minutes,
                format!("Task {}/{}: Topic {}\n\nType: practice", i + 1, slots.len(), i + 1),
                now(),
            )
        })
        .collect();
    repo::create_event_with_sessions(h.engine.pool(), &event, &sessions).expect("Failed to seed event");
    (event, sessions)
}

/// Starts a session, lets `minutes` pass and completes it
#[allow(dead_code)]
pub async fn run_session(h: &Harness, owner: &str, session_id: &str, minutes: i64) -> SessionUpdate {
    h.engine.start_session(owner, session_id).await.expect("start");
    h.clock.advance(Duration::minutes(minutes));
    h.engine.complete_session(owner, session_id, None).await.expect("complete")
}

use crate::advisor::{AdvisorClient, AdvisorSettings, MockProvider, PromptTemplates};
use crate::clock::{Clock, FixedClock};
use crate::engine::{EngineDefaults, StudyEngine};
use crate::models::*;
use crate::gate::{LearningPlan, PlanTask};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use proptest::prelude::*;
use std::sync::Arc;

pub use crate::repo::tests::setup_test_db;

/// The instant most tests treat as "now": Saturday 2025-03-01 09:00 UTC
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
}

/// An engine over a fresh database, the mock advisor and a clock frozen at `now`
pub struct TestEngine {
    pub engine: StudyEngine,
    pub provider: Arc<MockProvider>,
    pub clock: Arc<FixedClock>,
}

pub fn test_engine(now: DateTime<Utc>) -> TestEngine {
    test_engine_with(now, AdvisorSettings::default())
}

/// Same as `test_engine` with the advisor switched off
pub fn offline_engine(now: DateTime<Utc>) -> TestEngine {
    test_engine_with(
        now,
        AdvisorSettings {
            enabled: false,
            ..AdvisorSettings::default()
        },
    )
}

fn test_engine_with(now: DateTime<Utc>, settings: AdvisorSettings) -> TestEngine {
    let provider = Arc::new(MockProvider::new());
    let clock = Arc::new(FixedClock::new(now));
    let advisor = AdvisorClient::new(provider.clone(), PromptTemplates::builtin(), settings);
    let engine = StudyEngine::new(setup_test_db(), advisor, clock.clone(), EngineDefaults::default());
    TestEngine { engine, provider, clock }
}

/// Fields of an exam `days_ahead` days after `now`
pub fn new_event_fixture(title: &str, now: DateTime<Utc>, days_ahead: i64, prep_hours: f64) -> NewEvent {
    NewEvent {
        title: title.to_string(),
        event_type: EventType::Exam,
        event_date: now + Duration::days(days_ahead),
        subject: "Physics".to_string(),
        priority: Level::High,
        prep_hours,
        description: None,
    }
}

/// Builds an exam `days_ahead` days after `now`
pub fn event_fixture(owner: &str, now: DateTime<Utc>, days_ahead: i64, prep_hours: f64) -> Event {
    Event::new(
        owner,
        NewEvent {
            title: "Physics Midterm".to_string(),
            event_type: EventType::Exam,
            event_date: now + Duration::days(days_ahead),
            subject: "Physics".to_string(),
            priority: Level::High,
            prep_hours,
            description: None,
        },
        now,
    )
    .unwrap()
}

/// Builds a pending session for `event` at `hour:00` on `date`
pub fn session_fixture(event: &Event, date: NaiveDate, hour: u32, duration: i32, title: &str) -> Session {
    Session::new(
        &event.get_id(),
        &event.get_owner(),
        date,
        NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
        duration,
        format!("Task 1/1: {title}\n\nType: practice"),
        fixed_now(),
    )
}

/// Stores an exam for `owner` with one pending session per day at 18:00
///
/// Sessions are titled `Topic 1`, `Topic 2`, ... in schedule order.
pub fn seed_event(engine: &StudyEngine, owner: &str, days_ahead: i64, durations: &[i32]) -> (Event, Vec<Session>) {
    let now = engine.clock().now();
    let event = event_fixture(owner, now, days_ahead, 10.0);
    let today = engine.clock().today();
    let sessions: Vec<Session> = durations
        .iter()
        .enumerate()
        .map(|(i, d)| session_fixture(&event, today + Duration::days(i as i64), 18, *d, &format!("Topic {}", i + 1)))
        .collect();
    crate::repo::create_event_with_sessions(engine.pool(), &event, &sessions).unwrap();
    (event, sessions)
}

/// Starts a session, lets `minutes` pass and completes it
pub async fn run_session(t: &TestEngine, owner: &str, session_id: &str, minutes: i64) -> crate::tracker::SessionUpdate {
    t.engine.start_session(owner, session_id).await.unwrap();
    t.clock.advance(Duration::minutes(minutes));
    t.engine.complete_session(owner, session_id, None).await.unwrap()
}

/// A plan with the given task durations
pub fn plan_fixture(durations: &[i32]) -> LearningPlan {
    LearningPlan {
        goal_summary: "Be ready".to_string(),
        tasks: durations
            .iter()
            .enumerate()
            .map(|(i, d)| PlanTask {
                title: format!("Topic {}", i + 1),
                task_type: TaskType::Practice,
                suggested_duration_minutes: *d,
                difficulty: Level::Medium,
                cognitive_load: Level::Medium,
                notes: None,
            })
            .collect(),
    }
}

// ============================================================================
// Strategies
// ============================================================================

/// Generates strings with whitespace, punctuation and non-ASCII characters
pub fn arb_messy_string() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 ._-]{0,24}",
        "\\PC{0,16}",
        Just(String::new()),
        Just("  padded  ".to_string()),
    ]
}

/// Generates an arbitrary DateTime<Utc> within 2020-01-01 to 2030-01-01
pub fn arb_datetime_utc() -> impl Strategy<Value = DateTime<Utc>> {
    (1_577_836_800i64..1_893_456_000i64)
        .prop_map(|ts| DateTime::from_timestamp(ts, 0).unwrap())
}

pub fn arb_level() -> impl Strategy<Value = Level> {
    prop_oneof![Just(Level::Low), Just(Level::Medium), Just(Level::High)]
}

pub fn arb_mood() -> impl Strategy<Value = MoodLevels> {
    (arb_level(), arb_level(), arb_level()).prop_map(|(energy, stress, focus)| MoodLevels { energy, stress, focus })
}

/// Generates a valid session duration in [20, 60]
pub fn arb_session_minutes() -> impl Strategy<Value = i32> {
    20i32..=60
}

/// Generates a list of valid task durations
pub fn arb_task_durations() -> impl Strategy<Value = Vec<i32>> {
    prop::collection::vec(arb_session_minutes(), 1..30)
}

/// Generates a daily capacity that fits at least one maximal session
pub fn arb_capacity() -> impl Strategy<Value = i32> {
    60i32..=600
}

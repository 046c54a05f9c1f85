use super::*;
use crate::gate::SESSION_MINUTES;
use crate::test_utils::{
    arb_capacity, arb_task_durations, event_fixture, fixed_now, new_event_fixture, offline_engine, plan_fixture,
};
use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use std::collections::HashMap;

proptest! {
    #[test]
    fn prop_materialized_sessions_respect_bounds(
        durations in arb_task_durations(),
        capacity in arb_capacity(),
        days_ahead in -3i64..30,
    ) {
        let now = fixed_now();
        let today = now.date_naive();
        let event = event_fixture("alice", now, days_ahead, 10.0);
        let plan = plan_fixture(&durations);

        let sessions = materialize_plan(&plan, &event, today, today + Duration::days(days_ahead), capacity, now).unwrap();
        prop_assert_eq!(sessions.len(), durations.len());

        let mut per_day: HashMap<NaiveDate, i32> = HashMap::new();
        for (session, planned) in sessions.iter().zip(&durations) {
            prop_assert!(SESSION_MINUTES.contains(&session.get_duration_minutes()));
            prop_assert_eq!(session.get_duration_minutes(), *planned);
            prop_assert!(session.get_date() >= today);
            *per_day.entry(session.get_date()).or_default() += session.get_duration_minutes();
        }
        for minutes in per_day.values() {
            prop_assert!(*minutes <= capacity);
        }
    }

    #[test]
    fn prop_fallback_matches_budget(prep_minutes in 20i64..2000, capacity in 20i32..=600) {
        let now = fixed_now();
        let today = now.date_naive();
        let event = event_fixture("alice", now, 5, prep_minutes as f64 / 60.0);

        let sessions = fallback_sessions(&event, today, today + Duration::days(5), capacity, now).unwrap();
        let (duration, count) = fallback_size(event.prep_minutes(), capacity);
        prop_assert!(duration <= capacity);
        prop_assert!(duration <= fallback_duration(event.prep_minutes()));
        prop_assert_eq!(sessions.len(), count);
        prop_assert!(sessions.iter().all(|s| s.get_duration_minutes() == duration));
        prop_assert!(sessions.len() as i64 * i64::from(duration) <= event.prep_minutes().max(i64::from(duration)));
    }

    #[test]
    fn prop_first_pass_fills_days_left_to_right(count in 1usize..7) {
        let placements = place_sessions(&vec![30; count], 7, 1, 480).unwrap();
        let days: Vec<i64> = placements.iter().map(|p| p.day).collect();
        prop_assert_eq!(days, (0..count as i64).collect::<Vec<_>>());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_created_event_stores_its_sessions(prep_hours in 1u32..12, days_ahead in 1i64..14) {
        let t = offline_engine(fixed_now());
        let fields = new_event_fixture("Essay", fixed_now(), days_ahead, f64::from(prep_hours));

        let planned = tokio_test::block_on(t.engine.create_event("alice", fields)).unwrap();
        let stored = t.engine.event_sessions("alice", &planned.event.get_id()).unwrap();

        prop_assert_eq!(stored.len(), planned.sessions.len());
        let total = |sessions: &[crate::models::Session]| sessions.iter().map(|s| s.get_duration_minutes()).sum::<i32>();
        prop_assert_eq!(total(&stored), total(&planned.sessions));
    }
}

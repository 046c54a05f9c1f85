use super::*;
use crate::gate::{PlanAdjustment, SESSION_MINUTES};
use crate::models::{AdjustmentAction, Session};
use crate::test_utils::{arb_mood, arb_session_minutes, event_fixture, fixed_now, session_fixture};
use chrono::{Duration, NaiveDate, NaiveTime};
use proptest::prelude::*;
use std::collections::HashSet;

fn pending_sessions(durations: &[i32]) -> Vec<Session> {
    let event = event_fixture("alice", fixed_now(), 30, 10.0);
    let today = fixed_now().date_naive();
    durations
        .iter()
        .enumerate()
        .map(|(i, d)| session_fixture(&event, today + Duration::days(i as i64), 18, *d, &format!("Topic {}", i + 1)))
        .collect()
}

proptest! {
    #[test]
    fn prop_split_sizes_sum_and_stay_in_range(total in 20i32..=60, piece in 20i32..=60) {
        let sizes = split_sizes(total, piece);
        prop_assert_eq!(sizes.iter().sum::<i32>(), total);
        for size in &sizes {
            prop_assert!(SESSION_MINUTES.contains(size));
        }
        let longest = sizes.iter().max().copied().unwrap_or(0);
        let shortest = sizes.iter().min().copied().unwrap_or(0);
        prop_assert!(longest - shortest <= 1);
    }

    #[test]
    fn prop_split_never_double_books(
        durations in prop::collection::vec(arb_session_minutes(), 1..6),
        target in 0usize..6,
        piece in 20i32..=30,
    ) {
        let pending = pending_sessions(&durations);
        let target = &pending[target % pending.len()];
        let split = PlanAdjustment {
            action: AdjustmentAction::SplitTask,
            target: target.get_id(),
            new_duration_minutes: Some(piece),
            new_focus_mode: None,
            new_position: None,
            reason: None,
        };

        let changes = plan_changes(&pending, &[], &[split], fixed_now()).unwrap();
        let mut slots: HashSet<(NaiveDate, NaiveTime)> = HashSet::new();
        let untouched = pending
            .iter()
            .filter(|s| !changes.updated.iter().any(|u| u.get_id() == s.get_id()));
        for session in untouched.chain(&changes.updated).chain(&changes.created) {
            prop_assert!(slots.insert((session.get_date(), session.get_start_time())));
            prop_assert!(SESSION_MINUTES.contains(&session.get_duration_minutes()));
        }
        let total: i32 = changes.created.iter().map(|s| s.get_duration_minutes()).sum::<i32>()
            + changes.updated.iter().map(|s| s.get_duration_minutes()).sum::<i32>();
        let before = if changes.updated.is_empty() { 0 } else { target.get_duration_minutes() };
        prop_assert_eq!(total, before);
    }

    #[test]
    fn prop_emotional_triggers_follow_levels(mood in arb_mood()) {
        let triggers = emotional_triggers(&mood);
        prop_assert_eq!(triggers.contains(&Trigger::HighStress), mood.is_high_stress());
        prop_assert_eq!(triggers.contains(&Trigger::LowEnergy), mood.is_low_energy());
        prop_assert_eq!(triggers.contains(&Trigger::LowFocus), mood.is_low_focus());
        prop_assert!(triggers.iter().all(|t| !t.is_execution()));
    }

    #[test]
    fn prop_at_risk_is_monotone_in_completion(days in -2i64..5, completion in 0i32..=100) {
        if !is_at_risk(days, completion) {
            prop_assert!(!is_at_risk(days, (completion + 10).min(100)));
        }
    }
}

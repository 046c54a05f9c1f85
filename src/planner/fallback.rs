use chrono::{DateTime, NaiveDate, Utc};

use super::materializer::{horizon_days, place_sessions};
use crate::errors::EngineResult;
use crate::gate::SESSION_MINUTES;
use crate::models::{Event, Session};

/// Session length for a preparation budget, in minutes
pub fn fallback_duration(budget_minutes: i64) -> i32 {
    match budget_minutes {
        ..=120 => 25,
        ..=300 => 45,
        _ => 60,
    }
}

/// Number of uniform sessions for a preparation budget
pub fn fallback_count(budget_minutes: i64) -> usize {
    (budget_minutes / i64::from(fallback_duration(budget_minutes))).max(1) as usize
}

/// Session length and count for a budget under a daily capacity
///
/// The length never exceeds the capacity, so every session fits a day.
pub fn fallback_size(budget_minutes: i64, capacity: i32) -> (i32, usize) {
    let duration = fallback_duration(budget_minutes).min(capacity.max(*SESSION_MINUTES.start()));
    let count = (budget_minutes / i64::from(duration)).max(1) as usize;
    (duration, count)
}

/// Uniform sessions sized by the event's preparation budget
///
/// One session per day in the first pass, on the same horizon and hours as
/// the materializer.
pub fn fallback_sessions(
    event: &Event,
    today: NaiveDate,
    event_day: NaiveDate,
    capacity: i32,
    now: DateTime<Utc>,
) -> EngineResult<Vec<Session>> {
    let (duration, count) = fallback_size(event.prep_minutes(), capacity);
    let placements = place_sessions(&vec![duration; count], horizon_days(today, event_day), 1, capacity)?;

    Ok(placements
        .into_iter()
        .enumerate()
        .map(|(i, placement)| {
            Session::new(
                &event.get_id(),
                &event.get_owner(),
                placement.date(today),
                placement.start_time(),
                duration,
                format!("Study session {} of {}", i + 1, count),
                now,
            )
        })
        .collect())
}

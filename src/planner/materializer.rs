use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use tracing::debug;

use crate::errors::{EngineError, EngineResult};
use crate::gate::{LearningPlan, PlanTask, SESSION_MINUTES};
use crate::models::{Event, Session};

/// First session of a day starts at this hour
pub const BASE_HOUR: u32 = 18;
/// Hours between consecutive sessions of a day
pub const STAGGER_HOURS: u32 = 2;
/// No session starts later than this hour
pub const LAST_HOUR: u32 = 22;
/// Horizon used when the event is today or already past
pub const DEFAULT_HORIZON_DAYS: i64 = 7;

const MINUTES_PER_SLOT: i64 = 40;

/// Where a session lands: day offset from today and slot index on that day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub day: i64,
    pub slot: u32,
}

impl Placement {
    pub fn date(&self, today: NaiveDate) -> NaiveDate {
        today + Duration::days(self.day)
    }

    pub fn start_time(&self) -> NaiveTime {
        slot_start(self.slot)
    }
}

/// Start time of the `slot`-th session of a day
pub fn slot_start(slot: u32) -> NaiveTime {
    let hour = BASE_HOUR.saturating_add(STAGGER_HOURS.saturating_mul(slot)).min(LAST_HOUR);
    NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Days from `today` until `event_day`, or the default horizon when that is not positive
pub fn horizon_days(today: NaiveDate, event_day: NaiveDate) -> i64 {
    let days = (event_day - today).num_days();
    if days <= 0 { DEFAULT_HORIZON_DAYS } else { days }
}

/// `max(1, ⌊min(total / days, capacity) / 40⌋)`
pub fn sessions_per_day(total_minutes: i64, days: i64, capacity: i32) -> usize {
    let daily = (total_minutes / days.max(1)).min(i64::from(capacity));
    (daily / MINUTES_PER_SLOT).max(1) as usize
}

/// Places sessions of the given durations, in order, across the horizon
///
/// Each pass walks the days left to right and gives every day up to
/// `per_day` more sessions, skipping a day whose planned minutes would
/// exceed `capacity`. A pass that places nothing extends the horizon by one
/// day.
///
/// ### Errors
///
/// `ScheduleInfeasible` for an empty list, a duration outside 20 to 60
/// minutes or a duration larger than the daily capacity
pub fn place_sessions(durations: &[i32], horizon: i64, per_day: usize, capacity: i32) -> EngineResult<Vec<Placement>> {
    if durations.is_empty() {
        return Err(EngineError::ScheduleInfeasible("nothing to schedule".to_string()));
    }
    if let Some(bad) = durations.iter().find(|d| !SESSION_MINUTES.contains(*d)) {
        return Err(EngineError::ScheduleInfeasible(format!(
            "a {bad}-minute session is outside the allowed range"
        )));
    }
    if let Some(bad) = durations.iter().find(|d| **d > capacity) {
        return Err(EngineError::ScheduleInfeasible(format!(
            "a {bad}-minute session does not fit a daily capacity of {capacity} minutes"
        )));
    }

    let mut days = horizon.max(1) as usize;
    let mut loads = vec![0i32; days];
    let mut counts = vec![0u32; days];
    let mut placements = Vec::with_capacity(durations.len());
    let mut next = 0;

    while next < durations.len() {
        let mut placed_in_pass = false;
        for day in 0..days {
            let mut placed_today = 0;
            while placed_today < per_day && next < durations.len() && loads[day] + durations[next] <= capacity {
                placements.push(Placement {
                    day: day as i64,
                    slot: counts[day],
                });
                loads[day] += durations[next];
                counts[day] += 1;
                placed_today += 1;
                next += 1;
                placed_in_pass = true;
            }
            if next == durations.len() {
                break;
            }
        }
        if !placed_in_pass {
            debug!(days, "Horizon full, extending by one day");
            days += 1;
            loads.push(0);
            counts.push(0);
        }
    }

    Ok(placements)
}

fn task_content(index: usize, total: usize, task: &PlanTask) -> String {
    let mut content = format!(
        "Task {}/{}: {}\n\nType: {}\nDifficulty: {}\nCognitive load: {}\nDuration: {} minutes",
        index + 1,
        total,
        task.title,
        task.task_type,
        task.difficulty,
        task.cognitive_load,
        task.suggested_duration_minutes
    );
    if let Some(notes) = task.notes.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        content.push_str(&format!("\nTips: {notes}"));
    }
    content
}

/// Turns a validated plan into pending sessions
///
/// ### Arguments
///
/// * `plan` - The validated plan, tasks in study order
/// * `event` - The event the sessions belong to
/// * `today` - The owner's local date
/// * `event_day` - The event's local date
/// * `capacity` - Daily capacity in minutes
/// * `now` - Creation timestamp
///
/// ### Errors
///
/// `ScheduleInfeasible` when a task cannot be placed
pub fn materialize_plan(
    plan: &LearningPlan,
    event: &Event,
    today: NaiveDate,
    event_day: NaiveDate,
    capacity: i32,
    now: DateTime<Utc>,
) -> EngineResult<Vec<Session>> {
    let durations: Vec<i32> = plan.tasks.iter().map(|t| t.suggested_duration_minutes).collect();
    let horizon = horizon_days(today, event_day);
    let total: i64 = durations.iter().map(|d| i64::from(*d)).sum();
    let per_day = sessions_per_day(total, horizon, capacity);
    let placements = place_sessions(&durations, horizon, per_day, capacity)?;

    let count = plan.tasks.len();
    Ok(plan
        .tasks
        .iter()
        .zip(placements)
        .enumerate()
        .map(|(i, (task, placement))| {
            Session::new(
                &event.get_id(),
                &event.get_owner(),
                placement.date(today),
                placement.start_time(),
                task.suggested_duration_minutes,
                task_content(i, count, task),
                now,
            )
        })
        .collect())
}

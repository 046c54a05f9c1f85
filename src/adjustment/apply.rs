use std::collections::HashSet;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Timelike, Utc};

use crate::errors::{EngineError, EngineResult};
use crate::gate::{PlanAdjustment, SESSION_MINUTES};
use crate::models::{AdjustmentAction, FocusMode, Session};
use crate::planner::{BASE_HOUR, LAST_HOUR, STAGGER_HOURS, slot_start};

/// Session writes produced by accepting a suggestion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanChanges {
    /// Existing pending sessions whose stored values change
    pub updated: Vec<Session>,
    /// Sessions created by splits
    pub created: Vec<Session>,
}

struct Entry {
    session: Session,
    is_new: bool,
}

type Slot = (NaiveDate, NaiveTime);

/// Computes the effect of a list of adjustments on an event's pending sessions
///
/// Adjustments apply in order to a working copy. Targets resolve against
/// session ids first, then task titles (case-insensitive); `all` or `*`
/// addresses every pending session of a focus mode change.
///
/// ### Arguments
///
/// * `pending` - The event's pending sessions, in schedule order
/// * `occupied` - Slots taken by the owner's other sessions
/// * `adjustments` - Validated adjustments
/// * `now` - Timestamp for modified and created sessions
///
/// ### Errors
///
/// `InvariantViolation` when a target matches nothing, a focus mode is
/// unknown or a resulting duration leaves the 20 to 60 minute range
pub fn plan_changes(
    pending: &[Session],
    occupied: &[Slot],
    adjustments: &[PlanAdjustment],
    now: DateTime<Utc>,
) -> EngineResult<PlanChanges> {
    let mut working: Vec<Entry> = pending
        .iter()
        .map(|s| Entry {
            session: s.clone(),
            is_new: false,
        })
        .collect();
    let mut taken: HashSet<Slot> = occupied.iter().copied().collect();
    taken.extend(pending.iter().map(|s| (s.get_date(), s.get_start_time())));

    for adjustment in adjustments {
        match adjustment.action {
            AdjustmentAction::Shorten => {
                let minutes = required_minutes(adjustment)?;
                let index = resolve_one(&working, &adjustment.target)?;
                let session = &mut working[index].session;
                if minutes < session.get_duration_minutes() {
                    session.set_duration_minutes(minutes);
                }
            }
            AdjustmentAction::SplitTask => {
                let minutes = required_minutes(adjustment)?;
                let index = resolve_one(&working, &adjustment.target)?;
                let pieces = split_session(&mut working[index].session, minutes, &mut taken, now);
                working.extend(pieces.into_iter().map(|session| Entry { session, is_new: true }));
            }
            AdjustmentAction::Reorder => {
                let index = resolve_one(&working, &adjustment.target)?;
                reorder(&mut working, index, adjustment.new_position.unwrap_or(1));
            }
            AdjustmentAction::FocusModeChange => {
                let requested = adjustment.new_focus_mode.as_deref().unwrap_or_default();
                let mode = FocusMode::named(requested)
                    .ok_or_else(|| EngineError::invariant(format!("unknown focus mode `{requested}`")))?;
                for index in resolve_many(&working, &adjustment.target)? {
                    working[index].session.set_focus_mode(Some(mode.name.to_string()));
                }
            }
        }
    }

    if let Some(entry) = working
        .iter()
        .find(|e| !SESSION_MINUTES.contains(&e.session.get_duration_minutes()))
    {
        return Err(EngineError::invariant(format!(
            "session `{}` would last {} minutes",
            entry.session.title(),
            entry.session.get_duration_minutes()
        )));
    }

    let mut changes = PlanChanges::default();
    for mut entry in working {
        if entry.is_new {
            changes.created.push(entry.session);
            continue;
        }
        let original = pending.iter().find(|s| s.get_id() == entry.session.get_id());
        if original != Some(&entry.session) {
            entry.session.touch(now);
            changes.updated.push(entry.session);
        }
    }
    Ok(changes)
}

fn required_minutes(adjustment: &PlanAdjustment) -> EngineResult<i32> {
    adjustment.new_duration_minutes.ok_or_else(|| {
        EngineError::invariant(format!("{} needs new_duration_minutes", adjustment.action))
    })
}

fn is_everything(target: &str) -> bool {
    let target = target.trim();
    target == "*" || target.eq_ignore_ascii_case("all")
}

fn resolve_one(working: &[Entry], target: &str) -> EngineResult<usize> {
    let target = target.trim();
    working
        .iter()
        .position(|e| e.session.get_id() == target)
        .or_else(|| {
            working
                .iter()
                .position(|e| e.session.title().eq_ignore_ascii_case(target))
        })
        .ok_or_else(|| EngineError::invariant(format!("no pending session matches `{target}`")))
}

fn resolve_many(working: &[Entry], target: &str) -> EngineResult<Vec<usize>> {
    if is_everything(target) {
        return Ok((0..working.len()).collect());
    }
    resolve_one(working, target).map(|index| vec![index])
}

/// Sizes of the pieces a session of `total` minutes splits into
///
/// `n = max(1, min(⌈total / piece⌉, ⌊total / 20⌋))` near-equal pieces,
/// longer ones first, summing to `total`.
pub fn split_sizes(total: i32, piece: i32) -> Vec<i32> {
    let min_piece = *SESSION_MINUTES.start();
    let by_piece = (total + piece - 1) / piece.max(1);
    let n = by_piece.min(total / min_piece).max(1);
    let base = total / n;
    let remainder = total % n;
    (0..n).map(|i| base + i32::from(i < remainder)).collect()
}

fn with_part_suffix(content: &str, part: usize, parts: usize) -> String {
    let (first, rest) = match content.split_once('\n') {
        Some((first, rest)) => (first, Some(rest)),
        None => (content, None),
    };
    let first = if first.trim().is_empty() { "Study session" } else { first };
    match rest {
        Some(rest) => format!("{first} (part {part}/{parts})\n{rest}"),
        None => format!("{first} (part {part}/{parts})"),
    }
}

/// Next free slot after `(date, time)`: later the same day, then following days
fn next_free_slot(date: NaiveDate, time: NaiveTime, taken: &HashSet<Slot>) -> Slot {
    let slots_per_day = (LAST_HOUR - BASE_HOUR) / STAGGER_HOURS + 1;
    let mut day = date;
    loop {
        for k in 0..slots_per_day {
            let start = slot_start(k);
            if day == date && start.hour() <= time.hour() {
                continue;
            }
            if !taken.contains(&(day, start)) {
                return (day, start);
            }
        }
        day += Duration::days(1);
    }
}

/// Splits `source` in place and returns the new pieces
fn split_session(source: &mut Session, piece: i32, taken: &mut HashSet<Slot>, now: DateTime<Utc>) -> Vec<Session> {
    let sizes = split_sizes(source.get_duration_minutes(), piece);
    if sizes.len() < 2 {
        return Vec::new();
    }
    let parts = sizes.len();
    let content = source.get_suggested_content();
    source.set_duration_minutes(sizes[0]);
    source.set_suggested_content(with_part_suffix(&content, 1, parts));

    let mut after = (source.get_date(), source.get_start_time());
    let mut pieces = Vec::with_capacity(parts - 1);
    for (i, minutes) in sizes.iter().enumerate().skip(1) {
        let (date, time) = next_free_slot(after.0, after.1, taken);
        taken.insert((date, time));
        after = (date, time);
        let mut piece = Session::new(
            &source.get_event_id(),
            &source.get_owner(),
            date,
            time,
            *minutes,
            with_part_suffix(&content, i + 1, parts),
            now,
        );
        piece.set_focus_mode(source.get_focus_mode());
        pieces.push(piece);
    }
    pieces
}

/// Moves entry `index` to the 1-based `position` and hands the existing
/// slots out again in the new order
fn reorder(working: &mut [Entry], index: usize, position: u32) {
    let mut order: Vec<usize> = (0..working.len()).collect();
    order.sort_by_key(|i| (working[*i].session.get_date(), working[*i].session.get_start_time()));
    let slots: Vec<Slot> = order
        .iter()
        .map(|i| (working[*i].session.get_date(), working[*i].session.get_start_time()))
        .collect();

    let Some(from) = order.iter().position(|i| *i == index) else {
        return;
    };
    let moved = order.remove(from);
    let to = (position.max(1) as usize - 1).min(order.len());
    order.insert(to, moved);

    for (entry_index, (date, time)) in order.into_iter().zip(slots) {
        working[entry_index].session.set_schedule(date, time);
    }
}

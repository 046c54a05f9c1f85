use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::SessionStatus;
use crate::errors::{EngineError, EngineResult};

/// A time-placed block of study work for one event
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::study_sessions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Session {
    /// Unique identifier for the session (UUID v4 as string)
    id: String,

    /// The event this session prepares for
    event_id: String,

    owner: String,

    /// Local calendar date the session is scheduled on
    session_date: NaiveDate,

    /// Local wall-clock start time
    start_time: NaiveTime,

    /// Planned duration in minutes, between 20 and 60
    duration_minutes: i32,

    /// Multi-line description of what to study
    suggested_content: String,

    status: SessionStatus,

    focus_mode: Option<String>,

    actual_start: Option<NaiveDateTime>,

    actual_end: Option<NaiveDateTime>,

    /// Whole minutes actually spent, set on completion
    actual_duration_minutes: Option<i32>,

    notes: Option<String>,

    created_at: NaiveDateTime,

    updated_at: NaiveDateTime,
}

impl Session {
    /// Creates a new pending session
    ///
    /// ### Arguments
    ///
    /// * `event_id` - The event the session belongs to
    /// * `owner` - The owner of the event
    /// * `session_date` - Local date of the session
    /// * `start_time` - Local start time
    /// * `duration_minutes` - Planned duration
    /// * `suggested_content` - What to study
    /// * `now` - Creation timestamp
    ///
    /// ### Returns
    ///
    /// A new `Session` in the `pending` state
    pub fn new(
        event_id: &str,
        owner: &str,
        session_date: NaiveDate,
        start_time: NaiveTime,
        duration_minutes: i32,
        suggested_content: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_id: event_id.to_string(),
            owner: owner.to_string(),
            session_date,
            start_time,
            duration_minutes,
            suggested_content,
            status: SessionStatus::Pending,
            focus_mode: None,
            actual_start: None,
            actual_end: None,
            actual_duration_minutes: None,
            notes: None,
            created_at: now.naive_utc(),
            updated_at: now.naive_utc(),
        }
    }

    pub fn get_id(&self) -> String {
        self.id.clone()
    }

    pub fn get_event_id(&self) -> String {
        self.event_id.clone()
    }

    pub fn get_owner(&self) -> String {
        self.owner.clone()
    }

    pub fn get_date(&self) -> NaiveDate {
        self.session_date
    }

    pub fn get_start_time(&self) -> NaiveTime {
        self.start_time
    }

    /// Local date and start time combined
    pub fn scheduled_start(&self) -> NaiveDateTime {
        NaiveDateTime::new(self.session_date, self.start_time)
    }

    pub fn get_duration_minutes(&self) -> i32 {
        self.duration_minutes
    }

    pub fn get_suggested_content(&self) -> String {
        self.suggested_content.clone()
    }

    pub fn get_status(&self) -> SessionStatus {
        self.status
    }

    pub fn get_focus_mode(&self) -> Option<String> {
        self.focus_mode.clone()
    }

    pub fn get_actual_start(&self) -> Option<DateTime<Utc>> {
        self.actual_start.map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc))
    }

    pub fn get_actual_end(&self) -> Option<DateTime<Utc>> {
        self.actual_end.map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc))
    }

    pub fn get_actual_duration_minutes(&self) -> Option<i32> {
        self.actual_duration_minutes
    }

    pub fn get_notes(&self) -> Option<String> {
        self.notes.clone()
    }

    pub fn get_created_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.created_at, Utc)
    }

    pub fn get_updated_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.updated_at, Utc)
    }

    /// The task title of the session
    ///
    /// Taken from the first content line with the `[Adjusted for ...]`
    /// marker, the `Task k/N: ` prefix and any `(part i/n)` suffix removed.
    pub fn title(&self) -> String {
        let first_line = self.suggested_content.lines().next().unwrap_or("").trim();
        let without_marker = strip_adjustment_marker(first_line);
        let without_prefix = strip_task_prefix(without_marker);
        strip_part_suffix(without_prefix).trim().to_string()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether a non-terminal session's scheduled start lies in the past
    ///
    /// ### Arguments
    ///
    /// * `local_now` - The current local wall-clock time
    pub fn is_overdue(&self, local_now: NaiveDateTime) -> bool {
        !self.is_terminal() && self.scheduled_start() < local_now
    }

    fn transition_error(&self, action: &str) -> EngineError {
        EngineError::InvariantViolation(format!("cannot {} a session that is {}", action, self.status))
    }

    /// Moves a pending or postponed session to `in_progress`
    pub fn begin(&mut self, now: DateTime<Utc>) -> EngineResult<()> {
        match self.status {
            SessionStatus::Pending | SessionStatus::Postponed => {
                self.status = SessionStatus::InProgress;
                self.actual_start = Some(now.naive_utc());
                self.updated_at = now.naive_utc();
                Ok(())
            }
            _ => Err(self.transition_error("start")),
        }
    }

    /// Completes a running session, recording its actual duration in whole minutes
    pub fn finish(&mut self, now: DateTime<Utc>, notes: Option<String>) -> EngineResult<()> {
        if self.status != SessionStatus::InProgress {
            return Err(self.transition_error("complete"));
        }
        let started = self.actual_start.unwrap_or_else(|| now.naive_utc());
        let minutes = (now.naive_utc() - started).num_minutes().max(0);
        self.status = SessionStatus::Completed;
        self.actual_end = Some(now.naive_utc());
        self.actual_duration_minutes = Some(i32::try_from(minutes).unwrap_or(i32::MAX));
        if notes.is_some() {
            self.notes = notes;
        }
        self.updated_at = now.naive_utc();
        Ok(())
    }

    /// Marks a non-terminal session as skipped; no duration is recorded
    pub fn skip(&mut self, now: DateTime<Utc>, notes: Option<String>) -> EngineResult<()> {
        if self.is_terminal() {
            return Err(self.transition_error("skip"));
        }
        self.status = SessionStatus::Skipped;
        if notes.is_some() {
            self.notes = notes;
        }
        self.updated_at = now.naive_utc();
        Ok(())
    }

    /// Defers a pending session without dropping it
    pub fn postpone(&mut self, now: DateTime<Utc>) -> EngineResult<()> {
        if self.status != SessionStatus::Pending {
            return Err(self.transition_error("postpone"));
        }
        self.status = SessionStatus::Postponed;
        self.updated_at = now.naive_utc();
        Ok(())
    }

    /// Completes a session from accumulated focus time
    ///
    /// Terminal sessions are left alone and `false` is returned.
    pub fn auto_complete(&mut self, now: DateTime<Utc>, focused_minutes: i32) -> bool {
        if self.is_terminal() {
            return false;
        }
        let end = now.naive_utc();
        self.actual_start = self
            .actual_start
            .or_else(|| Some(end - chrono::Duration::minutes(i64::from(focused_minutes))));
        self.actual_end = Some(end);
        self.actual_duration_minutes = Some(focused_minutes);
        self.status = SessionStatus::Completed;
        self.updated_at = end;
        true
    }

    pub fn set_duration_minutes(&mut self, duration_minutes: i32) {
        self.duration_minutes = duration_minutes;
    }

    pub fn set_schedule(&mut self, session_date: NaiveDate, start_time: NaiveTime) {
        self.session_date = session_date;
        self.start_time = start_time;
    }

    pub fn set_suggested_content(&mut self, suggested_content: String) {
        self.suggested_content = suggested_content;
    }

    pub fn set_focus_mode(&mut self, focus_mode: Option<String>) {
        self.focus_mode = focus_mode;
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now.naive_utc();
    }
}

fn strip_adjustment_marker(line: &str) -> &str {
    if line.starts_with("[Adjusted for ") {
        if let Some(end) = line.find("] ") {
            return &line[end + 2..];
        }
    }
    line
}

fn strip_task_prefix(line: &str) -> &str {
    let Some(rest) = line.strip_prefix("Task ") else {
        return line;
    };
    match rest.split_once(": ") {
        Some((counter, title))
            if counter.split('/').count() == 2
                && counter.split('/').all(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit())) =>
        {
            title
        }
        _ => line,
    }
}

fn strip_part_suffix(line: &str) -> &str {
    let trimmed = line.trim_end();
    if let Some(open) = trimmed.rfind(" (part ") {
        if trimmed.ends_with(')') {
            return &trimmed[..open];
        }
    }
    trimmed
}

//! Plain data handed to the advisor
//!
//! Snapshots are serialized into prompts and stored as suggestion context.
//! They never flow back into records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{DiagnosticQuestion, EmotionalStateLog, Event, EventType, Level, LogSource, Session, SessionStatus};

/// Facts the plan generator needs about one event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub title: String,
    pub event_type: EventType,
    pub event_date: DateTime<Utc>,
    pub prep_hours: f64,
    pub subject: String,
    pub description: Option<String>,
    pub daily_capacity_minutes: i32,
    pub focus_mode: String,
}

impl PlanRequest {
    pub fn from_event(event: &Event, daily_capacity_minutes: i32, focus_mode: &str) -> Self {
        Self {
            title: event.get_title(),
            event_type: event.get_event_type(),
            event_date: event.get_event_date(),
            prep_hours: event.get_prep_hours(),
            subject: event.get_subject(),
            description: event.get_description(),
            daily_capacity_minutes,
            focus_mode: focus_mode.to_string(),
        }
    }

    /// Plans are cached by title, event date and preparation budget
    pub(crate) fn cache_key(&self) -> String {
        format!("{}|{}|{}", self.title, self.event_date.to_rfc3339(), self.prep_hours)
    }
}

/// Event facts for adjustment prompts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSnapshot {
    pub id: String,
    pub title: String,
    pub event_type: EventType,
    pub event_date: DateTime<Utc>,
    pub subject: String,
    pub days_until: i64,
}

impl EventSnapshot {
    pub fn from_event(event: &Event, now: DateTime<Utc>) -> Self {
        Self {
            id: event.get_id(),
            title: event.get_title(),
            event_type: event.get_event_type(),
            event_date: event.get_event_date(),
            subject: event.get_subject(),
            days_until: event.days_until(now),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub title: String,
    pub status: SessionStatus,
    pub date: NaiveDate,
    pub start_time: String,
    pub planned_minutes: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_minutes: Option<i32>,
}

impl SessionSnapshot {
    pub fn from_session(session: &Session) -> Self {
        Self {
            id: session.get_id(),
            title: session.title(),
            status: session.get_status(),
            date: session.get_date(),
            start_time: session.get_start_time().format("%H:%M").to_string(),
            planned_minutes: session.get_duration_minutes(),
            actual_minutes: session.get_actual_duration_minutes(),
        }
    }

    pub fn from_sessions(sessions: &[Session]) -> Vec<Self> {
        sessions.iter().map(Self::from_session).collect()
    }
}

/// Execution figures for one event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_sessions: i32,
    pub completed: i32,
    pub skipped: i32,
    pub pending: i32,
    pub completion_percentage: i32,
    /// Overrun of completed sessions, in percent of their planned time
    pub avg_overrun_percent: i32,
    pub days_remaining: i64,
}

impl PerformanceMetrics {
    pub fn from_sessions(sessions: &[Session], days_remaining: i64) -> Self {
        let count = |status: SessionStatus| sessions.iter().filter(|s| s.get_status() == status).count() as i32;
        let total_sessions = sessions.len() as i32;
        let completed = count(SessionStatus::Completed);

        let (actual, planned) = sessions
            .iter()
            .filter(|s| s.get_status() == SessionStatus::Completed)
            .fold((0i64, 0i64), |(actual, planned), s| {
                (
                    actual + i64::from(s.get_actual_duration_minutes().unwrap_or(0)),
                    planned + i64::from(s.get_duration_minutes()),
                )
            });
        let avg_overrun_percent = if planned > 0 { ((actual - planned) * 100 / planned) as i32 } else { 0 };

        Self {
            total_sessions,
            completed,
            skipped: count(SessionStatus::Skipped),
            pending: count(SessionStatus::Pending) + count(SessionStatus::Postponed),
            completion_percentage: completion_percentage(completed, total_sessions),
            avg_overrun_percent,
            days_remaining,
        }
    }
}

/// `⌊100 × completed / total⌋`, 0 without sessions
pub fn completion_percentage(completed: i32, total: i32) -> i32 {
    if total <= 0 { 0 } else { completed * 100 / total }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionalSnapshot {
    pub energy: Level,
    pub stress: Level,
    pub focus: Level,
    pub source: LogSource,
}

impl EmotionalSnapshot {
    pub fn from_log(log: &EmotionalStateLog) -> Self {
        let levels = log.get_levels();
        Self {
            energy: levels.energy,
            stress: levels.stress,
            focus: levels.focus,
            source: log.get_source(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSnapshot {
    pub question_number: i32,
    pub question_text: String,
    pub correct_answer: String,
    pub user_answer: String,
    pub topic: String,
    pub is_correct: bool,
}

impl QuestionSnapshot {
    pub fn from_question(question: &DiagnosticQuestion) -> Self {
        Self {
            question_number: question.get_question_number(),
            question_text: question.get_question_text(),
            correct_answer: question.get_correct_answer(),
            user_answer: question.get_user_answer(),
            topic: question.get_topic(),
            is_correct: question.is_correct(),
        }
    }
}

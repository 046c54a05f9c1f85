use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{EventType, Level};
use crate::errors::{EngineError, EngineResult};

/// A dated academic event a learner prepares for
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::events)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Event {
    /// Unique identifier for the event (UUID v4 as string)
    id: String,

    /// The user this event belongs to
    owner: String,

    title: String,

    event_type: EventType,

    /// When the event takes place (UTC)
    event_date: NaiveDateTime,

    subject: String,

    priority: Level,

    /// Total preparation budget in hours, always positive
    prep_hours: f64,

    description: Option<String>,

    created_at: NaiveDateTime,

    updated_at: NaiveDateTime,
}

/// Fields a caller supplies when creating an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub event_type: EventType,
    pub event_date: DateTime<Utc>,
    pub subject: String,
    pub priority: Level,
    pub prep_hours: f64,
    #[serde(default)]
    pub description: Option<String>,
}

/// Partial update of an event; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub event_type: Option<EventType>,
    #[serde(default)]
    pub event_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub priority: Option<Level>,
    #[serde(default)]
    pub prep_hours: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Largest preparation budget an event may carry
pub const MAX_PREP_HOURS: f64 = 2_000.0;

fn validate_fields(title: &str, subject: &str, prep_hours: f64) -> EngineResult<()> {
    if title.trim().is_empty() {
        return Err(EngineError::invariant("event title must not be empty"));
    }
    if subject.trim().is_empty() {
        return Err(EngineError::invariant("event subject must not be empty"));
    }
    if !prep_hours.is_finite() || prep_hours <= 0.0 {
        return Err(EngineError::invariant("preparation hours must be greater than zero"));
    }
    if prep_hours > MAX_PREP_HOURS {
        return Err(EngineError::InvariantViolation(format!(
            "preparation hours must be at most {MAX_PREP_HOURS}"
        )));
    }
    Ok(())
}

impl Event {
    /// Creates a new event for an owner
    ///
    /// ### Arguments
    ///
    /// * `owner` - The user the event belongs to
    /// * `fields` - The caller-supplied fields
    /// * `now` - Creation timestamp
    ///
    /// ### Errors
    ///
    /// Returns `InvariantViolation` for an empty title or subject, or a
    /// preparation budget outside `(0, MAX_PREP_HOURS]`
    pub fn new(owner: &str, fields: NewEvent, now: DateTime<Utc>) -> EngineResult<Self> {
        validate_fields(&fields.title, &fields.subject, fields.prep_hours)?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            owner: owner.to_string(),
            title: fields.title.trim().to_string(),
            event_type: fields.event_type,
            event_date: fields.event_date.naive_utc(),
            subject: fields.subject.trim().to_string(),
            priority: fields.priority,
            prep_hours: fields.prep_hours,
            description: fields.description,
            created_at: now.naive_utc(),
            updated_at: now.naive_utc(),
        })
    }

    /// Applies a partial update, returning whether any planning input changed
    ///
    /// Planning inputs are the title, date, type, subject, budget and
    /// description; priority alone does not change the plan.
    pub fn apply_update(&mut self, update: EventUpdate, now: DateTime<Utc>) -> EngineResult<bool> {
        let title = update.title.map(|t| t.trim().to_string()).unwrap_or_else(|| self.title.clone());
        let subject = update.subject.map(|s| s.trim().to_string()).unwrap_or_else(|| self.subject.clone());
        let prep_hours = update.prep_hours.unwrap_or(self.prep_hours);
        validate_fields(&title, &subject, prep_hours)?;

        let event_date = update.event_date.map(|d| d.naive_utc()).unwrap_or(self.event_date);
        let event_type = update.event_type.unwrap_or(self.event_type);
        let description = update.description.or_else(|| self.description.clone());

        let plan_changed = title != self.title
            || subject != self.subject
            || prep_hours != self.prep_hours
            || event_date != self.event_date
            || event_type != self.event_type
            || description != self.description;

        self.title = title;
        self.subject = subject;
        self.prep_hours = prep_hours;
        self.event_date = event_date;
        self.event_type = event_type;
        self.description = description;
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        self.updated_at = now.naive_utc();
        Ok(plan_changed)
    }

    pub fn get_id(&self) -> String {
        self.id.clone()
    }

    pub fn get_owner(&self) -> String {
        self.owner.clone()
    }

    pub fn get_title(&self) -> String {
        self.title.clone()
    }

    pub fn get_event_type(&self) -> EventType {
        self.event_type
    }

    /// Gets the event date as a DateTime<Utc>
    pub fn get_event_date(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.event_date, Utc)
    }

    pub fn get_subject(&self) -> String {
        self.subject.clone()
    }

    pub fn get_priority(&self) -> Level {
        self.priority
    }

    pub fn get_prep_hours(&self) -> f64 {
        self.prep_hours
    }

    pub fn get_description(&self) -> Option<String> {
        self.description.clone()
    }

    pub fn get_created_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.created_at, Utc)
    }

    pub fn get_updated_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.updated_at, Utc)
    }

    /// Preparation budget in whole minutes
    pub fn prep_minutes(&self) -> i64 {
        (self.prep_hours * 60.0).floor() as i64
    }

    /// Whole days until the event, never negative
    ///
    /// ### Arguments
    ///
    /// * `now` - The current instant
    pub fn days_until(&self, now: DateTime<Utc>) -> i64 {
        (self.get_event_date() - now).num_days().max(0)
    }
}

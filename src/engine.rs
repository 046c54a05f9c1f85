//! The study engine
//!
//! `StudyEngine` bundles the store, the advisor client and the clock. Its
//! operations are spread over the modules that own them: planning in
//! `planner`, execution in `tracker`, mood logs in `emotional`, diagnostics
//! in `diagnostics` and suggestions in `adjustment`. Every operation takes
//! the acting owner and never touches another owner's records.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use tracing::{info, instrument};

use crate::adjustment::is_at_risk;
use crate::advisor::{AdvisorClient, completion_percentage};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::db::{self, DbPool};
use crate::errors::{EngineError, EngineResult};
use crate::models::{Event, Session, SessionStatus, UserPreferences};
use crate::repo;

/// Preferences used for owners who never stored their own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineDefaults {
    pub daily_capacity_minutes: i32,
    pub focus_mode: String,
}

impl EngineDefaults {
    pub fn from_config(config: &Config) -> Self {
        Self {
            daily_capacity_minutes: config.default_daily_capacity_minutes,
            focus_mode: config.default_focus_mode.clone(),
        }
    }
}

impl Default for EngineDefaults {
    fn default() -> Self {
        Self {
            daily_capacity_minutes: 480,
            focus_mode: "Pomodoro".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct StudyEngine {
    pub(crate) pool: Arc<DbPool>,
    pub(crate) advisor: AdvisorClient,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) defaults: EngineDefaults,
}

/// Progress figures of one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventProgress {
    pub event_id: String,
    pub title: String,
    pub days_until: i64,
    pub total_sessions: i32,
    pub completed: i32,
    pub skipped: i32,
    pub pending: i32,
    pub completion_percentage: i32,
    pub is_at_risk: bool,
}

impl EventProgress {
    pub fn from_sessions(event: &Event, sessions: &[Session], now: DateTime<Utc>) -> Self {
        let count = |wanted: &[SessionStatus]| {
            sessions.iter().filter(|s| wanted.contains(&s.get_status())).count() as i32
        };
        let total_sessions = sessions.len() as i32;
        let completed = count(&[SessionStatus::Completed]);
        let completion = completion_percentage(completed, total_sessions);
        let days_until = event.days_until(now);

        Self {
            event_id: event.get_id(),
            title: event.get_title(),
            days_until,
            total_sessions,
            completed,
            skipped: count(&[SessionStatus::Skipped]),
            pending: count(&[SessionStatus::Pending, SessionStatus::Postponed]),
            completion_percentage: completion,
            is_at_risk: total_sessions > 0 && is_at_risk(days_until, completion),
        }
    }
}

impl StudyEngine {
    pub fn new(pool: Arc<DbPool>, advisor: AdvisorClient, clock: Arc<dyn Clock>, defaults: EngineDefaults) -> Self {
        Self {
            pool,
            advisor,
            clock,
            defaults,
        }
    }

    /// Opens the configured database and builds the advisor client
    ///
    /// ### Errors
    ///
    /// Returns an error if the database cannot be opened or migrated, or if
    /// the advisor configuration is invalid
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let pool = db::open(&config.database_url)?;
        let advisor = AdvisorClient::from_config(config)?;
        info!(database_url = %config.database_url, "Study engine ready");
        Ok(Self::new(
            Arc::new(pool),
            advisor,
            Arc::new(SystemClock),
            EngineDefaults::from_config(config),
        ))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn advisor(&self) -> &AdvisorClient {
        &self.advisor
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Stored preferences of `owner`, or the configured defaults
    pub fn preferences(&self, owner: &str) -> EngineResult<UserPreferences> {
        match repo::get_preferences(&self.pool, owner)? {
            Some(prefs) => Ok(prefs),
            None => UserPreferences::new(
                owner,
                self.defaults.daily_capacity_minutes,
                &self.defaults.focus_mode,
                self.clock.now(),
            ),
        }
    }

    /// Updates the given preference fields and keeps the others
    #[instrument(skip(self), fields(owner = %owner))]
    pub fn set_preferences(
        &self,
        owner: &str,
        daily_capacity_minutes: Option<i32>,
        focus_mode: Option<&str>,
        overload_alerts: Option<bool>,
    ) -> EngineResult<UserPreferences> {
        let current = self.preferences(owner)?;
        let current_mode = current.get_focus_mode();
        let prefs = UserPreferences::new(
            owner,
            daily_capacity_minutes.unwrap_or(current.get_daily_capacity_minutes()),
            focus_mode.unwrap_or(&current_mode),
            self.clock.now(),
        )?
        .with_overload_alerts(overload_alerts.unwrap_or(current.get_enable_overload_alerts()));
        repo::upsert_preferences(&self.pool, &prefs)?;
        info!(
            capacity = prefs.get_daily_capacity_minutes(),
            focus_mode = %prefs.get_focus_mode(),
            overload_alerts = prefs.get_enable_overload_alerts(),
            "Preferences saved"
        );
        Ok(prefs)
    }

    /// An event of `owner`
    ///
    /// ### Errors
    ///
    /// `NotFound` when the event is missing or belongs to someone else
    pub fn event(&self, owner: &str, event_id: &str) -> EngineResult<Event> {
        repo::get_event(&self.pool, owner, event_id)?.ok_or(EngineError::NotFound)
    }

    pub fn events(&self, owner: &str) -> EngineResult<Vec<Event>> {
        Ok(repo::list_events(&self.pool, owner)?)
    }

    /// A session of `owner`
    ///
    /// ### Errors
    ///
    /// `NotFound` when the session is missing or belongs to someone else
    pub fn session(&self, owner: &str, session_id: &str) -> EngineResult<Session> {
        repo::get_session(&self.pool, owner, session_id)?.ok_or(EngineError::NotFound)
    }

    /// Sessions of an event, in schedule order
    pub fn event_sessions(&self, owner: &str, event_id: &str) -> EngineResult<Vec<Session>> {
        let event = self.event(owner, event_id)?;
        Ok(repo::list_sessions_for_event(&self.pool, &event.get_id())?)
    }

    #[instrument(skip(self), fields(owner = %owner, event_id = %event_id))]
    pub fn event_progress(&self, owner: &str, event_id: &str) -> EngineResult<EventProgress> {
        let event = self.event(owner, event_id)?;
        let sessions = repo::list_sessions_for_event(&self.pool, &event.get_id())?;
        Ok(EventProgress::from_sessions(&event, &sessions, self.clock.now()))
    }

    /// UTC instants bounding a local calendar day, end exclusive
    pub(crate) fn local_day_bounds(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.local_to_utc(date.and_time(chrono::NaiveTime::MIN));
        (start, start + Duration::days(1))
    }

    pub(crate) fn local_to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        let offset = i64::from(self.clock.utc_offset().local_minus_utc());
        Utc.from_utc_datetime(&(local - Duration::seconds(offset)))
    }
}

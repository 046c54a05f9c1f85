//! Execution tracking
//!
//! `pending → in_progress → completed`, `pending | in_progress | postponed
//! → skipped`, `pending → postponed`. Every transition is written with a
//! guard on the status the session had when it was loaded, and the store
//! refuses a second in-progress session of the same owner.

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::adjustment::Signal;
use crate::engine::StudyEngine;
use crate::errors::{EngineError, EngineResult};
use crate::models::{AdjustmentSuggestion, FocusInterval, Session, SessionStatus};
use crate::repo;

/// Share of the daily capacity at which the overload alert is raised
pub const ALERT_PERCENT: i32 = 80;
/// Break length once the daily capacity is used up
pub const OVERLOAD_BREAK_MINUTES: i32 = 30;

/// A session after an execution update, with any suggestion it triggered
#[derive(Debug, Clone, Serialize)]
pub struct SessionUpdate {
    pub session: Session,
    pub suggestion: Option<AdjustmentSuggestion>,
}

/// Outcome of a recorded focus interval
#[derive(Debug, Clone, Serialize)]
pub struct FocusUpdate {
    pub session: Session,
    pub focused_minutes: i32,
    pub auto_completed: bool,
    pub suggestion: Option<AdjustmentSuggestion>,
}

/// Focus time of one local day against the owner's capacity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyLoad {
    pub date: NaiveDate,
    pub focused_minutes: i32,
    pub capacity_minutes: i32,
    pub percent: i32,
    pub alert: bool,
    pub overload: bool,
    pub message: Option<String>,
    pub intervals: usize,
    pub recommended_break_minutes: i32,
}

/// Break length for the owner's focus mode and today's load
pub fn recommended_break(base_break: i32, intervals_today: usize, overload: bool) -> i32 {
    if overload {
        OVERLOAD_BREAK_MINUTES
    } else if intervals_today >= 4 {
        base_break * 3
    } else if intervals_today >= 2 {
        base_break * 2
    } else {
        base_break
    }
}

impl StudyEngine {
    /// Starts a pending or postponed session
    ///
    /// ### Errors
    ///
    /// `InvariantViolation` if another session of the owner is running or
    /// the session cannot be started from its current status
    #[instrument(skip(self), fields(owner = %owner, session_id = %session_id))]
    pub async fn start_session(&self, owner: &str, session_id: &str) -> EngineResult<Session> {
        let mut session = self.session(owner, session_id)?;
        if let Some(active) = repo::find_active_session(&self.pool, owner)? {
            if active.get_id() != session.get_id() {
                return Err(EngineError::invariant(format!(
                    "session {} is already in progress",
                    active.get_id()
                )));
            }
        }

        let previous = session.get_status();
        session.begin(self.clock.now())?;
        repo::save_session(&self.pool, &session, previous)?;
        info!("Session started");
        Ok(session)
    }

    /// Completes a running session and evaluates the event's triggers
    #[instrument(skip(self, notes), fields(owner = %owner, session_id = %session_id))]
    pub async fn complete_session(&self, owner: &str, session_id: &str, notes: Option<String>) -> EngineResult<SessionUpdate> {
        let mut session = self.session(owner, session_id)?;
        let previous = session.get_status();
        session.finish(self.clock.now(), notes)?;
        repo::save_session(&self.pool, &session, previous)?;
        info!(actual_minutes = ?session.get_actual_duration_minutes(), "Session completed");

        let suggestion = self.evaluate_after_update(owner, &session.get_event_id(), None).await;
        Ok(SessionUpdate { session, suggestion })
    }

    /// Skips a session that has not reached a terminal status
    #[instrument(skip(self, notes), fields(owner = %owner, session_id = %session_id))]
    pub async fn skip_session(&self, owner: &str, session_id: &str, notes: Option<String>) -> EngineResult<SessionUpdate> {
        let mut session = self.session(owner, session_id)?;
        let previous = session.get_status();
        session.skip(self.clock.now(), notes)?;
        repo::save_session(&self.pool, &session, previous)?;
        info!("Session skipped");

        let suggestion = self.evaluate_after_update(owner, &session.get_event_id(), None).await;
        Ok(SessionUpdate { session, suggestion })
    }

    #[instrument(skip(self), fields(owner = %owner, session_id = %session_id))]
    pub fn postpone_session(&self, owner: &str, session_id: &str) -> EngineResult<Session> {
        let mut session = self.session(owner, session_id)?;
        let previous = session.get_status();
        session.postpone(self.clock.now())?;
        repo::save_session(&self.pool, &session, previous)?;
        info!("Session postponed");
        Ok(session)
    }

    /// Records a finished focus interval for a session
    ///
    /// Once the session's recorded focus time reaches its planned duration
    /// the session is completed. Intervals of terminal sessions are kept
    /// without a transition.
    ///
    /// ### Arguments
    ///
    /// * `owner` - The acting user
    /// * `session_id` - The session the interval belongs to
    /// * `minutes` - Length of the interval, positive
    #[instrument(skip(self), fields(owner = %owner, session_id = %session_id, minutes))]
    pub async fn record_focus_interval(&self, owner: &str, session_id: &str, minutes: i32) -> EngineResult<FocusUpdate> {
        if minutes <= 0 {
            return Err(EngineError::invariant("focus interval must be at least one minute"));
        }
        let mut session = self.session(owner, session_id)?;
        let now = self.clock.now();
        let interval = FocusInterval::new(owner, &session.get_id(), minutes, now);
        let focused_minutes = repo::record_focus_interval(&self.pool, &interval)?;

        let previous = session.get_status();
        let reached = focused_minutes >= session.get_duration_minutes();
        let auto_completed = reached && session.auto_complete(now, focused_minutes);
        let mut suggestion = None;
        if auto_completed {
            repo::save_session(&self.pool, &session, previous)?;
            info!(focused_minutes, "Session completed from focus time");
            suggestion = self.evaluate_after_update(owner, &session.get_event_id(), None).await;
        }

        Ok(FocusUpdate {
            session,
            focused_minutes,
            auto_completed,
            suggestion,
        })
    }

    /// Sessions of `owner` scheduled on the local date `date`
    pub fn sessions_on(&self, owner: &str, date: NaiveDate) -> EngineResult<Vec<Session>> {
        Ok(repo::list_sessions_between(&self.pool, owner, date, date)?)
    }

    pub fn todays_sessions(&self, owner: &str) -> EngineResult<Vec<Session>> {
        self.sessions_on(owner, self.clock.today())
    }

    /// Pending and postponed sessions from today on
    pub fn upcoming_sessions(&self, owner: &str) -> EngineResult<Vec<Session>> {
        Ok(repo::list_upcoming_sessions(&self.pool, owner, self.clock.today())?)
    }

    /// Non-terminal sessions of the past week whose start has passed
    pub fn overdue_sessions(&self, owner: &str) -> EngineResult<Vec<Session>> {
        let today = self.clock.today();
        let local_now = self.clock.local_now();
        let sessions = repo::list_sessions_between(&self.pool, owner, today - Duration::days(7), today)?;
        Ok(sessions.into_iter().filter(|s| s.is_overdue(local_now)).collect())
    }

    /// Focus time recorded on a local day against the owner's capacity
    #[instrument(skip(self), fields(owner = %owner, date = %date))]
    pub fn daily_load(&self, owner: &str, date: NaiveDate) -> EngineResult<DailyLoad> {
        let prefs = self.preferences(owner)?;
        let (from, to) = self.local_day_bounds(date);
        let intervals = repo::list_focus_intervals_between(&self.pool, owner, from, to)?;

        let focused_minutes: i32 = intervals.iter().map(|i| i.get_minutes()).sum();
        let capacity_minutes = prefs.get_daily_capacity_minutes();
        let percent = if capacity_minutes > 0 {
            focused_minutes.saturating_mul(100) / capacity_minutes
        } else {
            100
        };
        let overload = percent >= 100;
        let alert = prefs.get_enable_overload_alerts() && percent >= ALERT_PERCENT;
        let message = if !alert {
            None
        } else if overload {
            Some(format!(
                "You have studied {focused_minutes} minutes today, over your {capacity_minutes}-minute limit. Stop for today."
            ))
        } else {
            Some(format!("You have used {percent}% of today's {capacity_minutes} study minutes."))
        };
        if alert {
            warn!(percent, "Daily capacity nearly used");
        }

        Ok(DailyLoad {
            date,
            focused_minutes,
            capacity_minutes,
            percent,
            alert,
            overload,
            message,
            intervals: intervals.len(),
            recommended_break_minutes: recommended_break(prefs.focus_mode().break_minutes, intervals.len(), overload),
        })
    }

    /// Runs the trigger evaluation after an update that is already stored
    ///
    /// Failures are logged and reported as no suggestion.
    pub(crate) async fn evaluate_after_update(
        &self,
        owner: &str,
        event_id: &str,
        signal: Option<Signal>,
    ) -> Option<AdjustmentSuggestion> {
        match self.evaluate_triggers(owner, event_id, signal).await {
            Ok(suggestion) => suggestion,
            Err(err) => {
                warn!(event_id = %event_id, error = %err, "Trigger evaluation failed");
                None
            }
        }
    }
}

//! Emotional state log and the same-day auto-adjuster
//!
//! A self-report is the owner's consent to lighten today's plan: when it is
//! stored, today's pending sessions are capped right away. Suggestions for
//! the rest of the plan still go through the confirmation protocol.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, instrument};

use crate::adjustment::{Signal, emotional_triggers};
use crate::advisor::EmotionalSnapshot;
use crate::engine::StudyEngine;
use crate::errors::{EngineError, EngineResult};
use crate::models::{AdjustmentSuggestion, EmotionalStateLog, Level, LogSource, MoodLevels, Session, SessionStatus};
use crate::repo;

pub const HIGH_STRESS_CAP_MINUTES: i32 = 30;
pub const LOW_ENERGY_CAP_MINUTES: i32 = 25;
pub const LOW_FOCUS_CAP_MINUTES: i32 = 25;
/// Cap when energy and focus are both low; overrides the others
pub const DRAINED_CAP_MINUTES: i32 = 20;

const MARKER_OPEN: &str = "[Adjusted for ";

/// Result of logging a self-report
#[derive(Debug, Clone, Serialize)]
pub struct MoodLogged {
    pub log: EmotionalStateLog,
    /// False when a self-report for the same day already existed
    pub stored: bool,
    pub notice: Option<String>,
    /// Today's sessions shortened by the auto-adjuster
    pub adjusted: Vec<Session>,
    pub suggestions: Vec<AdjustmentSuggestion>,
}

/// Averaged state over a recent window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecentState {
    pub levels: MoodLevels,
    pub entries: usize,
    pub since: DateTime<Utc>,
    pub needs_attention: bool,
}

/// Session cap for a reported state and the reasons behind it
///
/// Returns `None` when the state does not call for shorter sessions.
pub fn session_cap(levels: &MoodLevels) -> Option<(i32, Vec<&'static str>)> {
    let mut cap = None::<i32>;
    let mut reasons = Vec::new();
    let mut tighten = |minutes: i32| cap = Some(cap.map_or(minutes, |c| c.min(minutes)));

    if levels.is_high_stress() {
        tighten(HIGH_STRESS_CAP_MINUTES);
        reasons.push("high stress");
    }
    if levels.is_low_energy() && levels.is_low_focus() {
        tighten(DRAINED_CAP_MINUTES);
        reasons.push("very challenging state");
    } else if levels.is_low_energy() {
        tighten(LOW_ENERGY_CAP_MINUTES);
        reasons.push("low energy");
    } else if levels.is_low_focus() {
        tighten(LOW_FOCUS_CAP_MINUTES);
        reasons.push("low focus");
    }
    cap.map(|minutes| (minutes, reasons))
}

fn with_marker(content: &str, reasons: &[&str]) -> String {
    let body = content
        .strip_prefix(MARKER_OPEN)
        .and_then(|rest| rest.split_once("] ").map(|(_, body)| body))
        .unwrap_or(content);
    let reasons = reasons.join(", ");
    if body.trim().is_empty() {
        format!("Session adjusted for {reasons}")
    } else {
        format!("{MARKER_OPEN}{reasons}] {body}")
    }
}

/// Caps pending sessions for a reported state
///
/// Only sessions that get strictly shorter are returned; their content is
/// prefixed with the reasons.
pub fn cap_sessions(sessions: &[Session], levels: &MoodLevels, now: DateTime<Utc>) -> Vec<Session> {
    let Some((cap, reasons)) = session_cap(levels) else {
        return Vec::new();
    };
    sessions
        .iter()
        .filter(|s| s.get_status() == SessionStatus::Pending && s.get_duration_minutes() > cap)
        .map(|s| {
            let mut session = s.clone();
            session.set_duration_minutes(cap);
            session.set_suggested_content(with_marker(&s.get_suggested_content(), &reasons));
            session.touch(now);
            session
        })
        .collect()
}

/// Averages logs on the low=1, medium=2, high=3 scale and bands the result
pub fn average_levels(logs: &[EmotionalStateLog]) -> Option<MoodLevels> {
    if logs.is_empty() {
        return None;
    }
    let n = logs.len() as f64;
    let band = |pick: fn(&MoodLevels) -> Level| {
        let sum: f64 = logs.iter().map(|log| pick(&log.get_levels()).score()).sum();
        Level::from_average(sum / n)
    };
    Some(MoodLevels {
        energy: band(|l| l.energy),
        stress: band(|l| l.stress),
        focus: band(|l| l.focus),
    })
}

impl StudyEngine {
    /// Logs a self-report and adjusts today's plan
    ///
    /// A second self-report on the same local day is a no-op with a notice.
    /// A stored report caps today's pending sessions, then every event with
    /// pending sessions is evaluated against the reported state.
    ///
    /// ### Arguments
    ///
    /// * `owner` - The reporting user
    /// * `levels` - Energy, stress and focus
    /// * `trigger_context` - Free-form note on what prompted the report
    /// * `session_id` - Optional session the report relates to
    #[instrument(skip(self, trigger_context), fields(owner = %owner))]
    pub async fn log_mood(
        &self,
        owner: &str,
        levels: MoodLevels,
        trigger_context: &str,
        session_id: Option<String>,
    ) -> EngineResult<MoodLogged> {
        if let Some(id) = &session_id {
            self.session(owner, id)?;
        }
        let now = self.clock.now();
        let log = EmotionalStateLog::new(
            owner,
            levels,
            LogSource::SelfReport,
            trigger_context.trim().to_string(),
            session_id,
            now,
        );
        let (day_start, day_end) = self.local_day_bounds(self.clock.today());
        if !repo::create_self_report_once(&self.pool, &log, day_start, day_end)? {
            return Ok(MoodLogged {
                log,
                stored: false,
                notice: Some("You already checked in today; the earlier report stands.".to_string()),
                adjusted: Vec::new(),
                suggestions: Vec::new(),
            });
        }

        let adjusted = cap_sessions(&self.todays_sessions(owner)?, &levels, now);
        if !adjusted.is_empty() {
            repo::save_pending_sessions(&self.pool, &adjusted)?;
            info!(sessions = adjusted.len(), "Shortened today's sessions");
        }

        let mut suggestions = Vec::new();
        if !emotional_triggers(&levels).is_empty() {
            let snapshot = EmotionalSnapshot::from_log(&log);
            for event in repo::list_events_with_pending_sessions(&self.pool, owner)? {
                let signal = Some(Signal::Emotional(snapshot));
                if let Some(suggestion) = self.evaluate_after_update(owner, &event.get_id(), signal).await {
                    suggestions.push(suggestion);
                }
            }
        }

        Ok(MoodLogged {
            log,
            stored: true,
            notice: None,
            adjusted,
            suggestions,
        })
    }

    /// Appends a state inferred from behaviour; never adjusts anything
    #[instrument(skip(self, trigger_context), fields(owner = %owner))]
    pub fn record_inferred_mood(
        &self,
        owner: &str,
        levels: MoodLevels,
        trigger_context: &str,
        session_id: Option<String>,
    ) -> EngineResult<EmotionalStateLog> {
        let log = EmotionalStateLog::new(
            owner,
            levels,
            LogSource::Inferred,
            trigger_context.trim().to_string(),
            session_id,
            self.clock.now(),
        );
        repo::create_emotional_log(&self.pool, &log)?;
        Ok(log)
    }

    /// Averaged state over the last `window_days` days; `None` without logs
    pub fn recent_state(&self, owner: &str, window_days: i64) -> EngineResult<Option<RecentState>> {
        if window_days <= 0 {
            return Err(EngineError::invariant("window must be at least one day"));
        }
        let since = self.clock.now() - Duration::days(window_days);
        let logs = repo::list_emotional_logs_since(&self.pool, owner, since)?;
        Ok(average_levels(&logs).map(|levels| RecentState {
            levels,
            entries: logs.len(),
            since,
            needs_attention: levels.needs_attention(),
        }))
    }
}

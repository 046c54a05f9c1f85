//! Event planning
//!
//! Creating or editing an event asks the advisor for a plan, places the
//! plan's tasks into sessions and stores event and sessions together. When
//! the advisor has nothing to offer, or its plan cannot be placed, uniform
//! fallback sessions are used instead.

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::advisor::PlanRequest;
use crate::engine::StudyEngine;
use crate::errors::{EngineError, EngineResult};
use crate::models::{Event, EventUpdate, NewEvent, Session};
use crate::repo;

mod fallback;
mod materializer;

pub use fallback::{fallback_count, fallback_duration, fallback_sessions, fallback_size};
pub use materializer::{
    BASE_HOUR, DEFAULT_HORIZON_DAYS, LAST_HOUR, Placement, STAGGER_HOURS, horizon_days, materialize_plan,
    place_sessions, sessions_per_day, slot_start,
};

/// Where a set of sessions came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanSource {
    Advisor,
    Fallback,
}

/// An event with its newly generated pending sessions
#[derive(Debug, Clone, Serialize)]
pub struct PlannedEvent {
    pub event: Event,
    pub sessions: Vec<Session>,
    /// `None` when the sessions were left untouched
    pub source: Option<PlanSource>,
    /// Pending sessions deleted by a regeneration
    pub removed: usize,
}

impl StudyEngine {
    /// Generates pending sessions for an event
    async fn plan_sessions(&self, event: &Event, force_regenerate: bool) -> EngineResult<(Vec<Session>, PlanSource)> {
        let prefs = self.preferences(&event.get_owner())?;
        let capacity = prefs.get_daily_capacity_minutes();
        let today = self.clock.today();
        let event_day = self.clock.local_date(event.get_event_date());
        let now = self.clock.now();

        let request = PlanRequest::from_event(event, capacity, &prefs.get_focus_mode());
        if let Some(plan) = self.advisor.generate_learning_plan(&request, force_regenerate).await {
            match materialize_plan(&plan, event, today, event_day, capacity, now) {
                Ok(sessions) => return Ok((sessions, PlanSource::Advisor)),
                Err(EngineError::ScheduleInfeasible(reason)) => {
                    warn!(%reason, "Advisor plan cannot be placed, using fallback sessions");
                }
                Err(err) => return Err(err),
            }
        }

        info!("Using fallback sessions");
        let sessions = fallback_sessions(event, today, event_day, capacity, now)?;
        Ok((sessions, PlanSource::Fallback))
    }

    /// Creates an event and its study sessions
    ///
    /// ### Arguments
    ///
    /// * `owner` - The acting user
    /// * `fields` - Event fields
    ///
    /// ### Returns
    ///
    /// The stored event with its sessions; nothing is stored on error
    #[instrument(skip(self, fields), fields(owner = %owner, title = %fields.title))]
    pub async fn create_event(&self, owner: &str, fields: NewEvent) -> EngineResult<PlannedEvent> {
        let event = Event::new(owner, fields, self.clock.now())?;
        let (sessions, source) = self.plan_sessions(&event, false).await?;
        repo::create_event_with_sessions(&self.pool, &event, &sessions)?;

        info!(event_id = %event.get_id(), sessions = sessions.len(), ?source, "Event created");
        Ok(PlannedEvent {
            event,
            sessions,
            source: Some(source),
            removed: 0,
        })
    }

    /// Edits an event
    ///
    /// Pending sessions are regenerated only when a planning field changed;
    /// completed, skipped, in-progress and postponed sessions are kept.
    #[instrument(skip(self, update), fields(owner = %owner, event_id = %event_id))]
    pub async fn update_event(&self, owner: &str, event_id: &str, update: EventUpdate) -> EngineResult<PlannedEvent> {
        let mut event = self.event(owner, event_id)?;
        let plan_changed = event.apply_update(update, self.clock.now())?;

        if !plan_changed {
            repo::update_event_with_sessions(&self.pool, &event, None)?;
            info!("Event updated, plan unchanged");
            return Ok(PlannedEvent {
                event,
                sessions: Vec::new(),
                source: None,
                removed: 0,
            });
        }

        let (sessions, source) = self.plan_sessions(&event, false).await?;
        let removed = repo::update_event_with_sessions(&self.pool, &event, Some(&sessions))?;
        info!(removed, created = sessions.len(), ?source, "Event updated, pending sessions regenerated");
        Ok(PlannedEvent {
            event,
            sessions,
            source: Some(source),
            removed,
        })
    }

    /// Regenerates an event's pending sessions on request
    ///
    /// With `force_regenerate` a fresh plan is requested even if one is cached.
    #[instrument(skip(self), fields(owner = %owner, event_id = %event_id))]
    pub async fn replan_event(&self, owner: &str, event_id: &str, force_regenerate: bool) -> EngineResult<PlannedEvent> {
        let event = self.event(owner, event_id)?;
        let (sessions, source) = self.plan_sessions(&event, force_regenerate).await?;
        let removed = repo::replace_pending_sessions(&self.pool, &event.get_id(), &sessions)?;
        info!(removed, created = sessions.len(), ?source, "Pending sessions regenerated");
        Ok(PlannedEvent {
            event,
            sessions,
            source: Some(source),
            removed,
        })
    }

    /// Deletes an event and everything attached to it
    #[instrument(skip(self), fields(owner = %owner, event_id = %event_id))]
    pub fn delete_event(&self, owner: &str, event_id: &str) -> EngineResult<()> {
        if repo::delete_event(&self.pool, owner, event_id)? {
            info!("Event deleted");
            Ok(())
        } else {
            Err(EngineError::NotFound)
        }
    }
}

#[cfg(test)]
mod tests;

#[cfg(test)]
mod prop_tests;

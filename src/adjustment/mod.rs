//! Confirmation-gated plan adjustments
//!
//! Triggers are evaluated after execution updates, mood logs and
//! diagnostic analyses. A firing evaluation asks the advisor for a proposal
//! and stores it as a pending suggestion; sessions change only when the
//! owner accepts it, and then all at once.

use chrono::Duration;
use serde_json::json;
use tracing::{info, instrument};

use crate::advisor::{EventSnapshot, PerformanceMetrics, SessionSnapshot};
use crate::engine::StudyEngine;
use crate::errors::{EngineError, EngineResult};
use crate::models::{AdjustmentSuggestion, SessionStatus, SuggestionStatus};
use crate::repo;

mod apply;
mod triggers;

pub use apply::{PlanChanges, plan_changes, split_sizes};
pub use triggers::{
    LOW_SCORE_PERCENT, MIN_COMPLETED_FOR_OVERRUN, MIN_SKIPPED, OVERRUN_PERCENT, SKIPPED_PERCENT, Signal, Trigger,
    emotional_triggers, execution_triggers, is_at_risk, is_overrunning, is_skipping, signal_triggers, trigger_label,
};

/// How far ahead the owner's schedule is read when looking for free slots
const SLOT_LOOKAHEAD_DAYS: i64 = 366;

impl StudyEngine {
    /// Evaluates an event's triggers and stores a suggestion if any fire
    ///
    /// Simultaneous triggers produce one suggestion labelled with all of
    /// them. Nothing is stored when the same label is already pending for
    /// the event or the advisor has no proposal.
    ///
    /// ### Arguments
    ///
    /// * `owner` - The acting user
    /// * `event_id` - The event to evaluate
    /// * `signal` - A mood log or diagnostic analysis that was just submitted
    ///
    /// ### Returns
    ///
    /// The new pending suggestion, if one was stored
    #[instrument(skip(self, signal), fields(owner = %owner, event_id = %event_id))]
    pub async fn evaluate_triggers(
        &self,
        owner: &str,
        event_id: &str,
        signal: Option<Signal>,
    ) -> EngineResult<Option<AdjustmentSuggestion>> {
        let event = self.event(owner, event_id)?;
        let sessions = repo::list_sessions_for_event(&self.pool, &event.get_id())?;
        let now = self.clock.now();
        let days_until = event.days_until(now);

        let signalled = signal.as_ref().map(signal_triggers).unwrap_or_default();
        let mut fired = execution_triggers(&sessions, days_until);
        fired.extend(signalled.iter().copied());
        if fired.is_empty() {
            return Ok(None);
        }

        let label = trigger_label(&fired);
        if repo::pending_suggestion_exists(&self.pool, &event.get_id(), &label)? {
            info!(%label, "Suggestion with the same triggers still pending");
            return Ok(None);
        }

        let snapshots = SessionSnapshot::from_sessions(&sessions);
        let metrics = PerformanceMetrics::from_sessions(&sessions, days_until);
        let proposal = match signal.as_ref().filter(|_| !signalled.is_empty()) {
            Some(signal) => {
                let (emotional, diagnostic) = match signal {
                    Signal::Emotional(state) => (Some(state), None),
                    Signal::Diagnostic(analysis) => (None, Some(analysis)),
                };
                self.advisor
                    .suggest_plan_adjustments(&EventSnapshot::from_event(&event, now), emotional, diagnostic, &snapshots)
                    .await
            }
            None => self.advisor.suggest_replan(&event.get_title(), &snapshots, &label, &metrics).await,
        };
        let Some(proposal) = proposal else {
            info!(%label, "Triggers fired but the advisor had no proposal");
            return Ok(None);
        };

        let context = json!({
            "triggers": fired,
            "issue_detected": proposal.issue_detected,
            "metrics": metrics,
            "signal": signal,
            "sessions": snapshots,
        });
        let suggestion = AdjustmentSuggestion::new(
            &event.get_id(),
            owner,
            &label,
            context,
            &proposal.adjustments,
            &proposal.rationale,
            now,
        )?;
        repo::create_suggestion(&self.pool, &suggestion)?;
        info!(%label, suggestion_id = %suggestion.get_id(), "Stored pending suggestion");
        Ok(Some(suggestion))
    }

    /// Suggestions of `owner`, newest first, optionally filtered by status
    pub fn suggestions(&self, owner: &str, status: Option<SuggestionStatus>) -> EngineResult<Vec<AdjustmentSuggestion>> {
        Ok(repo::list_suggestions(&self.pool, owner, status)?)
    }

    pub fn suggestion(&self, owner: &str, suggestion_id: &str) -> EngineResult<AdjustmentSuggestion> {
        repo::get_suggestion(&self.pool, owner, suggestion_id)?.ok_or(EngineError::NotFound)
    }

    /// Accepts a pending suggestion and applies every adjustment
    ///
    /// All session writes and the status change share one transaction. A
    /// suggestion that was already reviewed is returned unchanged.
    ///
    /// ### Errors
    ///
    /// `InvariantViolation` when an adjustment cannot be applied or a
    /// session changed in the meantime; the suggestion then stays pending
    #[instrument(skip(self, notes), fields(owner = %owner, suggestion_id = %suggestion_id))]
    pub fn accept_suggestion(&self, owner: &str, suggestion_id: &str, notes: &str) -> EngineResult<AdjustmentSuggestion> {
        let suggestion = self.suggestion(owner, suggestion_id)?;
        if !suggestion.is_pending() {
            info!(status = %suggestion.get_status(), "Suggestion already reviewed");
            return Ok(suggestion);
        }

        let adjustments = suggestion.parsed_adjustments()?;
        let pending: Vec<_> = repo::list_sessions_for_event(&self.pool, &suggestion.get_event_id())?
            .into_iter()
            .filter(|s| s.get_status() == SessionStatus::Pending)
            .collect();
        let today = self.clock.today();
        let occupied: Vec<_> = repo::list_sessions_between(
            &self.pool,
            owner,
            today - Duration::days(1),
            today + Duration::days(SLOT_LOOKAHEAD_DAYS),
        )?
        .into_iter()
        .filter(|s| !pending.iter().any(|p| p.get_id() == s.get_id()))
        .map(|s| (s.get_date(), s.get_start_time()))
        .collect();

        let now = self.clock.now();
        let changes = plan_changes(&pending, &occupied, &adjustments, now)?;
        let applied = repo::accept_suggestion(&self.pool, &suggestion.get_id(), now, notes, &changes.updated, &changes.created)?;
        if applied {
            info!(
                updated = changes.updated.len(),
                created = changes.created.len(),
                "Suggestion accepted"
            );
        }
        self.suggestion(owner, suggestion_id)
    }

    /// Rejects a pending suggestion; sessions are never touched
    #[instrument(skip(self, notes), fields(owner = %owner, suggestion_id = %suggestion_id))]
    pub fn reject_suggestion(&self, owner: &str, suggestion_id: &str, notes: &str) -> EngineResult<AdjustmentSuggestion> {
        let suggestion = self.suggestion(owner, suggestion_id)?;
        if !suggestion.is_pending() {
            info!(status = %suggestion.get_status(), "Suggestion already reviewed");
            return Ok(suggestion);
        }
        repo::reject_suggestion(&self.pool, &suggestion.get_id(), self.clock.now(), notes)?;
        info!("Suggestion rejected");
        self.suggestion(owner, suggestion_id)
    }
}


#[cfg(test)]
mod prop_tests;

use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{JsonValue, SuggestionStatus};
use crate::errors::{EngineError, EngineResult};
use crate::gate::PlanAdjustment;

/// A proposed plan change waiting for the user's decision
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::adjustment_suggestions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AdjustmentSuggestion {
    id: String,
    event_id: String,
    owner: String,
    /// Trigger labels joined with `+`
    triggered_by: String,
    triggered_at: NaiveDateTime,
    /// Snapshot of what the engine saw when the triggers fired
    context: JsonValue,
    /// Validated list of adjustments
    adjustments: JsonValue,
    rationale: String,
    status: SuggestionStatus,
    reviewed_at: Option<NaiveDateTime>,
    user_notes: String,
}

impl AdjustmentSuggestion {
    /// Creates a pending suggestion
    ///
    /// ### Arguments
    ///
    /// * `event_id` - Event whose plan would change
    /// * `owner` - Owner of the event
    /// * `triggered_by` - Joined trigger label
    /// * `context` - Snapshot of the triggering state
    /// * `adjustments` - Validated adjustments
    /// * `rationale` - Why the change is proposed
    /// * `now` - When the triggers fired
    ///
    /// ### Errors
    ///
    /// Returns `InvariantViolation` when the rationale is blank
    pub fn new(
        event_id: &str,
        owner: &str,
        triggered_by: &str,
        context: serde_json::Value,
        adjustments: &[PlanAdjustment],
        rationale: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<Self> {
        if rationale.trim().is_empty() {
            return Err(EngineError::invariant("suggestion rationale must not be empty"));
        }
        let adjustments = serde_json::to_value(adjustments)
            .map_err(|e| EngineError::Storage(anyhow::Error::from(e)))?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            event_id: event_id.to_string(),
            owner: owner.to_string(),
            triggered_by: triggered_by.to_string(),
            triggered_at: now.naive_utc(),
            context: JsonValue(context),
            adjustments: JsonValue(adjustments),
            rationale: rationale.trim().to_string(),
            status: SuggestionStatus::Pending,
            reviewed_at: None,
            user_notes: String::new(),
        })
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

    pub fn get_triggered_by(&self) -> String {
        self.triggered_by.clone()
    }

    pub fn get_triggered_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.triggered_at, Utc)
    }

    pub fn get_context(&self) -> JsonValue {
        self.context.clone()
    }

    pub fn get_adjustments(&self) -> JsonValue {
        self.adjustments.clone()
    }

    /// Decodes the stored adjustments
    pub fn parsed_adjustments(&self) -> EngineResult<Vec<PlanAdjustment>> {
        serde_json::from_value(self.adjustments.0.clone())
            .map_err(|e| EngineError::Storage(anyhow::Error::from(e).context("stored adjustments are unreadable")))
    }

    pub fn get_rationale(&self) -> String {
        self.rationale.clone()
    }

    pub fn get_status(&self) -> SuggestionStatus {
        self.status
    }

    pub fn is_pending(&self) -> bool {
        self.status == SuggestionStatus::Pending
    }

    pub fn get_reviewed_at(&self) -> Option<DateTime<Utc>> {
        self.reviewed_at.map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc))
    }

    pub fn get_user_notes(&self) -> String {
        self.user_notes.clone()
    }
}

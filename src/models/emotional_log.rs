use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Level, LogSource};

/// One entry of the append-only emotional state log
///
/// Only energy, stress and focus are ever recorded.
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::emotional_logs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct EmotionalStateLog {
    id: String,
    owner: String,
    logged_at: NaiveDateTime,
    energy: Level,
    stress: Level,
    focus: Level,
    source: LogSource,
    /// Free-form note on what prompted the entry
    trigger_context: String,
    session_id: Option<String>,
}

/// The three recorded dimensions of an emotional state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodLevels {
    pub energy: Level,
    pub stress: Level,
    pub focus: Level,
}

impl MoodLevels {
    pub fn is_high_stress(&self) -> bool {
        self.stress == Level::High
    }

    pub fn is_low_energy(&self) -> bool {
        self.energy == Level::Low
    }

    pub fn is_low_focus(&self) -> bool {
        self.focus == Level::Low
    }

    /// High stress, or low energy together with low focus
    pub fn needs_attention(&self) -> bool {
        self.is_high_stress() || (self.is_low_energy() && self.is_low_focus())
    }
}

impl EmotionalStateLog {
    /// Creates a new log entry
    ///
    /// ### Arguments
    ///
    /// * `owner` - The user reporting
    /// * `levels` - Energy, stress and focus
    /// * `source` - Self report or inferred
    /// * `trigger_context` - What prompted the entry
    /// * `session_id` - Optional session the entry relates to
    /// * `logged_at` - When the state was observed
    pub fn new(
        owner: &str,
        levels: MoodLevels,
        source: LogSource,
        trigger_context: String,
        session_id: Option<String>,
        logged_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner: owner.to_string(),
            logged_at: logged_at.naive_utc(),
            energy: levels.energy,
            stress: levels.stress,
            focus: levels.focus,
            source,
            trigger_context,
            session_id,
        }
    }

    pub fn get_id(&self) -> String {
        self.id.clone()
    }

    pub fn get_owner(&self) -> String {
        self.owner.clone()
    }

    pub fn get_logged_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.logged_at, Utc)
    }

    pub fn get_levels(&self) -> MoodLevels {
        MoodLevels {
            energy: self.energy,
            stress: self.stress,
            focus: self.focus,
        }
    }

    pub fn get_source(&self) -> LogSource {
        self.source
    }

    pub fn get_trigger_context(&self) -> String {
        self.trigger_context.clone()
    }

    pub fn get_session_id(&self) -> Option<String> {
        self.session_id.clone()
    }
}

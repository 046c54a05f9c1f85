use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, EngineResult};

/// Smallest daily capacity that still fits one session
pub const MIN_DAILY_CAPACITY_MINUTES: i32 = 20;

/// Per-owner planning preferences
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::user_preferences)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserPreferences {
    owner: String,
    daily_capacity_minutes: i32,
    focus_mode: String,
    updated_at: NaiveDateTime,
    enable_overload_alerts: bool,
}

impl UserPreferences {
    /// Creates preferences for an owner, with overload alerts on
    ///
    /// ### Errors
    ///
    /// Returns `InvariantViolation` when the capacity is below 20 minutes or
    /// the focus mode is unknown
    pub fn new(owner: &str, daily_capacity_minutes: i32, focus_mode: &str, now: DateTime<Utc>) -> EngineResult<Self> {
        if daily_capacity_minutes < MIN_DAILY_CAPACITY_MINUTES {
            return Err(EngineError::InvariantViolation(format!(
                "daily capacity must be at least {} minutes",
                MIN_DAILY_CAPACITY_MINUTES
            )));
        }
        let mode = FocusMode::named(focus_mode)
            .ok_or_else(|| EngineError::InvariantViolation(format!("unknown focus mode `{}`", focus_mode)))?;
        Ok(Self {
            owner: owner.to_string(),
            daily_capacity_minutes,
            focus_mode: mode.name.to_string(),
            updated_at: now.naive_utc(),
            enable_overload_alerts: true,
        })
    }

    pub fn with_overload_alerts(mut self, enabled: bool) -> Self {
        self.enable_overload_alerts = enabled;
        self
    }

    pub fn get_owner(&self) -> String {
        self.owner.clone()
    }

    pub fn get_daily_capacity_minutes(&self) -> i32 {
        self.daily_capacity_minutes
    }

    pub fn get_focus_mode(&self) -> String {
        self.focus_mode.clone()
    }

    /// The focus mode's timings, Pomodoro when the stored name is unknown
    pub fn focus_mode(&self) -> FocusMode {
        FocusMode::named(&self.focus_mode).unwrap_or(FocusMode::POMODORO)
    }

    pub fn get_updated_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.updated_at, Utc)
    }

    /// Whether `daily_load` raises capacity alerts
    pub fn get_enable_overload_alerts(&self) -> bool {
        self.enable_overload_alerts
    }
}

/// Focus and break lengths of a study rhythm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FocusMode {
    pub name: &'static str,
    pub focus_minutes: i32,
    pub break_minutes: i32,
}

impl FocusMode {
    pub const POMODORO: FocusMode = FocusMode { name: "Pomodoro", focus_minutes: 25, break_minutes: 5 };
    pub const EXTENDED: FocusMode = FocusMode { name: "Extended", focus_minutes: 45, break_minutes: 10 };
    pub const DEEP_WORK: FocusMode = FocusMode { name: "Deep Work", focus_minutes: 60, break_minutes: 15 };

    pub const ALL: [FocusMode; 3] = [Self::POMODORO, Self::EXTENDED, Self::DEEP_WORK];

    /// Looks a mode up by name, ignoring case, spaces and underscores
    pub fn named(name: &str) -> Option<FocusMode> {
        let wanted = canonical(name);
        Self::ALL.into_iter().find(|mode| canonical(mode.name) == wanted)
    }
}

fn canonical(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

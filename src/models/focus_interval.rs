use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A completed stretch of focused work reported by the focus timer
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::focus_intervals)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct FocusInterval {
    id: String,
    owner: String,
    session_id: String,
    minutes: i32,
    recorded_at: NaiveDateTime,
}

impl FocusInterval {
    pub fn new(owner: &str, session_id: &str, minutes: i32, recorded_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner: owner.to_string(),
            session_id: session_id.to_string(),
            minutes,
            recorded_at: recorded_at.naive_utc(),
        }
    }

    pub fn get_id(&self) -> String {
        self.id.clone()
    }

    pub fn get_owner(&self) -> String {
        self.owner.clone()
    }

    pub fn get_session_id(&self) -> String {
        self.session_id.clone()
    }

    pub fn get_minutes(&self) -> i32 {
        self.minutes
    }

    pub fn get_recorded_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.recorded_at, Utc)
    }
}

use crate::db::DbPool;
use crate::models::{EmotionalStateLog, LogSource};
use crate::schema::emotional_logs;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use anyhow::Result;
use tracing::{instrument, debug, info};

/// Appends an entry to the emotional log
#[instrument(skip(pool, log), fields(owner = %log.get_owner(), source = %log.get_source()))]
pub fn create_emotional_log(pool: &DbPool, log: &EmotionalStateLog) -> Result<()> {
    let conn = &mut pool.get()?;
    diesel::insert_into(emotional_logs::table).values(log).execute(conn)?;
    debug!("Stored emotional log {}", log.get_id());
    Ok(())
}

/// Stores a self report unless the owner already reported within the window
///
/// The check and the insert share one transaction.
///
/// ### Arguments
///
/// * `pool` - A reference to the database connection pool
/// * `log` - The self report to store
/// * `day_start` - Start of the owner's local day, as a UTC instant
/// * `day_end` - End of the owner's local day (exclusive)
///
/// ### Returns
///
/// `true` if the report was stored, `false` if one already existed
#[instrument(skip(pool, log), fields(owner = %log.get_owner()))]
pub fn create_self_report_once(
    pool: &DbPool,
    log: &EmotionalStateLog,
    day_start: DateTime<Utc>,
    day_end: DateTime<Utc>,
) -> Result<bool> {
    let conn = &mut pool.get()?;
    let stored = conn.transaction::<_, anyhow::Error, _>(|conn| {
        let existing: i64 = emotional_logs::table
            .filter(emotional_logs::owner.eq(log.get_owner()))
            .filter(emotional_logs::source.eq(LogSource::SelfReport))
            .filter(emotional_logs::logged_at.ge(day_start.naive_utc()))
            .filter(emotional_logs::logged_at.lt(day_end.naive_utc()))
            .count()
            .get_result(conn)?;
        if existing > 0 {
            return Ok(false);
        }
        diesel::insert_into(emotional_logs::table).values(log).execute(conn)?;
        Ok(true)
    })?;
    if stored {
        info!("Stored self report {}", log.get_id());
    } else {
        info!("Self report already recorded today");
    }
    Ok(stored)
}

/// Lists an owner's log entries since an instant, newest first
#[instrument(skip(pool), fields(owner = %owner, since = %since))]
pub fn list_emotional_logs_since(pool: &DbPool, owner: &str, since: DateTime<Utc>) -> Result<Vec<EmotionalStateLog>> {
    let conn = &mut pool.get()?;
    let result = emotional_logs::table
        .filter(emotional_logs::owner.eq(owner))
        .filter(emotional_logs::logged_at.ge(since.naive_utc()))
        .order(emotional_logs::logged_at.desc())
        .select(EmotionalStateLog::as_select())
        .load(conn)?;
    Ok(result)
}

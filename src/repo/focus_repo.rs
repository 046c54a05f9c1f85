use crate::db::DbPool;
use crate::models::FocusInterval;
use crate::schema::focus_intervals;
use chrono::{DateTime, Utc};
use diesel::dsl::sum;
use diesel::prelude::*;
use anyhow::Result;
use tracing::{instrument, debug};

/// Records a focus interval and returns the session's new total
///
/// ### Arguments
///
/// * `pool` - A reference to the database connection pool
/// * `interval` - The completed interval
///
/// ### Returns
///
/// The sum of all focus minutes recorded for the interval's session
#[instrument(skip(pool, interval), fields(session_id = %interval.get_session_id(), minutes = interval.get_minutes()))]
pub fn record_focus_interval(pool: &DbPool, interval: &FocusInterval) -> Result<i32> {
    let conn = &mut pool.get()?;
    let total = conn.transaction::<_, anyhow::Error, _>(|conn| {
        diesel::insert_into(focus_intervals::table)
            .values(interval)
            .execute(conn)?;
        let total: Option<i64> = focus_intervals::table
            .filter(focus_intervals::session_id.eq(interval.get_session_id()))
            .select(sum(focus_intervals::minutes))
            .first(conn)?;
        Ok(total.unwrap_or(0))
    })?;
    debug!("Session focus total is now {} minutes", total);
    Ok(i32::try_from(total).unwrap_or(i32::MAX))
}

/// Lists an owner's focus intervals recorded in `[from, to)`, oldest first
#[instrument(skip(pool), fields(owner = %owner))]
pub fn list_focus_intervals_between(
    pool: &DbPool,
    owner: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<FocusInterval>> {
    let conn = &mut pool.get()?;
    let result = focus_intervals::table
        .filter(focus_intervals::owner.eq(owner))
        .filter(focus_intervals::recorded_at.ge(from.naive_utc()))
        .filter(focus_intervals::recorded_at.lt(to.naive_utc()))
        .order(focus_intervals::recorded_at.asc())
        .select(FocusInterval::as_select())
        .load(conn)?;
    Ok(result)
}

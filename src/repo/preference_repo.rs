use crate::db::DbPool;
use crate::models::UserPreferences;
use crate::schema::user_preferences;
use diesel::prelude::*;
use anyhow::Result;
use tracing::{instrument, debug};

/// Retrieves an owner's stored preferences
#[instrument(skip(pool), fields(owner = %owner))]
pub fn get_preferences(pool: &DbPool, owner: &str) -> Result<Option<UserPreferences>> {
    let conn = &mut pool.get()?;
    let result = user_preferences::table
        .find(owner)
        .select(UserPreferences::as_select())
        .first(conn)
        .optional()?;
    Ok(result)
}

/// Inserts or replaces an owner's preferences
#[instrument(skip(pool, prefs), fields(owner = %prefs.get_owner()))]
pub fn upsert_preferences(pool: &DbPool, prefs: &UserPreferences) -> Result<()> {
    let conn = &mut pool.get()?;
    diesel::insert_into(user_preferences::table)
        .values(prefs)
        .on_conflict(user_preferences::owner)
        .do_update()
        .set((
            user_preferences::daily_capacity_minutes.eq(prefs.get_daily_capacity_minutes()),
            user_preferences::focus_mode.eq(prefs.get_focus_mode()),
            user_preferences::updated_at.eq(prefs.get_updated_at().naive_utc()),
            user_preferences::enable_overload_alerts.eq(prefs.get_enable_overload_alerts()),
        ))
        .execute(conn)?;
    debug!("Stored preferences");
    Ok(())
}

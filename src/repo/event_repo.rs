use crate::db::DbPool;
use crate::models::{Event, Session, SessionStatus};
use crate::schema::{events, study_sessions};
use diesel::prelude::*;
use anyhow::Result;
use tracing::{instrument, debug, info};

use super::session_repo::{delete_pending_sessions, insert_sessions};

/// Creates an event together with its materialized sessions
///
/// Both writes happen in one transaction, so an event never exists with a
/// half-written plan.
///
/// ### Arguments
///
/// * `pool` - A reference to the database connection pool
/// * `event` - The event to insert
/// * `sessions` - Its pending sessions
///
/// ### Errors
///
/// Returns an error if:
/// - Unable to get a connection from the pool
/// - Either insert fails, in which case nothing is written
#[instrument(skip(pool, event, sessions), fields(event_id = %event.get_id(), sessions = sessions.len()))]
pub fn create_event_with_sessions(pool: &DbPool, event: &Event, sessions: &[Session]) -> Result<()> {
    let conn = &mut pool.get()?;
    conn.transaction::<_, anyhow::Error, _>(|conn| {
        diesel::insert_into(events::table).values(event).execute(conn)?;
        insert_sessions(conn, sessions)?;
        Ok(())
    })?;
    info!("Created event {} with {} sessions", event.get_id(), sessions.len());
    Ok(())
}

/// Saves an edited event, optionally replacing its pending sessions
///
/// ### Arguments
///
/// * `pool` - A reference to the database connection pool
/// * `event` - The edited event
/// * `replacement` - New pending sessions, or `None` to keep the current plan
///
/// ### Returns
///
/// The number of pending sessions removed
#[instrument(skip(pool, event, replacement), fields(event_id = %event.get_id(), replan = replacement.is_some()))]
pub fn update_event_with_sessions(pool: &DbPool, event: &Event, replacement: Option<&[Session]>) -> Result<usize> {
    let conn = &mut pool.get()?;
    let removed = conn.transaction::<_, anyhow::Error, _>(|conn| {
        diesel::update(events::table.filter(events::id.eq(event.get_id())))
            .set((
                events::title.eq(event.get_title()),
                events::event_type.eq(event.get_event_type()),
                events::event_date.eq(event.get_event_date().naive_utc()),
                events::subject.eq(event.get_subject()),
                events::priority.eq(event.get_priority()),
                events::prep_hours.eq(event.get_prep_hours()),
                events::description.eq(event.get_description()),
                events::updated_at.eq(event.get_updated_at().naive_utc()),
            ))
            .execute(conn)?;
        match replacement {
            Some(sessions) => {
                let removed = delete_pending_sessions(conn, &event.get_id())?;
                insert_sessions(conn, sessions)?;
                Ok(removed)
            }
            None => Ok(0),
        }
    })?;
    debug!("Updated event, removed {} pending sessions", removed);
    Ok(removed)
}

/// Retrieves an event owned by `owner`
///
/// ### Returns
///
/// `None` when the event does not exist or belongs to someone else
#[instrument(skip(pool), fields(owner = %owner, event_id = %event_id))]
pub fn get_event(pool: &DbPool, owner: &str, event_id: &str) -> Result<Option<Event>> {
    let conn = &mut pool.get()?;
    let result = events::table
        .filter(events::id.eq(event_id))
        .filter(events::owner.eq(owner))
        .select(Event::as_select())
        .first(conn)
        .optional()?;
    Ok(result)
}

/// Lists an owner's events by date
#[instrument(skip(pool), fields(owner = %owner))]
pub fn list_events(pool: &DbPool, owner: &str) -> Result<Vec<Event>> {
    let conn = &mut pool.get()?;
    let result = events::table
        .filter(events::owner.eq(owner))
        .order(events::event_date.asc())
        .select(Event::as_select())
        .load(conn)?;
    debug!("Found {} events", result.len());
    Ok(result)
}

/// Lists an owner's events that still have pending sessions
#[instrument(skip(pool), fields(owner = %owner))]
pub fn list_events_with_pending_sessions(pool: &DbPool, owner: &str) -> Result<Vec<Event>> {
    let conn = &mut pool.get()?;
    let pending_event_ids = study_sessions::table
        .filter(study_sessions::owner.eq(owner))
        .filter(study_sessions::status.eq(SessionStatus::Pending))
        .select(study_sessions::event_id);
    let result = events::table
        .filter(events::owner.eq(owner))
        .filter(events::id.eq_any(pending_event_ids))
        .order(events::event_date.asc())
        .select(Event::as_select())
        .load(conn)?;
    Ok(result)
}

/// Deletes an event and, through the foreign-key cascade, everything under it
///
/// ### Returns
///
/// `true` if an owned event was deleted
#[instrument(skip(pool), fields(owner = %owner, event_id = %event_id))]
pub fn delete_event(pool: &DbPool, owner: &str, event_id: &str) -> Result<bool> {
    let conn = &mut pool.get()?;
    let rows = diesel::delete(
        events::table
            .filter(events::id.eq(event_id))
            .filter(events::owner.eq(owner)),
    )
    .execute(conn)?;
    if rows > 0 {
        info!("Deleted event {}", event_id);
    }
    Ok(rows > 0)
}

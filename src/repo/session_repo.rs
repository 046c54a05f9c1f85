use crate::db::DbPool;
use crate::errors::WriteConflict;
use crate::models::{Session, SessionStatus};
use crate::schema::study_sessions;
use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use anyhow::Result;
use tracing::{instrument, debug, info};

/// Inserts sessions on an existing connection
pub(crate) fn insert_sessions(conn: &mut SqliteConnection, sessions: &[Session]) -> Result<usize> {
    if sessions.is_empty() {
        return Ok(0);
    }
    let inserted = diesel::insert_into(study_sessions::table)
        .values(sessions)
        .execute(conn)?;
    Ok(inserted)
}

/// Writes every mutable field of a session, provided it is still in one of
/// the `expected` statuses
///
/// ### Errors
///
/// Returns a `WriteConflict` when no row matched, which rolls back any
/// surrounding transaction
pub(crate) fn write_session_guarded(
    conn: &mut SqliteConnection,
    session: &Session,
    expected: &[SessionStatus],
) -> Result<()> {
    let rows = diesel::update(
        study_sessions::table
            .filter(study_sessions::id.eq(session.get_id()))
            .filter(study_sessions::status.eq_any(expected.to_vec())),
    )
    .set((
        study_sessions::session_date.eq(session.get_date()),
        study_sessions::start_time.eq(session.get_start_time()),
        study_sessions::duration_minutes.eq(session.get_duration_minutes()),
        study_sessions::suggested_content.eq(session.get_suggested_content()),
        study_sessions::status.eq(session.get_status()),
        study_sessions::focus_mode.eq(session.get_focus_mode()),
        study_sessions::actual_start.eq(session.get_actual_start().map(|d| d.naive_utc())),
        study_sessions::actual_end.eq(session.get_actual_end().map(|d| d.naive_utc())),
        study_sessions::actual_duration_minutes.eq(session.get_actual_duration_minutes()),
        study_sessions::notes.eq(session.get_notes()),
        study_sessions::updated_at.eq(session.get_updated_at().naive_utc()),
    ))
    .execute(conn)?;

    if rows == 0 {
        return Err(WriteConflict(format!(
            "session {} is no longer {}",
            session.get_id(),
            expected.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(" or ")
        ))
        .into());
    }
    Ok(())
}

/// Deletes the pending sessions of an event and inserts their replacements
/// in one transaction
///
/// Sessions in any other status are left untouched.
///
/// ### Arguments
///
/// * `pool` - A reference to the database connection pool
/// * `event_id` - The event whose pending sessions are replaced
/// * `sessions` - The new pending sessions
///
/// ### Returns
///
/// The number of pending sessions that were removed
#[instrument(skip(pool, sessions), fields(event_id = %event_id, new_sessions = sessions.len()))]
pub fn replace_pending_sessions(pool: &DbPool, event_id: &str, sessions: &[Session]) -> Result<usize> {
    let conn = &mut pool.get()?;
    let removed = conn.transaction::<_, anyhow::Error, _>(|conn| {
        let removed = delete_pending_sessions(conn, event_id)?;
        insert_sessions(conn, sessions)?;
        Ok(removed)
    })?;
    info!("Replaced {} pending sessions with {}", removed, sessions.len());
    Ok(removed)
}

pub(crate) fn delete_pending_sessions(conn: &mut SqliteConnection, event_id: &str) -> Result<usize> {
    let removed = diesel::delete(
        study_sessions::table
            .filter(study_sessions::event_id.eq(event_id))
            .filter(study_sessions::status.eq(SessionStatus::Pending)),
    )
    .execute(conn)?;
    Ok(removed)
}

/// Retrieves a session owned by `owner`
///
/// ### Returns
///
/// `None` when the session does not exist or belongs to someone else
#[instrument(skip(pool), fields(owner = %owner, session_id = %session_id))]
pub fn get_session(pool: &DbPool, owner: &str, session_id: &str) -> Result<Option<Session>> {
    let conn = &mut pool.get()?;
    let result = study_sessions::table
        .filter(study_sessions::id.eq(session_id))
        .filter(study_sessions::owner.eq(owner))
        .select(Session::as_select())
        .first(conn)
        .optional()?;
    if result.is_none() {
        debug!("Session not found");
    }
    Ok(result)
}

/// Lists all sessions of an event in schedule order
#[instrument(skip(pool), fields(event_id = %event_id))]
pub fn list_sessions_for_event(pool: &DbPool, event_id: &str) -> Result<Vec<Session>> {
    let conn = &mut pool.get()?;
    let sessions = study_sessions::table
        .filter(study_sessions::event_id.eq(event_id))
        .order((study_sessions::session_date.asc(), study_sessions::start_time.asc(), study_sessions::created_at.asc()))
        .select(Session::as_select())
        .load(conn)?;
    debug!("Found {} sessions", sessions.len());
    Ok(sessions)
}

/// Lists an owner's sessions scheduled between two local dates (inclusive)
#[instrument(skip(pool), fields(owner = %owner, from = %from, to = %to))]
pub fn list_sessions_between(pool: &DbPool, owner: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<Session>> {
    let conn = &mut pool.get()?;
    let sessions = study_sessions::table
        .filter(study_sessions::owner.eq(owner))
        .filter(study_sessions::session_date.ge(from))
        .filter(study_sessions::session_date.le(to))
        .order((study_sessions::session_date.asc(), study_sessions::start_time.asc()))
        .select(Session::as_select())
        .load(conn)?;
    Ok(sessions)
}

/// Lists an owner's pending and postponed sessions from a local date onwards
#[instrument(skip(pool), fields(owner = %owner, from = %from))]
pub fn list_upcoming_sessions(pool: &DbPool, owner: &str, from: NaiveDate) -> Result<Vec<Session>> {
    let conn = &mut pool.get()?;
    let sessions = study_sessions::table
        .filter(study_sessions::owner.eq(owner))
        .filter(study_sessions::session_date.ge(from))
        .filter(study_sessions::status.eq_any(vec![SessionStatus::Pending, SessionStatus::Postponed]))
        .order((study_sessions::session_date.asc(), study_sessions::start_time.asc()))
        .select(Session::as_select())
        .load(conn)?;
    Ok(sessions)
}

/// Finds the owner's running session, if any
#[instrument(skip(pool), fields(owner = %owner))]
pub fn find_active_session(pool: &DbPool, owner: &str) -> Result<Option<Session>> {
    let conn = &mut pool.get()?;
    let result = study_sessions::table
        .filter(study_sessions::owner.eq(owner))
        .filter(study_sessions::status.eq(SessionStatus::InProgress))
        .select(Session::as_select())
        .first(conn)
        .optional()?;
    Ok(result)
}

/// Persists a session change, guarded by the status it had when loaded
///
/// ### Arguments
///
/// * `pool` - A reference to the database connection pool
/// * `session` - The modified session
/// * `previous` - The status the session had before the change
///
/// ### Errors
///
/// Returns a `WriteConflict` if the stored status is no longer `previous`, or
/// a unique violation if a second session of the owner would be in progress
#[instrument(skip(pool, session), fields(session_id = %session.get_id(), status = %session.get_status()))]
pub fn save_session(pool: &DbPool, session: &Session, previous: SessionStatus) -> Result<()> {
    let conn = &mut pool.get()?;
    write_session_guarded(conn, session, &[previous])?;
    debug!("Saved session");
    Ok(())
}

/// Persists several pending-session edits atomically
///
/// Every session must still be pending; otherwise nothing is written.
#[instrument(skip(pool, sessions), fields(count = sessions.len()))]
pub fn save_pending_sessions(pool: &DbPool, sessions: &[Session]) -> Result<()> {
    let conn = &mut pool.get()?;
    conn.transaction::<_, anyhow::Error, _>(|conn| {
        for session in sessions {
            write_session_guarded(conn, session, &[SessionStatus::Pending])?;
        }
        Ok(())
    })?;
    Ok(())
}

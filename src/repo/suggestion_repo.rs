use crate::db::DbPool;
use crate::errors::WriteConflict;
use crate::models::{AdjustmentSuggestion, Session, SessionStatus, SuggestionStatus};
use crate::schema::adjustment_suggestions;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use anyhow::Result;
use tracing::{instrument, debug, info};

use super::session_repo::{insert_sessions, write_session_guarded};

/// Persists a new pending suggestion
#[instrument(skip(pool, suggestion), fields(event_id = %suggestion.get_event_id(), triggered_by = %suggestion.get_triggered_by()))]
pub fn create_suggestion(pool: &DbPool, suggestion: &AdjustmentSuggestion) -> Result<()> {
    let conn = &mut pool.get()?;
    diesel::insert_into(adjustment_suggestions::table)
        .values(suggestion)
        .execute(conn)?;
    info!("Created suggestion {}", suggestion.get_id());
    Ok(())
}

/// Retrieves a suggestion owned by `owner`
#[instrument(skip(pool), fields(owner = %owner, suggestion_id = %suggestion_id))]
pub fn get_suggestion(pool: &DbPool, owner: &str, suggestion_id: &str) -> Result<Option<AdjustmentSuggestion>> {
    let conn = &mut pool.get()?;
    let result = adjustment_suggestions::table
        .filter(adjustment_suggestions::id.eq(suggestion_id))
        .filter(adjustment_suggestions::owner.eq(owner))
        .select(AdjustmentSuggestion::as_select())
        .first(conn)
        .optional()?;
    Ok(result)
}

/// Lists an owner's suggestions, newest first
///
/// ### Arguments
///
/// * `pool` - A reference to the database connection pool
/// * `owner` - The owner
/// * `status` - Only suggestions in this status, or all when `None`
#[instrument(skip(pool), fields(owner = %owner, status = ?status))]
pub fn list_suggestions(pool: &DbPool, owner: &str, status: Option<SuggestionStatus>) -> Result<Vec<AdjustmentSuggestion>> {
    let conn = &mut pool.get()?;
    let mut query = adjustment_suggestions::table
        .filter(adjustment_suggestions::owner.eq(owner))
        .into_boxed();
    if let Some(status) = status {
        query = query.filter(adjustment_suggestions::status.eq(status));
    }
    let result = query
        .order(adjustment_suggestions::triggered_at.desc())
        .select(AdjustmentSuggestion::as_select())
        .load(conn)?;
    debug!("Found {} suggestions", result.len());
    Ok(result)
}

/// Whether the event already has a pending suggestion with this trigger label
#[instrument(skip(pool), fields(event_id = %event_id, label = %label))]
pub fn pending_suggestion_exists(pool: &DbPool, event_id: &str, label: &str) -> Result<bool> {
    let conn = &mut pool.get()?;
    let count: i64 = adjustment_suggestions::table
        .filter(adjustment_suggestions::event_id.eq(event_id))
        .filter(adjustment_suggestions::triggered_by.eq(label))
        .filter(adjustment_suggestions::status.eq(SuggestionStatus::Pending))
        .count()
        .get_result(conn)?;
    Ok(count > 0)
}

/// Moves a pending suggestion to `status`; returns false if it was not pending
fn review(
    conn: &mut SqliteConnection,
    suggestion_id: &str,
    status: SuggestionStatus,
    reviewed_at: DateTime<Utc>,
    notes: &str,
) -> Result<bool> {
    let rows = diesel::update(
        adjustment_suggestions::table
            .filter(adjustment_suggestions::id.eq(suggestion_id))
            .filter(adjustment_suggestions::status.eq(SuggestionStatus::Pending)),
    )
    .set((
        adjustment_suggestions::status.eq(status),
        adjustment_suggestions::reviewed_at.eq(Some(reviewed_at.naive_utc())),
        adjustment_suggestions::user_notes.eq(notes),
    ))
    .execute(conn)?;
    Ok(rows > 0)
}

/// Marks a pending suggestion as rejected without touching any session
///
/// ### Returns
///
/// `false` if the suggestion had already been reviewed
#[instrument(skip(pool, notes), fields(suggestion_id = %suggestion_id))]
pub fn reject_suggestion(pool: &DbPool, suggestion_id: &str, reviewed_at: DateTime<Utc>, notes: &str) -> Result<bool> {
    let conn = &mut pool.get()?;
    let changed = review(conn, suggestion_id, SuggestionStatus::Rejected, reviewed_at, notes)?;
    info!("Rejected suggestion: {}", changed);
    Ok(changed)
}

/// Accepts a pending suggestion and applies its session changes atomically
///
/// The status flip, every session update and every insert share one
/// transaction. If any updated session is no longer pending, the whole
/// acceptance rolls back and the suggestion stays pending.
///
/// ### Arguments
///
/// * `pool` - A reference to the database connection pool
/// * `suggestion_id` - The suggestion to accept
/// * `reviewed_at` - Review timestamp
/// * `notes` - User notes stored with the review
/// * `updated` - Existing pending sessions with their new values
/// * `created` - New sessions produced by splits
///
/// ### Returns
///
/// `false` if the suggestion had already been reviewed; nothing is written then
///
/// ### Errors
///
/// Returns a `WriteConflict` if a session changed since it was read
#[instrument(skip(pool, notes, updated, created), fields(suggestion_id = %suggestion_id, updated = updated.len(), created = created.len()))]
pub fn accept_suggestion(
    pool: &DbPool,
    suggestion_id: &str,
    reviewed_at: DateTime<Utc>,
    notes: &str,
    updated: &[Session],
    created: &[Session],
) -> Result<bool> {
    let conn = &mut pool.get()?;
    let applied = conn.transaction::<_, anyhow::Error, _>(|conn| {
        if !review(conn, suggestion_id, SuggestionStatus::Accepted, reviewed_at, notes)? {
            return Ok(false);
        }
        for session in updated {
            write_session_guarded(conn, session, &[SessionStatus::Pending])?;
        }
        let inserted = insert_sessions(conn, created)?;
        if inserted != created.len() {
            return Err(WriteConflict("split sessions were not all inserted".to_string()).into());
        }
        Ok(true)
    })?;
    if applied {
        info!("Accepted suggestion, {} sessions updated and {} created", updated.len(), created.len());
    }
    Ok(applied)
}

#[cfg(test)]
mod tests;

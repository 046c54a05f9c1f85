pub mod diagnostic;
pub mod event;
pub mod mood;
pub mod prefs;
pub mod session;
pub mod suggestion;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// Result type shared by every command
pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Parses an RFC 3339 instant, or a bare date taken as 09:00 UTC
pub fn parse_when(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(value.trim()) {
        return Ok(instant.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| format!("expected YYYY-MM-DD or an RFC 3339 timestamp, got `{}`", value))?;
    let morning = NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN);
    Ok(date.and_time(morning).and_utc())
}

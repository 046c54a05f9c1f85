/// Repository module
///
/// This module provides the data access layer. Every function takes the
/// connection pool, scopes reads by owner where an owner is involved, and
/// uses a single transaction for any write that touches more than one record.

mod event_repo;
mod session_repo;
mod focus_repo;
mod emotional_repo;
mod diagnostic_repo;
mod suggestion_repo;
mod preference_repo;

// Re-export all repository functions
pub use event_repo::*;
pub use session_repo::*;
pub use focus_repo::*;
pub use emotional_repo::*;
pub use diagnostic_repo::*;
pub use suggestion_repo::*;
pub use preference_repo::*;

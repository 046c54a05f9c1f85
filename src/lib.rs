/// Studyflow: an adaptive study planner
///
/// This library turns upcoming academic events into scheduled study
/// sessions, tracks how those sessions actually go, and proposes plan
/// changes that take effect only once the owner accepts them.
///
/// ### Modules
///
/// - `planner`: event lifecycle, plan materialization and the offline fallback
/// - `tracker`: session transitions, focus intervals and the daily load check
/// - `emotional`: mood log and the same-day auto-adjuster
/// - `diagnostics`: diagnostic tests and their analysis
/// - `adjustment`: triggers and the confirmation-gated suggestion protocol
/// - `advisor`: language-model client, prompt templates and providers
/// - `gate`: validation of everything the advisor returns
/// - `repo`, `db`, `schema`, `models`: the SQLite store
///
/// All operations hang off `StudyEngine`.

/// Suggestion triggers and acceptance
pub mod adjustment;

/// Language-model advisor client
pub mod advisor;

/// Time source
pub mod clock;

/// Configuration loading
pub mod config;

/// Database connection management
pub mod db;

/// Diagnostic analysis
pub mod diagnostics;

/// Mood log and auto-adjuster
pub mod emotional;

/// The engine handle
pub mod engine;

/// Error types
pub mod errors;

/// Schema gate for advisor output
pub mod gate;

/// Data models module
pub mod models;

/// Event lifecycle and plan materialization
pub mod planner;

/// Repository module for database operations
pub mod repo;

/// Database schema module
pub mod schema;

/// Execution tracking
pub mod tracker;

#[cfg(test)]
pub mod test_utils;

pub use engine::{EngineDefaults, EventProgress, StudyEngine};
pub use errors::{EngineError, EngineResult};

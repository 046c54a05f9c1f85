/// Data models module
///
/// Database records for events, sessions, focus intervals, emotional logs,
/// diagnostic tests and adjustment suggestions, plus the enumerations they
/// share. Every record carries its owner; relations are plain ids.

mod json_value;
pub use json_value::JsonValue;

mod enums;
pub use enums::{AdjustmentAction, ErrorType, EventType, Level, LogSource, SessionStatus, SuggestionStatus, TaskType};

mod event;
pub use event::{Event, EventUpdate, MAX_PREP_HOURS, NewEvent};

mod session;
pub use session::Session;

mod focus_interval;
pub use focus_interval::FocusInterval;

mod emotional_log;
pub use emotional_log::{EmotionalStateLog, MoodLevels};

mod diagnostic;
pub use diagnostic::{DiagnosticQuestion, DiagnosticTest, NewQuestion, normalize_answer};

mod suggestion;
pub use suggestion::AdjustmentSuggestion;

mod preference;
pub use preference::{FocusMode, MIN_DAILY_CAPACITY_MINUTES, UserPreferences};

use std::fmt;
use std::str::FromStr;

use diesel::deserialize::{self, FromSql};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use diesel::sqlite::{Sqlite, SqliteValue};
use serde::{Deserialize, Serialize};

/// Declares a closed set of values stored as TEXT and serialized by name
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
            diesel::expression::AsExpression, diesel::deserialize::FromSqlRow,
        )]
        #[diesel(sql_type = Text)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant ),+
        }

        impl $name {
            /// Every value, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The stored and serialized name
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(format!(
                        "unknown {} `{}`, expected one of: {}",
                        stringify!($name),
                        s,
                        [$($text),+].join(", ")
                    )),
                }
            }
        }

        impl FromSql<Text, Sqlite> for $name {
            fn from_sql(value: SqliteValue<'_, '_, '_>) -> deserialize::Result<Self> {
                let text = <String as FromSql<Text, Sqlite>>::from_sql(value)?;
                text.parse::<$name>().map_err(Into::into)
            }
        }

        impl ToSql<Text, Sqlite> for $name {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
                out.set_value(self.as_str());
                Ok(IsNull::No)
            }
        }
    };
}

text_enum! {
    /// Three-step scale used for priority, difficulty, load and mood dimensions
    pub enum Level {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
}

impl Level {
    /// Numeric value used for averaging: low=1, medium=2, high=3
    pub fn score(&self) -> f64 {
        match self {
            Level::Low => 1.0,
            Level::Medium => 2.0,
            Level::High => 3.0,
        }
    }

    /// Bands an average score: `[1.0, 1.7)` low, `[1.7, 2.4)` medium, the rest high
    pub fn from_average(average: f64) -> Level {
        if average < 1.7 {
            Level::Low
        } else if average < 2.4 {
            Level::Medium
        } else {
            Level::High
        }
    }
}

text_enum! {
    pub enum EventType {
        Exam => "exam",
        Quiz => "quiz",
        Assignment => "assignment",
        Presentation => "presentation",
        Extracurricular => "extracurricular",
    }
}

text_enum! {
    /// Kind of work a planned task asks for
    pub enum TaskType {
        ConceptReview => "concept_review",
        Practice => "practice",
        DeepPractice => "deep_practice",
        Revision => "revision",
        MockTest => "mock_test",
    }
}

text_enum! {
    pub enum SessionStatus {
        Pending => "pending",
        InProgress => "in_progress",
        Completed => "completed",
        Skipped => "skipped",
        Postponed => "postponed",
    }
}

impl SessionStatus {
    /// Completed and skipped sessions never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Skipped)
    }
}

text_enum! {
    pub enum LogSource {
        SelfReport => "self_report",
        Inferred => "inferred",
    }
}

text_enum! {
    pub enum SuggestionStatus {
        Pending => "pending",
        Accepted => "accepted",
        Rejected => "rejected",
    }
}

text_enum! {
    /// Advisor label for why a diagnostic question was missed
    pub enum ErrorType {
        Conceptual => "conceptual",
        Application => "application",
        Reasoning => "reasoning",
    }
}

text_enum! {
    pub enum AdjustmentAction {
        SplitTask => "split_task",
        Shorten => "shorten",
        Reorder => "reorder",
        FocusModeChange => "focus_mode_change",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("In_Progress".parse::<SessionStatus>().unwrap(), SessionStatus::InProgress);
        assert_eq!(" HIGH ".parse::<Level>().unwrap(), Level::High);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "mock_exam".parse::<TaskType>().unwrap_err();
        assert!(err.contains("concept_review"));
    }

    #[test]
    fn test_serde_uses_snake_case_names() {
        let json = serde_json::to_string(&TaskType::DeepPractice).unwrap();
        assert_eq!(json, "\"deep_practice\"");
        let back: AdjustmentAction = serde_json::from_str("\"focus_mode_change\"").unwrap();
        assert_eq!(back, AdjustmentAction::FocusModeChange);
    }

    #[test]
    fn test_terminal_statuses() {
        let terminal: Vec<_> = SessionStatus::ALL.iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(terminal, vec![&SessionStatus::Completed, &SessionStatus::Skipped]);
    }

    #[test]
    fn test_band_edges() {
        assert_eq!(Level::from_average(1.0), Level::Low);
        assert_eq!(Level::from_average(1.69), Level::Low);
        assert_eq!(Level::from_average(1.7), Level::Medium);
        assert_eq!(Level::from_average(2.39), Level::Medium);
        assert_eq!(Level::from_average(2.4), Level::High);
        assert_eq!(Level::from_average(3.0), Level::High);
    }

    proptest! {
        /// Display and FromStr agree for every level
        #[test]
        fn prop_level_name_roundtrip(idx in 0..3usize) {
            let level = Level::ALL[idx];
            prop_assert_eq!(level.to_string().parse::<Level>().unwrap(), level);
        }

        /// Banding is monotone in the average
        #[test]
        fn prop_band_monotone(a in 1.0f64..=3.0, b in 1.0f64..=3.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(Level::from_average(lo).score() <= Level::from_average(hi).score());
        }
    }
}

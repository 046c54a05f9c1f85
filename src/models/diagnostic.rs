use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ErrorType, JsonValue};
use crate::errors::{EngineError, EngineResult};

/// A diagnostic quiz taken before studying for an event
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::diagnostic_tests)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DiagnosticTest {
    id: String,
    /// At most one test exists per event
    event_id: String,
    owner: String,
    title: String,
    /// Latest analysis, stored as JSON
    analysis_result: Option<JsonValue>,
    analyzed_at: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
}

impl DiagnosticTest {
    pub fn new(event_id: &str, owner: &str, title: &str, now: DateTime<Utc>) -> EngineResult<Self> {
        if title.trim().is_empty() {
            return Err(EngineError::invariant("diagnostic test title must not be empty"));
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            event_id: event_id.to_string(),
            owner: owner.to_string(),
            title: title.trim().to_string(),
            analysis_result: None,
            analyzed_at: None,
            created_at: now.naive_utc(),
        })
    }

    pub fn get_id(&self) -> String {
        self.id.clone()
    }

    pub fn get_event_id(&self) -> String {
        self.event_id.clone()
    }

    pub fn get_owner(&self) -> String {
        self.owner.clone()
    }

    pub fn get_title(&self) -> String {
        self.title.clone()
    }

    pub fn get_analysis_result(&self) -> Option<JsonValue> {
        self.analysis_result.clone()
    }

    pub fn get_analyzed_at(&self) -> Option<DateTime<Utc>> {
        self.analyzed_at.map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc))
    }

    pub fn get_created_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.created_at, Utc)
    }

    pub fn set_analysis(&mut self, result: JsonValue, now: DateTime<Utc>) {
        self.analysis_result = Some(result);
        self.analyzed_at = Some(now.naive_utc());
    }
}

/// One answered question of a diagnostic test
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::diagnostic_questions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DiagnosticQuestion {
    id: String,
    test_id: String,
    /// Unique within the test, defines the question order
    question_number: i32,
    question_text: String,
    correct_answer: String,
    user_answer: String,
    topic: String,
    /// Derived from the two answers, never set directly
    is_correct: bool,
    error_type: Option<ErrorType>,
}

/// Fields a caller supplies when adding a question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuestion {
    #[serde(default)]
    pub question_number: Option<i32>,
    pub question_text: String,
    pub correct_answer: String,
    pub user_answer: String,
    #[serde(default)]
    pub topic: String,
}

impl DiagnosticQuestion {
    /// Creates a question, deriving correctness from the answers
    ///
    /// ### Errors
    ///
    /// Returns `InvariantViolation` for a non-positive number or an empty
    /// question text or correct answer
    pub fn new(test_id: &str, question_number: i32, fields: NewQuestion) -> EngineResult<Self> {
        if question_number < 1 {
            return Err(EngineError::invariant("question number must be positive"));
        }
        if fields.question_text.trim().is_empty() {
            return Err(EngineError::invariant("question text must not be empty"));
        }
        if fields.correct_answer.trim().is_empty() {
            return Err(EngineError::invariant("correct answer must not be empty"));
        }
        let is_correct = normalize_answer(&fields.user_answer) == normalize_answer(&fields.correct_answer);
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            test_id: test_id.to_string(),
            question_number,
            question_text: fields.question_text,
            correct_answer: fields.correct_answer,
            user_answer: fields.user_answer,
            topic: fields.topic.trim().to_string(),
            is_correct,
            error_type: None,
        })
    }

    pub fn get_id(&self) -> String {
        self.id.clone()
    }

    pub fn get_test_id(&self) -> String {
        self.test_id.clone()
    }

    pub fn get_question_number(&self) -> i32 {
        self.question_number
    }

    pub fn get_question_text(&self) -> String {
        self.question_text.clone()
    }

    pub fn get_correct_answer(&self) -> String {
        self.correct_answer.clone()
    }

    pub fn get_user_answer(&self) -> String {
        self.user_answer.clone()
    }

    pub fn get_topic(&self) -> String {
        self.topic.clone()
    }

    pub fn is_correct(&self) -> bool {
        self.is_correct
    }

    pub fn get_error_type(&self) -> Option<ErrorType> {
        self.error_type
    }

    pub fn set_error_type(&mut self, error_type: Option<ErrorType>) {
        self.error_type = error_type;
    }
}

/// Lowercases an answer and collapses all whitespace runs to single spaces
pub fn normalize_answer(answer: &str) -> String {
    answer
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

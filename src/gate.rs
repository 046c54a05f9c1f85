//! Schema gate for advisor output
//!
//! Every JSON document returned by the advisor passes through one of the
//! `validate_*` functions before the rest of the crate sees it. A rejection
//! names the first offending field path, e.g.
//! `tasks[3].suggested_duration_minutes`.

use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::ValidationError;
use crate::models::{AdjustmentAction, ErrorType, Level, TaskType};

/// Shortest and longest allowed session, in minutes
pub const SESSION_MINUTES: RangeInclusive<i32> = 20..=60;

/// A validated learning plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPlan {
    pub goal_summary: String,
    pub tasks: Vec<PlanTask>,
}

/// One task of a learning plan, in the order the advisor ranked it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanTask {
    pub title: String,
    pub task_type: TaskType,
    pub suggested_duration_minutes: i32,
    pub difficulty: Level,
    pub cognitive_load: Level,
    #[serde(default)]
    pub notes: Option<String>,
}

/// One proposed change to an event's pending sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanAdjustment {
    pub action: AdjustmentAction,
    /// Session id or task title, or `all` for focus mode changes
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_duration_minutes: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_focus_mode: Option<String>,
    /// 1-based position among the event's pending sessions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_position: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A validated replan or adjustment proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentProposal {
    pub adjustments: Vec<PlanAdjustment>,
    pub rationale: String,
    #[serde(default)]
    pub issue_detected: Option<String>,
}

/// Incorrect answers sharing a topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorGroup {
    pub topic: String,
    pub error_count: i32,
    pub question_numbers: Vec<i32>,
    #[serde(default)]
    pub severity: Option<Level>,
}

/// Advisor label for a single missed question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionLabel {
    pub question_number: i32,
    pub error_type: ErrorType,
}

/// Result of analyzing a diagnostic test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticAnalysis {
    pub total_questions: i32,
    pub correct: i32,
    pub incorrect: i32,
    pub score_percentage: i32,
    pub error_groups: Vec<ErrorGroup>,
    pub dominant_error_topic: Option<String>,
    pub summary: String,
    #[serde(default)]
    pub question_labels: Vec<QuestionLabel>,
}

/// Topic of the group with the most errors; the earliest group wins ties
pub fn dominant_topic(groups: &[ErrorGroup]) -> Option<String> {
    let mut best: Option<&ErrorGroup> = None;
    for group in groups {
        if best.is_none_or(|b| group.error_count > b.error_count) {
            best = Some(group);
        }
    }
    best.map(|g| g.topic.clone())
}

// ============================================================================
// Field helpers
// ============================================================================

fn child(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, ValidationError> {
    value.as_object().ok_or_else(|| {
        let field = if path.is_empty() { "$" } else { path };
        ValidationError::new(field, "must be an object")
    })
}

fn required<'a>(obj: &'a Map<String, Value>, path: &str, key: &str) -> Result<&'a Value, ValidationError> {
    match obj.get(key) {
        Some(Value::Null) | None => Err(ValidationError::new(child(path, key), "is required")),
        Some(value) => Ok(value),
    }
}

fn non_empty_string(obj: &Map<String, Value>, path: &str, key: &str) -> Result<String, ValidationError> {
    let value = required(obj, path, key)?;
    let text = value
        .as_str()
        .ok_or_else(|| ValidationError::new(child(path, key), "must be a string"))?;
    if text.trim().is_empty() {
        return Err(ValidationError::new(child(path, key), "must not be empty"));
    }
    Ok(text.trim().to_string())
}

fn optional_string(obj: &Map<String, Value>, path: &str, key: &str) -> Result<Option<String>, ValidationError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ValidationError::new(child(path, key), "must be a string")),
    }
}

fn integer_of(value: &Value, field: String, range: RangeInclusive<i64>) -> Result<i32, ValidationError> {
    let n = value
        .as_i64()
        .ok_or_else(|| ValidationError::new(field.clone(), "must be an integer"))?;
    if !range.contains(&n) {
        return Err(ValidationError::new(
            field,
            format!("must be between {} and {}", range.start(), range.end()),
        ));
    }
    i32::try_from(n).map_err(|_| ValidationError::new("$", "integer out of range"))
}

fn integer_in(obj: &Map<String, Value>, path: &str, key: &str, range: RangeInclusive<i64>) -> Result<i32, ValidationError> {
    integer_of(required(obj, path, key)?, child(path, key), range)
}

fn optional_integer_in(
    obj: &Map<String, Value>,
    path: &str,
    key: &str,
    range: RangeInclusive<i64>,
) -> Result<Option<i32>, ValidationError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => integer_of(value, child(path, key), range).map(Some),
    }
}

fn enum_field<T: FromStr>(obj: &Map<String, Value>, path: &str, key: &str) -> Result<T, ValidationError> {
    let value = required(obj, path, key)?;
    let text = value
        .as_str()
        .ok_or_else(|| ValidationError::new(child(path, key), "must be a string"))?;
    text.parse::<T>()
        .map_err(|_| ValidationError::new(child(path, key), format!("unexpected value `{text}`")))
}

fn array_field<'a>(obj: &'a Map<String, Value>, path: &str, key: &str) -> Result<&'a Vec<Value>, ValidationError> {
    required(obj, path, key)?
        .as_array()
        .ok_or_else(|| ValidationError::new(child(path, key), "must be a list"))
}

fn non_empty_array<'a>(obj: &'a Map<String, Value>, path: &str, key: &str) -> Result<&'a Vec<Value>, ValidationError> {
    let items = array_field(obj, path, key)?;
    if items.is_empty() {
        return Err(ValidationError::new(child(path, key), "must not be empty"));
    }
    Ok(items)
}

fn minutes_range() -> RangeInclusive<i64> {
    i64::from(*SESSION_MINUTES.start())..=i64::from(*SESSION_MINUTES.end())
}

// ============================================================================
// Validators
// ============================================================================

/// Validates a learning plan document
///
/// ### Errors
///
/// Returns the first offending field
pub fn validate_learning_plan(value: &Value) -> Result<LearningPlan, ValidationError> {
    let root = as_object(value, "")?;
    let goal_summary = non_empty_string(root, "", "goal_summary")?;
    let raw_tasks = non_empty_array(root, "", "tasks")?;

    let mut tasks = Vec::with_capacity(raw_tasks.len());
    for (i, raw) in raw_tasks.iter().enumerate() {
        let path = format!("tasks[{i}]");
        let task = as_object(raw, &path)?;
        tasks.push(PlanTask {
            title: non_empty_string(task, &path, "title")?,
            task_type: enum_field(task, &path, "task_type")?,
            suggested_duration_minutes: integer_in(task, &path, "suggested_duration_minutes", minutes_range())?,
            difficulty: enum_field(task, &path, "difficulty")?,
            cognitive_load: enum_field(task, &path, "cognitive_load")?,
            notes: optional_string(task, &path, "notes")?,
        });
    }

    Ok(LearningPlan { goal_summary, tasks })
}

/// Validates a replan or plan adjustment document
///
/// ### Errors
///
/// Returns the first offending field
pub fn validate_adjustment_proposal(value: &Value) -> Result<AdjustmentProposal, ValidationError> {
    let root = as_object(value, "")?;
    let raw_adjustments = non_empty_array(root, "", "adjustments")?;

    let mut adjustments = Vec::with_capacity(raw_adjustments.len());
    for (i, raw) in raw_adjustments.iter().enumerate() {
        let path = format!("adjustments[{i}]");
        let item = as_object(raw, &path)?;
        let action: AdjustmentAction = enum_field(item, &path, "action")?;
        let target = non_empty_string(item, &path, "target")?;

        let mut adjustment = PlanAdjustment {
            action,
            target,
            new_duration_minutes: None,
            new_focus_mode: None,
            new_position: None,
            reason: optional_string(item, &path, "reason")?,
        };
        match action {
            AdjustmentAction::SplitTask | AdjustmentAction::Shorten => {
                adjustment.new_duration_minutes =
                    Some(integer_in(item, &path, "new_duration_minutes", minutes_range())?);
            }
            AdjustmentAction::FocusModeChange => {
                adjustment.new_focus_mode = Some(non_empty_string(item, &path, "new_focus_mode")?);
            }
            AdjustmentAction::Reorder => {
                adjustment.new_position = optional_integer_in(item, &path, "new_position", 1..=i64::from(i32::MAX))?
                    .and_then(|p| u32::try_from(p).ok());
            }
        }
        adjustments.push(adjustment);
    }

    let rationale = non_empty_string(root, "", "rationale")?;
    let issue_detected = optional_string(root, "", "issue_detected")?;

    Ok(AdjustmentProposal {
        adjustments,
        rationale,
        issue_detected,
    })
}

/// Validates a diagnostic analysis document
///
/// Besides field shapes, the totals must be consistent and
/// `dominant_error_topic` must name the group with the most errors.
///
/// ### Errors
///
/// Returns the first offending field
pub fn validate_diagnostic_analysis(value: &Value) -> Result<DiagnosticAnalysis, ValidationError> {
    let root = as_object(value, "")?;
    let total_questions = integer_in(root, "", "total_questions", 0..=i64::from(i32::MAX))?;
    let total = i64::from(total_questions);
    let correct = integer_in(root, "", "correct", 0..=total)?;
    let incorrect = integer_in(root, "", "incorrect", 0..=total)?;
    if i64::from(correct) + i64::from(incorrect) != total {
        return Err(ValidationError::new("incorrect", "correct and incorrect must add up to total_questions"));
    }
    let score_percentage = integer_in(root, "", "score_percentage", 0..=100)?;

    let raw_groups = array_field(root, "", "error_groups")?;
    let mut error_groups = Vec::with_capacity(raw_groups.len());
    for (i, raw) in raw_groups.iter().enumerate() {
        let path = format!("error_groups[{i}]");
        let group = as_object(raw, &path)?;
        let topic = non_empty_string(group, &path, "topic")?;
        let error_count = integer_in(group, &path, "error_count", 1..=total.max(1))?;
        let numbers_path = child(&path, "question_numbers");
        let raw_numbers = array_field(group, &path, "question_numbers")?;
        let mut question_numbers = Vec::with_capacity(raw_numbers.len());
        for (j, n) in raw_numbers.iter().enumerate() {
            question_numbers.push(integer_of(n, format!("{numbers_path}[{j}]"), 1..=i64::from(i32::MAX))?);
        }
        if question_numbers.len() != error_count as usize {
            return Err(ValidationError::new(numbers_path, "must list exactly error_count questions"));
        }
        let severity = Some(enum_field::<Level>(group, &path, "severity")?);
        error_groups.push(ErrorGroup {
            topic,
            error_count,
            question_numbers,
            severity,
        });
    }
    if error_groups.iter().map(|g| i64::from(g.error_count)).sum::<i64>() != i64::from(incorrect) {
        return Err(ValidationError::new("error_groups", "error counts must add up to incorrect"));
    }

    let dominant_error_topic = optional_string(root, "", "dominant_error_topic")?;
    if dominant_error_topic != dominant_topic(&error_groups) {
        return Err(ValidationError::new(
            "dominant_error_topic",
            "must name the topic with the most errors, or be null when there are none",
        ));
    }

    let summary = non_empty_string(root, "", "summary")?;

    let mut question_labels = Vec::new();
    if let Some(raw_labels) = root.get("question_error_types").filter(|v| !v.is_null()) {
        let labels = raw_labels
            .as_array()
            .ok_or_else(|| ValidationError::new("question_error_types", "must be a list"))?;
        for (i, raw) in labels.iter().enumerate() {
            let path = format!("question_error_types[{i}]");
            let label = as_object(raw, &path)?;
            question_labels.push(QuestionLabel {
                question_number: integer_in(label, &path, "question_number", 1..=i64::from(i32::MAX))?,
                error_type: enum_field(label, &path, "error_type")?,
            });
        }
    }

    Ok(DiagnosticAnalysis {
        total_questions,
        correct,
        incorrect,
        score_percentage,
        error_groups,
        dominant_error_topic,
        summary,
        question_labels,
    })
}

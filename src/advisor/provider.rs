//! Advisor providers
//!
//! A provider turns a rendered prompt into raw text. Everything after that
//! (fence stripping, JSON decoding, validation) happens in the client, so
//! providers stay ignorant of response shapes.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use super::http::{AnthropicProvider, OpenAiProvider};
use crate::config::Config;
use crate::errors::AdvisorError;
use crate::gate::DiagnosticAnalysis;
use crate::models::{Level, SessionStatus};

/// A language-model backend
#[async_trait]
pub trait AdvisorProvider: Send + Sync {
    /// Short provider name used in logs
    fn name(&self) -> &str;

    /// Sends one prompt and returns the raw response text
    async fn invoke(&self, prompt: &str, max_output_tokens: u32) -> Result<String, AdvisorError>;
}

/// Builds the provider named in the configuration
///
/// ### Errors
///
/// Returns `AdvisorError::Provider` for unknown names, or for network
/// providers without credentials
pub fn build_provider(config: &Config) -> Result<Arc<dyn AdvisorProvider>, AdvisorError> {
    let credentials = || {
        config
            .advisor_credentials
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AdvisorError::Provider(format!("provider `{}` needs credentials", config.advisor_provider)))
    };

    match config.advisor_provider.trim().to_lowercase().as_str() {
        "mock" => Ok(Arc::new(MockProvider::new())),
        "anthropic" => Ok(Arc::new(AnthropicProvider::new(credentials()?, &config.advisor_model)?)),
        "openai" => Ok(Arc::new(OpenAiProvider::new(credentials()?, &config.advisor_model)?)),
        other => Err(AdvisorError::Provider(format!("unknown advisor provider `{other}`"))),
    }
}

// ============================================================================
// Mock provider
// ============================================================================

/// Offline provider with canned, always-valid responses
///
/// The request kind is read from the `REQUEST TYPE:` line of the prompt.
/// Replan and adjustment answers target the first pending session listed on
/// the `SESSIONS:` line; diagnostic answers echo the `BASELINE:` line with
/// severities and labels added. Queued responses take precedence over the
/// canned ones.
#[derive(Debug, Default)]
pub struct MockProvider {
    queued: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw response for the next call
    pub fn queue_response(&self, text: impl Into<String>) {
        if let Ok(mut queued) = self.queued.lock() {
            queued.push_back(Ok(text.into()));
        }
    }

    /// Queue a provider failure for the next call
    pub fn queue_failure(&self, message: impl Into<String>) {
        if let Ok(mut queued) = self.queued.lock() {
            queued.push_back(Err(message.into()));
        }
    }

    /// Prompts received so far, oldest first
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }

    fn next_queued(&self) -> Option<Result<String, String>> {
        self.queued.lock().ok()?.pop_front()
    }
}

#[async_trait]
impl AdvisorProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn invoke(&self, prompt: &str, _max_output_tokens: u32) -> Result<String, AdvisorError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        if let Some(queued) = self.next_queued() {
            return queued.map_err(AdvisorError::Provider);
        }

        let response = match marker(prompt, "REQUEST TYPE:") {
            Some("plan_generation") => mock_plan(),
            Some("replanning") => mock_replan(prompt),
            Some("plan_adjustment") => mock_adjustment(prompt),
            Some("diagnostic_analysis") => mock_diagnostic(prompt)?,
            other => {
                return Err(AdvisorError::Provider(format!(
                    "mock provider cannot answer request type {other:?}"
                )));
            }
        };
        Ok(response.to_string())
    }
}

/// Rest of the first line starting with `label`
fn marker<'a>(prompt: &'a str, label: &str) -> Option<&'a str> {
    prompt
        .lines()
        .find_map(|line| line.trim_start().strip_prefix(label))
        .map(str::trim)
}

fn marker_json(prompt: &str, label: &str) -> Option<Value> {
    marker(prompt, label).and_then(|text| serde_json::from_str(text).ok())
}

fn mock_plan() -> Value {
    let tasks = [
        ("Review key concepts and fundamentals", "concept_review", 30, "low", "medium", "Start with the core principles"),
        ("Summarize definitions and formulas", "concept_review", 25, "low", "low", "Write a one-page sheet"),
        ("Worked examples walkthrough", "concept_review", 35, "medium", "medium", "Redo each example without notes"),
        ("Practice problems: basics", "practice", 40, "medium", "medium", "Time yourself"),
        ("Practice problems: mixed set", "practice", 45, "medium", "high", "Mix topics to force recall"),
        ("Deep practice: complex scenarios", "deep_practice", 45, "high", "high", "Pick the hardest problems first"),
        ("Error log review", "revision", 25, "low", "medium", "Revisit every mistake so far"),
        ("Deep practice: multi-step problems", "deep_practice", 45, "high", "high", "Explain each step aloud"),
        ("Timed mock test", "mock_test", 45, "high", "high", "Use exam conditions"),
        ("Mock test review", "revision", 30, "medium", "medium", "Classify each error"),
        ("Targeted practice on weak topics", "practice", 40, "medium", "high", "Focus on the weakest topic"),
        ("Final revision", "revision", 30, "low", "low", "Light review, rest well"),
    ];
    let tasks: Vec<Value> = tasks
        .iter()
        .map(|(title, task_type, minutes, difficulty, load, notes)| {
            json!({
                "title": title,
                "task_type": task_type,
                "suggested_duration_minutes": minutes,
                "difficulty": difficulty,
                "cognitive_load": load,
                "notes": notes,
            })
        })
        .collect();
    json!({
        "goal_summary": "Build understanding first, then practice under exam conditions",
        "tasks": tasks,
    })
}

/// Id and planned minutes of the first pending session on the `SESSIONS:` line
fn first_pending(prompt: &str) -> Option<(String, i64)> {
    let sessions = marker_json(prompt, "SESSIONS:")?;
    sessions.as_array()?.iter().find_map(|session| {
        let status = session.get("status")?.as_str()?;
        if status != SessionStatus::Pending.as_str() {
            return None;
        }
        Some((session.get("id")?.as_str()?.to_string(), session.get("planned_minutes")?.as_i64()?))
    })
}

fn calmer_focus_mode() -> Value {
    json!({
        "action": "focus_mode_change",
        "target": "all",
        "new_focus_mode": "Pomodoro",
        "reason": "Shorter focus blocks with regular breaks",
    })
}

fn mock_replan(prompt: &str) -> Value {
    let issue = marker(prompt, "ISSUE:").unwrap_or("tasks_overrunning").to_string();
    let mut adjustments = Vec::new();
    if let Some((id, planned)) = first_pending(prompt) {
        if planned >= 40 {
            adjustments.push(json!({
                "action": "split_task",
                "target": id,
                "new_duration_minutes": (planned / 2).max(20),
                "reason": "Break into smaller chunks to match the actual pace",
            }));
        } else {
            adjustments.push(json!({
                "action": "reorder",
                "target": id,
                "new_position": 1,
                "reason": "Tackle this while energy is fresh",
            }));
        }
    }
    adjustments.push(calmer_focus_mode());
    json!({
        "issue_detected": issue,
        "adjustments": adjustments,
        "rationale": "Recent sessions show the current plan is too demanding; smaller steps keep progress steady.",
    })
}

fn mock_adjustment(prompt: &str) -> Value {
    let mut adjustments = Vec::new();
    if let Some((id, _)) = first_pending(prompt).filter(|(_, planned)| *planned > 25) {
        adjustments.push(json!({
            "action": "shorten",
            "target": id,
            "new_duration_minutes": 25,
            "reason": "A shorter session is easier to start",
        }));
    }
    adjustments.push(calmer_focus_mode());
    json!({
        "adjustments": adjustments,
        "rationale": "Lighter sessions for the next few days while your state recovers.",
    })
}

fn mock_diagnostic(prompt: &str) -> Result<Value, AdvisorError> {
    let baseline: DiagnosticAnalysis = marker_json(prompt, "BASELINE:")
        .and_then(|value| serde_json::from_value(value).ok())
        .ok_or_else(|| AdvisorError::Provider("mock provider needs a BASELINE line".to_string()))?;

    let groups: Vec<Value> = baseline
        .error_groups
        .iter()
        .map(|group| {
            let severity = if group.error_count >= 2 { Level::High } else { Level::Medium };
            json!({
                "topic": group.topic,
                "error_count": group.error_count,
                "question_numbers": group.question_numbers,
                "severity": severity,
            })
        })
        .collect();
    let labels: Vec<Value> = baseline
        .error_groups
        .iter()
        .flat_map(|group| group.question_numbers.iter())
        .map(|n| json!({"question_number": n, "error_type": "conceptual"}))
        .collect();
    let summary = match &baseline.dominant_error_topic {
        Some(topic) => format!("Most mistakes come from {topic}; revisit its core ideas before more practice."),
        None => "No mistakes found; keep practicing at the current pace.".to_string(),
    };

    Ok(json!({
        "total_questions": baseline.total_questions,
        "correct": baseline.correct,
        "incorrect": baseline.incorrect,
        "score_percentage": baseline.score_percentage,
        "error_groups": groups,
        "dominant_error_topic": baseline.dominant_error_topic,
        "question_error_types": labels,
        "summary": summary,
    }))
}

//! Advisor client
//!
//! Provider-agnostic facade over the language-model advisor. Every public
//! call returns a gate-validated value or `None`: disabled advisor, provider
//! failures, timeouts, cancellation, malformed JSON and schema rejections
//! are logged here and never reach the caller.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::errors::{AdvisorError, ValidationError};
use crate::gate::{
    AdjustmentProposal, DiagnosticAnalysis, LearningPlan, validate_adjustment_proposal, validate_diagnostic_analysis,
    validate_learning_plan,
};

mod cache;
mod http;
mod prompts;
mod provider;
mod snapshot;

pub use cache::PlanCache;
pub use http::{AnthropicProvider, OpenAiProvider};
pub use prompts::{PromptTemplates, TEMPLATE_NAMES, strip_fences};
pub use provider::{AdvisorProvider, MockProvider, build_provider};
pub use snapshot::{
    EmotionalSnapshot, EventSnapshot, PerformanceMetrics, PlanRequest, QuestionSnapshot, SessionSnapshot,
    completion_percentage,
};

/// Tunables of the advisor client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvisorSettings {
    pub enabled: bool,
    pub timeout: Duration,
    pub cache_ttl: Duration,
    pub max_output_tokens: u32,
}

impl AdvisorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            enabled: config.advisor_enabled,
            timeout: config.advisor_timeout(),
            cache_ttl: config.advisor_cache_ttl(),
            max_output_tokens: config.advisor_max_output_tokens,
        }
    }
}

impl Default for AdvisorSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout: Duration::from_secs(30),
            cache_ttl: Duration::from_secs(86_400),
            max_output_tokens: 2_048,
        }
    }
}

/// Cheap to clone; clones share the provider, templates and plan cache
#[derive(Clone)]
pub struct AdvisorClient {
    provider: Arc<dyn AdvisorProvider>,
    templates: Arc<PromptTemplates>,
    cache: Arc<PlanCache>,
    settings: AdvisorSettings,
    cancel: CancellationToken,
}

impl AdvisorClient {
    pub fn new(provider: Arc<dyn AdvisorProvider>, templates: PromptTemplates, settings: AdvisorSettings) -> Self {
        Self {
            provider,
            templates: Arc::new(templates),
            cache: Arc::new(PlanCache::new(settings.cache_ttl)),
            settings,
            cancel: CancellationToken::new(),
        }
    }

    /// Builds the provider and loads the prompt templates named in `config`
    ///
    /// ### Errors
    ///
    /// Returns an error for an unknown provider, missing credentials or an
    /// unreadable template override
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let provider = build_provider(config)?;
        let templates = PromptTemplates::load(config.prompt_dir.as_deref())?;
        info!(
            provider = provider.name(),
            enabled = config.advisor_enabled,
            "Advisor client ready"
        );
        Ok(Self::new(provider, templates, AdvisorSettings::from_config(config)))
    }

    /// An advisor that always answers `None`
    pub fn disabled() -> Self {
        let settings = AdvisorSettings {
            enabled: false,
            ..AdvisorSettings::default()
        };
        Self::new(Arc::new(MockProvider::new()), PromptTemplates::builtin(), settings)
    }

    /// Ties in-flight calls of this client to `token`
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn cache(&self) -> &PlanCache {
        &self.cache
    }

    /// Generates a learning plan for an event
    ///
    /// Plans are cached by event title, date and preparation budget. With
    /// `force_regenerate` the cache is neither read nor written.
    #[instrument(skip(self, request), fields(event_title = %request.title))]
    pub async fn generate_learning_plan(&self, request: &PlanRequest, force_regenerate: bool) -> Option<LearningPlan> {
        if !self.settings.enabled {
            info!("Advisor disabled, skipping plan generation");
            return None;
        }

        let key = request.cache_key();
        if !force_regenerate {
            if let Some(plan) = self.cache.get(&key) {
                info!("Using cached learning plan");
                return Some(plan);
            }
        }

        let values = [
            ("event_title", request.title.clone()),
            ("event_type", request.event_type.to_string()),
            ("event_date", request.event_date.format("%Y-%m-%d").to_string()),
            ("subject", request.subject.clone()),
            (
                "description",
                request
                    .description
                    .clone()
                    .filter(|d| !d.trim().is_empty())
                    .unwrap_or_else(|| "No additional details provided".to_string()),
            ),
            ("prep_hours", request.prep_hours.to_string()),
            ("daily_capacity_minutes", request.daily_capacity_minutes.to_string()),
            ("focus_mode", request.focus_mode.clone()),
        ];
        let plan = self
            .settle("plan_generation", self.request("plan_generation", &values, validate_learning_plan).await)?;

        info!(
            tasks = plan.tasks.len(),
            minutes = plan.tasks.iter().map(|t| t.suggested_duration_minutes).sum::<i32>(),
            "Generated learning plan"
        );
        if !force_regenerate {
            self.cache.insert(key, plan.clone());
        }
        Some(plan)
    }

    /// Asks for changes after an execution trigger fired
    #[instrument(skip(self, sessions, metrics), fields(event_title = %event_title, issue_kind = %issue_kind))]
    pub async fn suggest_replan(
        &self,
        event_title: &str,
        sessions: &[SessionSnapshot],
        issue_kind: &str,
        metrics: &PerformanceMetrics,
    ) -> Option<AdjustmentProposal> {
        if !self.settings.enabled {
            info!("Advisor disabled, skipping replan suggestion");
            return None;
        }

        let values = [
            ("event_title", event_title.to_string()),
            ("issue_kind", issue_kind.to_string()),
            ("issue_description", describe_issue(issue_kind, metrics)),
            ("performance", to_pretty_json(metrics)),
            ("sessions", to_line_json(sessions)),
        ];
        let result = self.request("replanning", &values, validate_adjustment_proposal).await;
        self.settle("replanning", result)
    }

    /// Asks for an enriched analysis of a diagnostic test
    ///
    /// The prompt carries the deterministic baseline computed from
    /// `questions`; the caller decides which parts of the answer to keep.
    #[instrument(skip(self, questions), fields(test_id = %test_id, questions = questions.len()))]
    pub async fn analyze_diagnostic(
        &self,
        test_id: &str,
        event_title: &str,
        questions: &[QuestionSnapshot],
    ) -> Option<DiagnosticAnalysis> {
        if !self.settings.enabled {
            info!("Advisor disabled, skipping diagnostic analysis");
            return None;
        }

        let baseline = crate::diagnostics::baseline_analysis(questions);
        let values = [
            ("test_id", test_id.to_string()),
            ("event_title", event_title.to_string()),
            ("questions", to_pretty_json(&questions)),
            ("baseline", to_line_json(&baseline)),
        ];
        let result = self
            .request("diagnostic_analysis", &values, validate_diagnostic_analysis)
            .await;
        self.settle("diagnostic_analysis", result)
    }

    /// Asks for changes after an emotional or diagnostic signal
    #[instrument(skip_all, fields(event_title = %event.title))]
    pub async fn suggest_plan_adjustments(
        &self,
        event: &EventSnapshot,
        emotional_state: Option<&EmotionalSnapshot>,
        diagnostic_results: Option<&DiagnosticAnalysis>,
        sessions: &[SessionSnapshot],
    ) -> Option<AdjustmentProposal> {
        if !self.settings.enabled {
            info!("Advisor disabled, skipping plan adjustments");
            return None;
        }

        let values = [
            ("event_title", event.title.clone()),
            ("event_date", event.event_date.format("%Y-%m-%d").to_string()),
            ("emotional_state", to_line_json(&emotional_state)),
            ("diagnostic_results", to_line_json(&diagnostic_results)),
            ("sessions", to_line_json(sessions)),
        ];
        let result = self.request("plan_adjustment", &values, validate_adjustment_proposal).await;
        self.settle("plan_adjustment", result)
    }

    /// Renders, sends, decodes and validates one request
    async fn request<T>(
        &self,
        template: &str,
        values: &[(&str, String)],
        validate: fn(&Value) -> Result<T, ValidationError>,
    ) -> Result<T, AdvisorError> {
        let prompt = self
            .templates
            .render(template, values)
            .ok_or_else(|| AdvisorError::Provider(format!("no prompt template named `{template}`")))?;

        let timeout = self.settings.timeout;
        let call = self.provider.invoke(&prompt, self.settings.max_output_tokens);
        let text = tokio::select! {
            _ = self.cancel.cancelled() => return Err(AdvisorError::Cancelled),
            outcome = tokio::time::timeout(timeout, call) => {
                outcome.map_err(|_| AdvisorError::Timeout(timeout))??
            }
        };

        let value: Value =
            serde_json::from_str(strip_fences(&text)).map_err(|err| AdvisorError::Malformed(err.to_string()))?;
        Ok(validate(&value)?)
    }

    fn settle<T>(&self, request: &str, result: Result<T, AdvisorError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(AdvisorError::Disabled) => {
                info!(request, "Advisor disabled");
                None
            }
            Err(err) => {
                warn!(request, provider = self.provider.name(), error = %err, "Advisor request failed");
                None
            }
        }
    }
}

fn describe_issue(issue_kind: &str, metrics: &PerformanceMetrics) -> String {
    issue_kind
        .split('+')
        .map(|kind| match kind {
            "tasks_overrunning" => format!(
                "Sessions take {}% longer than planned on average",
                metrics.avg_overrun_percent
            ),
            "tasks_skipped" => format!("{} of {} sessions were skipped", metrics.skipped, metrics.total_sessions),
            "event_at_risk" => format!(
                "Only {}% of sessions are done with {} days left",
                metrics.completion_percentage, metrics.days_remaining
            ),
            other => format!("Unrecognized issue `{other}`"),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
}

/// Single-line JSON, for fields that sit on a labelled prompt line
fn to_line_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

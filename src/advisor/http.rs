use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;

use super::provider::AdvisorProvider;
use crate::errors::AdvisorError;

const ANTHROPIC_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";

const OPENAI_URL: &str = "https://api.openai.com";
const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";

const SYSTEM_PROMPT: &str = "You are an educational planning assistant. Always return valid JSON.";

fn model_or(model: &str, default: &str) -> String {
    if model.trim().is_empty() {
        default.to_string()
    } else {
        model.trim().to_string()
    }
}

fn client() -> Result<Client, AdvisorError> {
    Client::builder().build().map_err(AdvisorError::from)
}

async fn read_json(response: reqwest::Response) -> Result<Value, AdvisorError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AdvisorError::Provider(format!("HTTP {status}: {body}")));
    }
    Ok(response.json::<Value>().await?)
}

/// Anthropic Messages API
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(api_key: String, model: &str) -> Result<Self, AdvisorError> {
        Ok(Self {
            client: client()?,
            api_key,
            model: model_or(model, ANTHROPIC_DEFAULT_MODEL),
            base_url: ANTHROPIC_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl AdvisorProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn invoke(&self, prompt: &str, max_output_tokens: u32) -> Result<String, AdvisorError> {
        debug!(model = %self.model, "Calling Anthropic");
        let body = json!({
            "model": self.model,
            "max_tokens": max_output_tokens,
            "system": SYSTEM_PROMPT,
            "messages": [{"role": "user", "content": prompt}],
        });
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url.trim_end_matches('/')))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let value = read_json(response).await?;
        value
            .pointer("/content/0/text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AdvisorError::Malformed("response has no content[0].text".to_string()))
    }
}

/// OpenAI Chat Completions API
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, model: &str) -> Result<Self, AdvisorError> {
        Ok(Self {
            client: client()?,
            api_key,
            model: model_or(model, OPENAI_DEFAULT_MODEL),
            base_url: OPENAI_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl AdvisorProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn invoke(&self, prompt: &str, max_output_tokens: u32) -> Result<String, AdvisorError> {
        debug!(model = %self.model, "Calling OpenAI");
        let body = json!({
            "model": self.model,
            "max_tokens": max_output_tokens,
            "temperature": 0.7,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prompt},
            ],
        });
        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let value = read_json(response).await?;
        value
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AdvisorError::Malformed("response has no choices[0].message.content".to_string()))
    }
}

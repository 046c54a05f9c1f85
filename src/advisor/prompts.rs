use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

/// Names of the templates the advisor client renders
pub const TEMPLATE_NAMES: [&str; 4] = ["plan_generation", "replanning", "diagnostic_analysis", "plan_adjustment"];

fn builtin(name: &str) -> Option<&'static str> {
    match name {
        "plan_generation" => Some(include_str!("../../prompts/plan_generation.txt")),
        "replanning" => Some(include_str!("../../prompts/replanning.txt")),
        "diagnostic_analysis" => Some(include_str!("../../prompts/diagnostic_analysis.txt")),
        "plan_adjustment" => Some(include_str!("../../prompts/plan_adjustment.txt")),
        _ => None,
    }
}

/// Prompt templates, read once when the advisor client is built
///
/// A file named `<template>.txt` in the override directory replaces the
/// built-in text of that template; missing files keep the built-in one.
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    templates: HashMap<&'static str, String>,
}

impl PromptTemplates {
    /// Built-in templates only
    pub fn builtin() -> Self {
        let templates = TEMPLATE_NAMES
            .iter()
            .filter_map(|name| builtin(name).map(|text| (*name, text.to_string())))
            .collect();
        Self { templates }
    }

    /// Built-in templates, overridden by files found in `dir`
    ///
    /// ### Errors
    ///
    /// Returns an error if an override file exists but cannot be read
    pub fn load(dir: Option<&Path>) -> Result<Self> {
        let mut loaded = Self::builtin();
        let Some(dir) = dir else {
            return Ok(loaded);
        };

        for name in TEMPLATE_NAMES {
            let path = dir.join(format!("{name}.txt"));
            if !path.exists() {
                debug!("No override for template {} in {:?}", name, dir);
                continue;
            }
            let text = fs::read_to_string(&path).with_context(|| format!("Failed to read prompt template {path:?}"))?;
            info!("Loaded prompt template {} from {:?}", name, path);
            loaded.templates.insert(name, text);
        }
        Ok(loaded)
    }

    /// Renders a template, replacing each `{key}` with its value
    ///
    /// Placeholders without a value are left in place.
    pub fn render(&self, name: &str, values: &[(&str, String)]) -> Option<String> {
        let template = self.templates.get(name)?;
        let mut rendered = template.clone();
        for (key, value) in values {
            rendered = rendered.replace(&format!("{{{key}}}"), value);
        }
        Some(rendered)
    }
}

/// Removes a surrounding markdown code fence, if any
pub fn strip_fences(response: &str) -> &str {
    let mut text = response.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

//! Hosted-model client and narrative extraction.
//!
//! The pipeline talks to the model through [`ModelClient`] so tests can swap
//! in canned replies. [`HttpModelClient`] posts a Converse-shaped request to
//! whatever gateway the configuration names.

use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use thiserror::Error;

use crate::{config::AnalyzerConfig, request::ResponseFormat};

/// Gateways route on this header; the body stays a plain Converse request.
pub const REGION_HEADER: &str = "x-model-region";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("no model endpoint configured (set LLM_ENDPOINT or `endpoint` in the config file)")]
    NotConfigured,
    #[error("model request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("model endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model response was malformed: {0}")]
    Malformed(String),
}

pub trait ModelClient {
    fn converse(&self, system: &str, prompt: &str) -> Result<String, LlmError>;
}

pub struct HttpModelClient {
    client: Client,
    endpoint: Option<String>,
    api_key: Option<String>,
    model_id: String,
    region: String,
    max_tokens: u32,
    temperature: f32,
}

impl HttpModelClient {
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model_id: config.model_id.clone(),
            region: config.region.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    fn request_body(&self, system: &str, prompt: &str) -> JsonValue {
        json!({
            "modelId": self.model_id,
            "system": [{"text": system}],
            "messages": [{"role": "user", "content": [{"text": prompt}]}],
            "inferenceConfig": {
                "maxTokens": self.max_tokens,
                "temperature": self.temperature,
            },
        })
    }
}

impl ModelClient for HttpModelClient {
    fn converse(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let endpoint = self.endpoint.as_deref().ok_or(LlmError::NotConfigured)?;
        debug!("Posting {} prompt chars to {endpoint}", prompt.chars().count());
        let mut request = self
            .client
            .post(endpoint)
            .header(REGION_HEADER, self.region.as_str())
            .json(&self.request_body(system, prompt));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }
        let payload: JsonValue = response.json()?;
        extract_converse_text(&payload)
    }
}

/// Joins every `text` part of `output.message.content`; other part kinds are skipped.
pub fn extract_converse_text(payload: &JsonValue) -> Result<String, LlmError> {
    let parts = payload
        .pointer("/output/message/content")
        .and_then(JsonValue::as_array)
        .ok_or_else(|| LlmError::Malformed("missing output.message.content".to_string()))?;
    let text = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(JsonValue::as_str))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    Ok(text.trim().to_string())
}

/// What the model said, split into the pieces the response needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Narrative {
    pub overview: String,
    pub findings: Vec<String>,
    pub kpis: Option<JsonValue>,
    pub trend: Option<JsonValue>,
}

impl Narrative {
    pub fn from_model_text(text: &str, format: ResponseFormat) -> Self {
        match format {
            ResponseFormat::Json => Self::from_json_text(text),
            ResponseFormat::Markdown | ResponseFormat::Text => Self {
                overview: text.to_string(),
                ..Self::default()
            },
        }
    }

    pub fn from_error(err: &LlmError) -> Self {
        Self {
            overview: format!("(model error: {err})"),
            ..Self::default()
        }
    }

    fn from_json_text(text: &str) -> Self {
        let cleaned = strip_code_fence(text.trim());
        let parsed = serde_json::from_str::<JsonValue>(cleaned)
            .ok()
            .or_else(|| outermost_object(cleaned).and_then(|slice| serde_json::from_str(slice).ok()));
        match parsed {
            Some(JsonValue::Object(object)) => {
                let overview = object
                    .get("overview")
                    .and_then(JsonValue::as_str)
                    .unwrap_or_default()
                    .to_string();
                let findings = object
                    .get("findings")
                    .and_then(JsonValue::as_array)
                    .map(|items| {
                        items
                            .iter()
                            .map(|item| match item {
                                JsonValue::String(s) => s.clone(),
                                other => other.to_string(),
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                Self {
                    overview,
                    findings,
                    kpis: object.get("kpis").cloned(),
                    trend: object.get("trend").cloned(),
                }
            }
            _ => Self {
                overview: text.to_string(),
                ..Self::default()
            },
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

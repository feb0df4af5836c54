//! Analyzer configuration.
//!
//! Values are layered: built-in defaults, then an optional YAML file, then the
//! process environment. The resolved [`AnalyzerConfig`] is handed to the
//! pipeline explicitly; nothing reads the environment after start-up.

use std::{env, fs::File, io::BufReader, path::Path, str::FromStr};

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::request::ResponseFormat;

pub const DEFAULT_MODEL_ID: &str = "us.deepseek.r1-v1:0";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_MAX_TOKENS: u32 = 2200;
pub const DEFAULT_TEMPERATURE: f32 = 0.15;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct AnalyzerConfig {
    pub model_id: String,
    /// Converse-compatible endpoint; without one every model call fails softly.
    pub endpoint: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub region: String,
    pub default_format: ResponseFormat,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub force_ja: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            endpoint: None,
            api_key: None,
            region: DEFAULT_REGION.to_string(),
            default_format: ResponseFormat::Json,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            force_ja: false,
        }
    }
}

impl AnalyzerConfig {
    /// Defaults, then `path` (if any), then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        Ok(config.with_env(|key| env::var(key).ok()))
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let config = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing config YAML {path:?}"))?;
        debug!("Loaded analyzer config from {path:?}");
        Ok(config)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw).context("Parsing config YAML")
    }

    /// Applies environment overrides through `lookup` so tests can inject values.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(model) = non_empty("BEDROCK_MODEL_ID") {
            self.model_id = model;
        }
        if let Some(endpoint) = non_empty("LLM_ENDPOINT") {
            self.endpoint = Some(endpoint);
        }
        if let Some(key) = non_empty("LLM_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(region) = non_empty("AWS_REGION").or_else(|| non_empty("AWS_DEFAULT_REGION")) {
            self.region = region;
        }
        if let Some(format) = non_empty("DEFAULT_FORMAT") {
            self.default_format = ResponseFormat::parse_lenient(&format);
        }
        override_parsed(&mut self.max_tokens, "MAX_TOKENS", non_empty("MAX_TOKENS"));
        override_parsed(&mut self.temperature, "TEMPERATURE", non_empty("TEMPERATURE"));
        override_parsed(
            &mut self.timeout_secs,
            "LLM_TIMEOUT_SECS",
            non_empty("LLM_TIMEOUT_SECS"),
        );
        if let Some(flag) = non_empty("FORCE_JA") {
            self.force_ja = matches!(flag.trim().to_ascii_lowercase().as_str(), "1" | "true");
        }
        self
    }
}

fn override_parsed<T: FromStr>(slot: &mut T, key: &str, raw: Option<String>) {
    let Some(raw) = raw else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => *slot = value,
        Err(_) => warn!("Ignoring {key}='{raw}': not a valid value"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_stable() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.model_id, DEFAULT_MODEL_ID);
        assert_eq!(config.default_format, ResponseFormat::Json);
        assert_eq!(config.max_tokens, 2200);
        assert!((config.temperature - 0.15).abs() < f32::EPSILON);
        assert!(!config.force_ja);
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = AnalyzerConfig::default().with_env(lookup(&[
            ("BEDROCK_MODEL_ID", "anthropic.test"),
            ("DEFAULT_FORMAT", "Markdown"),
            ("MAX_TOKENS", "900"),
            ("FORCE_JA", "TRUE"),
            ("AWS_DEFAULT_REGION", "ap-northeast-1"),
        ]));
        assert_eq!(config.model_id, "anthropic.test");
        assert_eq!(config.default_format, ResponseFormat::Markdown);
        assert_eq!(config.max_tokens, 900);
        assert!(config.force_ja);
        assert_eq!(config.region, "ap-northeast-1");
    }

    #[test]
    fn unparseable_numbers_keep_previous_value() {
        let config = AnalyzerConfig::default().with_env(lookup(&[
            ("MAX_TOKENS", "lots"),
            ("TEMPERATURE", "warm"),
        ]));
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
        assert!((config.temperature - DEFAULT_TEMPERATURE).abs() < f32::EPSILON);
    }

    #[test]
    fn yaml_fills_missing_fields_from_defaults() {
        let config = AnalyzerConfig::from_yaml_str(
            "model_id: local-model\nendpoint: http://localhost:9000/converse\ndefault_format: text\n",
        )
        .unwrap();
        assert_eq!(config.model_id, "local-model");
        assert_eq!(config.endpoint.as_deref(), Some("http://localhost:9000/converse"));
        assert_eq!(config.default_format, ResponseFormat::Text);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }
}

//! Per-request orchestration.
//!
//! Local work (classification, compatibility, statistics) always completes
//! before the model is called, and a model failure only replaces the narrative.
//! The returned response always carries the local statistics.

use std::time::Instant;

use log::{info, warn};
use uuid::Uuid;

use crate::{
    classify::{Classification, classify_records},
    compat::{Compatibility, check_compatibility, resolve_category},
    config::AnalyzerConfig,
    llm::{LlmError, ModelClient, Narrative},
    prompt::{PromptContext, SYSTEM_PROMPT, build_prompt},
    request::AnalysisRequest,
    response::{AnalysisResponse, ResponseParts, assemble},
    stats::{Statistics, compute_statistics},
};

/// Everything computed locally for one request, before any model call.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalAnalysis {
    pub classification: Classification,
    pub compatibility: Compatibility,
    pub resolved: crate::classify::Category,
    pub stats: Statistics,
}

enum ModelSlot<C> {
    Offline,
    Ready(C),
    Unavailable(LlmError),
}

pub struct Analyzer<C: ModelClient> {
    config: AnalyzerConfig,
    model: ModelSlot<C>,
}

impl<C: ModelClient> Analyzer<C> {
    pub fn new(config: AnalyzerConfig, client: C) -> Self {
        Self {
            config,
            model: ModelSlot::Ready(client),
        }
    }

    /// Never calls a model; the narrative stays empty.
    pub fn offline(config: AnalyzerConfig) -> Self {
        Self {
            config,
            model: ModelSlot::Offline,
        }
    }

    /// The client could not be built; every response reports `err` as the model error.
    pub fn unavailable(config: AnalyzerConfig, err: LlmError) -> Self {
        Self {
            config,
            model: ModelSlot::Unavailable(err),
        }
    }

    pub fn analyze_locally(&self, request: &AnalysisRequest) -> LocalAnalysis {
        let classification = classify_records(&request.records);
        let compatibility = match &request.analysis_type {
            Some(requested) => check_compatibility(classification.category, requested),
            None => Compatibility {
                compatible: true,
                advisory: None,
            },
        };
        if let Some(advisory) = &compatibility.advisory {
            warn!("Analysis type mismatch: {advisory}");
        }
        let resolved = resolve_category(classification.category, request.analysis_type.as_ref());
        let stats = compute_statistics(&request.records);
        LocalAnalysis {
            classification,
            compatibility,
            resolved,
            stats,
        }
    }

    pub fn render_prompt(&self, request: &AnalysisRequest, local: &LocalAnalysis) -> String {
        let mut ctx = PromptContext::new(&local.stats, &request.records, local.resolved);
        ctx.instruction = &request.instruction;
        ctx.force_ja = self.config.force_ja;
        build_prompt(self.format_for(request), &ctx)
    }

    pub fn analyze(&self, request: &AnalysisRequest) -> AnalysisResponse {
        let started = Instant::now();
        let request_id = Uuid::new_v4().to_string();
        let format = self.format_for(request);
        let local = self.analyze_locally(request);

        let narrative = match &self.model {
            ModelSlot::Ready(client) => {
                let prompt = self.render_prompt(request, &local);
                match client.converse(SYSTEM_PROMPT, &prompt) {
                    Ok(text) => Narrative::from_model_text(&text, format),
                    Err(err) => {
                        warn!("request_id={request_id} model call failed: {err}");
                        Narrative::from_error(&err)
                    }
                }
            }
            ModelSlot::Unavailable(err) => Narrative::from_error(err),
            ModelSlot::Offline => Narrative::default(),
        };

        info!(
            "request_id={} rows={} detected={} resolved={} format={} duration_ms={}",
            request_id,
            local.stats.total_rows,
            local.classification.category,
            local.resolved,
            format,
            started.elapsed().as_millis()
        );

        assemble(ResponseParts {
            format,
            model_id: &self.config.model_id,
            request_id,
            stats: &local.stats,
            narrative,
            detected: local.classification.category,
            resolved: local.resolved,
            requested: request.analysis_type.as_ref().map(|t| t.as_str()),
            compatibility: local.compatibility.clone(),
        })
    }

    fn format_for(&self, request: &AnalysisRequest) -> crate::request::ResponseFormat {
        request.format.unwrap_or(self.config.default_format)
    }
}

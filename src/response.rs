//! Final response payload.
//!
//! JSON responses carry the narrative, a plain-language summary built from the
//! local statistics, and the evidence the summary was computed from. Markdown
//! and text responses carry only the narrative.

use serde::Serialize;
use serde_json::{Value as JsonValue, json};

use crate::{
    classify::Category,
    compat::Compatibility,
    llm::Narrative,
    request::ResponseFormat,
    stats::Statistics,
};

pub const EVIDENCE_SEPARATOR: &str = "---以下は読み込んだデータの証拠です---";
const SUMMARY_TREND_POINTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResponse {
    pub response: ResponseBody,
    pub format: ResponseFormat,
    pub message: String,
    pub model: String,
    pub request_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Detailed(DetailedBody),
    Summary { summary_ai: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedBody {
    pub summary_ai: String,
    pub presentation_md: String,
    pub key_insights: Vec<String>,
    pub separator: String,
    pub data_analysis: DataAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataAnalysis {
    pub total_records: usize,
    pub kpis: JsonValue,
    pub trend: JsonValue,
    pub detected_type: String,
    pub resolved_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_type: Option<String>,
    pub compatibility: Compatibility,
}

/// Inputs gathered by the pipeline for one response.
#[derive(Debug)]
pub struct ResponseParts<'a> {
    pub format: ResponseFormat,
    pub model_id: &'a str,
    pub request_id: String,
    pub stats: &'a Statistics,
    pub narrative: Narrative,
    pub detected: Category,
    pub resolved: Category,
    pub requested: Option<&'a str>,
    pub compatibility: Compatibility,
}

pub fn assemble(parts: ResponseParts<'_>) -> AnalysisResponse {
    let response = match parts.format {
        ResponseFormat::Markdown | ResponseFormat::Text => ResponseBody::Summary {
            summary_ai: parts.narrative.overview,
        },
        ResponseFormat::Json => {
            let default_kpis = json!({
                "total_sales": parts.stats.total_sales,
                "top_products": parts.stats.top_products,
            });
            let default_trend = json!(parts.stats.timeseries);
            ResponseBody::Detailed(DetailedBody {
                summary_ai: parts.narrative.overview,
                presentation_md: presentation_summary(parts.stats),
                key_insights: parts.narrative.findings,
                separator: EVIDENCE_SEPARATOR.to_string(),
                data_analysis: DataAnalysis {
                    total_records: parts.stats.total_rows,
                    kpis: parts.narrative.kpis.unwrap_or(default_kpis),
                    trend: parts.narrative.trend.unwrap_or(default_trend),
                    detected_type: parts.detected.display_name().to_string(),
                    resolved_type: parts.resolved.label().to_string(),
                    requested_type: parts.requested.map(str::to_string),
                    compatibility: parts.compatibility,
                },
            })
        }
    };
    AnalysisResponse {
        response,
        format: parts.format,
        message: "OK".to_string(),
        model: parts.model_id.to_string(),
        request_id: parts.request_id,
    }
}

/// One-paragraph Japanese summary of the totals and the first few days.
pub fn presentation_summary(stats: &Statistics) -> String {
    let trend = stats
        .timeseries
        .iter()
        .take(SUMMARY_TREND_POINTS)
        .filter(|point| !point.date.is_empty() && point.sales != 0.0)
        .map(|point| format!("{}に{}円", point.date, format_yen(point.sales)))
        .collect::<Vec<_>>();
    let trend_text = if trend.is_empty() {
        "データがありません".to_string()
    } else {
        trend.join("、")
    };
    format!(
        "{}件のデータを分析しました。売上合計は{}円で、1件あたり平均{}円でした。主な売上は{}となっています。",
        stats.total_rows,
        format_yen(stats.total_sales),
        format_yen(stats.avg_row_sales),
        trend_text
    )
}

/// Truncates toward zero and groups thousands: `-1234567.8` → `-1,234,567`.
pub fn format_yen(amount: f64) -> String {
    if !amount.is_finite() {
        return amount.to_string();
    }
    let truncated = amount.trunc() as i64;
    let digits = truncated.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if truncated < 0 {
        grouped.push('-');
    }
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

//! Request payload decoding and record loading.
//!
//! A request carries its rows in one of `salesData`, `csv`, `rows` or `data`,
//! checked in that order; the first field that is present with the right JSON
//! type wins. Everything except an unparseable JSON body degrades to an empty
//! or partial record set instead of failing.

use std::{fmt, path::Path};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::{
    compat::AnalysisType,
    data::{Record, Value},
    io_utils,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Json,
    Markdown,
    Text,
}

impl ResponseFormat {
    /// Case-insensitive; anything unrecognised is treated as JSON.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "markdown" => ResponseFormat::Markdown,
            "text" => ResponseFormat::Text,
            _ => ResponseFormat::Json,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResponseFormat::Json => "json",
            ResponseFormat::Markdown => "markdown",
            ResponseFormat::Text => "text",
        }
    }
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSource {
    SalesData,
    Csv,
    Rows,
    Data,
    Missing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub records: Vec<Record>,
    pub source: RecordSource,
    /// `None` means the caller did not ask; the configured default applies.
    pub format: Option<ResponseFormat>,
    pub analysis_type: Option<AnalysisType>,
    pub instruction: String,
}

impl AnalysisRequest {
    pub fn from_records(records: Vec<Record>) -> Self {
        Self {
            records,
            source: RecordSource::Rows,
            format: None,
            analysis_type: None,
            instruction: String::new(),
        }
    }

    pub fn parse(body: &str) -> Result<Self> {
        let trimmed = body.trim_start_matches('\u{feff}');
        let payload: JsonValue = if trimmed.trim().is_empty() {
            JsonValue::Object(Default::default())
        } else {
            serde_json::from_str(trimmed).context("Parsing request body as JSON")?
        };
        Ok(Self::from_json(&payload))
    }

    pub fn from_json(payload: &JsonValue) -> Self {
        let (records, source) = extract_records(payload);
        let text_field = |name: &str| {
            payload
                .get(name)
                .and_then(JsonValue::as_str)
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };
        let format = text_field("responseFormat").map(ResponseFormat::parse_lenient);
        let analysis_type = text_field("analysisType").map(AnalysisType::parse);
        let instruction = text_field("instruction")
            .or_else(|| text_field("prompt"))
            .unwrap_or_default()
            .to_string();
        debug!("Request carries {} row(s) from {:?}", records.len(), source);
        Self {
            records,
            source,
            format,
            analysis_type,
            instruction,
        }
    }
}

fn extract_records(payload: &JsonValue) -> (Vec<Record>, RecordSource) {
    if let Some(rows) = payload.get("salesData").and_then(JsonValue::as_array) {
        return (rows.iter().map(Record::from_json).collect(), RecordSource::SalesData);
    }
    if let Some(text) = payload.get("csv").and_then(JsonValue::as_str) {
        return (parse_csv_text(text, b','), RecordSource::Csv);
    }
    if let Some(rows) = payload.get("rows").and_then(JsonValue::as_array) {
        return (rows.iter().map(Record::from_json).collect(), RecordSource::Rows);
    }
    if let Some(rows) = payload.get("data").and_then(JsonValue::as_array) {
        return (rows.iter().map(Record::from_json).collect(), RecordSource::Data);
    }
    (Vec::new(), RecordSource::Missing)
}

/// Header row plus data rows; short rows pad with empty text, extra cells are dropped.
pub fn parse_csv_text(text: &str, delimiter: u8) -> Vec<Record> {
    let mut reader = io_utils::open_csv_reader(text.as_bytes(), delimiter, true);
    let headers = match reader.headers() {
        Ok(headers) => headers.iter().map(str::to_string).collect::<Vec<_>>(),
        Err(err) => {
            warn!("Unreadable CSV header row: {err}");
            return Vec::new();
        }
    };
    let mut records = Vec::new();
    for (row_idx, row) in reader.records().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                warn!("Stopping CSV parse at row {}: {err}", row_idx + 2);
                break;
            }
        };
        // whitespace-only line
        if row.len() == 1 && row.get(0).is_some_and(str::is_empty) {
            continue;
        }
        let record = headers
            .iter()
            .enumerate()
            .map(|(idx, header)| {
                let cell = row.get(idx).unwrap_or("");
                (header.as_str(), Value::Text(cell.to_string()))
            })
            .collect::<Record>();
        records.push(record);
    }
    records
}

/// Loads rows for the CLI: `.json` files hold a request payload or a bare
/// array, anything else is read as delimited text.
pub fn load_records(
    path: &Path,
    delimiter: Option<u8>,
    encoding_label: Option<&str>,
) -> Result<Vec<Record>> {
    let encoding = io_utils::resolve_encoding(encoding_label)?;
    let text = io_utils::read_input_text(path, encoding)?;
    if io_utils::is_json_path(path) || looks_like_json(&text) {
        let payload: JsonValue = serde_json::from_str(&text)
            .with_context(|| format!("Parsing JSON rows from {path:?}"))?;
        let records = match &payload {
            JsonValue::Array(rows) => rows.iter().map(Record::from_json).collect(),
            other => AnalysisRequest::from_json(other).records,
        };
        return Ok(records);
    }
    let delimiter = io_utils::resolve_input_delimiter(path, delimiter);
    Ok(parse_csv_text(&text, delimiter))
}

pub fn load_request(path: &Path, encoding: &'static Encoding) -> Result<AnalysisRequest> {
    let body = io_utils::read_input_text(path, encoding)?;
    AnalysisRequest::parse(&body).with_context(|| format!("Reading request from {path:?}"))
}

fn looks_like_json(text: &str) -> bool {
    matches!(text.trim_start().chars().next(), Some('{') | Some('['))
}

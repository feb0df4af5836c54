//! Loosely-typed cell values and records.
//!
//! Incoming rows arrive as JSON objects or CSV text whose cells may be text,
//! numbers, or missing. [`Value`] captures that at the boundary and
//! [`coerce_amount()`] turns any cell into a monetary amount without ever
//! failing: malformed cells count as zero.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};

const AMOUNT_NOISE: &[char] = &[',', '¥', '円'];

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
    Absent,
}

impl Value {
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Value::Absent,
            JsonValue::String(s) => Value::Text(s.clone()),
            JsonValue::Number(n) => match n.as_f64() {
                Some(f) => Value::Number(f),
                None => Value::Text(n.to_string()),
            },
            other => Value::Text(other.to_string()),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Text(s) => JsonValue::String(s.clone()),
            Value::Number(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::Absent => JsonValue::Null,
        }
    }

    /// Text form used for grouping keys and value-pattern checks.
    pub fn as_key(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Number(f) => {
                if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
                    (*f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
            Value::Absent => String::new(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_key())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Converts a cell into an amount. Never fails; anything unparseable is `0.0`.
pub fn coerce_amount(value: &Value) -> f64 {
    match value {
        Value::Number(f) => *f,
        Value::Text(s) => parse_amount_text(s),
        Value::Absent => 0.0,
    }
}

pub fn parse_amount_text(raw: &str) -> f64 {
    let cleaned = raw.replace(AMOUNT_NOISE, "");
    cleaned.trim().parse::<f64>().unwrap_or(0.0)
}

/// One input row. Keeps the column order it was declared with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_object(object: &Map<String, JsonValue>) -> Self {
        let fields = object
            .iter()
            .map(|(key, value)| (key.clone(), Value::from_json(value)))
            .collect();
        Self { fields }
    }

    /// Array entries that are not objects carry no fields.
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Object(object) => Self::from_json_object(object),
            _ => Self::new(),
        }
    }

    pub fn push(&mut self, column: impl Into<String>, value: Value) {
        let column = column.into();
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> &Value {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
            .unwrap_or(&Value::Absent)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_json(&self) -> JsonValue {
        let object = self
            .fields
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect::<Map<_, _>>();
        JsonValue::Object(object)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (column, value) in iter {
            record.push(column, value);
        }
        record
    }
}

/// Column names of the first record, or nothing for an empty sequence.
pub fn header_columns(records: &[Record]) -> Vec<String> {
    records
        .first()
        .map(|record| record.columns().map(str::to_string).collect())
        .unwrap_or_default()
}

//! Normalization of service response shapes.
//!
//! The listing endpoint has answered with an array of records, with an
//! object keyed by id, and with either of those wrapped in a `Data`
//! envelope. Internal code only ever sees an ordered `Vec<CodeSample>`.

use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::id::SampleId;
use crate::sample::CodeSample;

/// Envelope key used by some listing responses.
const ENVELOPE_KEY: &str = "Data";

/// Converts a listing response into an ordered sample collection.
///
/// Order is the wire order: array order, or key order for keyed maps.
pub fn normalize_collection(value: Value) -> Result<Vec<CodeSample>, CoreError> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| record_to_sample(item, None).map_err(|e| at(e, &idx.to_string())))
            .collect(),
        Value::Object(mut map) => {
            if map.len() == 1 {
                if let Some(inner) = map.remove(ENVELOPE_KEY) {
                    return normalize_collection(inner);
                }
            }
            map.into_iter()
                .map(|(key, item)| record_to_sample(item, Some(&key)).map_err(|e| at(e, &key)))
                .collect()
        }
        Value::Null => Ok(Vec::new()),
        other => Err(CoreError::MalformedResponse {
            reason: format!("expected array or object of samples, got {}", kind(&other)),
        }),
    }
}

/// Extracts an id from a name→id lookup response.
///
/// Accepts a bare string, a number, or an object with an `id` field.
/// Returns `None` for null, blank strings, and any other shape.
pub fn resolve_id(value: &Value) -> Option<SampleId> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| SampleId::from(s))
        }
        Value::Number(n) => Some(SampleId(n.to_string())),
        Value::Object(map) => map.get("id").and_then(resolve_id),
        _ => None,
    }
}

/// Extracts the source text from a content-by-id response (`{ code, ... }`).
pub fn extract_code(value: &Value) -> Result<String, CoreError> {
    value
        .get("code")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| CoreError::MalformedResponse {
            reason: "content response has no string `code` field".to_string(),
        })
}

/// Extracts the textual output from a compile response (`{ output }`).
pub fn extract_output(value: &Value) -> Option<String> {
    value.get("output").and_then(Value::as_str).map(str::to_string)
}

fn record_to_sample(value: Value, key: Option<&str>) -> Result<CodeSample, CoreError> {
    let Value::Object(record) = value else {
        return Err(CoreError::MalformedResponse {
            reason: format!("sample record is {}, not an object", kind(&value)),
        });
    };

    let id = record_id(&record)
        .or_else(|| key.map(SampleId::from))
        .ok_or_else(|| CoreError::MalformedResponse {
            reason: "sample record has no id".to_string(),
        })?;
    let name = record
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| CoreError::MalformedResponse {
            reason: format!("sample {} has no name", id),
        })?
        .to_string();
    let code = record
        .get("code")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(CodeSample { id, name, code })
}

fn record_id(record: &Map<String, Value>) -> Option<SampleId> {
    record.get("id").and_then(resolve_id)
}

fn at(err: CoreError, position: &str) -> CoreError {
    match err {
        CoreError::MalformedResponse { reason } => CoreError::MalformedResponse {
            reason: format!("{} (at {})", reason, position),
        },
        other => other,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

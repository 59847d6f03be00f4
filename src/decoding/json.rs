//! JSON decoder for the object-keyed and array submission forms.
//!
//! ```text
//! object: { "<sensorId>": value | [value] | [value, createdAt] | [value, createdAt, location], ... }
//! array:  [ { "sensor" | "sensor_id": id, "value": v, "createdAt"?: ts, "location"?: loc }, ... ]
//! ```

use serde_json::{Map, Value};
use serde_json_path::JsonPath;

use crate::error::MalformedPayload;
use crate::models::CandidateMeasurement;
use crate::timestamp::RawTimestamp;

// ---

/// The two accepted top-level shapes, decided once at the entry point.
enum Submission<'a> {
    Keyed(&'a Map<String, Value>),
    List(&'a [Value]),
}

impl<'a> TryFrom<&'a Value> for Submission<'a> {
    type Error = MalformedPayload;

    fn try_from(value: &'a Value) -> Result<Self, Self::Error> {
        // ---
        match value {
            Value::Object(map) => Ok(Submission::Keyed(map)),
            Value::Array(items) => Ok(Submission::List(items)),
            other => Err(MalformedPayload::JsonShape(json_type_name(other))),
        }
    }
}

pub(super) fn decode(
    document: &Value,
    json_path: Option<&str>,
) -> Result<Vec<CandidateMeasurement>, MalformedPayload> {
    // ---
    let root = match json_path {
        Some(path) => select(document, path)?,
        None => document,
    };

    match Submission::try_from(root)? {
        Submission::Keyed(map) => map
            .iter()
            .map(|(sensor_id, entry)| from_keyed_entry(sensor_id, entry))
            .collect(),
        Submission::List(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| from_list_item(index, item))
            .collect(),
    }
}

fn select<'a>(document: &'a Value, path: &str) -> Result<&'a Value, MalformedPayload> {
    // ---
    let compiled = JsonPath::parse(path).map_err(|e| MalformedPayload::JsonPath {
        path: path.to_string(),
        reason: e.to_string(),
    })?;

    compiled
        .query(document)
        .first()
        .ok_or_else(|| MalformedPayload::JsonPathNoMatch(path.to_string()))
}

fn from_keyed_entry(sensor_id: &str, entry: &Value) -> Result<CandidateMeasurement, MalformedPayload> {
    // ---
    let mut candidate = CandidateMeasurement {
        sensor_id: Some(sensor_id.to_string()),
        ..CandidateMeasurement::default()
    };

    let Value::Array(parts) = entry else {
        candidate.value = scalar_to_string(entry);
        return Ok(candidate);
    };

    match parts.as_slice() {
        [value] => {
            candidate.value = scalar_to_string(value);
        }
        [value, created_at] => {
            candidate.value = scalar_to_string(value);
            candidate.created_at = timestamp_field(created_at);
        }
        [value, created_at, location] => {
            candidate.value = scalar_to_string(value);
            candidate.created_at = timestamp_field(created_at);
            candidate.location = Some(location.clone());
        }
        _ => {
            return Err(MalformedPayload::JsonArrayLength {
                sensor_id: sensor_id.to_string(),
                len: parts.len(),
            })
        }
    }
    Ok(candidate)
}

fn from_list_item(index: usize, item: &Value) -> Result<CandidateMeasurement, MalformedPayload> {
    // ---
    let Value::Object(fields) = item else {
        return Err(MalformedPayload::JsonArrayItem {
            index,
            item: item.to_string(),
        });
    };

    // A non-null `sensor_id` wins over its `sensor` alias
    let sensor_id = fields
        .get("sensor_id")
        .filter(|id| !id.is_null())
        .or_else(|| fields.get("sensor"))
        .and_then(scalar_to_string);

    Ok(CandidateMeasurement {
        sensor_id,
        value: fields.get("value").and_then(scalar_to_string),
        created_at: fields.get("createdAt").and_then(timestamp_field),
        location: fields.get("location").filter(|l| !l.is_null()).cloned(),
    })
}

/// Numbers and strings become text; anything else counts as absent.
fn scalar_to_string(value: &Value) -> Option<String> {
    // ---
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// A present but non-textual timestamp is kept so validation rejects it.
fn timestamp_field(value: &Value) -> Option<RawTimestamp> {
    // ---
    match value {
        Value::Null => None,
        Value::String(s) => Some(RawTimestamp::Text(s.clone())),
        other => Some(RawTimestamp::Text(other.to_string())),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    // ---
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

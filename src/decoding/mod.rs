//! Decoder registry: maps a submission's format to its decoder.
//!
//! Each decoder turns a raw payload into [`CandidateMeasurement`]s in input
//! order; the shared validator then normalises the whole batch. A structural
//! failure anywhere in the payload fails the entire submission.

use std::{fmt, str::FromStr};

use serde_json::Value;

use crate::error::{DecodeError, MalformedPayload};
use crate::models::{CandidateMeasurement, SensorDescriptor, ValidatedMeasurement};
use crate::validator;

mod bytes;
mod csv;
mod json;
mod luftdaten;

// ---

/// Wire format of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatId {
    // ---
    Json,
    Csv,
    Luftdaten,
    /// 16 byte records without timestamp.
    Bytes,
    /// 20 byte records with a trailing Unix timestamp.
    BytesTimestamp,
}

impl FromStr for FormatId {
    type Err = DecodeError;

    /// Resolve a content type or explicit format flag. Media type parameters
    /// such as `; charset=utf-8` must be stripped by the caller.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // ---
        match s {
            "json" | "application/json" => Ok(FormatId::Json),
            "csv" | "text/csv" => Ok(FormatId::Csv),
            "luftdaten" => Ok(FormatId::Luftdaten),
            "bytes" | "application/sbx-bytes" => Ok(FormatId::Bytes),
            "bytes-ts" | "application/sbx-bytes-ts" => Ok(FormatId::BytesTimestamp),
            other => Err(DecodeError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ---
        let name = match self {
            FormatId::Json => "json",
            FormatId::Csv => "csv",
            FormatId::Luftdaten => "luftdaten",
            FormatId::Bytes => "bytes",
            FormatId::BytesTimestamp => "bytes-ts",
        };
        f.write_str(name)
    }
}

/// A submission body as received at the boundary.
#[derive(Debug, Clone, Copy)]
pub enum Payload<'a> {
    Bytes(&'a [u8]),
    Json(&'a Value),
}

impl<'a> Payload<'a> {
    fn as_text(&self) -> Result<&'a str, MalformedPayload> {
        // ---
        match *self {
            Payload::Bytes(bytes) => std::str::from_utf8(bytes).map_err(|_| MalformedPayload::NotText),
            Payload::Json(_) => Err(MalformedPayload::NotText),
        }
    }

    fn as_bytes(&self) -> Result<&'a [u8], MalformedPayload> {
        // ---
        match *self {
            Payload::Bytes(bytes) => Ok(bytes),
            Payload::Json(_) => Err(MalformedPayload::NotBinary),
        }
    }

    fn to_json(self) -> Result<std::borrow::Cow<'a, Value>, MalformedPayload> {
        // ---
        use std::borrow::Cow;
        match self {
            Payload::Json(value) => Ok(Cow::Borrowed(value)),
            Payload::Bytes(bytes) => Ok(Cow::Owned(serde_json::from_slice(bytes)?)),
        }
    }
}

/// Optional knowledge about the receiving box and transport envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeContext<'a> {
    /// Sensors of the target box. When set, every measurement must reference one.
    pub sensors: Option<&'a [SensorDescriptor]>,
    /// JSONPath selecting the measurements inside a larger JSON message.
    pub json_path: Option<&'a str>,
}

/// Decode and validate one submission.
pub fn decode(
    payload: Payload<'_>,
    format: FormatId,
    context: DecodeContext<'_>,
) -> Result<Vec<ValidatedMeasurement>, DecodeError> {
    // ---
    let candidates = decode_candidates(payload, format, context)?;
    tracing::debug!(
        "Decoded {} candidate measurements from {} payload",
        candidates.len(),
        format
    );

    Ok(validator::validate(candidates, context.sensors)?)
}

/// Run only the format-specific stage, without validation.
pub fn decode_candidates(
    payload: Payload<'_>,
    format: FormatId,
    context: DecodeContext<'_>,
) -> Result<Vec<CandidateMeasurement>, DecodeError> {
    // ---
    let candidates = match format {
        FormatId::Json => json::decode(&*payload.to_json()?, context.json_path)?,
        FormatId::Csv => csv::decode(payload.as_text()?)?,
        FormatId::Bytes => bytes::decode(payload.as_bytes()?, false)?,
        FormatId::BytesTimestamp => bytes::decode(payload.as_bytes()?, true)?,
        FormatId::Luftdaten => {
            luftdaten::decode(&*payload.to_json()?, context.sensors.unwrap_or_default())?
        }
    };
    Ok(candidates)
}

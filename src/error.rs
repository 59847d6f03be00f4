//! Error taxonomy for measurement decoding and validation.
//!
//! The `Display` output of every variant is returned to API clients verbatim
//! as the failure reason, so the wording here is part of the public contract.
//! Messages that concern a single record embed that record's JSON form.

use thiserror::Error;

/// Maximum number of measurements accepted in one submission.
pub const MAX_BATCH_SIZE: usize = 2500;

// ---

/// Any failure of one ingestion call.
#[derive(Debug, Error)]
pub enum DecodeError {
    // ---
    /// No decoder is registered for the given content type or format flag.
    #[error("Unsupported content-type or format '{0}'")]
    UnsupportedFormat(String),

    #[error(transparent)]
    MalformedPayload(#[from] MalformedPayload),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The vendor payload parsed, but none of its values matched a sensor.
    #[error("No applicable values found in payload: no value_type matched a sensor of this box")]
    NoApplicableData,
}

/// Structural decode failures. Always abort the whole submission.
#[derive(Debug, Error)]
pub enum MalformedPayload {
    // ---
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid JSONPath expression '{path}': {reason}")]
    JsonPath { path: String, reason: String },

    #[error("JSONPath '{0}' did not select any value in the payload")]
    JsonPathNoMatch(String),

    #[error("Measurements must be a JSON object or array, got {0}")]
    JsonShape(&'static str),

    #[error("A single measurement must be a JSON object {{value, createdAt?, location?}}")]
    SingleMeasurementShape,

    #[error("Measurement array element {index} is not an object: {item}")]
    JsonArrayItem { index: usize, item: String },

    #[error("Illegal value for sensor '{sensor_id}': arrays must have 1 to 3 elements, got {len}")]
    JsonArrayLength { sensor_id: String, len: usize },

    #[error("Payload is not valid UTF-8 text")]
    NotText,

    #[error("Invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Illegal line '{line}': expected 2 or 3 comma separated fields, got {fields}")]
    CsvFieldCount { line: String, fields: usize },

    #[error("Payload length {len} is not a multiple of the {record_len} byte record length")]
    BinaryLength { len: usize, record_len: usize },

    #[error("Binary formats require a raw byte payload")]
    NotBinary,

    #[error("Payload does not contain a 'sensordatavalues' array")]
    MissingSensorDataValues,
}

/// Semantic failures on structurally valid candidates.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    // ---
    #[error("Array too long: a submission may contain at most {max} measurements, got {len}")]
    BatchTooLarge { len: usize, max: usize },

    #[error("Submission must contain at least one measurement")]
    EmptyBatch,

    #[error("Measurement {item} has no sensor_id")]
    MissingSensorId { item: String },

    #[error("Measurement {item} references sensor '{sensor_id}' which does not belong to this box")]
    UnknownSensor { sensor_id: String, item: String },

    #[error("Measurement {item} has a missing or non-numeric value")]
    InvalidValue { item: String },

    #[error("Measurement {item} has an invalid timestamp or one more than a minute in the future")]
    InvalidTimestamp { item: String },

    #[error("Measurement {item} has an invalid location: {reason}")]
    InvalidLocation { item: String, reason: LocationError },
}

/// Reasons a location is rejected by the coordinate validator.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum LocationError {
    // ---
    #[error("missing latitude or longitude")]
    MissingCoordinates,

    #[error("latitude or longitude out of bounds")]
    OutOfBounds,

    #[error("location must be an array [lng, lat, height?] or an object {{lng, lat, height?}}")]
    InvalidShape,
}

/// Rejected outlier export parameters.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OutlierConfigError {
    // ---
    #[error("outlier-window must be an integer between 1 and 50, got {0}")]
    WindowOutOfRange(String),

    #[error("outliers must be 'mark' or 'replace', got '{0}'")]
    InvalidMode(String),
}

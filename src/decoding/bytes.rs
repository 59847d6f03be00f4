//! Fixed-width binary decoder.
//!
//! ```text
//! offset  0..12  sensor id, raw bytes (lowercase hex on decode)
//! offset 12..16  f32 value, little-endian
//! offset 16..20  u32 Unix timestamp in seconds, little-endian (bytes-ts only)
//! ```

use chrono::DateTime;

use crate::error::MalformedPayload;
use crate::models::CandidateMeasurement;

const SENSOR_ID_LEN: usize = 12;

/// Record length without timestamp.
pub const RECORD_LEN: usize = 16;

/// Record length with the trailing timestamp.
pub const RECORD_LEN_WITH_TIMESTAMP: usize = 20;

// ---

pub(super) fn decode(
    payload: &[u8],
    with_timestamp: bool,
) -> Result<Vec<CandidateMeasurement>, MalformedPayload> {
    // ---
    let record_len = if with_timestamp {
        RECORD_LEN_WITH_TIMESTAMP
    } else {
        RECORD_LEN
    };

    if payload.len() % record_len != 0 {
        return Err(MalformedPayload::BinaryLength {
            len: payload.len(),
            record_len,
        });
    }

    Ok(payload
        .chunks_exact(record_len)
        .map(decode_record)
        .collect())
}

fn decode_record(record: &[u8]) -> CandidateMeasurement {
    // ---
    let (sensor_id, rest) = record.split_at(SENSOR_ID_LEN);
    let (value, timestamp) = rest.split_at(4);

    let value = f32::from_le_bytes([value[0], value[1], value[2], value[3]]);
    let candidate = CandidateMeasurement::new(hex::encode(sensor_id), one_decimal(value));

    if let &[a, b, c, d] = timestamp {
        let seconds = u32::from_le_bytes([a, b, c, d]);
        // Every u32 second count is a representable instant
        if let Some(ts) = DateTime::from_timestamp(i64::from(seconds), 0) {
            return candidate.with_created_at(ts);
        }
    }
    candidate
}

/// One decimal place, exact ties rounded away from zero (`21.25` -> `21.3`).
fn one_decimal(value: f32) -> String {
    // ---
    format!("{:.1}", (f64::from(value) * 10.0).round() / 10.0)
}

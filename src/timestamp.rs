//! Timestamp parsing and future-skew checks shared by all decoders.
//!
//! Strings are parsed as strict ISO 8601. An explicit offset is honoured and
//! normalised to UTC; a timestamp without offset is taken as UTC. Nothing is
//! guessed: partial dates, week dates and free-form text are invalid.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

/// Grace band for device clocks running ahead of the server.
pub const FUTURE_TOLERANCE_SECS: i64 = 60;

const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

// ---

/// A timestamp as it arrived from a decoder.
#[derive(Debug, Clone, PartialEq)]
pub enum RawTimestamp {
    // ---
    /// Textual timestamp still to be parsed.
    Text(String),
    /// Already decoded, e.g. from a binary record.
    Parsed(DateTime<Utc>),
}

impl From<DateTime<Utc>> for RawTimestamp {
    fn from(value: DateTime<Utc>) -> Self {
        RawTimestamp::Parsed(value)
    }
}

/// Parse a raw timestamp. `None` means the input is not a valid ISO 8601 instant.
pub fn parse_timestamp(input: &RawTimestamp) -> Option<DateTime<Utc>> {
    // ---
    match input {
        RawTimestamp::Parsed(ts) => Some(*ts),
        RawTimestamp::Text(text) => parse_iso8601(text),
    }
}

fn parse_iso8601(text: &str) -> Option<DateTime<Utc>> {
    // ---
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }

    // Offset-less forms are UTC
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// True when `timestamp` lies no later than one minute past the current time.
#[cfg(test)]
pub fn is_timestamp_acceptable(timestamp: &DateTime<Utc>) -> bool {
    // ---
    is_timestamp_acceptable_at(timestamp, Utc::now())
}

/// True when `timestamp` lies no later than one minute past `now`.
pub fn is_timestamp_acceptable_at(timestamp: &DateTime<Utc>, now: DateTime<Utc>) -> bool {
    // ---
    *timestamp <= now + Duration::seconds(FUTURE_TOLERANCE_SECS)
}

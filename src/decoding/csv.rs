//! Line-oriented CSV decoder: `sensorId,value[,createdAt]` per line.

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::error::MalformedPayload;
use crate::models::CandidateMeasurement;
use crate::timestamp::RawTimestamp;

// ---

pub(super) fn decode(text: &str) -> Result<Vec<CandidateMeasurement>, MalformedPayload> {
    // ---
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut candidates = Vec::new();
    for record in reader.records() {
        let record = record?;
        // Leading delimiters carry no field
        let fields: Vec<&str> = record.iter().skip_while(|field| field.is_empty()).collect();

        let candidate = match fields.as_slice() {
            [] => continue,
            [sensor_id, value] => CandidateMeasurement::new(*sensor_id, *value),
            [sensor_id, value, created_at] => CandidateMeasurement::new(*sensor_id, *value)
                .with_created_at(RawTimestamp::Text(created_at.to_string())),
            _ => {
                return Err(MalformedPayload::CsvFieldCount {
                    line: raw_line(text, &record).to_string(),
                    fields: fields.len(),
                })
            }
        };
        candidates.push(candidate);
    }
    Ok(candidates)
}

/// The submitted text of the line `record` starts on.
fn raw_line<'a>(text: &'a str, record: &StringRecord) -> &'a str {
    // ---
    let start = record
        .position()
        .and_then(|pos| usize::try_from(pos.byte()).ok())
        .unwrap_or_default();

    text.get(start..)
        .and_then(|rest| rest.lines().next())
        .unwrap_or_default()
        .trim_end_matches('\r')
}

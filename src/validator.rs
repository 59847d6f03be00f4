//! Batch validation of decoded measurements.
//!
//! A batch is accepted or rejected as a whole: the first failing record
//! aborts the submission with an error naming that record.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use uuid::Uuid;

use crate::error::{ValidationError, MAX_BATCH_SIZE};
use crate::location::validate_and_normalize;
use crate::models::{CandidateMeasurement, SensorDescriptor, ValidatedMeasurement};
use crate::timestamp::{is_timestamp_acceptable_at, parse_timestamp};

/// Everything outside alphanumerics, Latin-1/Extended-A letters, space and `.,_-`.
static VALUE_DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9\x{00C0}-\x{017F} .,_-]").expect("static regex"));

// ---

/// Validate a batch against the current wall clock.
///
/// When `sensors` is given, every measurement must reference one of them.
pub fn validate(
    candidates: Vec<CandidateMeasurement>,
    sensors: Option<&[SensorDescriptor]>,
) -> Result<Vec<ValidatedMeasurement>, ValidationError> {
    validate_at(candidates, sensors, Utc::now())
}

/// Validate a batch against an explicit "now".
///
/// The result is ordered by ascending `createdAt`; measurements sharing a
/// timestamp keep their input order.
pub fn validate_at(
    candidates: Vec<CandidateMeasurement>,
    sensors: Option<&[SensorDescriptor]>,
    now: DateTime<Utc>,
) -> Result<Vec<ValidatedMeasurement>, ValidationError> {
    // ---
    if candidates.len() > MAX_BATCH_SIZE {
        return Err(ValidationError::BatchTooLarge {
            len: candidates.len(),
            max: MAX_BATCH_SIZE,
        });
    }
    if candidates.is_empty() {
        return Err(ValidationError::EmptyBatch);
    }

    let known: Option<HashSet<&str>> =
        sensors.map(|sensors| sensors.iter().map(|s| s.id.as_str()).collect());

    let mut validated = candidates
        .iter()
        .map(|candidate| validate_one(candidate, known.as_ref(), now))
        .collect::<Result<Vec<_>, _>>()?;

    validated.sort_by_key(|m| m.created_at);

    tracing::debug!("Validated batch of {} measurements", validated.len());
    Ok(validated)
}

fn validate_one(
    candidate: &CandidateMeasurement,
    known: Option<&HashSet<&str>>,
    now: DateTime<Utc>,
) -> Result<ValidatedMeasurement, ValidationError> {
    // ---
    let sensor_id = match candidate.sensor_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            return Err(ValidationError::MissingSensorId {
                item: candidate.to_json(),
            })
        }
    };

    if let Some(known) = known {
        if !known.contains(sensor_id.as_str()) {
            return Err(ValidationError::UnknownSensor {
                sensor_id,
                item: candidate.to_json(),
            });
        }
    }

    // Numeric check on the raw value; sanitising only shapes what is stored
    let value = candidate
        .value
        .as_deref()
        .map(str::trim)
        .filter(|v| is_finite_number(v))
        .map(sanitize_value)
        .ok_or_else(|| ValidationError::InvalidValue {
            item: candidate.to_json(),
        })?;

    let created_at = match &candidate.created_at {
        None => now,
        Some(raw) => parse_timestamp(raw)
            .filter(|ts| is_timestamp_acceptable_at(ts, now))
            .ok_or_else(|| ValidationError::InvalidTimestamp {
                item: candidate.to_json(),
            })?,
    };

    let location = candidate
        .location
        .as_ref()
        .map(validate_and_normalize)
        .transpose()
        .map_err(|reason| ValidationError::InvalidLocation {
            item: candidate.to_json(),
            reason,
        })?;

    Ok(ValidatedMeasurement {
        id: Uuid::new_v4(),
        sensor_id,
        value,
        created_at,
        location,
    })
}

/// Strip every character outside the accepted value alphabet.
pub fn sanitize_value(raw: &str) -> String {
    // ---
    VALUE_DISALLOWED.replace_all(raw, "").trim().to_string()
}

fn is_finite_number(value: &str) -> bool {
    // ---
    !value.is_empty() && value.parse::<f64>().is_ok_and(f64::is_finite)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::error::LocationError;
    use crate::timestamp::RawTimestamp;
    use chrono::{Duration, TimeZone};
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
    }

    fn sensor(id: &str) -> SensorDescriptor {
        SensorDescriptor {
            id: id.to_string(),
            title: "Temperatur".to_string(),
            unit: "°C".to_string(),
            sensor_type: "HDC1080".to_string(),
        }
    }

    fn batch(n: usize) -> Vec<CandidateMeasurement> {
        (0..n)
            .map(|i| CandidateMeasurement::new("s1", format!("{}", i as f64 / 10.0)))
            .collect()
    }

    #[test]
    fn test_batch_size_boundary() {
        // ---
        let ok = assert_ok!(validate_at(batch(MAX_BATCH_SIZE), None, now()));
        assert_eq!(ok.len(), 2500);

        let err = assert_err!(validate_at(batch(MAX_BATCH_SIZE + 1), None, now()));
        assert_eq!(
            err,
            ValidationError::BatchTooLarge {
                len: 2501,
                max: 2500
            }
        );
    }

    #[test]
    fn test_batch_too_large_wins_over_item_errors() {
        // ---
        let mut candidates = batch(MAX_BATCH_SIZE + 1);
        candidates[0].sensor_id = None;
        assert!(matches!(
            validate_at(candidates, None, now()),
            Err(ValidationError::BatchTooLarge { .. })
        ));
    }

    #[test]
    fn test_empty_batch() {
        // ---
        assert_eq!(
            validate_at(vec![], None, now()),
            Err(ValidationError::EmptyBatch)
        );
    }

    #[test]
    fn test_defaults_and_identity() {
        // ---
        let out = validate_at(vec![CandidateMeasurement::new(" s1 ", "21.5")], None, now()).unwrap();
        assert_eq!(out[0].sensor_id, "s1");
        assert_eq!(out[0].value, "21.5");
        assert_eq!(out[0].created_at, now());
        assert_eq!(out[0].location, None);
        assert!(!out[0].id.is_nil());
    }

    #[test]
    fn test_missing_sensor_id() {
        // ---
        let candidate = CandidateMeasurement {
            sensor_id: Some("  ".to_string()),
            value: Some("1".to_string()),
            ..Default::default()
        };
        let err = validate_at(vec![candidate], None, now()).unwrap_err();
        assert!(matches!(err, ValidationError::MissingSensorId { .. }));
        assert!(err.to_string().contains(r#""value":"1""#));
    }

    #[test]
    fn test_sensor_must_belong_to_box() {
        // ---
        let sensors = [sensor("s1"), sensor("s2")];
        assert_ok!(validate_at(
            vec![CandidateMeasurement::new("s2", "1")],
            Some(&sensors),
            now()
        ));

        let err = validate_at(
            vec![
                CandidateMeasurement::new("s1", "1"),
                CandidateMeasurement::new("s3", "1"),
            ],
            Some(&sensors),
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::UnknownSensor { ref sensor_id, .. } if sensor_id == "s3"));
    }

    #[test]
    fn test_value_rules() {
        // ---
        for good in ["0", "-3.5", "1e3", "  12  "] {
            assert_ok!(validate_at(vec![CandidateMeasurement::new("s", good)], None, now()));
        }
        for bad in ["", "abc", "NaN", "inf", "--1", "1.2.3", "(7)", "5;", "<1>", "12'", "+23.1°"] {
            let err = assert_err!(validate_at(vec![CandidateMeasurement::new("s", bad)], None, now()));
            assert!(matches!(err, ValidationError::InvalidValue { .. }), "{bad:?}");
        }

        let missing = CandidateMeasurement {
            sensor_id: Some("s".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            validate_at(vec![missing], None, now()),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_sanitising_does_not_make_value_numeric() {
        // ---
        for raw in ["(7)", "5;"] {
            let err = assert_err!(validate_at(vec![CandidateMeasurement::new("s", raw)], None, now()));
            assert!(matches!(err, ValidationError::InvalidValue { .. }), "{raw:?}");
        }
    }

    #[test]
    fn test_value_is_sanitized() {
        // ---
        assert_eq!(sanitize_value("21.5°C"), "21.5C");
        assert_eq!(sanitize_value("<b>42</b>"), "b42b");
        assert_eq!(sanitize_value("Größe_1,5 - ok"), "Größe_1,5 - ok");

        // A leading plus sign is numeric but outside the stored alphabet
        let out = validate_at(vec![CandidateMeasurement::new("s", " +23.1 ")], None, now()).unwrap();
        assert_eq!(out[0].value, "23.1");
    }

    #[test]
    fn test_timestamp_rules() {
        // ---
        let at = |ts: DateTime<Utc>| {
            validate_at(
                vec![CandidateMeasurement::new("s", "1").with_created_at(ts)],
                None,
                now(),
            )
        };
        assert_ok!(at(now() + Duration::seconds(59)));
        assert_ok!(at(now() + Duration::seconds(60)));
        assert!(matches!(
            at(now() + Duration::seconds(61)),
            Err(ValidationError::InvalidTimestamp { .. })
        ));

        let garbage = CandidateMeasurement::new("s", "1")
            .with_created_at(RawTimestamp::Text("not a date".to_string()));
        assert!(matches!(
            validate_at(vec![garbage], None, now()),
            Err(ValidationError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn test_location_is_normalised_or_rejected() {
        // ---
        let out = validate_at(
            vec![CandidateMeasurement::new("s", "1").with_location(json!({"lng": 7.1234567, "lat": 51.5}))],
            None,
            now(),
        )
        .unwrap();
        assert_eq!(out[0].location.unwrap().to_vec(), vec![7.123457, 51.5]);

        let err = validate_at(
            vec![CandidateMeasurement::new("s", "1").with_location(json!([0]))],
            None,
            now(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InvalidLocation {
                reason: LocationError::MissingCoordinates,
                ..
            }
        ));
    }

    #[test]
    fn test_batch_is_sorted_by_created_at_stably() {
        // ---
        let t = |h| Utc.with_ymd_and_hms(2024, 5, 1, h, 0, 0).unwrap();
        let out = validate_at(
            vec![
                CandidateMeasurement::new("a", "3").with_created_at(t(9)),
                CandidateMeasurement::new("a", "1").with_created_at(t(7)),
                CandidateMeasurement::new("b", "2").with_created_at(t(8)),
                CandidateMeasurement::new("b", "4").with_created_at(t(8)),
            ],
            None,
            now(),
        )
        .unwrap();
        let values: Vec<_> = out.iter().map(|m| m.value.as_str()).collect();
        assert_eq!(values, ["1", "2", "4", "3"]);
    }

    #[test]
    fn test_one_bad_item_rejects_whole_batch() {
        // ---
        let mut candidates = batch(10);
        candidates[7].value = Some("n/a".to_string());
        let err = validate_at(candidates, None, now()).unwrap_err();
        assert!(err.to_string().contains(r#""value":"n/a""#));
    }
}

//! Decoder for Luftdaten-style vendor payloads.
//!
//! The payload carries no sensor ids. Each `value_type` such as
//! `BME280_temperature` or `SDS_P1` is split into a sensor-type prefix and a
//! phenomenon, and matched against the box's sensors by `sensorType` prefix
//! and title. First match wins; value types that match nothing are dropped.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{DecodeError, MalformedPayload};
use crate::models::{CandidateMeasurement, SensorDescriptor};

/// Sensor titles accepted for a phenomenon besides the phenomenon itself.
const PHENOMENON_ALIASES: &[(&str, &[&str])] = &[
    ("p1", &["pm10"]),
    ("p2", &["pm2.5", "pm25"]),
    ("temperature", &["temperatur"]),
    ("humidity", &["rel. luftfeuchte", "luftfeuchtigkeit", "luftfeuchte"]),
    ("pressure", &["luftdruck", "druck"]),
    ("signal", &["wifi-stärke", "signalstärke"]),
];

// ---

#[derive(Debug, Deserialize)]
struct SensorDataValue {
    value_type: String,
    value: Value,
}

pub(super) fn decode(
    document: &Value,
    sensors: &[SensorDescriptor],
) -> Result<Vec<CandidateMeasurement>, DecodeError> {
    // ---
    let values = document
        .get("sensordatavalues")
        .filter(|v| v.is_array())
        .ok_or(MalformedPayload::MissingSensorDataValues)?;
    let values: Vec<SensorDataValue> =
        serde_json::from_value(values.clone()).map_err(MalformedPayload::Json)?;

    let candidates: Vec<CandidateMeasurement> = values
        .iter()
        .filter_map(|entry| {
            let Some(sensor) = find_sensor(sensors, &entry.value_type) else {
                tracing::debug!("Dropping unmatched value_type '{}'", entry.value_type);
                return None;
            };
            let value = match &entry.value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some(CandidateMeasurement::new(sensor.id.as_str(), value))
        })
        .collect();

    if candidates.is_empty() {
        return Err(DecodeError::NoApplicableData);
    }
    Ok(candidates)
}

fn find_sensor<'a>(sensors: &'a [SensorDescriptor], value_type: &str) -> Option<&'a SensorDescriptor> {
    // ---
    let value_type = value_type.to_lowercase();
    let (type_prefix, phenomenon) = match value_type.split_once('_') {
        Some((prefix, phenomenon)) => (prefix, phenomenon),
        // DHT value types carry no prefix; neither does the WiFi signal
        None if value_type == "signal" => ("wifi", value_type.as_str()),
        None => ("dht", value_type.as_str()),
    };

    let aliases = PHENOMENON_ALIASES
        .iter()
        .find(|(name, _)| *name == phenomenon)
        .map_or(&[][..], |(_, titles)| *titles);

    sensors.iter().find(|sensor| {
        let sensor_type: String = sensor
            .sensor_type
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let title = sensor.title.trim().to_lowercase();

        sensor_type.starts_with(type_prefix)
            && (title == phenomenon || aliases.contains(&title.as_str()))
    })
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use serde_json::json;

    fn sensor(id: &str, title: &str, sensor_type: &str) -> SensorDescriptor {
        SensorDescriptor {
            id: id.to_string(),
            title: title.to_string(),
            unit: String::new(),
            sensor_type: sensor_type.to_string(),
        }
    }

    fn feinstaub_box() -> Vec<SensorDescriptor> {
        vec![
            sensor("pm10", "PM10", "SDS 011"),
            sensor("pm25", "PM2.5", "SDS 011"),
            sensor("temp", "Temperatur", "DHT22"),
            sensor("humi", "rel. Luftfeuchte", "DHT22"),
            sensor("bme-temp", "Temperatur", "BME280"),
            sensor("bme-pres", "Luftdruck", "BME280"),
        ]
    }

    #[test]
    fn test_sds_phenomena() {
        // ---
        let payload = json!({
            "esp8266id": "1234567",
            "software_version": "NRZ-2018-123B",
            "sensordatavalues": [
                {"value_type": "SDS_P1", "value": "12.40"},
                {"value_type": "SDS_P2", "value": "7.10"}
            ]
        });
        let out = decode(&payload, &feinstaub_box()).unwrap();
        assert_eq!(
            out,
            vec![
                CandidateMeasurement::new("pm10", "12.40"),
                CandidateMeasurement::new("pm25", "7.10"),
            ]
        );
    }

    #[test]
    fn test_prefixless_and_prefixed_types() {
        // ---
        let payload = json!({"sensordatavalues": [
            {"value_type": "temperature", "value": "20.1"},
            {"value_type": "humidity", "value": "55"},
            {"value_type": "BME280_temperature", "value": "19.8"},
            {"value_type": "BME280_pressure", "value": "100321.5"},
            {"value_type": "samples", "value": "617000"},
            {"value_type": "signal", "value": "-71"}
        ]});
        let out = decode(&payload, &feinstaub_box()).unwrap();
        let ids: Vec<_> = out.iter().map(|c| c.sensor_id.clone().unwrap()).collect();
        assert_eq!(ids, ["temp", "humi", "bme-temp", "bme-pres"]);
    }

    #[test]
    fn test_signal_matches_wifi_sensor() {
        // ---
        let sensors = [sensor("wifi", "Signal", "WiFi")];
        let payload = json!({"sensordatavalues": [{"value_type": "signal", "value": -60}]});
        let out = decode(&payload, &sensors).unwrap();
        assert_eq!(out, vec![CandidateMeasurement::new("wifi", "-60")]);
    }

    #[test]
    fn test_first_match_wins() {
        // ---
        let sensors = [
            sensor("first", "PM10", "SDS011"),
            sensor("second", "PM10", "SDS011"),
        ];
        let payload = json!({"sensordatavalues": [{"value_type": "SDS_P1", "value": "1"}]});
        assert_eq!(decode(&payload, &sensors).unwrap()[0].sensor_id.as_deref(), Some("first"));
    }

    #[test]
    fn test_type_prefix_gates_match() {
        // ---
        // A PM10 sensor of another type must not receive SDS values
        let sensors = [sensor("pm", "PM10", "PMS5003")];
        let payload = json!({"sensordatavalues": [{"value_type": "SDS_P1", "value": "1"}]});
        assert!(matches!(
            decode(&payload, &sensors),
            Err(DecodeError::NoApplicableData)
        ));
    }

    #[test]
    fn test_nothing_matched() {
        // ---
        let payload = json!({"sensordatavalues": [{"value_type": "min_micro", "value": "1"}]});
        assert!(matches!(
            decode(&payload, &feinstaub_box()),
            Err(DecodeError::NoApplicableData)
        ));
        assert!(matches!(decode(&payload, &[]), Err(DecodeError::NoApplicableData)));
    }

    #[test]
    fn test_missing_sensordatavalues() {
        // ---
        for payload in [json!({"values": []}), json!({"sensordatavalues": "x"}), json!([1])] {
            assert!(matches!(
                decode(&payload, &feinstaub_box()),
                Err(DecodeError::MalformedPayload(MalformedPayload::MissingSensorDataValues))
            ));
        }
    }
}

//! Data models for the measurement ingestion pipeline.

use chrono::{DateTime, Utc};
use serde::{ser::SerializeMap, Serialize, Serializer};
use serde_json::Value;
use uuid::Uuid;

use crate::timestamp::RawTimestamp;

// ---

/// Decoder output prior to validation.
///
/// Every decoder produces these in input order; the validator turns them into
/// [`ValidatedMeasurement`]s or rejects the whole batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateMeasurement {
    // ---
    pub sensor_id: Option<String>,
    pub value: Option<String>,
    pub created_at: Option<RawTimestamp>,
    /// Unvalidated location, either `[lng, lat, height?]` or `{lng, lat, height?}`.
    pub location: Option<Value>,
}

impl CandidateMeasurement {
    // ---
    pub fn new(sensor_id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            sensor_id: Some(sensor_id.into()),
            value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn with_created_at(mut self, created_at: impl Into<RawTimestamp>) -> Self {
        self.created_at = Some(created_at.into());
        self
    }

    #[cfg(test)]
    pub fn with_location(mut self, location: Value) -> Self {
        self.location = Some(location);
        self
    }

    /// JSON rendering used in client-facing error messages.
    pub fn to_json(&self) -> String {
        // ---
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}

impl Serialize for CandidateMeasurement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // ---
        let mut map = serializer.serialize_map(None)?;
        if let Some(sensor_id) = &self.sensor_id {
            map.serialize_entry("sensor_id", sensor_id)?;
        }
        if let Some(value) = &self.value {
            map.serialize_entry("value", value)?;
        }
        match &self.created_at {
            Some(RawTimestamp::Text(text)) => map.serialize_entry("createdAt", text)?,
            Some(RawTimestamp::Parsed(ts)) => map.serialize_entry("createdAt", ts)?,
            None => {}
        }
        if let Some(location) = &self.location {
            map.serialize_entry("location", location)?;
        }
        map.end()
    }
}

/// A normalised WGS84 position, serialised as `[lng, lat]` or `[lng, lat, height]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub lng: f64,
    pub lat: f64,
    pub height: Option<f64>,
}

impl Location {
    pub fn to_vec(&self) -> Vec<f64> {
        // ---
        let mut coords = vec![self.lng, self.lat];
        coords.extend(self.height);
        coords
    }
}

impl Serialize for Location {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.to_vec())
    }
}

/// Canonical measurement handed to the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedMeasurement {
    // ---
    pub id: Uuid,
    pub sensor_id: String,
    pub value: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

/// A sensor of a box, as needed for ownership checks and vendor matching.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct SensorDescriptor {
    // ---
    pub id: String,
    pub title: String,
    pub unit: String,
    pub sensor_type: String,
}

/// A persisted measurement row, as read back for export.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct StoredMeasurement {
    // ---
    pub sensor_id: String,
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub lng: Option<f64>,
    pub lat: Option<f64>,
    pub height: Option<f64>,
}

impl StoredMeasurement {
    pub fn location(&self) -> Option<Location> {
        // ---
        match (self.lng, self.lat) {
            (Some(lng), Some(lat)) => Some(Location {
                lng,
                lat,
                height: self.height,
            }),
            _ => None,
        }
    }
}

/// Export representation of one measurement, optionally carrying outlier metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportedMeasurement {
    // ---
    pub sensor_id: String,
    pub value: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(rename = "isOutlier", skip_serializing_if = "Option::is_none")]
    pub is_outlier: Option<bool>,
}

impl From<StoredMeasurement> for ExportedMeasurement {
    fn from(stored: StoredMeasurement) -> Self {
        // ---
        let location = stored.location();
        ExportedMeasurement {
            sensor_id: stored.sensor_id,
            value: stored.value,
            created_at: stored.created_at,
            location,
            is_outlier: None,
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_location_serializes_as_array() {
        // ---
        let flat = Location {
            lng: 7.5,
            lat: 51.9,
            height: None,
        };
        assert_eq!(serde_json::to_value(flat).unwrap(), json!([7.5, 51.9]));

        let with_height = Location {
            height: Some(66.6),
            ..flat
        };
        assert_eq!(
            serde_json::to_value(with_height).unwrap(),
            json!([7.5, 51.9, 66.6])
        );
    }

    #[test]
    fn test_candidate_json_omits_absent_fields() {
        // ---
        let candidate = CandidateMeasurement {
            sensor_id: Some("abc".to_string()),
            ..Default::default()
        };
        assert_eq!(candidate.to_json(), r#"{"sensor_id":"abc"}"#);

        let candidate = CandidateMeasurement::new("abc", "1.5")
            .with_created_at(RawTimestamp::Text("2020-01-01T00:00:00Z".to_string()))
            .with_location(json!([1, 2]));
        assert_eq!(
            candidate.to_json(),
            r#"{"sensor_id":"abc","value":"1.5","createdAt":"2020-01-01T00:00:00Z","location":[1,2]}"#
        );
    }

    #[test]
    fn test_validated_measurement_wire_shape() {
        // ---
        let m = ValidatedMeasurement {
            id: Uuid::nil(),
            sensor_id: "s1".to_string(),
            value: "21.5".to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 3, 26, 18, 45, 0).unwrap(),
            location: None,
        };
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["createdAt"], json!("2025-03-26T18:45:00Z"));
        assert!(v.get("location").is_none());
    }

    #[test]
    fn test_stored_location_requires_both_coordinates() {
        // ---
        let stored = StoredMeasurement {
            sensor_id: "s1".to_string(),
            value: "1".to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
            lng: Some(1.0),
            lat: None,
            height: Some(3.0),
        };
        assert_eq!(stored.location(), None);

        let exported = ExportedMeasurement::from(StoredMeasurement {
            lat: Some(2.0),
            ..stored
        });
        assert_eq!(exported.location.unwrap().to_vec(), vec![1.0, 2.0, 3.0]);
        assert_eq!(exported.is_outlier, None);
    }
}

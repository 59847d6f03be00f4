//! Coordinate validation and normalisation.
//!
//! Accepts `[lng, lat, height?]` arrays (extra trailing elements ignored) or
//! `{lng, lat, height?}` objects. Numbers may arrive as JSON numbers or as
//! numeric strings. Longitude and latitude are rounded to 6 decimal places,
//! height to 3.

use serde_json::Value;

use crate::error::LocationError;
use crate::models::Location;

const MAX_LNG: f64 = 180.0;
const MAX_LAT: f64 = 90.0;

// ---

/// Validate a raw location value and normalise it to a [`Location`].
pub fn validate_and_normalize(coords: &Value) -> Result<Location, LocationError> {
    // ---
    let (lng, lat, height) = match coords {
        Value::Array(items) => (items.first(), items.get(1), items.get(2)),
        Value::Object(map) => (map.get("lng"), map.get("lat"), map.get("height")),
        _ => return Err(LocationError::InvalidShape),
    };

    let (Some(lng), Some(lat)) = (lng.and_then(as_number), lat.and_then(as_number)) else {
        return Err(LocationError::MissingCoordinates);
    };

    if lng.abs() > MAX_LNG || lat.abs() > MAX_LAT {
        return Err(LocationError::OutOfBounds);
    }

    Ok(Location {
        lng: round_to(lng, 6),
        lat: round_to(lat, 6),
        // Non-numeric height is dropped, not rejected
        height: height.and_then(as_number).map(|h| round_to(h, 3)),
    })
}

fn as_number(value: &Value) -> Option<f64> {
    // ---
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    // ---
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use serde_json::json;

    #[test]
    fn test_array_and_object_forms_agree() {
        // ---
        let from_array = validate_and_normalize(&json!([7.6, 51.96])).unwrap();
        let from_object = validate_and_normalize(&json!({"lng": 7.6, "lat": 51.96})).unwrap();
        assert_eq!(from_array, from_object);
        assert_eq!(from_array.to_vec(), vec![7.6, 51.96]);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        // ---
        assert!(validate_and_normalize(&json!([180.0, 90.0])).is_ok());
        assert!(validate_and_normalize(&json!([-180.0, -90.0])).is_ok());
        assert_eq!(
            validate_and_normalize(&json!([180.1, 0])),
            Err(LocationError::OutOfBounds)
        );
        assert_eq!(
            validate_and_normalize(&json!({"lng": 0, "lat": 90.1})),
            Err(LocationError::OutOfBounds)
        );
    }

    #[test]
    fn test_missing_coordinates() {
        // ---
        assert_eq!(
            validate_and_normalize(&json!([0])),
            Err(LocationError::MissingCoordinates)
        );
        assert_eq!(
            validate_and_normalize(&json!({"lng": 5})),
            Err(LocationError::MissingCoordinates)
        );
        assert_eq!(
            validate_and_normalize(&json!(["east", 5])),
            Err(LocationError::MissingCoordinates)
        );
        assert_eq!(
            validate_and_normalize(&json!("7.6,51.9")),
            Err(LocationError::InvalidShape)
        );
    }

    #[test]
    fn test_rounding_and_height() {
        // ---
        let loc = validate_and_normalize(&json!([7.123456789, "51.98765449", 66.12345, 99])).unwrap();
        assert_eq!(loc.lng, 7.123457);
        assert_eq!(loc.lat, 51.987654);
        assert_eq!(loc.height, Some(66.123));

        let loc = validate_and_normalize(&json!({"lng": "1", "lat": "2", "height": "high"})).unwrap();
        assert_eq!(loc.to_vec(), vec![1.0, 2.0]);
    }
}

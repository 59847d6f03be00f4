//! Read side: one sensor's measurements, optionally outlier-filtered.
//!
//! `GET /boxes/{box_id}/data/{sensor_id}` with query parameters
//! `from-date`, `to-date` (ISO 8601), `outliers=mark|replace` and
//! `outlier-window` (1-50, default 15). Rows are fed from the database cursor
//! through a per-request [`OutlierTransform`] one at a time.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;

use super::ApiError;
use crate::models::ExportedMeasurement;
use crate::outliers::{OutlierConfig, OutlierTransform};
use crate::timestamp::{parse_timestamp, RawTimestamp};
use crate::{store, Config};

/// Window used when only one or neither bound is given.
const DEFAULT_RANGE_HOURS: i64 = 48;

// ---

pub fn router() -> Router<(PgPool, Config)> {
    // ---
    Router::new().route("/boxes/{box_id}/data/{sensor_id}", get(handler))
}

/// Query parameters for the sensor data export
#[derive(Debug, Default, Deserialize)]
struct SensorDataQuery {
    #[serde(rename = "from-date")]
    from_date: Option<String>,
    #[serde(rename = "to-date")]
    to_date: Option<String>,
    outliers: Option<String>,
    #[serde(rename = "outlier-window")]
    outlier_window: Option<String>,
}

async fn handler(
    Path((box_id, sensor_id)): Path<(String, String)>,
    Query(params): Query<SensorDataQuery>,
    State((pool, _config)): State<(PgPool, Config)>,
) -> Result<Json<Vec<ExportedMeasurement>>, ApiError> {
    // ---
    let (from, to) = time_range(&params, Utc::now())?;
    let outliers =
        OutlierConfig::from_query(params.outliers.as_deref(), params.outlier_window.as_deref())?;
    info!(
        "GET /boxes/{}/data/{} - {} .. {}, outliers: {:?}",
        box_id, sensor_id, from, to, outliers
    );

    let sensors = store::load_box_sensors(&pool, &box_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Box {box_id} not found")))?;
    if !sensors.iter().any(|s| s.id == sensor_id) {
        return Err(ApiError::NotFound(format!(
            "Sensor {sensor_id} not found in box {box_id}"
        )));
    }

    // One transform per request, never shared
    let mut transform = outliers.map(OutlierTransform::new);
    let mut exported = Vec::new();

    let count = store::for_each_sensor_measurement(&pool, &sensor_id, from, to, |row| {
        let measurement = match transform.as_mut() {
            Some(transform) => transform.apply(row),
            None => ExportedMeasurement::from(row),
        };
        exported.push(measurement);
    })
    .await?;

    info!("Returning {} measurements for sensor {}", count, sensor_id);
    Ok(Json(exported))
}

/// Resolve the requested time range. Without bounds the last 48 hours up to
/// now are returned; a single bound extends 48 hours the other way.
fn time_range(
    params: &SensorDataQuery,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), ApiError> {
    // ---
    let parse = |name: &str, raw: &Option<String>| -> Result<Option<DateTime<Utc>>, ApiError> {
        raw.as_ref()
            .map(|text| {
                parse_timestamp(&RawTimestamp::Text(text.clone())).ok_or_else(|| {
                    ApiError::InvalidQuery(format!("Invalid ISO 8601 timestamp for {name}: '{text}'"))
                })
            })
            .transpose()
    };

    let window = Duration::hours(DEFAULT_RANGE_HOURS);
    let (from, to) = match (parse("from-date", &params.from_date)?, parse("to-date", &params.to_date)?) {
        (Some(from), Some(to)) => (from, to),
        (Some(from), None) => (from, from + window),
        (None, Some(to)) => (to - window, to),
        (None, None) => (now - window, now),
    };

    if from > to {
        return Err(ApiError::InvalidQuery(
            "from-date must not be after to-date".to_string(),
        ));
    }
    Ok((from, to))
}

//! Measurement ingestion endpoints.
//!
//! - `POST /boxes/{box_id}/data` takes a batch in any supported format,
//!   selected by `Content-Type` or `?luftdaten=true`.
//! - `POST /boxes/{box_id}/{sensor_id}` takes one JSON measurement
//!   `{ value, createdAt?, location? }` for one sensor.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use tracing::{debug, info};

use super::ApiError;
use crate::decoding::{self, DecodeContext, FormatId, Payload};
use crate::error::{DecodeError, MalformedPayload};
use crate::{store, Config, SensorDescriptor};

// ---

pub fn router() -> Router<(PgPool, Config)> {
    // ---
    Router::new()
        .route("/boxes/{box_id}/data", post(post_batch))
        .route("/boxes/{box_id}/{sensor_id}", post(post_single))
}

#[derive(Debug, Default, Deserialize)]
struct IngestQuery {
    #[serde(default)]
    luftdaten: bool,
}

#[derive(Debug, Serialize)]
struct IngestResponse {
    message: &'static str,
    count: usize,
}

async fn post_batch(
    Path(box_id): Path<String>,
    Query(params): Query<IngestQuery>,
    State((pool, _config)): State<(PgPool, Config)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
    // ---
    let format = resolve_format(&headers, params.luftdaten)?;
    info!("POST /boxes/{}/data - {} bytes as {}", box_id, body.len(), format);

    let sensors = box_sensors(&pool, &box_id).await?;
    let context = DecodeContext {
        sensors: Some(&sensors),
        json_path: None,
    };
    let batch = decoding::decode(Payload::Bytes(&body), format, context)?;

    store::insert_measurements(&pool, &batch).await?;
    debug!("POST /boxes/{}/data - stored {} measurements", box_id, batch.len());

    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            message: "Measurements saved in box",
            count: batch.len(),
        }),
    ))
}

async fn post_single(
    Path((box_id, sensor_id)): Path<(String, String)>,
    State((pool, _config)): State<(PgPool, Config)>,
    body: Bytes,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
    // ---
    info!("POST /boxes/{}/{} - single measurement", box_id, sensor_id);

    let mut measurement: Value = serde_json::from_slice(&body)
        .map_err(|e| DecodeError::from(MalformedPayload::Json(e)))?;
    let Some(fields) = measurement.as_object_mut() else {
        return Err(DecodeError::from(MalformedPayload::SingleMeasurementShape).into());
    };
    fields.insert("sensor_id".to_string(), Value::String(sensor_id));

    let sensors = box_sensors(&pool, &box_id).await?;
    let context = DecodeContext {
        sensors: Some(&sensors),
        json_path: None,
    };
    let document = Value::Array(vec![measurement]);
    let batch = decoding::decode(Payload::Json(&document), FormatId::Json, context)?;

    store::insert_measurements(&pool, &batch).await?;

    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            message: "Measurement saved in box",
            count: batch.len(),
        }),
    ))
}

// ---

async fn box_sensors(pool: &PgPool, box_id: &str) -> Result<Vec<SensorDescriptor>, ApiError> {
    // ---
    store::load_box_sensors(pool, box_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Box {box_id} not found")))
}

/// Pick the decoder from the vendor flag or the request's media type.
fn resolve_format(headers: &HeaderMap, luftdaten: bool) -> Result<FormatId, DecodeError> {
    // ---
    if luftdaten {
        return Ok(FormatId::Luftdaten);
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    media_type.parse()
}

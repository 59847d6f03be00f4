//! Persistence for boxes, sensors and measurements.
//!
//! Thin `sqlx` layer: the decoding core never touches the database, it only
//! receives sensor descriptors from here and hands validated batches back.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use sqlx::PgPool;

use crate::models::{SensorDescriptor, StoredMeasurement, ValidatedMeasurement};

// ---

/// Load the sensors of a box; `None` if the box does not exist.
pub async fn load_box_sensors(
    pool: &PgPool,
    box_id: &str,
) -> Result<Option<Vec<SensorDescriptor>>, sqlx::Error> {
    // ---
    let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM boxes WHERE id = $1")
        .bind(box_id)
        .fetch_optional(pool)
        .await?;
    if exists.is_none() {
        return Ok(None);
    }

    let sensors = sqlx::query_as::<_, SensorDescriptor>(
        r#"
        SELECT id, title, unit, sensor_type
        FROM sensors
        WHERE box_id = $1
        ORDER BY id
        "#,
    )
    .bind(box_id)
    .fetch_all(pool)
    .await?;

    Ok(Some(sensors))
}

/// Insert a validated batch in one transaction and record each sensor's
/// last measurement. The batch arrives sorted by time, so the last entry per
/// sensor in batch order is the one kept.
pub async fn insert_measurements(
    pool: &PgPool,
    batch: &[ValidatedMeasurement],
) -> Result<(), sqlx::Error> {
    // ---
    let mut tx = pool.begin().await?;

    for m in batch {
        let (lng, lat, height) = match m.location {
            Some(loc) => (Some(loc.lng), Some(loc.lat), loc.height),
            None => (None, None, None),
        };
        sqlx::query(
            r#"
            INSERT INTO measurements (id, sensor_id, value, created_at, lng, lat, height)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(m.id)
        .bind(&m.sensor_id)
        .bind(&m.value)
        .bind(m.created_at)
        .bind(lng)
        .bind(lat)
        .bind(height)
        .execute(&mut *tx)
        .await?;
    }

    let mut last_per_sensor: HashMap<&str, &ValidatedMeasurement> = HashMap::new();
    for m in batch {
        last_per_sensor.insert(m.sensor_id.as_str(), m);
    }

    for (sensor_id, m) in last_per_sensor {
        sqlx::query(
            r#"
            UPDATE sensors
            SET last_value = $2, last_measurement_at = $3
            WHERE id = $1
              AND (last_measurement_at IS NULL OR last_measurement_at <= $3)
            "#,
        )
        .bind(sensor_id)
        .bind(&m.value)
        .bind(m.created_at)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    tracing::debug!("Stored {} measurements", batch.len());
    Ok(())
}

/// Stream one sensor's measurements in ascending time order, handing each
/// row to `sink` as it arrives from the cursor.
pub async fn for_each_sensor_measurement<F>(
    pool: &PgPool,
    sensor_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    mut sink: F,
) -> Result<usize, sqlx::Error>
where
    F: FnMut(StoredMeasurement),
{
    // ---
    let mut rows = sqlx::query_as::<_, StoredMeasurement>(
        r#"
        SELECT sensor_id, value, created_at, lng, lat, height
        FROM measurements
        WHERE sensor_id = $1 AND created_at BETWEEN $2 AND $3
        ORDER BY created_at ASC
        "#,
    )
    .bind(sensor_id)
    .bind(from)
    .bind(to)
    .fetch(pool);

    let mut count = 0;
    while let Some(row) = rows.try_next().await? {
        sink(row);
        count += 1;
    }
    Ok(count)
}

//! Database schema management for `codemetal-sensebox`.
//!
//! Ensures required tables and indexes exist before serving requests.
//! Applied once on startup from `main.rs` (EMBP: single gateway call).

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create or update the database schema (idempotent).
///
/// Boxes and their sensors are provisioned by the registration service; this
/// backend only reads them. Measurements are written here and indexed by
/// sensor and time for export queries.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS boxes (
            id   TEXT PRIMARY KEY,
            name TEXT NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sensors (
            id                  TEXT PRIMARY KEY,
            box_id              TEXT        NOT NULL REFERENCES boxes (id) ON DELETE CASCADE,
            title               TEXT        NOT NULL,
            unit                TEXT        NOT NULL DEFAULT '',
            sensor_type         TEXT        NOT NULL DEFAULT '',
            last_value          TEXT,
            last_measurement_at TIMESTAMPTZ
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS measurements (
            id         UUID PRIMARY KEY,
            sensor_id  TEXT             NOT NULL REFERENCES sensors (id) ON DELETE CASCADE,
            value      TEXT             NOT NULL,
            created_at TIMESTAMPTZ      NOT NULL,
            lng        DOUBLE PRECISION,
            lat        DOUBLE PRECISION,
            height     DOUBLE PRECISION
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_sensors_box_id
            ON sensors (box_id);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_measurements_sensor_time
            ON measurements (sensor_id, created_at);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

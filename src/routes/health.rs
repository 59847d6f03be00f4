// src/routes/health.rs
//! Liveness and readiness endpoint for the sensebox backend.
//!
//! `/health` answers 200 only when the measurement store is reachable, since
//! an instance that cannot persist would reject every submission anyway.
//! Follows the Explicit Module Boundary Pattern (EMBP): the gateway
//! (`mod.rs`) merges the subrouter returned here.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use sqlx::PgPool;

use crate::Config;

/// JSON response body for the `/health` endpoint.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
}

/// Handle `GET /health`.
async fn health(State((pool, _)): State<(PgPool, Config)>) -> (StatusCode, Json<HealthResponse>) {
    // ---
    match sqlx::query("SELECT 1").execute(&pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                database: "ok",
            }),
        ),
        Err(e) => {
            tracing::warn!("Health check failed to reach database: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    database: "unreachable",
                }),
            )
        }
    }
}

/// Create a subrouter containing the `/health` route.
pub fn router() -> Router<(PgPool, Config)> {
    Router::new().route("/health", get(health))
}

use axum::{extract::DefaultBodyLimit, Router};
use sqlx::PgPool;

use crate::Config;

mod error;
mod get_sensor_data;
mod health;
mod post_measurements;

pub use error::ApiError;

// ---

pub fn router(pool: PgPool, config: Config) -> Router {
    // ---
    let body_limit = DefaultBodyLimit::max(config.max_body_bytes);

    Router::new()
        .merge(post_measurements::router())
        .merge(get_sensor_data::router())
        .merge(health::router())
        .layer(body_limit)
        .with_state((pool, config))
}

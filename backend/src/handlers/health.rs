//! Liveness and readiness

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub environment: String,
    pub database: &'static str,
}

/// Plain liveness probe
pub async fn liveness() -> &'static str {
    "OK"
}

/// Readiness with a database round trip. Answers 503 while the pool is unusable.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database_ok = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => true,
        Err(err) => {
            tracing::warn!(error = %err, "Health check could not reach the database");
            false
        }
    };

    let (code, status, database) = if database_ok {
        (StatusCode::OK, "healthy", "connected")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded", "disconnected")
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            environment: state.config.environment.clone(),
            database,
        }),
    )
}

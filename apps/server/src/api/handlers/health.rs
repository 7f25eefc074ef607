use crate::{models::Envelope, state::AppState};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub database: &'static str,
}

/// `GET /health`. Pings Postgres when that backend is in use.
pub async fn health(State(state): State<AppState>) -> Response {
    let database = match &state.db_pool {
        None => "memory",
        Some(pool) => match sqlx::query("SELECT 1").execute(pool).await {
            Ok(_) => "up",
            Err(e) => {
                tracing::warn!(error = %e, "Health check database ping failed");
                "down"
            }
        },
    };

    let healthy = database != "down";
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = HealthStatus {
        status: if healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        database,
    };

    Envelope::success(status, "Service health", body).into_response()
}

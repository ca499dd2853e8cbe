/// Health check endpoint
///
/// Provides a simple health check endpoint that verifies:
/// - The server is running
/// - Database connectivity
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected"
/// }
/// ```
///
/// The tutorial acknowledgement lives here as well: it is the only other
/// endpoint that answers plain JSON without a page envelope.

use crate::app::AppState;
use axum::{extract::State, http::StatusCode, Json};
use kutubxona_shared::db::pool;
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Application version
    pub version: String,

    /// Database status
    pub database: String,
}

/// Health check handler
///
/// Returns 200 when the database answers, 500 otherwise.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (code, status, database) = match pool::health_check(&state.db).await {
        Ok(()) => (StatusCode::OK, "healthy", "connected"),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "unhealthy", "disconnected")
        }
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: database.to_string(),
        }),
    )
}

/// Tutorial acknowledgement
///
/// The client remembers that the tutorial was seen; nothing is stored here.
///
/// ```text
/// POST /api/tutorial-seen
/// ```
pub async fn tutorial_seen() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

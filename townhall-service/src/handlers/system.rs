use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use tracing::{error, info};

use crate::database::models::MunicipalityRecord;
use crate::error::ApiError;
use crate::metrics;
use crate::state::AppState;

/// GET /healthz
pub async fn health_check() -> &'static str {
    "ok"
}

/// GET /meta
pub async fn get_meta() -> Json<Value> {
    info!("GET /meta - Build metadata requested");
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "git_hash": option_env!("TOWNHALL_BUILD_GIT_HASH").unwrap_or("unknown"),
        "built_at_unix": option_env!("TOWNHALL_BUILD_TIME_UNIX").unwrap_or("unknown"),
    }))
}

/// GET /api/status
pub async fn db_status(State(state): State<AppState>) -> impl IntoResponse {
    match MunicipalityRecord::count(state.pool()).await {
        Ok(count) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "count": count,
                "message": "Database connection successful"
            })),
        ),
        Err(e) => {
            error!("Database status check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": "Database connection failed"
                })),
            )
        }
    }
}

/// GET /api/debug
pub async fn town_index(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let towns = MunicipalityRecord::list_all(state.pool()).await?;
    let entries: Vec<Value> = towns
        .iter()
        .map(|t| json!({ "id": t.id, "name": t.name, "slug": t.slug }))
        .collect();
    Ok(Json(json!({ "count": entries.len(), "municipalities": entries })))
}

/// GET /admin/stats
pub async fn admin_stats(State(state): State<AppState>) -> Json<Value> {
    info!("GET /admin/stats");
    Json(metrics::snapshot_as_json(&state.config.db_path))
}

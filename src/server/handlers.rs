use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::air::types::RegionAverages;

use super::state::AppState;

// ─── Error response ──────────────────────────────────────────────

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    code: u16,
}

pub struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.1,
            code: self.0.as_u16(),
        };
        (self.0, Json(body)).into_response()
    }
}

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    ApiError(status, msg.into())
}

// ─── GET /health ─────────────────────────────────────────────────

pub async fn health() -> &'static str {
    "ok"
}

// ─── GET /api/report ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ReportQuery {
    pub city: Option<String>,
}

/// Full report for a city. Terminal lookup failures still return the report
/// body, with its `error` set and a 404 status.
pub async fn report(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReportQuery>,
) -> Result<Response, ApiError> {
    let city = params.city.as_deref().unwrap_or("").trim().to_string();
    if city.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Missing 'city' parameter"));
    }

    let orchestrator = state.orchestrator.clone();
    let report = tokio::task::spawn_blocking(move || orchestrator.report(&city))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "report task failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "report task failed")
        })?;

    let status = if report.error.is_some() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    };
    Ok((status, Json(report)).into_response())
}

// ─── GET /api/regions ────────────────────────────────────────────

pub async fn regions(State(state): State<Arc<AppState>>) -> Result<Json<RegionAverages>, ApiError> {
    let orchestrator = state.orchestrator.clone();
    tokio::task::spawn_blocking(move || orchestrator.all_region_averages())
        .await
        .map(Json)
        .map_err(|e| {
            tracing::error!(error = %e, "regions task failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "regions task failed")
        })
}

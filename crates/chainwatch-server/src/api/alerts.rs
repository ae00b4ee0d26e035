use crate::api::{not_found, resolve_limit, resolve_offset, storage_error};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chainwatch_common::types::Severity;
use chainwatch_storage::AlertFilter;
use chrono::{Duration, Utc};
use serde::Deserialize;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/alerts", get(list_alerts))
        .route("/v1/alerts/{id}", get(get_alert))
        .route("/v1/alerts/{id}/ack", post(acknowledge_alert))
}

#[derive(Debug, Deserialize)]
struct ListAlertsParams {
    severity: Option<Severity>,
    acknowledged: Option<bool>,
    /// Only alerts created in the last N hours.
    since_hours: Option<i64>,
    limit: Option<usize>,
    offset: Option<usize>,
}

/// List alerts sorted by risk score descending.
async fn list_alerts(
    State(state): State<AppState>,
    Query(params): Query<ListAlertsParams>,
) -> Response {
    let filter = AlertFilter {
        severity_eq: params.severity,
        acknowledged_eq: params.acknowledged,
        since: params.since_hours.map(|h| Utc::now() - Duration::hours(h)),
    };
    let limit = resolve_limit(params.limit);
    let offset = resolve_offset(params.offset);

    match state.store.list_alerts(&filter, limit, offset).await {
        Ok(alerts) => Json(alerts).into_response(),
        Err(e) => storage_error(e),
    }
}

async fn get_alert(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.store.get_alert_by_id(&id).await {
        Ok(Some(alert)) => Json(alert).into_response(),
        Ok(None) => not_found("Alert not found"),
        Err(e) => storage_error(e),
    }
}

#[derive(Debug, Deserialize)]
struct AckRequest {
    acknowledged_by: String,
}

async fn acknowledge_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AckRequest>,
) -> Response {
    match state
        .store
        .acknowledge_alert(&id, &req.acknowledged_by)
        .await
    {
        Ok(Some(alert)) => Json(alert).into_response(),
        Ok(None) => not_found("Alert not found"),
        Err(e) => storage_error(e),
    }
}

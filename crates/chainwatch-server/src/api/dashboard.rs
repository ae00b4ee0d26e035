use crate::api::storage_error;
use crate::pipeline::StageMetricsSnapshot;
use crate::state::AppState;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chainwatch_common::types::Severity;
use chainwatch_storage::AlertFilter;
use chainwatch_stream::{
    GROUP_ALERTING, GROUP_EXTRACTION, GROUP_SCORING, STREAM_NEW_ALERTS, STREAM_NORMALIZED_EVENTS,
    STREAM_RISK_ENTITIES, STREAM_RISK_SCORES,
};
use serde::Serialize;
use std::collections::HashMap;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/dashboard/summary", get(summary))
}

#[derive(Debug, Serialize)]
struct StreamDepth {
    length: usize,
    pending: usize,
}

#[derive(Debug, Serialize)]
struct DashboardSummary {
    alerts_by_severity: HashMap<String, u64>,
    unacknowledged_alerts: u64,
    suppliers_by_status: HashMap<String, u64>,
    suppliers_by_risk_band: HashMap<String, u64>,
    streams: HashMap<String, StreamDepth>,
    stages: HashMap<String, StageMetricsSnapshot>,
    uptime_secs: i64,
}

/// Aggregate counts for the dashboard: alerts by band, suppliers by
/// status and risk band, stream depths, and per-stage pipeline metrics.
async fn summary(State(state): State<AppState>) -> Response {
    let mut alerts_by_severity = HashMap::new();
    for severity in [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ] {
        let filter = AlertFilter {
            severity_eq: Some(severity),
            ..Default::default()
        };
        match state.store.count_alerts(&filter).await {
            Ok(count) => {
                alerts_by_severity.insert(severity.to_string(), count);
            }
            Err(e) => return storage_error(e),
        }
    }

    let unacknowledged_alerts = match state
        .store
        .count_alerts(&AlertFilter {
            acknowledged_eq: Some(false),
            ..Default::default()
        })
        .await
    {
        Ok(count) => count,
        Err(e) => return storage_error(e),
    };

    let suppliers = match state.store.list_suppliers().await {
        Ok(suppliers) => suppliers,
        Err(e) => return storage_error(e),
    };
    let mut suppliers_by_status: HashMap<String, u64> = HashMap::new();
    let mut suppliers_by_risk_band: HashMap<String, u64> = HashMap::new();
    for supplier in &suppliers {
        *suppliers_by_status
            .entry(supplier.status.to_string())
            .or_insert(0) += 1;
        let band = chainwatch_risk::score_to_band(supplier.risk_score_current);
        *suppliers_by_risk_band.entry(band.to_string()).or_insert(0) += 1;
    }

    let streams = HashMap::from([
        (
            STREAM_NORMALIZED_EVENTS.to_string(),
            StreamDepth {
                length: state.broker.len(STREAM_NORMALIZED_EVENTS),
                pending: state
                    .broker
                    .pending_count(STREAM_NORMALIZED_EVENTS, GROUP_EXTRACTION),
            },
        ),
        (
            STREAM_RISK_ENTITIES.to_string(),
            StreamDepth {
                length: state.broker.len(STREAM_RISK_ENTITIES),
                pending: state
                    .broker
                    .pending_count(STREAM_RISK_ENTITIES, GROUP_SCORING),
            },
        ),
        (
            STREAM_RISK_SCORES.to_string(),
            StreamDepth {
                length: state.broker.len(STREAM_RISK_SCORES),
                pending: state
                    .broker
                    .pending_count(STREAM_RISK_SCORES, GROUP_ALERTING),
            },
        ),
        (
            STREAM_NEW_ALERTS.to_string(),
            StreamDepth {
                length: state.broker.len(STREAM_NEW_ALERTS),
                pending: 0,
            },
        ),
    ]);

    let stages = HashMap::from([
        ("ingest".to_string(), state.metrics.ingest.snapshot()),
        ("extraction".to_string(), state.metrics.extraction.snapshot()),
        ("scoring".to_string(), state.metrics.scoring.snapshot()),
        ("alerting".to_string(), state.metrics.alerting.snapshot()),
    ]);

    Json(DashboardSummary {
        alerts_by_severity,
        unacknowledged_alerts,
        suppliers_by_status,
        suppliers_by_risk_band,
        streams,
        stages,
        uptime_secs: (chrono::Utc::now() - state.start_time).num_seconds(),
    })
    .into_response()
}

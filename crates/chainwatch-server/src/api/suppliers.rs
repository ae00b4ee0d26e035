use crate::api::{not_found, storage_error};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chainwatch_storage::{RiskEventRow, SupplierRow};
use serde::Serialize;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/suppliers", get(list_suppliers))
        .route("/v1/suppliers/{id}", get(get_supplier))
}

async fn list_suppliers(State(state): State<AppState>) -> Response {
    match state.store.list_suppliers().await {
        Ok(suppliers) => Json(suppliers).into_response(),
        Err(e) => storage_error(e),
    }
}

#[derive(Debug, Serialize)]
struct SupplierDetail {
    #[serde(flatten)]
    supplier: SupplierRow,
    risk_history: Vec<RiskEventRow>,
}

/// Supplier with its risk history derived from the risk-event store.
async fn get_supplier(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let supplier = match state.store.get_supplier_by_id(&id).await {
        Ok(Some(supplier)) => supplier,
        Ok(None) => return not_found("Supplier not found"),
        Err(e) => return storage_error(e),
    };

    match state
        .store
        .list_risk_events_for_supplier(&supplier.id, &supplier.name, 20)
        .await
    {
        Ok(risk_history) => Json(SupplierDetail {
            supplier,
            risk_history,
        })
        .into_response(),
        Err(e) => storage_error(e),
    }
}

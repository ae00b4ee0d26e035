use crate::api;
use crate::state::AppState;
use axum::routing::get;
use axum::Router;

pub fn build_http_app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .merge(api::alerts::router())
        .merge(api::suppliers::router())
        .merge(api::dashboard::router())
        .with_state(state)
}

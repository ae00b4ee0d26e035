use crate::config::ServerConfig;
use crate::pipeline::PipelineMetrics;
use chainwatch_storage::RiskStore;
use chainwatch_stream::StreamBroker;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Shared handles for the HTTP surface.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RiskStore>,
    pub broker: Arc<StreamBroker>,
    pub metrics: Arc<PipelineMetrics>,
    pub config: Arc<ServerConfig>,
    pub start_time: DateTime<Utc>,
}

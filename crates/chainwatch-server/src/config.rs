use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub ai: AiConfig,
}

impl ServerConfig {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{path}'"))?;
        let config: ServerConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file '{path}'"))?;
        Ok(config)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            database: DatabaseConfig::default(),
            ingest: IngestConfig::default(),
            pipeline: PipelineConfig::default(),
            ai: AiConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// Ingestion scheduler period.
    #[serde(default = "default_fetch_interval_minutes")]
    pub fetch_interval_minutes: u64,
    /// Fingerprint retention in the dedup set.
    #[serde(default = "default_dedup_ttl_seconds")]
    pub dedup_ttl_seconds: u64,
    #[serde(default)]
    pub newsapi_key: String,
    #[serde(default = "default_newsapi_query")]
    pub newsapi_query: String,
    #[serde(default = "default_newsapi_page_size")]
    pub newsapi_page_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            fetch_interval_minutes: default_fetch_interval_minutes(),
            dedup_ttl_seconds: default_dedup_ttl_seconds(),
            newsapi_key: String::new(),
            newsapi_query: default_newsapi_query(),
            newsapi_page_size: default_newsapi_page_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Extraction relevance gate (strictly-greater-than).
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f64,
    /// Minimum composite score to raise an alert (inclusive).
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold: f64,
    /// BFS propagation cutoff (strictly-greater-than).
    #[serde(default = "default_propagation_threshold")]
    pub propagation_threshold: f64,
    /// Max entries per stream consume.
    #[serde(default = "default_worker_batch_size")]
    pub worker_batch_size: usize,
    /// Consume block timeout.
    #[serde(default = "default_worker_block_ms")]
    pub worker_block_ms: u64,
    /// Idle age after which a pending entry may be reclaimed.
    #[serde(default = "default_claim_min_idle_ms")]
    pub claim_min_idle_ms: u64,
    /// Per-message processing deadline.
    #[serde(default = "default_stage_deadline_ms")]
    pub stage_deadline_ms: u64,
    #[serde(default = "default_extraction_workers")]
    pub extraction_workers: usize,
    #[serde(default = "default_scoring_workers")]
    pub scoring_workers: usize,
    #[serde(default = "default_alerting_workers")]
    pub alerting_workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            relevance_threshold: default_relevance_threshold(),
            alert_threshold: default_alert_threshold(),
            propagation_threshold: default_propagation_threshold(),
            worker_batch_size: default_worker_batch_size(),
            worker_block_ms: default_worker_block_ms(),
            claim_min_idle_ms: default_claim_min_idle_ms(),
            stage_deadline_ms: default_stage_deadline_ms(),
            extraction_workers: default_extraction_workers(),
            scoring_workers: default_scoring_workers(),
            alerting_workers: default_alerting_workers(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub api_key: String,
    /// "fast" or "capable"; the complexity heuristic may upgrade per call.
    #[serde(default = "default_extraction_model_tier")]
    pub extraction_model_tier: String,
    #[serde(default)]
    pub fast_model: Option<String>,
    #[serde(default)]
    pub capable_model: Option<String>,
    #[serde(default)]
    pub embedding_model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_llm_timeout_ms")]
    pub llm_timeout_ms: u64,
    #[serde(default = "default_embedding_timeout_ms")]
    pub embedding_timeout_ms: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            extraction_model_tier: default_extraction_model_tier(),
            fast_model: None,
            capable_model: None,
            embedding_model: None,
            base_url: None,
            llm_timeout_ms: default_llm_timeout_ms(),
            embedding_timeout_ms: default_embedding_timeout_ms(),
        }
    }
}

fn default_http_port() -> u16 {
    8080
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_fetch_interval_minutes() -> u64 {
    15
}

fn default_dedup_ttl_seconds() -> u64 {
    172_800
}

fn default_newsapi_query() -> String {
    "supply chain disruption".to_string()
}

fn default_newsapi_page_size() -> usize {
    100
}

fn default_relevance_threshold() -> f64 {
    0.30
}

fn default_alert_threshold() -> f64 {
    3.0
}

fn default_propagation_threshold() -> f64 {
    1.0
}

fn default_worker_batch_size() -> usize {
    10
}

fn default_worker_block_ms() -> u64 {
    5000
}

fn default_claim_min_idle_ms() -> u64 {
    300_000
}

fn default_stage_deadline_ms() -> u64 {
    60_000
}

fn default_extraction_workers() -> usize {
    2
}

fn default_scoring_workers() -> usize {
    2
}

fn default_alerting_workers() -> usize {
    1
}

fn default_extraction_model_tier() -> String {
    "fast".to_string()
}

fn default_llm_timeout_ms() -> u64 {
    30_000
}

fn default_embedding_timeout_ms() -> u64 {
    10_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_documented_defaults() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.ingest.fetch_interval_minutes, 15);
        assert_eq!(config.ingest.dedup_ttl_seconds, 172_800);
        assert_eq!(config.pipeline.relevance_threshold, 0.30);
        assert_eq!(config.pipeline.alert_threshold, 3.0);
        assert_eq!(config.pipeline.propagation_threshold, 1.0);
        assert_eq!(config.pipeline.worker_batch_size, 10);
        assert_eq!(config.pipeline.worker_block_ms, 5000);
        assert_eq!(config.pipeline.claim_min_idle_ms, 300_000);
        assert_eq!(config.ai.llm_timeout_ms, 30_000);
        assert_eq!(config.ai.embedding_timeout_ms, 10_000);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config: ServerConfig = toml::from_str(
            r#"
            http_port = 9999

            [pipeline]
            alert_threshold = 4.5
            "#,
        )
        .unwrap();
        assert_eq!(config.http_port, 9999);
        assert_eq!(config.pipeline.alert_threshold, 4.5);
        assert_eq!(config.pipeline.relevance_threshold, 0.30);
    }
}

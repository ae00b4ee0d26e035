#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use chainwatch_ai::{ExtractError, ModelTier, ProfileContext, RiskAnalyzer, RiskExtraction};
use chainwatch_common::types::{
    Confirmation, RiskType, Severity, SupplierStatus, TimeHorizon, UpstreamSupplier,
};
use chainwatch_ingest::{Connector, RawItem};
use chainwatch_risk::GraphCache;
use chainwatch_server::config::PipelineConfig;
use chainwatch_server::pipeline::{
    AlertingWorker, ExtractionWorker, IngestScheduler, PipelineMetrics, ScoringWorker,
};
use chainwatch_storage::{CompanyRow, RiskStore, SupplierRow};
use chainwatch_stream::StreamBroker;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted model double: extraction answers are popped from a queue,
/// embeddings key off a single marker term, recommendation synthesis
/// always fails so tests exercise the template fallback.
pub struct MockAnalyzer {
    extractions: Mutex<VecDeque<ScriptedExtraction>>,
    /// Texts containing this term embed "near" the company profile.
    relevant_term: String,
    pub extract_calls: AtomicU32,
    pub embed_calls: AtomicU32,
}

pub enum ScriptedExtraction {
    Ok(RiskExtraction),
    Malformed,
}

impl MockAnalyzer {
    pub fn new(relevant_term: &str, script: Vec<ScriptedExtraction>) -> Self {
        Self {
            extractions: Mutex::new(script.into()),
            relevant_term: relevant_term.to_lowercase(),
            extract_calls: AtomicU32::new(0),
            embed_calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl RiskAnalyzer for MockAnalyzer {
    fn provider(&self) -> &str {
        "mock"
    }

    async fn extract_risk(
        &self,
        _headline: &str,
        _body: &str,
        _profile: &ProfileContext,
        _tier: ModelTier,
        _strict: bool,
    ) -> Result<RiskExtraction, ExtractError> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.extractions.lock().unwrap().pop_front();
        match next {
            Some(ScriptedExtraction::Ok(extraction)) => Ok(extraction),
            Some(ScriptedExtraction::Malformed) => Err(ExtractError::Malformed(
                serde_json::from_str::<RiskExtraction>("not json at all").unwrap_err(),
            )),
            None => Err(ExtractError::Transport(anyhow::anyhow!(
                "no scripted extraction left"
            ))),
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        if text.to_lowercase().contains(&self.relevant_term) {
            Ok(vec![1.0, 0.0])
        } else {
            Ok(vec![0.0, 1.0])
        }
    }

    async fn generate_text(&self, _prompt: &str) -> Result<String> {
        anyhow::bail!("mock model has no text generation")
    }
}

/// Connector double handing out a fixed batch.
pub struct MockConnector {
    items: Vec<RawItem>,
}

impl MockConnector {
    pub fn new(items: Vec<RawItem>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl Connector for MockConnector {
    fn source_name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self) -> Result<Vec<RawItem>> {
        Ok(self.items.clone())
    }
}

pub fn raw_item(headline: &str) -> RawItem {
    RawItem {
        title: headline.to_string(),
        description: Some("wire description".to_string()),
        content: Some(format!("{headline}. Full report follows.")),
        url: "https://example.com/article".to_string(),
        published_at: Some("2026-07-14T08:30:00Z".to_string()),
        source: "MockWire".to_string(),
    }
}

/// Everything a pipeline scenario needs, wired like `run_server` but with
/// a scripted analyzer and tight consume timeouts.
pub struct TestHarness {
    pub store: Arc<RiskStore>,
    pub broker: Arc<StreamBroker>,
    pub analyzer: Arc<MockAnalyzer>,
    pub metrics: Arc<PipelineMetrics>,
    pub config: PipelineConfig,
    _dir: tempfile::TempDir,
}

impl TestHarness {
    pub async fn new(analyzer: MockAnalyzer) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(RiskStore::new(dir.path()).await.unwrap());
        let broker = Arc::new(StreamBroker::new());
        let config = PipelineConfig {
            worker_block_ms: 100,
            stage_deadline_ms: 10_000,
            ..Default::default()
        };
        Self {
            store,
            broker,
            analyzer: Arc::new(analyzer),
            metrics: Arc::new(PipelineMetrics::default()),
            config,
            _dir: dir,
        }
    }

    /// Spawn one worker per stage. Tasks die with the test runtime.
    pub fn spawn_pipeline(&self) {
        let extraction = Arc::new(ExtractionWorker::new(
            self.store.clone(),
            self.broker.clone(),
            self.analyzer.clone(),
            self.config.clone(),
            ModelTier::Fast,
            self.metrics.extraction.clone(),
        ));
        tokio::spawn(extraction.run("extraction_worker_1".to_string()));

        let scoring = Arc::new(ScoringWorker::new(
            self.store.clone(),
            self.broker.clone(),
            self.config.clone(),
            self.metrics.scoring.clone(),
            Arc::new(GraphCache::new()),
        ));
        tokio::spawn(scoring.run("scoring_worker_1".to_string()));

        let alerting = Arc::new(AlertingWorker::new(
            self.store.clone(),
            self.broker.clone(),
            self.analyzer.clone(),
            self.config.clone(),
            self.metrics.alerting.clone(),
        ));
        tokio::spawn(alerting.run("alert_worker_1".to_string()));
    }

    /// Run a single ingestion pass over the given connector batch.
    pub async fn ingest(&self, items: Vec<RawItem>) {
        let scheduler = IngestScheduler::new(
            vec![Box::new(MockConnector::new(items))],
            self.store.clone(),
            self.broker.clone(),
            Default::default(),
            self.metrics.ingest.clone(),
        );
        scheduler.run_once().await;
    }
}

pub async fn seed_company(store: &RiskStore) -> CompanyRow {
    store
        .insert_company(&CompanyRow {
            id: chainwatch_common::id::next_id(),
            company_name: "Vulcan Alloys".to_string(),
            industry: "specialty metals".to_string(),
            raw_materials: vec!["copper".to_string(), "nickel".to_string()],
            material_criticality: HashMap::from([
                ("copper".to_string(), 10),
                ("nickel".to_string(), 6),
            ]),
            inventory_days: HashMap::from([("copper".to_string(), 15.0)]),
            key_geographies: vec!["Chile".to_string(), "Norway".to_string()],
            alert_contacts: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .await
        .unwrap()
}

pub struct SupplierSpec {
    pub name: &'static str,
    pub material: &'static str,
    pub pct: f64,
    pub tier: i32,
    pub status: SupplierStatus,
    pub country: &'static str,
    pub upstream: Vec<UpstreamSupplier>,
}

impl Default for SupplierSpec {
    fn default() -> Self {
        Self {
            name: "Andes Copper Co",
            material: "copper",
            pct: 65.0,
            tier: 1,
            status: SupplierStatus::Active,
            country: "Chile",
            upstream: vec![],
        }
    }
}

pub async fn seed_supplier(store: &RiskStore, company_id: &str, spec: SupplierSpec) -> SupplierRow {
    store
        .insert_supplier(&SupplierRow {
            id: chainwatch_common::id::next_id(),
            company_id: company_id.to_string(),
            name: spec.name.to_string(),
            country: spec.country.to_string(),
            region: "test-region".to_string(),
            tier: spec.tier,
            supplies: vec![spec.material.to_string()],
            supply_volume_pct: spec.pct,
            status: spec.status,
            approved_vendor: spec.status == SupplierStatus::Active,
            esg_score: Some(70),
            credit_rating: Some("BBB".to_string()),
            max_capacity: Some(80.0),
            lead_time_weeks: 6,
            switching_cost_estimate: Some(4.0),
            upstream_suppliers: spec.upstream,
            risk_score_current: 0.0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .await
        .unwrap()
}

pub fn extraction(
    nodes: &[&str],
    severity: Severity,
    horizon: TimeHorizon,
    confirmation: Confirmation,
) -> RiskExtraction {
    RiskExtraction {
        is_risk: true,
        risk_type: RiskType::SupplyDisruption,
        affected_entities: vec!["Chile".to_string()],
        affected_supply_chain_nodes: nodes.iter().map(|n| n.to_string()).collect(),
        severity,
        is_confirmed: confirmation,
        time_horizon: horizon,
        reasoning: "Supply halted at a key supplier.".to_string(),
        recommended_action: Some("Engage alternates immediately.".to_string()),
    }
}

/// Poll until `cond` holds or a 5s budget elapses.
pub async fn wait_for<F, Fut>(what: &str, mut cond: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..250 {
        if cond().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("timed out waiting for {what}");
}

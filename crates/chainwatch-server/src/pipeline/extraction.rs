use crate::config::PipelineConfig;
use crate::pipeline::{with_backoff, Outcome, StageMetrics};
use anyhow::{Context, Result};
use chainwatch_ai::{select_model_tier, ExtractError, ModelTier, ProfileContext, RiskAnalyzer};
use chainwatch_common::types::{Confirmation, RiskType, Severity, TimeHorizon};
use chainwatch_risk::{build_company_keywords, cosine_similarity, is_relevant};
use chainwatch_storage::{RiskEventRow, RiskStore};
use chainwatch_stream::{
    StreamBroker, StreamEntry, GROUP_EXTRACTION, STREAM_NORMALIZED_EVENTS, STREAM_RISK_ENTITIES,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Extraction stage: relevance-filter articles from `normalized_events`,
/// run the structured model extraction, link entities against the supplier
/// list, persist the risk event, and emit to `risk_entities`.
pub struct ExtractionWorker {
    store: Arc<RiskStore>,
    broker: Arc<StreamBroker>,
    analyzer: Arc<dyn RiskAnalyzer>,
    config: PipelineConfig,
    base_tier: ModelTier,
    metrics: Arc<StageMetrics>,
    /// Embedding of the company keyword text, computed once for the
    /// lifetime of a stable profile.
    keyword_embedding: OnceCell<Vec<f32>>,
}

impl ExtractionWorker {
    pub fn new(
        store: Arc<RiskStore>,
        broker: Arc<StreamBroker>,
        analyzer: Arc<dyn RiskAnalyzer>,
        config: PipelineConfig,
        base_tier: ModelTier,
        metrics: Arc<StageMetrics>,
    ) -> Self {
        Self {
            store,
            broker,
            analyzer,
            config,
            base_tier,
            metrics,
            keyword_embedding: OnceCell::new(),
        }
    }

    pub async fn run(self: Arc<Self>, consumer: String) {
        tracing::info!(consumer = %consumer, "Extraction worker started");
        let block = Duration::from_millis(self.config.worker_block_ms);
        let min_idle = Duration::from_millis(self.config.claim_min_idle_ms);
        let deadline = Duration::from_millis(self.config.stage_deadline_ms);

        loop {
            let claimed = self.broker.claim(
                STREAM_NORMALIZED_EVENTS,
                GROUP_EXTRACTION,
                &consumer,
                min_idle,
            );
            let fresh = self
                .broker
                .consume(
                    STREAM_NORMALIZED_EVENTS,
                    GROUP_EXTRACTION,
                    &consumer,
                    block,
                    self.config.worker_batch_size,
                )
                .await;

            for entry in claimed.into_iter().chain(fresh) {
                match tokio::time::timeout(deadline, self.process(&entry)).await {
                    Ok(Ok(outcome)) => {
                        self.metrics.record(outcome);
                        self.broker
                            .ack(STREAM_NORMALIZED_EVENTS, GROUP_EXTRACTION, &[entry.id]);
                    }
                    Ok(Err(e)) => {
                        tracing::error!(entry = %entry.id, error = %e, "Extraction failed, leaving unacked");
                        self.metrics.record_transient_failure();
                    }
                    Err(_) => {
                        tracing::error!(entry = %entry.id, "Extraction deadline exceeded");
                        self.metrics.record_transient_failure();
                    }
                }
            }
        }
    }

    /// Process one normalized event. `Ok` means the entry can be acked;
    /// `Err` means transient trouble and the entry stays pending.
    pub async fn process(&self, entry: &StreamEntry) -> Result<Outcome> {
        let Some(event_id) = entry.field("event_id") else {
            tracing::error!(entry = %entry.id, "Entry missing event_id field");
            self.metrics.record_permanent_failure();
            return Ok(Outcome::Skipped);
        };

        let article = with_backoff("load article", || self.store.get_article(event_id)).await?;
        let Some(article) = article else {
            // Ingestion commits before publishing, so this is a broken
            // invariant rather than a race.
            tracing::error!(event_id, "Article not found for normalized event");
            self.metrics.record_permanent_failure();
            return Ok(Outcome::Skipped);
        };

        if article.processed {
            // Re-delivery after a crash between persist and ack. Re-emit
            // downstream when a risk event exists; scoring is idempotent.
            if let Some(risk_event_id) = &article.risk_event_id {
                self.broker.publish(
                    STREAM_RISK_ENTITIES,
                    HashMap::from([
                        ("risk_event_id".to_string(), risk_event_id.clone()),
                        ("article_id".to_string(), article.event_id.clone()),
                    ]),
                );
            }
            return Ok(Outcome::Duplicate);
        }

        if let Some(existing) = self
            .store
            .get_risk_event_by_article(&article.event_id)
            .await?
        {
            self.store
                .mark_article_processed(&article.event_id, Some("risk_extracted"), Some(&existing.id), None)
                .await?;
            self.broker.publish(
                STREAM_RISK_ENTITIES,
                HashMap::from([
                    ("risk_event_id".to_string(), existing.id.clone()),
                    ("article_id".to_string(), article.event_id.clone()),
                ]),
            );
            return Ok(Outcome::Duplicate);
        }

        let profile = self.load_profile().await?;

        // Relevance gate first, to spare model calls on noise.
        let keyword_embedding = self.keyword_embedding().await?;
        let article_text = format!("{} {}", article.headline, article.body);
        let article_embedding =
            with_backoff("embed article", || self.analyzer.embed(&article_text)).await?;
        let relevance = cosine_similarity(&article_embedding, &keyword_embedding);

        if !is_relevant(relevance, self.config.relevance_threshold) {
            tracing::info!(
                event_id,
                relevance,
                headline = %article.headline,
                "Article not relevant, skipping"
            );
            self.store
                .mark_article_processed(&article.event_id, Some("irrelevant"), None, Some(relevance))
                .await?;
            return Ok(Outcome::Skipped);
        }

        let tier = select_model_tier(self.base_tier, &article.headline, &article.body);
        let extraction = match self
            .extract_with_policy(&article.headline, &article.body, &profile, tier)
            .await?
        {
            Some(extraction) => extraction,
            None => {
                // Twice-malformed output: write the event off as a non-risk
                // so re-delivery cannot loop on it.
                let row = self.written_off_event(&article.event_id, article.timestamp);
                let inserted =
                    with_backoff("persist written-off event", || self.store.insert_risk_event(&row))
                        .await?;
                self.store
                    .mark_article_processed(
                        &article.event_id,
                        Some("extraction_malformed"),
                        Some(&inserted.id),
                        Some(relevance),
                    )
                    .await?;
                self.metrics.record_permanent_failure();
                return Ok(Outcome::Skipped);
            }
        };

        if !extraction.is_risk {
            self.store
                .mark_article_processed(&article.event_id, Some("not_a_risk"), None, Some(relevance))
                .await?;
            return Ok(Outcome::Skipped);
        }

        // Entity linking: names that resolve against the supplier list
        // survive as supply chain nodes; the rest stay free-form.
        let mut linked_nodes: Vec<String> = Vec::new();
        let mut free_form = extraction.affected_entities.clone();
        for name in &extraction.affected_supply_chain_nodes {
            match self.store.find_supplier_by_name(name).await? {
                Some(supplier) => {
                    if !linked_nodes.contains(&supplier.name) {
                        linked_nodes.push(supplier.name);
                    }
                }
                None => free_form.push(name.clone()),
            }
        }

        let row = RiskEventRow {
            id: chainwatch_common::id::next_id(),
            article_id: article.event_id.clone(),
            timestamp: article.timestamp,
            is_risk: true,
            risk_type: extraction.risk_type,
            affected_entities: free_form,
            affected_supply_chain_nodes: linked_nodes,
            severity: extraction.severity,
            confirmation: extraction.is_confirmed,
            time_horizon: extraction.time_horizon,
            reasoning: extraction.reasoning.clone(),
            recommended_action: extraction.recommended_action.clone(),
            components: Default::default(),
            risk_score: 0.0,
            severity_band: Severity::Low,
            primary_supplier: None,
            propagation: HashMap::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let inserted = with_backoff("persist risk event", || self.store.insert_risk_event(&row)).await?;
        self.store
            .mark_article_processed(
                &article.event_id,
                Some("risk_extracted"),
                Some(&inserted.id),
                Some(relevance),
            )
            .await?;

        self.broker.publish(
            STREAM_RISK_ENTITIES,
            HashMap::from([
                ("risk_event_id".to_string(), inserted.id.clone()),
                ("article_id".to_string(), article.event_id.clone()),
            ]),
        );

        tracing::info!(
            risk_event_id = %inserted.id,
            risk_type = %inserted.risk_type,
            nodes = ?inserted.affected_supply_chain_nodes,
            "Created risk event"
        );

        Ok(Outcome::Processed)
    }

    /// First attempt with the normal prompt; a malformed response earns
    /// exactly one stricter retry. Transport errors bubble up as transient.
    async fn extract_with_policy(
        &self,
        headline: &str,
        body: &str,
        profile: &ProfileContext,
        tier: ModelTier,
    ) -> Result<Option<chainwatch_ai::RiskExtraction>> {
        for strict in [false, true] {
            let attempt = with_backoff("extract risk", || async {
                match self
                    .analyzer
                    .extract_risk(headline, body, profile, tier, strict)
                    .await
                {
                    Ok(extraction) => Ok(Ok(extraction)),
                    Err(ExtractError::Malformed(e)) => Ok(Err(e)),
                    Err(ExtractError::Transport(e)) => Err(e),
                }
            })
            .await?;

            match attempt {
                Ok(extraction) => return Ok(Some(extraction)),
                Err(e) if !strict => {
                    tracing::warn!(error = %e, "Malformed extraction output, retrying strict");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Extraction output malformed twice, writing off");
                }
            }
        }
        Ok(None)
    }

    fn written_off_event(
        &self,
        article_id: &str,
        timestamp: chrono::DateTime<Utc>,
    ) -> RiskEventRow {
        RiskEventRow {
            id: chainwatch_common::id::next_id(),
            article_id: article_id.to_string(),
            timestamp,
            is_risk: false,
            risk_type: RiskType::Operational,
            affected_entities: vec![],
            affected_supply_chain_nodes: vec![],
            severity: Severity::Low,
            confirmation: Confirmation::Uncertain,
            time_horizon: TimeHorizon::Months,
            reasoning: "Extraction output failed schema validation twice".to_string(),
            recommended_action: None,
            components: Default::default(),
            risk_score: 0.0,
            severity_band: Severity::Low,
            primary_supplier: None,
            propagation: HashMap::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    async fn load_profile(&self) -> Result<ProfileContext> {
        let company = self
            .store
            .get_company()
            .await?
            .context("Company profile not seeded")?;
        let suppliers = self.store.list_suppliers().await?;
        Ok(ProfileContext {
            company_name: company.company_name.clone(),
            supplier_names: suppliers.iter().map(|s| s.name.clone()).collect(),
            materials: company.raw_materials.clone(),
            geographies: company.key_geographies.clone(),
        })
    }

    async fn keyword_embedding(&self) -> Result<Vec<f32>> {
        let embedding = self
            .keyword_embedding
            .get_or_try_init(|| async {
                let company = self
                    .store
                    .get_company()
                    .await?
                    .context("Company profile not seeded")?;
                let suppliers = self.store.list_suppliers().await?;
                let keywords = build_company_keywords(&company, &suppliers);
                let keyword_text = keywords.join(" ");
                tracing::debug!(keywords = ?keywords, "Building keyword embedding");
                with_backoff("embed keywords", || self.analyzer.embed(&keyword_text)).await
            })
            .await?;
        Ok(embedding.clone())
    }
}

use crate::config::PipelineConfig;
use crate::pipeline::{with_backoff, Outcome, StageMetrics};
use anyhow::{Context, Result};
use chainwatch_risk::{build_supply_graph, calculate_risk_score, propagate, GraphCache, NodeKind};
use chainwatch_storage::{RiskStore, SupplierRow};
use chainwatch_stream::{
    StreamBroker, StreamEntry, GROUP_SCORING, STREAM_RISK_ENTITIES, STREAM_RISK_SCORES,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Scoring stage: compute the deterministic composite for events from
/// `risk_entities`, propagate through the derived supply graph, update
/// supplier risk, and emit to `risk_scores`.
pub struct ScoringWorker {
    store: Arc<RiskStore>,
    broker: Arc<StreamBroker>,
    config: PipelineConfig,
    metrics: Arc<StageMetrics>,
    graph_cache: Arc<GraphCache>,
}

impl ScoringWorker {
    pub fn new(
        store: Arc<RiskStore>,
        broker: Arc<StreamBroker>,
        config: PipelineConfig,
        metrics: Arc<StageMetrics>,
        graph_cache: Arc<GraphCache>,
    ) -> Self {
        Self {
            store,
            broker,
            config,
            metrics,
            graph_cache,
        }
    }

    pub async fn run(self: Arc<Self>, consumer: String) {
        tracing::info!(consumer = %consumer, "Scoring worker started");
        let block = Duration::from_millis(self.config.worker_block_ms);
        let min_idle = Duration::from_millis(self.config.claim_min_idle_ms);
        let deadline = Duration::from_millis(self.config.stage_deadline_ms);

        loop {
            let claimed =
                self.broker
                    .claim(STREAM_RISK_ENTITIES, GROUP_SCORING, &consumer, min_idle);
            let fresh = self
                .broker
                .consume(
                    STREAM_RISK_ENTITIES,
                    GROUP_SCORING,
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
                            .ack(STREAM_RISK_ENTITIES, GROUP_SCORING, &[entry.id]);
                    }
                    Ok(Err(e)) => {
                        tracing::error!(entry = %entry.id, error = %e, "Scoring failed, leaving unacked");
                        self.metrics.record_transient_failure();
                    }
                    Err(_) => {
                        tracing::error!(entry = %entry.id, "Scoring deadline exceeded");
                        self.metrics.record_transient_failure();
                    }
                }
            }
        }
    }

    pub async fn process(&self, entry: &StreamEntry) -> Result<Outcome> {
        let Some(risk_event_id) = entry.field("risk_event_id") else {
            tracing::error!(entry = %entry.id, "Entry missing risk_event_id field");
            self.metrics.record_permanent_failure();
            return Ok(Outcome::Skipped);
        };

        let event =
            with_backoff("load risk event", || self.store.get_risk_event(risk_event_id)).await?;
        let Some(event) = event else {
            tracing::error!(risk_event_id, "Risk event not found");
            self.metrics.record_permanent_failure();
            return Ok(Outcome::Skipped);
        };
        if !event.is_risk {
            // Written-off extraction failures flow no further.
            return Ok(Outcome::Skipped);
        }

        let company = self
            .store
            .get_company()
            .await?
            .context("Company profile not seeded")?;
        let suppliers = self.store.list_suppliers().await?;

        // Resolve linked suppliers; the highest-impact link drives the
        // composite and is the propagation origin.
        let linked: Vec<&SupplierRow> = event
            .affected_supply_chain_nodes
            .iter()
            .filter_map(|name| {
                suppliers
                    .iter()
                    .find(|s| s.name.eq_ignore_ascii_case(name))
            })
            .collect();
        let dominant = linked.iter().copied().max_by(|a, b| {
            chainwatch_risk::scoring::impact_for(Some(*a), &company)
                .total_cmp(&chainwatch_risk::scoring::impact_for(Some(*b), &company))
        });

        let score = calculate_risk_score(
            event.severity,
            event.confirmation,
            event.time_horizon,
            dominant,
            &company,
            &suppliers,
        );

        let mut propagation: HashMap<String, f64> = HashMap::new();
        if let Some(origin_supplier) = dominant {
            let version = self.store.supplier_version();
            let graph = match self.graph_cache.get(version) {
                Some(graph) => graph,
                None => {
                    let graph = Arc::new(build_supply_graph(&company, &suppliers));
                    self.graph_cache.put(version, graph.clone());
                    graph
                }
            };

            if let Some(origin) = graph.index_by_id(&origin_supplier.id) {
                propagation = propagate(
                    &graph,
                    origin,
                    score.risk_score,
                    self.config.propagation_threshold,
                );

                // Raise current risk on every touched supplier node.
                for (node_id, propagated) in &propagation {
                    let Some(idx) = graph.index_by_id(node_id) else {
                        continue;
                    };
                    if graph.node(idx).kind != NodeKind::Supplier {
                        continue;
                    }
                    if !suppliers.iter().any(|s| &s.id == node_id) {
                        continue; // synthetic upstream nodes are not stored
                    }
                    with_backoff("raise supplier risk", || {
                        self.store.raise_supplier_risk_score(node_id, *propagated)
                    })
                    .await?;
                }
            }
        }

        with_backoff("update risk event scoring", || {
            self.store.update_risk_event_scoring(
                &event.id,
                &score.components,
                score.risk_score,
                score.severity_band,
                dominant.map(|s| s.name.as_str()),
                &propagation,
            )
        })
        .await?;

        self.broker.publish(
            STREAM_RISK_SCORES,
            HashMap::from([("risk_event_id".to_string(), event.id.clone())]),
        );

        tracing::info!(
            risk_event_id = %event.id,
            risk_score = score.risk_score,
            band = %score.severity_band,
            propagated_nodes = propagation.len(),
            "Scored risk event"
        );

        Ok(Outcome::Processed)
    }
}

use crate::config::PipelineConfig;
use crate::pipeline::{with_backoff, Outcome, StageMetrics};
use anyhow::{Context, Result};
use chainwatch_ai::RiskAnalyzer;
use chainwatch_alert::build_alert;
use chainwatch_storage::RiskStore;
use chainwatch_stream::{
    StreamBroker, StreamEntry, GROUP_ALERTING, STREAM_NEW_ALERTS, STREAM_RISK_SCORES,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Alerting stage: threshold-gate scored events from `risk_scores`, rank
/// alternate suppliers, synthesize the recommendation, persist the alert,
/// and emit its id to `new_alerts` for outside consumers.
pub struct AlertingWorker {
    store: Arc<RiskStore>,
    broker: Arc<StreamBroker>,
    analyzer: Arc<dyn RiskAnalyzer>,
    config: PipelineConfig,
    metrics: Arc<StageMetrics>,
}

impl AlertingWorker {
    pub fn new(
        store: Arc<RiskStore>,
        broker: Arc<StreamBroker>,
        analyzer: Arc<dyn RiskAnalyzer>,
        config: PipelineConfig,
        metrics: Arc<StageMetrics>,
    ) -> Self {
        Self {
            store,
            broker,
            analyzer,
            config,
            metrics,
        }
    }

    pub async fn run(self: Arc<Self>, consumer: String) {
        tracing::info!(consumer = %consumer, "Alerting worker started");
        let block = Duration::from_millis(self.config.worker_block_ms);
        let min_idle = Duration::from_millis(self.config.claim_min_idle_ms);
        let deadline = Duration::from_millis(self.config.stage_deadline_ms);

        loop {
            let claimed = self
                .broker
                .claim(STREAM_RISK_SCORES, GROUP_ALERTING, &consumer, min_idle);
            let fresh = self
                .broker
                .consume(
                    STREAM_RISK_SCORES,
                    GROUP_ALERTING,
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
                            .ack(STREAM_RISK_SCORES, GROUP_ALERTING, &[entry.id]);
                    }
                    Ok(Err(e)) => {
                        tracing::error!(entry = %entry.id, error = %e, "Alerting failed, leaving unacked");
                        self.metrics.record_transient_failure();
                    }
                    Err(_) => {
                        tracing::error!(entry = %entry.id, "Alerting deadline exceeded");
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

        // Never double-emit for the same risk event.
        if self
            .store
            .get_alert_by_risk_event(&event.id)
            .await?
            .is_some()
        {
            return Ok(Outcome::Duplicate);
        }

        let company = self
            .store
            .get_company()
            .await?
            .context("Company profile not seeded")?;
        let suppliers = self.store.list_suppliers().await?;

        let Some(alert) = build_alert(
            &event,
            &company,
            &suppliers,
            self.analyzer.as_ref(),
            self.config.alert_threshold,
        )
        .await
        else {
            return Ok(Outcome::Skipped);
        };

        let inserted = with_backoff("persist alert", || self.store.insert_alert(&alert)).await?;
        let Some(inserted) = inserted else {
            // A racing worker got there first; the unique index held.
            return Ok(Outcome::Duplicate);
        };

        self.broker.publish(
            STREAM_NEW_ALERTS,
            HashMap::from([("alert_id".to_string(), inserted.id.clone())]),
        );

        tracing::info!(
            alert_id = %inserted.id,
            title = %inserted.title,
            score = inserted.risk_score,
            alternates = inserted.recommendations.len(),
            "Created alert"
        );

        Ok(Outcome::Processed)
    }
}

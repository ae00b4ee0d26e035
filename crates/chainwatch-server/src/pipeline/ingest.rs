use crate::config::IngestConfig;
use crate::pipeline::{with_backoff, Outcome, StageMetrics};
use chainwatch_common::types::NormalizedEvent;
use chainwatch_ingest::{normalize, validate, Connector};
use chainwatch_stream::{StreamBroker, STREAM_NORMALIZED_EVENTS};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

/// Fixed-interval ingestion: pull every registered connector, normalize,
/// fingerprint, dedup, commit to the article store, then publish to
/// `normalized_events`. A failing connector is logged and the others
/// proceed.
pub struct IngestScheduler {
    connectors: Vec<Box<dyn Connector>>,
    store: Arc<chainwatch_storage::RiskStore>,
    broker: Arc<StreamBroker>,
    config: IngestConfig,
    metrics: Arc<StageMetrics>,
}

impl IngestScheduler {
    pub fn new(
        connectors: Vec<Box<dyn Connector>>,
        store: Arc<chainwatch_storage::RiskStore>,
        broker: Arc<StreamBroker>,
        config: IngestConfig,
        metrics: Arc<StageMetrics>,
    ) -> Self {
        Self {
            connectors,
            store,
            broker,
            config,
            metrics,
        }
    }

    pub async fn run(self: Arc<Self>) {
        let period = Duration::from_secs(self.config.fetch_interval_minutes * 60);
        let mut ticker = interval(period);
        loop {
            ticker.tick().await;
            self.run_once().await;
        }
    }

    /// One full fetch pass over all connectors.
    pub async fn run_once(&self) {
        let mut fetched = 0u32;
        let mut new = 0u32;
        let mut duplicates = 0u32;
        let mut invalid = 0u32;

        for connector in &self.connectors {
            let items = match connector.fetch().await {
                Ok(items) => items,
                Err(e) => {
                    tracing::error!(
                        source = connector.source_name(),
                        error = %e,
                        "Connector fetch failed"
                    );
                    self.metrics.record_transient_failure();
                    continue;
                }
            };
            fetched += items.len() as u32;

            for item in &items {
                let event = normalize(item);
                if !validate(&event) {
                    invalid += 1;
                    self.metrics.record_permanent_failure();
                    continue;
                }

                let ttl = Duration::from_secs(self.config.dedup_ttl_seconds);
                if !self.broker.check_and_set(&event.event_id, ttl) {
                    tracing::debug!(headline = %event.headline, "Duplicate article dropped");
                    duplicates += 1;
                    self.metrics.record(Outcome::Duplicate);
                    continue;
                }

                // Commit the article before publishing so extraction can
                // always reload it by fingerprint.
                let inserted =
                    match with_backoff("insert article", || self.store.insert_article(&event))
                        .await
                    {
                        Ok(inserted) => inserted,
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to persist article");
                            self.metrics.record_transient_failure();
                            continue;
                        }
                    };
                if !inserted {
                    // Fingerprint seen after dedup TTL expiry; the unique
                    // index keeps this idempotent.
                    duplicates += 1;
                    self.metrics.record(Outcome::Duplicate);
                    continue;
                }

                self.broker
                    .publish(STREAM_NORMALIZED_EVENTS, event_fields(&event));
                new += 1;
                self.metrics.record(Outcome::Processed);
            }
        }

        tracing::info!(fetched, new, duplicates, invalid, "Ingestion pass complete");
    }
}

/// Flatten a normalized event into stream fields.
pub fn event_fields(event: &NormalizedEvent) -> HashMap<String, String> {
    HashMap::from([
        ("event_id".to_string(), event.event_id.clone()),
        ("timestamp".to_string(), event.timestamp.to_rfc3339()),
        ("source".to_string(), event.source.clone()),
        ("headline".to_string(), event.headline.clone()),
        ("body".to_string(), event.body.clone()),
        ("url".to_string(), event.url.clone()),
    ])
}

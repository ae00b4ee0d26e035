use anyhow::Result;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub mod alerting;
pub mod extraction;
pub mod ingest;
pub mod scoring;

pub use alerting::AlertingWorker;
pub use extraction::ExtractionWorker;
pub use ingest::IngestScheduler;
pub use scoring::ScoringWorker;

/// Retry budget for transient external failures within one message.
pub const MAX_TRANSIENT_RETRIES: u32 = 5;

/// How one consumed entry ended. The worker loop acks on any of these;
/// an `Err` from processing leaves the entry pending for reclaim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Fully processed and emitted downstream.
    Processed,
    /// Terminal without emitting (irrelevant, below threshold, written off).
    Skipped,
    /// Work already done by an earlier delivery.
    Duplicate,
}

/// Per-stage counters. Every consumed message lands in exactly one bucket
/// per attempt; transient failures count each abandoned attempt.
#[derive(Debug, Default)]
pub struct StageMetrics {
    success: AtomicU64,
    skipped: AtomicU64,
    duplicates: AtomicU64,
    transient_failures: AtomicU64,
    permanent_failures: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageMetricsSnapshot {
    pub success: u64,
    pub skipped: u64,
    pub duplicates: u64,
    pub transient_failures: u64,
    pub permanent_failures: u64,
}

impl StageMetrics {
    pub fn record(&self, outcome: Outcome) {
        match outcome {
            Outcome::Processed => self.success.fetch_add(1, Ordering::Relaxed),
            Outcome::Skipped => self.skipped.fetch_add(1, Ordering::Relaxed),
            Outcome::Duplicate => self.duplicates.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn record_transient_failure(&self) {
        self.transient_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_permanent_failure(&self) {
        self.permanent_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StageMetricsSnapshot {
        StageMetricsSnapshot {
            success: self.success.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            transient_failures: self.transient_failures.load(Ordering::Relaxed),
            permanent_failures: self.permanent_failures.load(Ordering::Relaxed),
        }
    }
}

/// One metrics block per pipeline stage; each worker holds its stage's
/// block behind the shared `Arc`.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    pub ingest: Arc<StageMetrics>,
    pub extraction: Arc<StageMetrics>,
    pub scoring: Arc<StageMetrics>,
    pub alerting: Arc<StageMetrics>,
}

/// Capped exponential backoff for transient external failures: 100ms base,
/// doubling, capped at 5s, at most [`MAX_TRANSIENT_RETRIES`] retries. The
/// final error is returned so the caller can leave the message unacked.
pub async fn with_backoff<T, Fut>(op_name: &str, mut op: impl FnMut() -> Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < MAX_TRANSIENT_RETRIES => {
                let delay =
                    Duration::from_millis(100 * 2u64.pow(attempt)).min(Duration::from_secs(5));
                tracing::warn!(
                    op = op_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient failure, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(op = op_name, attempts = attempt + 1, error = %e, "Giving up");
                return Err(e);
            }
        }
    }
}

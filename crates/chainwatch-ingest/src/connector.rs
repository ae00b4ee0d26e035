use anyhow::Result;
use async_trait::async_trait;

/// A raw item fetched from an external source, before normalization.
#[derive(Debug, Clone)]
pub struct RawItem {
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub url: String,
    pub published_at: Option<String>,
    pub source: String,
}

/// A pull-based external data source.
///
/// The ingestion scheduler calls every registered connector on each tick;
/// a connector error is logged and the remaining connectors proceed.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Source name stamped on normalized events (e.g. `"NewsAPI"`).
    fn source_name(&self) -> &str;

    /// Fetch a batch of raw items.
    async fn fetch(&self) -> Result<Vec<RawItem>>;
}

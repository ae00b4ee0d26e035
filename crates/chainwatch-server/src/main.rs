use anyhow::Result;
use chainwatch_ai::{ModelTier, RiskAnalyzer, ZhipuProvider};
use chainwatch_ingest::{Connector, NewsApiConnector};
use chainwatch_risk::GraphCache;
use chainwatch_server::app;
use chainwatch_server::config::ServerConfig;
use chainwatch_server::pipeline::{
    AlertingWorker, ExtractionWorker, IngestScheduler, PipelineMetrics, ScoringWorker,
};
use chainwatch_server::seed;
use chainwatch_server::state::AppState;
use chainwatch_storage::RiskStore;
use chainwatch_stream::StreamBroker;
use chrono::Utc;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  chainwatch-server [config.toml]                          Start the server");
    eprintln!("  chainwatch-server init-profile <config.toml> <seed.json> Seed company + suppliers");
}

#[tokio::main]
async fn main() -> Result<()> {
    chainwatch_common::id::init(1, 1);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("chainwatch=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("init-profile") => {
            let config_path = args.get(2).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("init-profile requires <config.toml> and <seed.json> arguments")
            })?;
            let seed_path = args.get(3).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("init-profile requires <seed.json> argument")
            })?;
            run_init_profile(config_path, seed_path).await
        }
        Some("--help" | "-h") => {
            print_usage();
            Ok(())
        }
        _ => {
            let config_path = args
                .get(1)
                .map(|s| s.as_str())
                .unwrap_or("config/server.toml");
            run_server(config_path).await
        }
    }
}

async fn run_init_profile(config_path: &str, seed_path: &str) -> Result<()> {
    let config = ServerConfig::load(config_path)?;
    let store = RiskStore::new(Path::new(&config.database.data_dir)).await?;
    seed::init_from_seed_file(&store, seed_path).await
}

async fn run_server(config_path: &str) -> Result<()> {
    let config = Arc::new(ServerConfig::load(config_path)?);

    tracing::info!(
        http_port = config.http_port,
        data_dir = %config.database.data_dir,
        "chainwatch-server starting"
    );

    let store = Arc::new(RiskStore::new(Path::new(&config.database.data_dir)).await?);
    let broker = Arc::new(StreamBroker::new());
    let metrics = Arc::new(PipelineMetrics::default());
    let graph_cache = Arc::new(GraphCache::new());

    if store.get_company().await?.is_none() {
        tracing::warn!(
            "No company profile seeded; run `chainwatch-server init-profile` before \
             expecting the pipeline to produce risk events"
        );
    }

    if config.ai.api_key.is_empty() {
        anyhow::bail!("[ai].api_key is required to run the pipeline");
    }
    let analyzer: Arc<dyn RiskAnalyzer> = Arc::new(ZhipuProvider::new(
        config.ai.api_key.clone(),
        config.ai.fast_model.clone(),
        config.ai.capable_model.clone(),
        config.ai.embedding_model.clone(),
        config.ai.base_url.clone(),
        config.ai.llm_timeout_ms,
        config.ai.embedding_timeout_ms,
    )?);
    let base_tier: ModelTier = config
        .ai
        .extraction_model_tier
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let mut handles = Vec::new();

    // Ingestion scheduler.
    let mut connectors: Vec<Box<dyn Connector>> = Vec::new();
    if config.ingest.newsapi_key.is_empty() {
        tracing::warn!("No NewsAPI key configured; ingestion runs with no connectors");
    } else {
        connectors.push(Box::new(NewsApiConnector::new(
            config.ingest.newsapi_key.clone(),
            config.ingest.newsapi_query.clone(),
            config.ingest.newsapi_page_size,
        )?));
    }
    let ingest = Arc::new(IngestScheduler::new(
        connectors,
        store.clone(),
        broker.clone(),
        config.ingest.clone(),
        metrics.ingest.clone(),
    ));
    handles.push(tokio::spawn({
        let ingest = ingest.clone();
        async move { ingest.run().await }
    }));

    // Stage worker pools; each worker owns one consumer name.
    for i in 0..config.pipeline.extraction_workers {
        let worker = Arc::new(ExtractionWorker::new(
            store.clone(),
            broker.clone(),
            analyzer.clone(),
            config.pipeline.clone(),
            base_tier,
            metrics.extraction.clone(),
        ));
        handles.push(tokio::spawn(
            worker.run(format!("extraction_worker_{}", i + 1)),
        ));
    }
    for i in 0..config.pipeline.scoring_workers {
        let worker = Arc::new(ScoringWorker::new(
            store.clone(),
            broker.clone(),
            config.pipeline.clone(),
            metrics.scoring.clone(),
            graph_cache.clone(),
        ));
        handles.push(tokio::spawn(
            worker.run(format!("scoring_worker_{}", i + 1)),
        ));
    }
    for i in 0..config.pipeline.alerting_workers {
        let worker = Arc::new(AlertingWorker::new(
            store.clone(),
            broker.clone(),
            analyzer.clone(),
            config.pipeline.clone(),
            metrics.alerting.clone(),
        ));
        handles.push(tokio::spawn(
            worker.run(format!("alert_worker_{}", i + 1)),
        ));
    }

    // HTTP surface.
    let state = AppState {
        store: store.clone(),
        broker: broker.clone(),
        metrics: metrics.clone(),
        config: config.clone(),
        start_time: Utc::now(),
    };
    let http_addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let http_listener = tokio::net::TcpListener::bind(http_addr).await?;
    let http_server = axum::serve(http_listener, app::build_http_app(state));

    tracing::info!(http = %http_addr, "Server started");

    tokio::select! {
        result = http_server.with_graceful_shutdown(async { signal::ctrl_c().await.ok(); }) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server error");
            }
        }
        _ = signal::ctrl_c() => {
            tracing::info!("Shutting down gracefully");
        }
    }

    for handle in handles {
        handle.abort();
    }
    tracing::info!("Server stopped");

    Ok(())
}

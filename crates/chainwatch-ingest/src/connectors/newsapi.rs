use crate::connector::{Connector, RawItem};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const NEWSAPI_BASE: &str = "https://newsapi.org/v2";

/// NewsAPI connector: pulls recent articles matching the configured query.
pub struct NewsApiConnector {
    api_key: String,
    query: String,
    page_size: usize,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    status: String,
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
}

#[derive(Debug, Deserialize)]
struct NewsApiArticle {
    source: NewsApiSource,
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    url: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsApiSource {
    name: Option<String>,
}

impl NewsApiConnector {
    pub fn new(api_key: String, query: String, page_size: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            api_key,
            query,
            page_size,
            client,
        })
    }
}

#[async_trait]
impl Connector for NewsApiConnector {
    fn source_name(&self) -> &str {
        "NewsAPI"
    }

    async fn fetch(&self) -> Result<Vec<RawItem>> {
        let resp = self
            .client
            .get(format!("{NEWSAPI_BASE}/everything"))
            .query(&[
                ("q", self.query.as_str()),
                ("sortBy", "publishedAt"),
                ("language", "en"),
                ("pageSize", &self.page_size.to_string()),
            ])
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .context("Failed to reach NewsAPI")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("NewsAPI error {}: {}", status, body);
        }

        let parsed: NewsApiResponse = resp
            .json()
            .await
            .context("Failed to parse NewsAPI response")?;
        if parsed.status != "ok" {
            anyhow::bail!("NewsAPI returned status '{}'", parsed.status);
        }

        let items = parsed
            .articles
            .into_iter()
            .filter_map(|a| {
                Some(RawItem {
                    title: a.title?,
                    description: a.description,
                    content: a.content,
                    url: a.url.unwrap_or_default(),
                    published_at: a.published_at,
                    source: a.source.name.unwrap_or_else(|| "NewsAPI".to_string()),
                })
            })
            .collect::<Vec<_>>();

        tracing::info!(count = items.len(), query = %self.query, "Fetched NewsAPI batch");
        Ok(items)
    }
}

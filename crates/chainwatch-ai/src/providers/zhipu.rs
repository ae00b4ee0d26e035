use crate::analyzer::{ExtractError, ModelTier, ProfileContext, RiskAnalyzer, RiskExtraction};
use crate::models::{
    ChatMessage, ChatRequest, ChatResponse, EmbeddingRequest, EmbeddingResponse, ResponseFormat,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Zhipu (GLM) provider: chat completions for extraction and
/// recommendations, embeddings for the relevance filter.
#[derive(Clone)]
pub struct ZhipuProvider {
    api_key: String,
    fast_model: String,
    capable_model: String,
    embedding_model: String,
    base_url: String,
    client: Client,
    llm_timeout: Duration,
    embedding_timeout: Duration,
}

impl ZhipuProvider {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        api_key: String,
        fast_model: Option<String>,
        capable_model: Option<String>,
        embedding_model: Option<String>,
        base_url: Option<String>,
        llm_timeout_ms: u64,
        embedding_timeout_ms: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            api_key,
            fast_model: fast_model.unwrap_or_else(|| "glm-4-flash".to_string()),
            capable_model: capable_model.unwrap_or_else(|| "glm-5".to_string()),
            embedding_model: embedding_model.unwrap_or_else(|| "embedding-3".to_string()),
            base_url: base_url
                .unwrap_or_else(|| "https://open.bigmodel.cn/api/paas/v4".to_string()),
            client,
            llm_timeout: Duration::from_millis(llm_timeout_ms),
            embedding_timeout: Duration::from_millis(embedding_timeout_ms),
        })
    }

    fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.fast_model,
            ModelTier::Capable => &self.capable_model,
        }
    }

    async fn chat(&self, req: &ChatRequest) -> Result<String> {
        tracing::debug!(
            model = %req.model,
            messages = req.messages.len(),
            "Calling Zhipu chat API"
        );

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .timeout(self.llm_timeout)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(req)
            .send()
            .await
            .context("Failed to send request to Zhipu API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Zhipu API request failed");
            anyhow::bail!("Zhipu API error {}: {}", status, body);
        }

        let chat_resp: ChatResponse = resp
            .json()
            .await
            .context("Failed to parse Zhipu API response")?;

        tracing::debug!(usage = ?chat_resp.usage, "Zhipu API response received");

        chat_resp
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| anyhow::anyhow!("Empty response from Zhipu API"))
    }
}

#[async_trait]
impl RiskAnalyzer for ZhipuProvider {
    fn provider(&self) -> &str {
        "zhipu"
    }

    async fn extract_risk(
        &self,
        headline: &str,
        body: &str,
        profile: &ProfileContext,
        tier: ModelTier,
        strict: bool,
    ) -> Result<RiskExtraction, ExtractError> {
        let prompt = crate::prompt::build_extraction_prompt(profile, headline, body, strict);
        let req = ChatRequest {
            model: self.model_for(tier).to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: crate::prompt::EXTRACTION_SYSTEM.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt,
                },
            ],
            // Low temperature keeps enum values stable across retries.
            temperature: Some(0.1),
            max_tokens: Some(1024),
            response_format: Some(ResponseFormat::json_object()),
        };

        let content = self.chat(&req).await.map_err(ExtractError::Transport)?;
        let extraction: RiskExtraction = serde_json::from_str(content.trim()).map_err(|e| {
            tracing::warn!(error = %e, raw = %content, "Extraction response failed schema parse");
            ExtractError::Malformed(e)
        })?;

        tracing::info!(
            risk_type = %extraction.risk_type,
            is_risk = extraction.is_risk,
            severity = %extraction.severity,
            "Risk extracted"
        );

        Ok(extraction)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let req = EmbeddingRequest {
            model: self.embedding_model.clone(),
            // Provider-side input cap; headline plus lede carries the signal.
            input: text.chars().take(1000).collect(),
        };

        let resp = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .timeout(self.embedding_timeout)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&req)
            .send()
            .await
            .context("Failed to send embedding request to Zhipu API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Zhipu embeddings error {}: {}", status, body);
        }

        let parsed: EmbeddingResponse = resp
            .json()
            .await
            .context("Failed to parse Zhipu embedding response")?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| anyhow::anyhow!("Empty embedding response from Zhipu API"))
    }

    async fn generate_text(&self, prompt: &str) -> Result<String> {
        let req = ChatRequest {
            model: self.fast_model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: Some(0.5),
            max_tokens: Some(512),
            response_format: None,
        };
        let content = self.chat(&req).await?;
        Ok(content.trim().to_string())
    }
}

use anyhow::Result;
use async_trait::async_trait;
use chainwatch_common::types::{Confirmation, RiskType, Severity, TimeHorizon};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Company context handed to the extraction model.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileContext {
    pub company_name: String,
    pub supplier_names: Vec<String>,
    pub materials: Vec<String>,
    pub geographies: Vec<String>,
}

/// Structured risk record the extraction model must return.
///
/// This is the wire contract: a response that does not deserialize into
/// this shape is a parse failure, regardless of how plausible the free
/// text looks. The `reasoning` field is carried verbatim, never parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RiskExtraction {
    pub is_risk: bool,
    pub risk_type: RiskType,
    #[serde(default)]
    pub affected_entities: Vec<String>,
    #[serde(default)]
    pub affected_supply_chain_nodes: Vec<String>,
    pub severity: Severity,
    #[serde(default = "default_confirmation")]
    pub is_confirmed: Confirmation,
    pub time_horizon: TimeHorizon,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub recommended_action: Option<String>,
}

fn default_confirmation() -> Confirmation {
    Confirmation::Uncertain
}

/// Which model tier serves a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    /// Cheap/fast tier; the extraction default.
    Fast,
    /// More capable tier for complex events.
    Capable,
}

impl FromStr for ModelTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "capable" => Ok(Self::Capable),
            _ => Err(format!("unknown model tier: {s}")),
        }
    }
}

const GEOPOLITICAL_TERMS: &[&str] = &[
    "sanction", "embargo", "tariff", "export ban", "war", "invasion", "coup", "blockade",
    "nationaliz",
];

/// Long or geopolitically loaded articles go to the capable tier.
pub fn select_model_tier(base: ModelTier, headline: &str, body: &str) -> ModelTier {
    if base == ModelTier::Capable {
        return ModelTier::Capable;
    }
    if body.len() > 2000 {
        return ModelTier::Capable;
    }
    let text = format!("{} {}", headline.to_lowercase(), body.to_lowercase());
    if GEOPOLITICAL_TERMS.iter().any(|t| text.contains(t)) {
        return ModelTier::Capable;
    }
    ModelTier::Fast
}

/// Why an extraction call failed. Transport failures are transient and
/// retried with backoff; malformed output gets exactly one stricter-prompt
/// retry before the message is written off.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("model transport error: {0}")]
    Transport(#[source] anyhow::Error),
    #[error("model returned non-conforming output: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// External model behind the pipeline: structured extraction, embeddings
/// for the relevance filter, and free-text generation for recommendations.
///
/// Implementations must be cheap to share (`Send + Sync`); every pipeline
/// worker holds the same instance behind an `Arc`.
#[async_trait]
pub trait RiskAnalyzer: Send + Sync {
    /// Model provider name, for logs.
    fn provider(&self) -> &str;

    /// Extract a structured risk record from an article. `strict` selects
    /// the harder-edged retry prompt after a malformed response.
    async fn extract_risk(
        &self,
        headline: &str,
        body: &str,
        profile: &ProfileContext,
        tier: ModelTier,
        strict: bool,
    ) -> Result<RiskExtraction, ExtractError>;

    /// Embedding vector for relevance scoring.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Free-text generation (recommendation synthesis).
    async fn generate_text(&self, prompt: &str) -> Result<String>;
}

pub mod analyzer;
pub mod models;
pub mod prompt;
pub mod providers;

pub use analyzer::{
    select_model_tier, ExtractError, ModelTier, ProfileContext, RiskAnalyzer, RiskExtraction,
};
pub use providers::zhipu::ZhipuProvider;

use sea_orm::entity::prelude::*;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "risk_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub article_id: String,
    pub timestamp: DateTimeWithTimeZone,
    pub is_risk: bool,
    pub risk_type: String,
    pub affected_entities: String,
    pub affected_supply_chain_nodes: String,
    pub severity: String,
    pub confirmation: String,
    pub time_horizon: String,
    pub reasoning: String,
    pub recommended_action: Option<String>,
    pub probability: f64,
    pub impact: f64,
    pub urgency: f64,
    pub mitigation: f64,
    pub risk_score: f64,
    pub severity_band: String,
    pub primary_supplier: Option<String>,
    pub propagation: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl ActiveModelBehavior for ActiveModel {}

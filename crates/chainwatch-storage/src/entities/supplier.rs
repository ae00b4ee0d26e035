use sea_orm::entity::prelude::*;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "suppliers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub company_id: String,
    pub name: String,
    pub country: String,
    pub region: String,
    pub tier: i32,
    pub supplies: String,
    pub supply_volume_pct: f64,
    pub status: String,
    pub approved_vendor: bool,
    pub esg_score: Option<i32>,
    pub credit_rating: Option<String>,
    pub max_capacity: Option<f64>,
    pub lead_time_weeks: i32,
    pub switching_cost_estimate: Option<f64>,
    pub upstream_suppliers: String,
    pub risk_score_current: f64,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl ActiveModelBehavior for ActiveModel {}

use sea_orm::entity::prelude::*;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "articles")]
pub struct Model {
    /// Dedup fingerprint of the headline; doubles as the primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub event_id: String,
    pub timestamp: DateTimeWithTimeZone,
    pub source: String,
    pub headline: String,
    pub body: String,
    pub url: String,
    pub relevance_score: Option<f64>,
    pub processed: bool,
    pub process_note: Option<String>,
    pub risk_event_id: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl ActiveModelBehavior for ActiveModel {}

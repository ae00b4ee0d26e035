use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m001_initial_schema"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.get_connection().execute_unprepared(UP_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(DOWN_SQL)
            .await?;
        Ok(())
    }
}

const UP_SQL: &str = "
PRAGMA journal_mode=WAL;

CREATE TABLE IF NOT EXISTS companies (
    id TEXT PRIMARY KEY NOT NULL,
    company_name TEXT NOT NULL UNIQUE,
    industry TEXT NOT NULL,
    raw_materials TEXT NOT NULL,
    material_criticality TEXT NOT NULL,
    inventory_days TEXT NOT NULL,
    key_geographies TEXT NOT NULL,
    alert_contacts TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS suppliers (
    id TEXT PRIMARY KEY NOT NULL,
    company_id TEXT NOT NULL,
    name TEXT NOT NULL,
    country TEXT NOT NULL,
    region TEXT NOT NULL,
    tier INTEGER NOT NULL DEFAULT 1,
    supplies TEXT NOT NULL,
    supply_volume_pct REAL NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'active',
    approved_vendor INTEGER NOT NULL DEFAULT 0,
    esg_score INTEGER,
    credit_rating TEXT,
    max_capacity REAL,
    lead_time_weeks INTEGER NOT NULL DEFAULT 4,
    switching_cost_estimate REAL,
    upstream_suppliers TEXT NOT NULL DEFAULT '[]',
    risk_score_current REAL NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_suppliers_name ON suppliers(name);
CREATE INDEX IF NOT EXISTS idx_suppliers_status ON suppliers(status);

CREATE TABLE IF NOT EXISTS articles (
    event_id TEXT PRIMARY KEY NOT NULL,
    timestamp TEXT NOT NULL,
    source TEXT NOT NULL,
    headline TEXT NOT NULL,
    body TEXT NOT NULL,
    url TEXT NOT NULL,
    relevance_score REAL,
    processed INTEGER NOT NULL DEFAULT 0,
    process_note TEXT,
    risk_event_id TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_articles_event_id ON articles(event_id);
CREATE INDEX IF NOT EXISTS idx_articles_processed ON articles(processed);

CREATE TABLE IF NOT EXISTS risk_events (
    id TEXT PRIMARY KEY NOT NULL,
    article_id TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    is_risk INTEGER NOT NULL DEFAULT 1,
    risk_type TEXT NOT NULL,
    affected_entities TEXT NOT NULL DEFAULT '[]',
    affected_supply_chain_nodes TEXT NOT NULL DEFAULT '[]',
    severity TEXT NOT NULL,
    confirmation TEXT NOT NULL DEFAULT 'uncertain',
    time_horizon TEXT NOT NULL,
    reasoning TEXT NOT NULL DEFAULT '',
    recommended_action TEXT,
    probability REAL NOT NULL DEFAULT 0,
    impact REAL NOT NULL DEFAULT 0,
    urgency REAL NOT NULL DEFAULT 0,
    mitigation REAL NOT NULL DEFAULT 0,
    risk_score REAL NOT NULL DEFAULT 0,
    severity_band TEXT NOT NULL DEFAULT 'low',
    primary_supplier TEXT,
    propagation TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_risk_events_article ON risk_events(article_id);
CREATE INDEX IF NOT EXISTS idx_risk_events_created_at ON risk_events(created_at DESC);

CREATE TABLE IF NOT EXISTS alerts (
    id TEXT PRIMARY KEY NOT NULL,
    risk_event_id TEXT NOT NULL,
    severity_band TEXT NOT NULL,
    risk_score REAL NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    affected_supplier TEXT NOT NULL,
    affected_material TEXT NOT NULL,
    recommendations TEXT NOT NULL DEFAULT '[]',
    recommendation_text TEXT,
    acknowledged INTEGER NOT NULL DEFAULT 0,
    acknowledged_by TEXT,
    acknowledged_at TEXT,
    resolved_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_alerts_risk_event ON alerts(risk_event_id);
CREATE INDEX IF NOT EXISTS idx_alerts_risk_score ON alerts(risk_score DESC);
CREATE INDEX IF NOT EXISTS idx_alerts_acknowledged ON alerts(acknowledged);
";

const DOWN_SQL: &str = "
DROP TABLE IF EXISTS alerts;
DROP TABLE IF EXISTS risk_events;
DROP TABLE IF EXISTS articles;
DROP TABLE IF EXISTS suppliers;
DROP TABLE IF EXISTS companies;
";

use anyhow::Result;
use chainwatch_common::types::{
    Confirmation, RiskScoreComponents, RiskType, Severity, TimeHorizon,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::entities::risk_event::{self, Column, Entity};
use crate::store::RiskStore;

/// An extracted (and, after scoring, enriched) risk event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskEventRow {
    pub id: String,
    pub article_id: String,
    pub timestamp: DateTime<Utc>,
    pub is_risk: bool,
    pub risk_type: RiskType,
    pub affected_entities: Vec<String>,
    pub affected_supply_chain_nodes: Vec<String>,
    pub severity: Severity,
    pub confirmation: Confirmation,
    pub time_horizon: TimeHorizon,
    pub reasoning: String,
    pub recommended_action: Option<String>,
    pub components: RiskScoreComponents,
    pub risk_score: f64,
    pub severity_band: Severity,
    /// The linked supplier whose impact drives the composite score.
    pub primary_supplier: Option<String>,
    /// supplier id -> propagated score, filled by the scoring stage.
    pub propagation: HashMap<String, f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn to_row(m: risk_event::Model) -> RiskEventRow {
    RiskEventRow {
        id: m.id,
        article_id: m.article_id,
        timestamp: m.timestamp.with_timezone(&Utc),
        is_risk: m.is_risk,
        risk_type: m.risk_type.parse().unwrap_or(RiskType::Operational),
        affected_entities: serde_json::from_str(&m.affected_entities).unwrap_or_default(),
        affected_supply_chain_nodes: serde_json::from_str(&m.affected_supply_chain_nodes)
            .unwrap_or_default(),
        severity: m.severity.parse().unwrap_or(Severity::Medium),
        confirmation: m.confirmation.parse().unwrap_or(Confirmation::Uncertain),
        time_horizon: m.time_horizon.parse().unwrap_or(TimeHorizon::Weeks),
        reasoning: m.reasoning,
        recommended_action: m.recommended_action,
        components: RiskScoreComponents {
            probability: m.probability,
            impact: m.impact,
            urgency: m.urgency,
            mitigation: m.mitigation,
        },
        risk_score: m.risk_score,
        severity_band: m.severity_band.parse().unwrap_or(Severity::Low),
        primary_supplier: m.primary_supplier,
        propagation: serde_json::from_str(&m.propagation).unwrap_or_default(),
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

impl RiskStore {
    pub async fn insert_risk_event(&self, row: &RiskEventRow) -> Result<RiskEventRow> {
        let now = Utc::now().fixed_offset();
        let am = risk_event::ActiveModel {
            id: Set(row.id.clone()),
            article_id: Set(row.article_id.clone()),
            timestamp: Set(row.timestamp.fixed_offset()),
            is_risk: Set(row.is_risk),
            risk_type: Set(row.risk_type.to_string()),
            affected_entities: Set(serde_json::to_string(&row.affected_entities)?),
            affected_supply_chain_nodes: Set(serde_json::to_string(
                &row.affected_supply_chain_nodes,
            )?),
            severity: Set(row.severity.to_string()),
            confirmation: Set(row.confirmation.to_string()),
            time_horizon: Set(row.time_horizon.to_string()),
            reasoning: Set(row.reasoning.clone()),
            recommended_action: Set(row.recommended_action.clone()),
            probability: Set(row.components.probability),
            impact: Set(row.components.impact),
            urgency: Set(row.components.urgency),
            mitigation: Set(row.components.mitigation),
            risk_score: Set(row.risk_score),
            severity_band: Set(row.severity_band.to_string()),
            primary_supplier: Set(row.primary_supplier.clone()),
            propagation: Set(serde_json::to_string(&row.propagation)?),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        Ok(to_row(model))
    }

    pub async fn get_risk_event(&self, id: &str) -> Result<Option<RiskEventRow>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        Ok(model.map(to_row))
    }

    /// At most one risk event is ever emitted per article; this is the
    /// re-delivery guard for the extraction stage.
    pub async fn get_risk_event_by_article(
        &self,
        article_id: &str,
    ) -> Result<Option<RiskEventRow>> {
        let model = Entity::find()
            .filter(Column::ArticleId.eq(article_id))
            .one(self.db())
            .await?;
        Ok(model.map(to_row))
    }

    /// Record the scoring result on a risk event. Idempotent upsert-by-id:
    /// re-delivery recomputes the same deterministic values.
    pub async fn update_risk_event_scoring(
        &self,
        id: &str,
        components: &RiskScoreComponents,
        risk_score: f64,
        severity_band: Severity,
        primary_supplier: Option<&str>,
        propagation: &HashMap<String, f64>,
    ) -> Result<Option<RiskEventRow>> {
        let Some(model) = Entity::find_by_id(id).one(self.db()).await? else {
            return Ok(None);
        };
        let mut am: risk_event::ActiveModel = model.into();
        am.probability = Set(components.probability);
        am.impact = Set(components.impact);
        am.urgency = Set(components.urgency);
        am.mitigation = Set(components.mitigation);
        am.risk_score = Set(risk_score);
        am.severity_band = Set(severity_band.to_string());
        am.primary_supplier = Set(primary_supplier.map(str::to_string));
        am.propagation = Set(serde_json::to_string(propagation)?);
        am.updated_at = Set(Utc::now().fixed_offset());
        let updated = am.update(self.db()).await?;
        Ok(Some(to_row(updated)))
    }

    pub async fn list_recent_risk_events(&self, limit: usize) -> Result<Vec<RiskEventRow>> {
        let rows = Entity::find()
            .order_by(Column::CreatedAt, Order::Desc)
            .limit(limit as u64)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(to_row).collect())
    }

    /// Risk history for one supplier: events that either link the supplier
    /// by name or touched it through propagation.
    pub async fn list_risk_events_for_supplier(
        &self,
        supplier_id: &str,
        supplier_name: &str,
        limit: usize,
    ) -> Result<Vec<RiskEventRow>> {
        let recent = self.list_recent_risk_events(limit.max(100)).await?;
        Ok(recent
            .into_iter()
            .filter(|e| {
                e.affected_supply_chain_nodes
                    .iter()
                    .any(|n| n.eq_ignore_ascii_case(supplier_name))
                    || e.propagation.contains_key(supplier_id)
            })
            .take(limit)
            .collect())
    }
}

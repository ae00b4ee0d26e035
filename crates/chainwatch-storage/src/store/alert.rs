use anyhow::Result;
use chainwatch_common::types::{AlternateRecommendation, Severity};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};

use crate::entities::alert::{self, Column, Entity};
use crate::store::RiskStore;

/// An actionable alert raised from a scored risk event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRow {
    pub id: String,
    pub risk_event_id: String,
    pub severity_band: Severity,
    pub risk_score: f64,
    pub title: String,
    pub description: String,
    pub affected_supplier: String,
    pub affected_material: String,
    pub recommendations: Vec<AlternateRecommendation>,
    pub recommendation_text: Option<String>,
    pub acknowledged: bool,
    pub acknowledged_by: Option<String>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// List filter for the read API.
#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    pub severity_eq: Option<Severity>,
    pub acknowledged_eq: Option<bool>,
    pub since: Option<DateTime<Utc>>,
}

fn to_row(m: alert::Model) -> AlertRow {
    AlertRow {
        id: m.id,
        risk_event_id: m.risk_event_id,
        severity_band: m.severity_band.parse().unwrap_or(Severity::Low),
        risk_score: m.risk_score,
        title: m.title,
        description: m.description,
        affected_supplier: m.affected_supplier,
        affected_material: m.affected_material,
        recommendations: serde_json::from_str(&m.recommendations).unwrap_or_default(),
        recommendation_text: m.recommendation_text,
        acknowledged: m.acknowledged,
        acknowledged_by: m.acknowledged_by,
        acknowledged_at: m.acknowledged_at.map(|t| t.with_timezone(&Utc)),
        resolved_at: m.resolved_at.map(|t| t.with_timezone(&Utc)),
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

impl RiskStore {
    /// Insert an alert unless one already exists for the same risk event.
    /// Returns `None` on the duplicate path (at-least-once re-delivery);
    /// the unique index on `risk_event_id` backs this for racing workers.
    pub async fn insert_alert(&self, row: &AlertRow) -> Result<Option<AlertRow>> {
        if self
            .get_alert_by_risk_event(&row.risk_event_id)
            .await?
            .is_some()
        {
            return Ok(None);
        }
        let now = Utc::now().fixed_offset();
        let am = alert::ActiveModel {
            id: Set(row.id.clone()),
            risk_event_id: Set(row.risk_event_id.clone()),
            severity_band: Set(row.severity_band.to_string()),
            risk_score: Set(row.risk_score),
            title: Set(row.title.clone()),
            description: Set(row.description.clone()),
            affected_supplier: Set(row.affected_supplier.clone()),
            affected_material: Set(row.affected_material.clone()),
            recommendations: Set(serde_json::to_string(&row.recommendations)?),
            recommendation_text: Set(row.recommendation_text.clone()),
            acknowledged: Set(false),
            acknowledged_by: Set(None),
            acknowledged_at: Set(None),
            resolved_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        Ok(Some(to_row(model)))
    }

    pub async fn get_alert_by_id(&self, id: &str) -> Result<Option<AlertRow>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        Ok(model.map(to_row))
    }

    pub async fn get_alert_by_risk_event(&self, risk_event_id: &str) -> Result<Option<AlertRow>> {
        let model = Entity::find()
            .filter(Column::RiskEventId.eq(risk_event_id))
            .one(self.db())
            .await?;
        Ok(model.map(to_row))
    }

    /// List alerts sorted by risk score descending.
    pub async fn list_alerts(
        &self,
        filter: &AlertFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<AlertRow>> {
        let mut q = Entity::find();
        if let Some(sev) = filter.severity_eq {
            q = q.filter(Column::SeverityBand.eq(sev.to_string()));
        }
        if let Some(ack) = filter.acknowledged_eq {
            q = q.filter(Column::Acknowledged.eq(ack));
        }
        if let Some(since) = filter.since {
            q = q.filter(Column::CreatedAt.gte(since.fixed_offset()));
        }
        let rows = q
            .order_by(Column::RiskScore, Order::Desc)
            .limit(limit as u64)
            .offset(offset as u64)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(to_row).collect())
    }

    pub async fn count_alerts(&self, filter: &AlertFilter) -> Result<u64> {
        let mut q = Entity::find();
        if let Some(sev) = filter.severity_eq {
            q = q.filter(Column::SeverityBand.eq(sev.to_string()));
        }
        if let Some(ack) = filter.acknowledged_eq {
            q = q.filter(Column::Acknowledged.eq(ack));
        }
        if let Some(since) = filter.since {
            q = q.filter(Column::CreatedAt.gte(since.fixed_offset()));
        }
        Ok(q.count(self.db()).await?)
    }

    /// `created -> acknowledged` transition, recording who acknowledged.
    pub async fn acknowledge_alert(&self, id: &str, by: &str) -> Result<Option<AlertRow>> {
        let Some(model) = Entity::find_by_id(id).one(self.db()).await? else {
            return Ok(None);
        };
        let now = Utc::now().fixed_offset();
        let mut am: alert::ActiveModel = model.into();
        am.acknowledged = Set(true);
        am.acknowledged_by = Set(Some(by.to_string()));
        am.acknowledged_at = Set(Some(now));
        am.updated_at = Set(now);
        let updated = am.update(self.db()).await?;
        Ok(Some(to_row(updated)))
    }

    /// Terminal `resolved` transition, opaque to the pipeline.
    pub async fn resolve_alert(&self, id: &str) -> Result<Option<AlertRow>> {
        let Some(model) = Entity::find_by_id(id).one(self.db()).await? else {
            return Ok(None);
        };
        let now = Utc::now().fixed_offset();
        let mut am: alert::ActiveModel = model.into();
        am.resolved_at = Set(Some(now));
        am.updated_at = Set(now);
        let updated = am.update(self.db()).await?;
        Ok(Some(to_row(updated)))
    }
}

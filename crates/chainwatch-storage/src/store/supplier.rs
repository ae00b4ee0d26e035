use anyhow::Result;
use chainwatch_common::types::{SupplierStatus, UpstreamSupplier};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait, Order, QueryOrder};
use serde::{Deserialize, Serialize};

use crate::entities::supplier::{self, Column, Entity};
use crate::store::RiskStore;

/// A supplier relationship (tier-1 or tier-2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierRow {
    pub id: String,
    pub company_id: String,
    pub name: String,
    pub country: String,
    pub region: String,
    pub tier: i32,
    /// Materials supplied; non-empty, first entry is the primary material.
    pub supplies: Vec<String>,
    pub supply_volume_pct: f64,
    pub status: SupplierStatus,
    pub approved_vendor: bool,
    pub esg_score: Option<i32>,
    pub credit_rating: Option<String>,
    pub max_capacity: Option<f64>,
    pub lead_time_weeks: i32,
    pub switching_cost_estimate: Option<f64>,
    pub upstream_suppliers: Vec<UpstreamSupplier>,
    pub risk_score_current: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SupplierRow {
    pub fn primary_material(&self) -> &str {
        self.supplies.first().map(String::as_str).unwrap_or("unknown")
    }

    pub fn supplies_material(&self, material: &str) -> bool {
        self.supplies
            .iter()
            .any(|m| m.eq_ignore_ascii_case(material))
    }
}

fn to_row(m: supplier::Model) -> SupplierRow {
    SupplierRow {
        id: m.id,
        company_id: m.company_id,
        name: m.name,
        country: m.country,
        region: m.region,
        tier: m.tier,
        supplies: serde_json::from_str(&m.supplies).unwrap_or_default(),
        supply_volume_pct: m.supply_volume_pct,
        status: m.status.parse().unwrap_or(SupplierStatus::Inactive),
        approved_vendor: m.approved_vendor,
        esg_score: m.esg_score,
        credit_rating: m.credit_rating,
        max_capacity: m.max_capacity,
        lead_time_weeks: m.lead_time_weeks,
        switching_cost_estimate: m.switching_cost_estimate,
        upstream_suppliers: serde_json::from_str(&m.upstream_suppliers).unwrap_or_default(),
        risk_score_current: m.risk_score_current,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

impl RiskStore {
    pub async fn insert_supplier(&self, row: &SupplierRow) -> Result<SupplierRow> {
        let now = Utc::now().fixed_offset();
        let am = supplier::ActiveModel {
            id: Set(row.id.clone()),
            company_id: Set(row.company_id.clone()),
            name: Set(row.name.clone()),
            country: Set(row.country.clone()),
            region: Set(row.region.clone()),
            tier: Set(row.tier),
            supplies: Set(serde_json::to_string(&row.supplies)?),
            supply_volume_pct: Set(row.supply_volume_pct),
            status: Set(row.status.to_string()),
            approved_vendor: Set(row.approved_vendor),
            esg_score: Set(row.esg_score),
            credit_rating: Set(row.credit_rating.clone()),
            max_capacity: Set(row.max_capacity),
            lead_time_weeks: Set(row.lead_time_weeks),
            switching_cost_estimate: Set(row.switching_cost_estimate),
            upstream_suppliers: Set(serde_json::to_string(&row.upstream_suppliers)?),
            risk_score_current: Set(row.risk_score_current),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        self.bump_supplier_version();
        Ok(to_row(model))
    }

    pub async fn get_supplier_by_id(&self, id: &str) -> Result<Option<SupplierRow>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        Ok(model.map(to_row))
    }

    pub async fn list_suppliers(&self) -> Result<Vec<SupplierRow>> {
        let rows = Entity::find()
            .order_by(Column::CreatedAt, Order::Asc)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(to_row).collect())
    }

    /// Resolve a supplier by display name, case-insensitively. Exact match
    /// wins over substring containment (entity-linking contract).
    pub async fn find_supplier_by_name(&self, name: &str) -> Result<Option<SupplierRow>> {
        let suppliers = self.list_suppliers().await?;
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(None);
        }
        if let Some(exact) = suppliers
            .iter()
            .find(|s| s.name.to_lowercase() == needle)
        {
            return Ok(Some(exact.clone()));
        }
        Ok(suppliers
            .into_iter()
            .find(|s| {
                let candidate = s.name.to_lowercase();
                candidate.contains(&needle) || needle.contains(&candidate)
            }))
    }

    /// Raise a supplier's current risk score to `candidate` if it exceeds
    /// the stored value. Returns the effective score.
    pub async fn raise_supplier_risk_score(&self, id: &str, candidate: f64) -> Result<f64> {
        let Some(model) = Entity::find_by_id(id).one(self.db()).await? else {
            anyhow::bail!("supplier {id} not found");
        };
        let current = model.risk_score_current;
        if candidate <= current {
            return Ok(current);
        }
        let mut am: supplier::ActiveModel = model.into();
        am.risk_score_current = Set(candidate);
        am.updated_at = Set(Utc::now().fixed_offset());
        am.update(self.db()).await?;
        self.bump_supplier_version();
        Ok(candidate)
    }
}

use anyhow::Result;
use chainwatch_common::types::AlertContact;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait, QueryOrder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::entities::company::{self, Column, Entity};
use crate::store::RiskStore;

/// The company profile (singleton per deployment).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyRow {
    pub id: String,
    pub company_name: String,
    pub industry: String,
    pub raw_materials: Vec<String>,
    /// material -> criticality in [1, 10]
    pub material_criticality: HashMap<String, i32>,
    /// material -> inventory buffer in days
    pub inventory_days: HashMap<String, f64>,
    pub key_geographies: Vec<String>,
    pub alert_contacts: Vec<AlertContact>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CompanyRow {
    /// Criticality for a material, defaulting to the scale midpoint when
    /// the profile does not list it.
    pub fn criticality_for(&self, material: &str) -> i32 {
        self.material_criticality.get(material).copied().unwrap_or(5)
    }

    /// Inventory buffer days for a material, defaulting to zero.
    pub fn inventory_days_for(&self, material: &str) -> f64 {
        self.inventory_days.get(material).copied().unwrap_or(0.0)
    }
}

fn to_row(m: company::Model) -> CompanyRow {
    CompanyRow {
        id: m.id,
        company_name: m.company_name,
        industry: m.industry,
        raw_materials: serde_json::from_str(&m.raw_materials).unwrap_or_default(),
        material_criticality: serde_json::from_str(&m.material_criticality).unwrap_or_default(),
        inventory_days: serde_json::from_str(&m.inventory_days).unwrap_or_default(),
        key_geographies: serde_json::from_str(&m.key_geographies).unwrap_or_default(),
        alert_contacts: serde_json::from_str(&m.alert_contacts).unwrap_or_default(),
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

impl RiskStore {
    pub async fn insert_company(&self, row: &CompanyRow) -> Result<CompanyRow> {
        let now = Utc::now().fixed_offset();
        let am = company::ActiveModel {
            id: Set(row.id.clone()),
            company_name: Set(row.company_name.clone()),
            industry: Set(row.industry.clone()),
            raw_materials: Set(serde_json::to_string(&row.raw_materials)?),
            material_criticality: Set(serde_json::to_string(&row.material_criticality)?),
            inventory_days: Set(serde_json::to_string(&row.inventory_days)?),
            key_geographies: Set(serde_json::to_string(&row.key_geographies)?),
            alert_contacts: Set(serde_json::to_string(&row.alert_contacts)?),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        Ok(to_row(model))
    }

    /// The seeded company profile. There is at most one per deployment;
    /// the oldest row wins if a seed was ever run twice.
    pub async fn get_company(&self) -> Result<Option<CompanyRow>> {
        let model = Entity::find()
            .order_by_asc(Column::CreatedAt)
            .one(self.db())
            .await?;
        Ok(model.map(to_row))
    }
}

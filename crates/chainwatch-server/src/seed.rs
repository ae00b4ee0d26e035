use anyhow::{Context, Result};
use chainwatch_common::types::{AlertContact, SupplierStatus, UpstreamSupplier};
use chainwatch_storage::{CompanyRow, RiskStore, SupplierRow};
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;

/// JSON seed file: the company profile plus its supplier list.
#[derive(Debug, Deserialize)]
pub struct ProfileSeedFile {
    pub company: CompanySeed,
    #[serde(default)]
    pub suppliers: Vec<SupplierSeed>,
}

#[derive(Debug, Deserialize)]
pub struct CompanySeed {
    pub company_name: String,
    pub industry: String,
    #[serde(default)]
    pub raw_materials: Vec<String>,
    #[serde(default)]
    pub material_criticality: HashMap<String, i32>,
    #[serde(default)]
    pub inventory_days: HashMap<String, f64>,
    #[serde(default)]
    pub key_geographies: Vec<String>,
    #[serde(default)]
    pub alert_contacts: Vec<AlertContact>,
}

#[derive(Debug, Deserialize)]
pub struct SupplierSeed {
    pub name: String,
    pub country: String,
    #[serde(default)]
    pub region: String,
    #[serde(default = "default_tier")]
    pub tier: i32,
    pub supplies: Vec<String>,
    #[serde(default)]
    pub supply_volume_pct: f64,
    #[serde(default = "default_status")]
    pub status: SupplierStatus,
    #[serde(default)]
    pub approved_vendor: bool,
    #[serde(default)]
    pub esg_score: Option<i32>,
    #[serde(default)]
    pub credit_rating: Option<String>,
    #[serde(default)]
    pub max_capacity: Option<f64>,
    #[serde(default = "default_lead_time_weeks")]
    pub lead_time_weeks: i32,
    #[serde(default)]
    pub switching_cost_estimate: Option<f64>,
    #[serde(default)]
    pub upstream_suppliers: Vec<UpstreamSupplier>,
}

fn default_tier() -> i32 {
    1
}

fn default_status() -> SupplierStatus {
    SupplierStatus::Active
}

fn default_lead_time_weeks() -> i32 {
    4
}

/// Seed the company profile and suppliers from a JSON file. A deployment
/// has one profile; seeding is skipped when one already exists.
pub async fn init_from_seed_file(store: &RiskStore, seed_path: &str) -> Result<()> {
    let content = std::fs::read_to_string(seed_path)
        .with_context(|| format!("Failed to read seed file '{seed_path}'"))?;
    let seed: ProfileSeedFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse seed file '{seed_path}'"))?;

    if let Some(existing) = store.get_company().await? {
        tracing::warn!(
            company = %existing.company_name,
            "Company profile already seeded, skipping"
        );
        return Ok(());
    }

    anyhow::ensure!(
        !seed.company.raw_materials.is_empty(),
        "Company profile needs at least one raw material"
    );

    let now = Utc::now();
    let company = store
        .insert_company(&CompanyRow {
            id: chainwatch_common::id::next_id(),
            company_name: seed.company.company_name.clone(),
            industry: seed.company.industry.clone(),
            raw_materials: seed.company.raw_materials.clone(),
            material_criticality: seed.company.material_criticality.clone(),
            inventory_days: seed.company.inventory_days.clone(),
            key_geographies: seed.company.key_geographies.clone(),
            alert_contacts: seed.company.alert_contacts.clone(),
            created_at: now,
            updated_at: now,
        })
        .await?;
    tracing::info!(company = %company.company_name, id = %company.id, "Company seeded");

    let mut created = 0u32;
    for s in &seed.suppliers {
        if s.supplies.is_empty() {
            tracing::error!(supplier = %s.name, "Supplier has no materials, skipping");
            continue;
        }
        let row = SupplierRow {
            id: chainwatch_common::id::next_id(),
            company_id: company.id.clone(),
            name: s.name.clone(),
            country: s.country.clone(),
            region: s.region.clone(),
            tier: s.tier,
            supplies: s.supplies.clone(),
            supply_volume_pct: s.supply_volume_pct,
            status: s.status,
            approved_vendor: s.approved_vendor,
            esg_score: s.esg_score,
            credit_rating: s.credit_rating.clone(),
            max_capacity: s.max_capacity,
            lead_time_weeks: s.lead_time_weeks,
            switching_cost_estimate: s.switching_cost_estimate,
            upstream_suppliers: s.upstream_suppliers.clone(),
            risk_score_current: 0.0,
            created_at: now,
            updated_at: now,
        };
        match store.insert_supplier(&row).await {
            Ok(inserted) => {
                tracing::info!(supplier = %inserted.name, id = %inserted.id, "Supplier seeded");
                created += 1;
            }
            Err(e) => {
                tracing::error!(supplier = %s.name, error = %e, "Failed to seed supplier");
            }
        }
    }

    tracing::info!(created, "init-profile completed");
    Ok(())
}

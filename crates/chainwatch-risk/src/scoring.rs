use chainwatch_common::types::{
    Confirmation, RiskScoreComponents, Severity, TimeHorizon,
};
use chainwatch_storage::{CompanyRow, SupplierRow};

/// Result of the deterministic scoring model:
/// `score = probability × impact × urgency / mitigation`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreResult {
    pub components: RiskScoreComponents,
    pub risk_score: f64,
    pub severity_band: Severity,
}

/// Base probability from extraction severity, discounted when the event is
/// not confirmed.
pub fn probability_for(severity: Severity, confirmation: Confirmation) -> f64 {
    let base = match severity {
        Severity::Critical => 0.95,
        Severity::High => 0.80,
        Severity::Medium => 0.55,
        Severity::Low => 0.25,
    };
    match confirmation {
        Confirmation::Confirmed => base,
        Confirmation::Uncertain | Confirmation::Unconfirmed => base * 0.7,
    }
}

/// Operational impact in [0, 10].
///
/// `dependency_ratio × (criticality / 10) × buffer × 10`, where the buffer
/// term decays with inventory days. An unlinkable supplier contributes a
/// dependency ratio of zero, so the impact (and composite) collapse to 0.
pub fn impact_for(supplier: Option<&SupplierRow>, company: &CompanyRow) -> f64 {
    let Some(supplier) = supplier else {
        return 0.0;
    };
    let dependency_ratio = supplier.supply_volume_pct / 100.0;
    let material = supplier.primary_material();
    let criticality = f64::from(company.criticality_for(material));
    let inventory_days = company.inventory_days_for(material);
    let buffer = 1.0 / (1.0 + inventory_days / 30.0);

    (dependency_ratio * (criticality / 10.0) * buffer * 10.0).min(10.0)
}

pub fn urgency_for(horizon: TimeHorizon) -> f64 {
    match horizon {
        TimeHorizon::Immediate => 2.0,
        TimeHorizon::Days => 1.5,
        TimeHorizon::Weeks => 1.0,
        TimeHorizon::Months => 0.5,
    }
}

/// Mitigation divisor in [1.0, 2.0]: each available alternate supplier of
/// the material (different identity, usable status) adds 0.2, capped.
pub fn mitigation_for(
    material: &str,
    affected_id: Option<&str>,
    suppliers: &[SupplierRow],
) -> f64 {
    let alternates = suppliers
        .iter()
        .filter(|s| s.supplies_material(material))
        .filter(|s| s.status.is_available())
        .filter(|s| affected_id != Some(s.id.as_str()))
        .count();
    1.0 + (0.2 * alternates as f64).min(1.0)
}

/// Band thresholds over the composite score.
pub fn score_to_band(score: f64) -> Severity {
    if score >= 10.0 {
        Severity::Critical
    } else if score >= 6.0 {
        Severity::High
    } else if score >= 3.0 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Score one risk event against one linked supplier (or none, when the
/// extraction named a node that does not exist).
pub fn calculate_risk_score(
    severity: Severity,
    confirmation: Confirmation,
    time_horizon: TimeHorizon,
    supplier: Option<&SupplierRow>,
    company: &CompanyRow,
    all_suppliers: &[SupplierRow],
) -> ScoreResult {
    let probability = probability_for(severity, confirmation);
    let impact = impact_for(supplier, company);
    let urgency = urgency_for(time_horizon);

    let material = supplier.map(SupplierRow::primary_material).unwrap_or("unknown");
    let mitigation = mitigation_for(material, supplier.map(|s| s.id.as_str()), all_suppliers);

    let risk_score = probability * impact * urgency / mitigation;
    let severity_band = score_to_band(risk_score);

    tracing::debug!(
        probability,
        impact,
        urgency,
        mitigation,
        risk_score,
        band = %severity_band,
        "Risk score calculated"
    );

    ScoreResult {
        components: RiskScoreComponents {
            probability,
            impact,
            urgency,
            mitigation,
        },
        risk_score,
        severity_band,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainwatch_common::types::SupplierStatus;
    use chrono::Utc;
    use std::collections::HashMap;

    fn company() -> CompanyRow {
        CompanyRow {
            id: "c1".into(),
            company_name: "Vulcan Alloys".into(),
            industry: "metals".into(),
            raw_materials: vec!["copper".into()],
            material_criticality: HashMap::from([("copper".to_string(), 10)]),
            inventory_days: HashMap::from([("copper".to_string(), 15.0)]),
            key_geographies: vec!["Chile".into()],
            alert_contacts: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn supplier(id: &str, status: SupplierStatus, pct: f64) -> SupplierRow {
        SupplierRow {
            id: id.into(),
            company_id: "c1".into(),
            name: id.into(),
            country: "Chile".into(),
            region: "South America".into(),
            tier: 1,
            supplies: vec!["copper".into()],
            supply_volume_pct: pct,
            status,
            approved_vendor: false,
            esg_score: None,
            credit_rating: None,
            max_capacity: None,
            lead_time_weeks: 4,
            switching_cost_estimate: None,
            upstream_suppliers: vec![],
            risk_score_current: 0.0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn probability_table_and_confirmation_discount() {
        assert_eq!(probability_for(Severity::Critical, Confirmation::Confirmed), 0.95);
        assert_eq!(probability_for(Severity::High, Confirmation::Confirmed), 0.80);
        assert_eq!(probability_for(Severity::Medium, Confirmation::Confirmed), 0.55);
        assert_eq!(probability_for(Severity::Low, Confirmation::Confirmed), 0.25);
        assert!((probability_for(Severity::High, Confirmation::Uncertain) - 0.56).abs() < 1e-9);
        assert!((probability_for(Severity::High, Confirmation::Unconfirmed) - 0.56).abs() < 1e-9);
    }

    #[test]
    fn urgency_table() {
        assert_eq!(urgency_for(TimeHorizon::Immediate), 2.0);
        assert_eq!(urgency_for(TimeHorizon::Days), 1.5);
        assert_eq!(urgency_for(TimeHorizon::Weeks), 1.0);
        assert_eq!(urgency_for(TimeHorizon::Months), 0.5);
    }

    #[test]
    fn band_boundaries_are_inclusive_lower_bounds() {
        assert_eq!(score_to_band(2.999_999), Severity::Low);
        assert_eq!(score_to_band(3.0), Severity::Medium);
        assert_eq!(score_to_band(5.999_999), Severity::Medium);
        assert_eq!(score_to_band(6.0), Severity::High);
        assert_eq!(score_to_band(9.999_999), Severity::High);
        assert_eq!(score_to_band(10.0), Severity::Critical);
    }

    #[test]
    fn band_is_monotone_in_score() {
        let mut prev = score_to_band(0.0);
        let mut score = 0.0;
        while score < 15.0 {
            let band = score_to_band(score);
            assert!(band >= prev, "band regressed at score {score}");
            prev = band;
            score += 0.01;
        }
    }

    #[test]
    fn composite_matches_formula_exactly() {
        let x = supplier("x", SupplierStatus::Active, 65.0);
        let all = vec![x.clone()];
        let result = calculate_risk_score(
            Severity::High,
            Confirmation::Confirmed,
            TimeHorizon::Days,
            Some(&x),
            &company(),
            &all,
        );
        let c = result.components;
        let expected = c.probability * c.impact * c.urgency / c.mitigation;
        assert!((result.risk_score - expected).abs() < 1e-9);

        // Single-source disruption arithmetic: 0.8 × 4.333 × 1.5 / 1.0.
        assert!((c.probability - 0.80).abs() < 1e-9);
        assert!((c.impact - 0.65 * 1.0 * (1.0 / 1.5) * 10.0).abs() < 1e-9);
        assert_eq!(c.urgency, 1.5);
        assert_eq!(c.mitigation, 1.0);
        assert!((result.risk_score - 5.2).abs() < 1e-6);
        assert_eq!(result.severity_band, Severity::Medium);
    }

    #[test]
    fn mitigation_counts_available_alternates_only() {
        let x = supplier("x", SupplierStatus::Active, 65.0);
        let suppliers = vec![
            x.clone(),
            supplier("a1", SupplierStatus::PreQualified, 0.0),
            supplier("a2", SupplierStatus::PreQualified, 0.0),
            supplier("a3", SupplierStatus::Alternate, 0.0),
            supplier("dead", SupplierStatus::Inactive, 0.0),
        ];
        // Three usable alternates besides x; the inactive one is ignored.
        assert!((mitigation_for("copper", Some("x"), &suppliers) - 1.6).abs() < 1e-9);
        // Unrelated material has no alternates.
        assert_eq!(mitigation_for("lithium", Some("x"), &suppliers), 1.0);
        // Cap at 2.0.
        let mut crowd = vec![x];
        for i in 0..10 {
            crowd.push(supplier(&format!("alt{i}"), SupplierStatus::Active, 0.0));
        }
        assert_eq!(mitigation_for("copper", Some("x"), &crowd), 2.0);
    }

    #[test]
    fn redundant_supply_lowers_composite() {
        let x = supplier("x", SupplierStatus::Active, 65.0);
        let suppliers = vec![
            x.clone(),
            supplier("a1", SupplierStatus::PreQualified, 0.0),
            supplier("a2", SupplierStatus::PreQualified, 0.0),
            supplier("a3", SupplierStatus::PreQualified, 0.0),
        ];
        let result = calculate_risk_score(
            Severity::High,
            Confirmation::Confirmed,
            TimeHorizon::Days,
            Some(&x),
            &company(),
            &suppliers,
        );
        assert!((result.components.mitigation - 1.6).abs() < 1e-9);
        assert!((result.risk_score - 3.25).abs() < 1e-6);
        assert_eq!(result.severity_band, Severity::Medium);
    }

    #[test]
    fn zero_supply_volume_yields_zero_impact() {
        let x = supplier("x", SupplierStatus::Active, 0.0);
        let all = vec![x.clone()];
        let result = calculate_risk_score(
            Severity::Critical,
            Confirmation::Confirmed,
            TimeHorizon::Immediate,
            Some(&x),
            &company(),
            &all,
        );
        assert_eq!(result.components.impact, 0.0);
        assert_eq!(result.risk_score, 0.0);
        assert_eq!(result.severity_band, Severity::Low);
    }

    #[test]
    fn missing_supplier_scores_to_zero() {
        let all = vec![];
        let result = calculate_risk_score(
            Severity::Critical,
            Confirmation::Confirmed,
            TimeHorizon::Immediate,
            None,
            &company(),
            &all,
        );
        assert_eq!(result.components.impact, 0.0);
        assert_eq!(result.risk_score, 0.0);
    }
}

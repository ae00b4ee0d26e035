use crate::recommend::find_alternates;
use chainwatch_ai::RiskAnalyzer;
use chainwatch_common::types::{AlternateRecommendation, RiskType};
use chainwatch_storage::{AlertRow, CompanyRow, RiskEventRow, SupplierRow};
use chrono::Utc;

/// An alert is warranted only when the composite score reaches the
/// threshold (inclusive) and the risk actually touches a supply chain
/// node.
pub fn should_create_alert(event: &RiskEventRow, alert_threshold: f64) -> bool {
    if event.risk_score < alert_threshold {
        tracing::debug!(
            risk_event_id = %event.id,
            score = event.risk_score,
            alert_threshold,
            "Risk score below alert threshold"
        );
        return false;
    }
    if event.affected_supply_chain_nodes.is_empty() {
        tracing::debug!(risk_event_id = %event.id, "No supply chain nodes affected");
        return false;
    }
    true
}

/// Concise title derived from risk type and the primary affected supplier.
pub fn alert_title(risk_type: RiskType, affected: Option<&str>) -> String {
    format!(
        "{} Risk: {}",
        risk_type.title(),
        affected.unwrap_or("Supply Chain")
    )
}

/// Human description: the extraction reasoning plus the leading affected
/// entities.
pub fn alert_description(reasoning: &str, entities: &[String]) -> String {
    let mut description = if reasoning.is_empty() {
        "Supply chain disruption detected".to_string()
    } else {
        reasoning.to_string()
    };
    if !entities.is_empty() {
        let listed: Vec<&str> = entities.iter().take(5).map(String::as_str).collect();
        description.push_str(&format!(" Affected entities: {}.", listed.join(", ")));
    }
    description
}

fn fallback_recommendation(alternates: &[AlternateRecommendation]) -> String {
    match alternates.first() {
        Some(top) => format!(
            "Activate alternate supplier {} from {}; lead time {}w.",
            top.name, top.country, top.lead_time_weeks
        ),
        None => "No qualified alternate suppliers are available. Initiate emergency sourcing \
                 and increase inventory buffers."
            .to_string(),
    }
}

fn recommendation_prompt(
    company: &CompanyRow,
    event: &RiskEventRow,
    title: &str,
    affected_supplier: &str,
    affected_material: &str,
    alternates: &[AlternateRecommendation],
) -> String {
    let alternates_text = alternates
        .iter()
        .take(3)
        .enumerate()
        .map(|(i, alt)| {
            format!(
                "  {}. {} ({}) - Score: {}/10, Lead time: {} weeks, Approved: {}",
                i + 1,
                alt.name,
                alt.country,
                alt.score,
                alt.lead_time_weeks,
                if alt.approved_vendor { "Yes" } else { "No" }
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a supply chain advisor for {company}.

ALERT DETAILS:
- Title: {title}
- Risk Score: {score:.2} ({band})
- Affected Supplier: {affected_supplier}
- Affected Material: {affected_material}

TOP ALTERNATE SUPPLIERS:
{alternates_text}

Write a concise (3-4 sentences) recommendation for the supply chain manager.
Include:
1. Urgency level and immediate action needed
2. Top recommended supplier and why
3. Risk mitigation strategy

Use professional but direct language. No bullet points - write flowing sentences."#,
        company = company.company_name,
        score = event.risk_score,
        band = event.severity_band.to_string().to_uppercase(),
    )
}

/// Assemble an alert for a scored risk event: rank alternates, synthesize
/// the recommendation (falling back to a template when the model call
/// fails or there is nothing to rank), and fill the row. Returns `None`
/// when no alert is warranted. The caller persists and publishes.
pub async fn build_alert(
    event: &RiskEventRow,
    company: &CompanyRow,
    suppliers: &[SupplierRow],
    analyzer: &dyn RiskAnalyzer,
    alert_threshold: f64,
) -> Option<AlertRow> {
    if !should_create_alert(event, alert_threshold) {
        return None;
    }

    let supplier_name = event
        .primary_supplier
        .as_deref()
        .or_else(|| event.affected_supply_chain_nodes.first().map(String::as_str))
        .unwrap_or("Unknown");

    let disrupted = suppliers
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case(supplier_name));

    let affected_material = disrupted
        .map(|s| s.primary_material().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let alternates = match disrupted {
        Some(disrupted) => find_alternates(disrupted, suppliers, 5),
        None => {
            tracing::warn!(supplier = supplier_name, "Affected supplier not in store");
            Vec::new()
        }
    };

    let title = alert_title(event.risk_type, Some(supplier_name));
    let description = alert_description(&event.reasoning, &event.affected_entities);

    let recommendation_text = if alternates.is_empty() {
        fallback_recommendation(&alternates)
    } else {
        let prompt = recommendation_prompt(
            company,
            event,
            &title,
            supplier_name,
            &affected_material,
            &alternates,
        );
        match analyzer.generate_text(&prompt).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => fallback_recommendation(&alternates),
            Err(e) => {
                tracing::warn!(error = %e, "Recommendation synthesis failed, using template");
                fallback_recommendation(&alternates)
            }
        }
    };

    let now = Utc::now();
    Some(AlertRow {
        id: chainwatch_common::id::next_id(),
        risk_event_id: event.id.clone(),
        severity_band: event.severity_band,
        risk_score: event.risk_score,
        title,
        description,
        affected_supplier: supplier_name.to_string(),
        affected_material,
        recommendations: alternates,
        recommendation_text: Some(recommendation_text),
        acknowledged: false,
        acknowledged_by: None,
        acknowledged_at: None,
        resolved_at: None,
        created_at: now,
        updated_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use chainwatch_ai::{ExtractError, ModelTier, ProfileContext, RiskExtraction};
    use chainwatch_common::types::{
        Confirmation, RiskScoreComponents, Severity, SupplierStatus, TimeHorizon,
    };
    use std::collections::HashMap;

    struct FailingAnalyzer;

    #[async_trait]
    impl RiskAnalyzer for FailingAnalyzer {
        fn provider(&self) -> &str {
            "failing"
        }

        async fn extract_risk(
            &self,
            _headline: &str,
            _body: &str,
            _profile: &ProfileContext,
            _tier: ModelTier,
            _strict: bool,
        ) -> Result<RiskExtraction, ExtractError> {
            Err(ExtractError::Transport(anyhow::anyhow!("unavailable")))
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            anyhow::bail!("unavailable")
        }

        async fn generate_text(&self, _prompt: &str) -> Result<String> {
            anyhow::bail!("unavailable")
        }
    }

    fn company() -> CompanyRow {
        CompanyRow {
            id: "c1".into(),
            company_name: "Vulcan Alloys".into(),
            industry: "metals".into(),
            raw_materials: vec!["copper".into()],
            material_criticality: HashMap::new(),
            inventory_days: HashMap::new(),
            key_geographies: vec![],
            alert_contacts: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn supplier(name: &str, country: &str) -> SupplierRow {
        SupplierRow {
            id: name.to_lowercase().replace(' ', "-"),
            company_id: "c1".into(),
            name: name.into(),
            country: country.into(),
            region: "region".into(),
            tier: 1,
            supplies: vec!["copper".into()],
            supply_volume_pct: 65.0,
            status: SupplierStatus::Active,
            approved_vendor: true,
            esg_score: Some(60),
            credit_rating: Some("A".into()),
            max_capacity: Some(80.0),
            lead_time_weeks: 6,
            switching_cost_estimate: Some(4.0),
            upstream_suppliers: vec![],
            risk_score_current: 0.0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn scored_event(score: f64, nodes: Vec<String>) -> RiskEventRow {
        RiskEventRow {
            id: "re-1".into(),
            article_id: "fp-1".into(),
            timestamp: Utc::now(),
            is_risk: true,
            risk_type: RiskType::SupplyDisruption,
            affected_entities: vec!["Chile".into(), "copper".into()],
            affected_supply_chain_nodes: nodes,
            severity: Severity::High,
            confirmation: Confirmation::Confirmed,
            time_horizon: TimeHorizon::Days,
            reasoning: "Copper supply halted at a key supplier.".into(),
            recommended_action: None,
            components: RiskScoreComponents {
                probability: 0.8,
                impact: 4.33,
                urgency: 1.5,
                mitigation: 1.0,
            },
            risk_score: score,
            severity_band: band_for(score),
            primary_supplier: None,
            propagation: HashMap::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn band_for(score: f64) -> Severity {
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

    #[test]
    fn threshold_is_an_inclusive_lower_bound() {
        let at = scored_event(3.0, vec!["Andes Copper Co".into()]);
        assert!(should_create_alert(&at, 3.0));

        let below = scored_event(2.999, vec!["Andes Copper Co".into()]);
        assert!(!should_create_alert(&below, 3.0));

        let no_nodes = scored_event(8.0, vec![]);
        assert!(!should_create_alert(&no_nodes, 3.0));
    }

    #[test]
    fn title_and_description_shapes() {
        assert_eq!(
            alert_title(RiskType::SupplyDisruption, Some("Andes Copper Co")),
            "Supply Disruption Risk: Andes Copper Co"
        );
        assert_eq!(
            alert_title(RiskType::Geopolitical, None),
            "Geopolitical Risk: Supply Chain"
        );

        let desc = alert_description("Port closed.", &["Chile".into(), "copper".into()]);
        assert_eq!(desc, "Port closed. Affected entities: Chile, copper.");
        assert_eq!(alert_description("Port closed.", &[]), "Port closed.");
    }

    #[tokio::test]
    async fn alert_with_alternates_falls_back_on_llm_failure() {
        let event = scored_event(5.2, vec!["Andes Copper Co".into()]);
        let suppliers = vec![
            supplier("Andes Copper Co", "Chile"),
            supplier("Nordic Copper", "Norway"),
        ];
        let alert = build_alert(&event, &company(), &suppliers, &FailingAnalyzer, 3.0)
            .await
            .unwrap();

        assert_eq!(alert.affected_supplier, "Andes Copper Co");
        assert_eq!(alert.affected_material, "copper");
        assert_eq!(alert.recommendations.len(), 1);
        let text = alert.recommendation_text.unwrap();
        assert!(text.starts_with("Activate alternate supplier Nordic Copper from Norway"));
        assert!(text.contains("lead time 6w"));
    }

    #[tokio::test]
    async fn alert_without_alternates_uses_no_alternate_template() {
        let event = scored_event(5.2, vec!["Andes Copper Co".into()]);
        let suppliers = vec![supplier("Andes Copper Co", "Chile")];
        let alert = build_alert(&event, &company(), &suppliers, &FailingAnalyzer, 3.0)
            .await
            .unwrap();

        assert!(alert.recommendations.is_empty());
        assert!(alert
            .recommendation_text
            .unwrap()
            .contains("No qualified alternate suppliers"));
    }

    #[tokio::test]
    async fn below_threshold_produces_no_alert() {
        let event = scored_event(1.0, vec!["Andes Copper Co".into()]);
        let suppliers = vec![supplier("Andes Copper Co", "Chile")];
        assert!(
            build_alert(&event, &company(), &suppliers, &FailingAnalyzer, 3.0)
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn unknown_supplier_still_alerts_without_alternates() {
        let event = scored_event(4.0, vec!["Mystery Mining".into()]);
        let suppliers = vec![supplier("Andes Copper Co", "Chile")];
        let alert = build_alert(&event, &company(), &suppliers, &FailingAnalyzer, 3.0)
            .await
            .unwrap();
        assert_eq!(alert.affected_supplier, "Mystery Mining");
        assert_eq!(alert.affected_material, "unknown");
        assert!(alert.recommendations.is_empty());
    }
}

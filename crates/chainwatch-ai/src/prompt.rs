use crate::analyzer::ProfileContext;

/// System role for extraction calls.
pub const EXTRACTION_SYSTEM: &str =
    "You are a supply chain risk analyst. You answer with a single JSON object and nothing else.";

/// Build the structured-extraction prompt. The `strict` variant is used on
/// retry after a malformed response and repeats the schema with harder
/// wording.
pub fn build_extraction_prompt(
    profile: &ProfileContext,
    headline: &str,
    body: &str,
    strict: bool,
) -> String {
    let supplier_list = profile.supplier_names.join(", ");
    let materials_list = profile.materials.join(", ");
    let geographies = profile.geographies.join(", ");

    let mut prompt = format!(
        r#"You are a supply chain risk analyst for {company}.

Company's key suppliers: {supplier_list}
Company's raw materials: {materials_list}
Key geographies: {geographies}

Analyze the following news article and return a JSON object ONLY (no explanation):

Article:
{headline}

{body}

JSON schema to follow:
{{
  "is_risk": true or false,
  "risk_type": "geopolitical | natural_disaster | financial | regulatory | operational | cybersecurity | esg | supply_disruption | price_volatility",
  "affected_entities": ["companies, countries, or materials mentioned"],
  "affected_supply_chain_nodes": ["names matching our supplier list exactly"],
  "severity": "critical | high | medium | low",
  "is_confirmed": "confirmed | unconfirmed | uncertain",
  "time_horizon": "immediate | days | weeks | months",
  "reasoning": "one sentence explaining the link to our supply chain",
  "recommended_action": "one sentence immediate action"
}}

Rules:
- Only set is_risk=true if this directly affects our suppliers, materials, or geographies
- affected_supply_chain_nodes must match names from the supplier list (case-insensitive)
- Be conservative: if the connection is weak or speculative, set is_risk=false
- severity should reflect potential operational impact to {company}
"#,
        company = profile.company_name,
    );

    if strict {
        prompt.push_str(
            "\nIMPORTANT: your previous answer was not valid JSON for this schema. \
             Respond with exactly one JSON object, no markdown fences, no commentary, \
             every key present, enum values copied verbatim from the schema above.\n",
        );
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> ProfileContext {
        ProfileContext {
            company_name: "Vulcan Alloys".into(),
            supplier_names: vec!["Andes Copper Co".into(), "Nordic Nickel".into()],
            materials: vec!["copper".into(), "nickel".into()],
            geographies: vec!["Chile".into(), "Norway".into()],
        }
    }

    #[test]
    fn prompt_names_profile_and_schema() {
        let p = build_extraction_prompt(&profile(), "Strike at port", "Body text", false);
        assert!(p.contains("Vulcan Alloys"));
        assert!(p.contains("Andes Copper Co, Nordic Nickel"));
        assert!(p.contains("copper, nickel"));
        assert!(p.contains("\"is_risk\""));
        assert!(p.contains("Strike at port"));
        assert!(!p.contains("previous answer"));
    }

    #[test]
    fn strict_variant_appends_retry_instruction() {
        let p = build_extraction_prompt(&profile(), "h", "b", true);
        assert!(p.contains("previous answer was not valid JSON"));
    }
}

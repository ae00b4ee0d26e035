use chainwatch_common::types::{AlternateRecommendation, ScoreBreakdown, SupplierStatus};
use chainwatch_storage::SupplierRow;

// Ranking weights; they must sum to 1.0.
pub const W_GEOGRAPHIC: f64 = 0.20;
pub const W_CAPACITY: f64 = 0.25;
pub const W_RELATIONSHIP: f64 = 0.20;
pub const W_ESG: f64 = 0.10;
pub const W_FINANCIAL: f64 = 0.10;
pub const W_SWITCHING: f64 = 0.05;
pub const W_LEAD_TIME: f64 = 0.10;

pub fn weights_sum() -> f64 {
    W_GEOGRAPHIC + W_CAPACITY + W_RELATIONSHIP + W_ESG + W_FINANCIAL + W_SWITCHING + W_LEAD_TIME
}

/// Credit-rating ordinal mapped to [0, 1]; unknown ratings score neutral.
pub fn credit_rating_score(rating: Option<&str>) -> f64 {
    match rating.map(str::trim).map(str::to_uppercase).as_deref() {
        Some("AAA") => 1.0,
        Some("AA") => 0.9,
        Some("A") => 0.8,
        Some("BBB") => 0.7,
        Some("BB") => 0.55,
        Some("B") => 0.4,
        Some("CCC") => 0.25,
        Some("CC") => 0.15,
        Some("C") => 0.05,
        _ => 0.5,
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Score one candidate against the disrupted supplier with the weighted
/// multi-factor model; the result is on a 0-10 scale.
pub fn score_alternate(
    candidate: &SupplierRow,
    disrupted: &SupplierRow,
) -> AlternateRecommendation {
    // Prefer a different country from the disrupted supplier.
    let geo_score = if candidate.country != disrupted.country {
        1.0
    } else {
        0.3
    };

    // Can the candidate cover the lost volume? Unknown capacity scores
    // neutral; zero required volume is trivially covered.
    let required_volume = disrupted.supply_volume_pct;
    let cap_score = match candidate.max_capacity {
        Some(capacity) if capacity > 0.0 => {
            if required_volume > 0.0 {
                (capacity / required_volume).min(1.0)
            } else {
                1.0
            }
        }
        _ => 0.5,
    };

    let rel_score = if candidate.approved_vendor {
        1.0
    } else if candidate.status == SupplierStatus::PreQualified {
        0.8
    } else {
        0.4
    };

    let esg_score = f64::from(candidate.esg_score.unwrap_or(50)) / 100.0;

    let financial_score = credit_rating_score(candidate.credit_rating.as_deref());

    let switching_cost = candidate.switching_cost_estimate.unwrap_or(5.0);
    let switch_score = 1.0 - switching_cost / 10.0;

    let lead_time_weeks = candidate.lead_time_weeks;
    let lead_score = 1.0 / (1.0 + f64::from(lead_time_weeks) / 4.0);

    let final_score = (geo_score * W_GEOGRAPHIC
        + cap_score * W_CAPACITY
        + rel_score * W_RELATIONSHIP
        + esg_score * W_ESG
        + financial_score * W_FINANCIAL
        + switch_score * W_SWITCHING
        + lead_score * W_LEAD_TIME)
        * 10.0;

    tracing::debug!(
        candidate = %candidate.name,
        score = final_score,
        geo = geo_score,
        cap = cap_score,
        rel = rel_score,
        "Scored alternate supplier"
    );

    AlternateRecommendation {
        supplier_id: candidate.id.clone(),
        name: candidate.name.clone(),
        country: candidate.country.clone(),
        score: round2(final_score),
        lead_time_weeks,
        approved_vendor: candidate.approved_vendor,
        breakdown: ScoreBreakdown {
            geographic_diversity: round2(geo_score),
            capacity: round2(cap_score),
            relationship: round2(rel_score),
            esg: round2(esg_score),
            financial: round2(financial_score),
            switching_cost: round2(switch_score),
            lead_time: round2(lead_score),
        },
    }
}

/// Find and rank alternates for a disrupted supplier: same material,
/// usable status, different identity. Ties break on higher capacity, then
/// shorter lead time, then name, which makes the ranking a total order.
pub fn find_alternates(
    disrupted: &SupplierRow,
    suppliers: &[SupplierRow],
    max_results: usize,
) -> Vec<AlternateRecommendation> {
    let material = disrupted.primary_material();

    let mut scored: Vec<(&SupplierRow, AlternateRecommendation)> = suppliers
        .iter()
        .filter(|s| s.id != disrupted.id)
        .filter(|s| s.supplies_material(material))
        .filter(|s| s.status.is_available())
        .map(|s| (s, score_alternate(s, disrupted)))
        .collect();

    scored.sort_by(|(a, ra), (b, rb)| {
        rb.score
            .total_cmp(&ra.score)
            .then_with(|| {
                b.max_capacity
                    .unwrap_or(0.0)
                    .total_cmp(&a.max_capacity.unwrap_or(0.0))
            })
            .then_with(|| a.lead_time_weeks.cmp(&b.lead_time_weeks))
            .then_with(|| a.name.cmp(&b.name))
    });

    tracing::info!(
        disrupted = %disrupted.name,
        material,
        candidates = scored.len(),
        "Ranked alternate suppliers"
    );

    scored
        .into_iter()
        .take(max_results)
        .map(|(_, rec)| rec)
        .collect()
}

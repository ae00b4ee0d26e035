use chainwatch_storage::{CompanyRow, SupplierRow};

/// Cosine similarity between two embedding vectors. Zero when either
/// vector is empty, zero-magnitude, or the dimensions disagree.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut mag_a = 0.0f64;
    let mut mag_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        mag_a += f64::from(*x) * f64::from(*x);
        mag_b += f64::from(*y) * f64::from(*y);
    }
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a.sqrt() * mag_b.sqrt())
}

/// Relevance gate. Strictly greater than: a score exactly at the threshold
/// is rejected.
pub fn is_relevant(score: f64, threshold: f64) -> bool {
    score > threshold
}

/// Keywords describing the company profile for the relevance embedding:
/// company name, top-5 tier-1 suppliers by supply volume, top-3 materials
/// by criticality, top-3 geographies. The embedding of the joined keyword
/// text is cached for the lifetime of a stable profile.
pub fn build_company_keywords(company: &CompanyRow, suppliers: &[SupplierRow]) -> Vec<String> {
    let mut keywords = vec![company.company_name.clone()];

    let mut tier1: Vec<&SupplierRow> = suppliers.iter().filter(|s| s.tier == 1).collect();
    tier1.sort_by(|a, b| {
        b.supply_volume_pct
            .total_cmp(&a.supply_volume_pct)
            .then_with(|| a.name.cmp(&b.name))
    });
    keywords.extend(tier1.iter().take(5).map(|s| s.name.clone()));

    let mut materials: Vec<(&String, &i32)> = company.material_criticality.iter().collect();
    materials.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    keywords.extend(materials.iter().take(3).map(|(m, _)| (*m).clone()));

    keywords.extend(company.key_geographies.iter().take(3).cloned());

    keywords
}

use crate::graph::SupplyGraph;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, VecDeque};

/// Propagate a risk score from the originating node toward the company.
///
/// Breadth-first over successors: for edge `u → v` with weight `w`,
/// `propagated_v = propagated_u × w × (0.5 + vulnerability_v)` where
/// `vulnerability_v = 1 − mitigation_score_v`. A node is recorded and
/// re-enqueued only when the new score strictly exceeds both the
/// propagation threshold and any previously recorded score, which bounds
/// the traversal at O(|V|·|E|) and makes every recorded score the maximum
/// over all paths. The origin is recorded at its initial score.
///
/// Returns node id → propagated score.
pub fn propagate(
    graph: &SupplyGraph,
    origin: NodeIndex,
    initial_score: f64,
    threshold: f64,
) -> HashMap<String, f64> {
    let mut best: HashMap<NodeIndex, f64> = HashMap::new();
    best.insert(origin, initial_score);

    let mut queue = VecDeque::new();
    queue.push_back(origin);

    tracing::debug!(
        origin = %graph.node(origin).name,
        initial_score,
        threshold,
        "Starting risk propagation"
    );

    while let Some(u) = queue.pop_front() {
        let score_u = best[&u];
        for edge in graph.graph.edges(u) {
            let v = edge.target();
            let weight = *edge.weight();
            let vulnerability = 1.0 - graph.node(v).mitigation_score;
            let score_v = score_u * weight * (0.5 + vulnerability);

            if score_v <= threshold {
                continue;
            }
            let improved = best.get(&v).is_none_or(|prev| score_v > *prev);
            if improved {
                best.insert(v, score_v);
                queue.push_back(v);
            }
        }
    }

    tracing::debug!(nodes = best.len(), "Propagation complete");

    best.into_iter()
        .map(|(idx, score)| (graph.node(idx).id.clone(), score))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_supply_graph;
    use chainwatch_common::types::{SupplierStatus, UpstreamSupplier};
    use chainwatch_storage::{CompanyRow, SupplierRow};
    use chrono::Utc;
    use std::collections::HashMap as Map;

    fn company() -> CompanyRow {
        CompanyRow {
            id: "c1".into(),
            company_name: "Vulcan Alloys".into(),
            industry: "metals".into(),
            raw_materials: vec!["copper".into()],
            material_criticality: Map::new(),
            inventory_days: Map::new(),
            key_geographies: vec![],
            alert_contacts: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn supplier(id: &str, tier: i32, pct: f64, upstream: Vec<UpstreamSupplier>) -> SupplierRow {
        SupplierRow {
            id: id.into(),
            company_id: "c1".into(),
            name: id.to_uppercase(),
            country: "Chile".into(),
            region: "South America".into(),
            tier,
            supplies: vec!["copper".into()],
            supply_volume_pct: pct,
            status: SupplierStatus::Active,
            approved_vendor: false,
            esg_score: None,
            credit_rating: None,
            max_capacity: None,
            lead_time_weeks: 4,
            switching_cost_estimate: None,
            upstream_suppliers: upstream,
            risk_score_current: 0.0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn up(name: &str, pct: f64) -> UpstreamSupplier {
        UpstreamSupplier {
            name: name.into(),
            country: "Peru".into(),
            supply_volume_pct: pct,
        }
    }

    #[test]
    fn two_tier_propagation_matches_expected_scores() {
        // Y (tier-2) feeds X (tier-1, weight 1.0); X feeds company at 0.65.
        let suppliers = vec![
            supplier("x", 1, 65.0, vec![up("Y", 100.0)]),
            supplier("y", 2, 100.0, vec![]),
        ];
        let g = build_supply_graph(&company(), &suppliers);
        let y = g.index_by_id("y").unwrap();

        let result = propagate(&g, y, 8.0, 1.0);

        // Default mitigation 0.5 makes the multiplier exactly the weight.
        assert!((result["y"] - 8.0).abs() < 1e-9);
        assert!((result["x"] - 8.0).abs() < 1e-9);
        assert!((result["c1"] - 5.2).abs() < 1e-9);
        assert_eq!(result.len(), 3);
    }

    #[test]
    fn propagation_stops_strictly_at_threshold() {
        // x -> company with weight 0.1: 8.0 * 0.1 = 0.8 <= 1.0, dropped.
        let suppliers = vec![supplier("x", 1, 10.0, vec![])];
        let g = build_supply_graph(&company(), &suppliers);
        let x = g.index_by_id("x").unwrap();

        let result = propagate(&g, x, 8.0, 1.0);
        assert_eq!(result.len(), 1);
        assert!(result.contains_key("x"));

        // Exactly at the threshold is not recorded either.
        let suppliers = vec![supplier("x", 1, 100.0, vec![])];
        let g = build_supply_graph(&company(), &suppliers);
        let x = g.index_by_id("x").unwrap();
        let result = propagate(&g, x, 1.0, 1.0);
        assert_eq!(result.len(), 1, "score equal to threshold must not spread");
    }

    #[test]
    fn recorded_score_is_max_over_paths() {
        // Diamond: d feeds both a (strong) and b (weak), both feed x.
        let suppliers = vec![
            supplier("x", 1, 100.0, vec![up("A", 100.0), up("B", 100.0)]),
            supplier("a", 2, 0.0, vec![up("D", 90.0)]),
            supplier("b", 2, 0.0, vec![up("D", 30.0)]),
            supplier("d", 2, 0.0, vec![]),
        ];
        let g = build_supply_graph(&company(), &suppliers);
        let d = g.index_by_id("d").unwrap();

        let result = propagate(&g, d, 10.0, 1.0);
        assert!((result["a"] - 9.0).abs() < 1e-9);
        assert!((result["b"] - 3.0).abs() < 1e-9);
        // x must carry the stronger path (via a), not whichever arrived first.
        assert!((result["x"] - 9.0).abs() < 1e-9);
    }

    #[test]
    fn propagation_terminates_on_cycles() {
        // a and b reference each other as upstreams.
        let suppliers = vec![
            supplier("a", 1, 100.0, vec![up("B", 100.0)]),
            supplier("b", 1, 100.0, vec![up("A", 100.0)]),
        ];
        let g = build_supply_graph(&company(), &suppliers);
        let a = g.index_by_id("a").unwrap();

        let result = propagate(&g, a, 9.0, 1.0);
        assert!(result.len() <= 3);
        assert!((result["a"] - 9.0).abs() < 1e-9);
        assert!((result["b"] - 9.0).abs() < 1e-9);
    }

    #[test]
    fn origin_below_threshold_still_recorded() {
        let suppliers = vec![supplier("x", 1, 65.0, vec![])];
        let g = build_supply_graph(&company(), &suppliers);
        let x = g.index_by_id("x").unwrap();
        let result = propagate(&g, x, 0.5, 1.0);
        assert_eq!(result.len(), 1);
        assert!((result["x"] - 0.5).abs() < 1e-9);
    }
}

use chainwatch_storage::{CompanyRow, SupplierRow};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Default mitigation score for graph nodes; no node currently carries a
/// persisted override, which makes the default propagation multiplier
/// exactly `w × (0.5 + (1 − 0.5)) = w`.
pub const DEFAULT_MITIGATION_SCORE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Company,
    Supplier,
}

/// A node in the derived supply graph.
#[derive(Debug, Clone)]
pub struct SupplyNode {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    pub tier: i32,
    pub mitigation_score: f64,
}

/// The derived supply graph: suppliers upstream, the company downstream,
/// edges pointing in the direction of supply with weight
/// `supply_volume_pct / 100`. Rebuilt on demand from the store; never
/// persisted.
pub struct SupplyGraph {
    pub(crate) graph: DiGraph<SupplyNode, f64>,
    index_by_id: HashMap<String, NodeIndex>,
    index_by_name: HashMap<String, NodeIndex>,
    company: NodeIndex,
}

impl SupplyGraph {
    pub fn node(&self, idx: NodeIndex) -> &SupplyNode {
        &self.graph[idx]
    }

    pub fn company_index(&self) -> NodeIndex {
        self.company
    }

    pub fn index_by_id(&self, id: &str) -> Option<NodeIndex> {
        self.index_by_id.get(id).copied()
    }

    /// Case-insensitive node lookup by display name.
    pub fn index_by_name(&self, name: &str) -> Option<NodeIndex> {
        self.index_by_name.get(&name.trim().to_lowercase()).copied()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

/// Build the supply graph from the seeded profile and supplier rows.
///
/// Wiring rules:
/// - every tier-1 supplier gets an edge to the company;
/// - an upstream descriptor whose name matches a stored supplier reuses
///   that supplier's node, so a named tier-2 supplier feeds its parent;
/// - unmatched descriptors become synthetic `{parent}:upstream:{name}`
///   nodes;
/// - a tier-2 supplier referenced by nobody falls back to a direct company
///   edge so it stays reachable.
pub fn build_supply_graph(company: &CompanyRow, suppliers: &[SupplierRow]) -> SupplyGraph {
    let mut graph = DiGraph::new();
    let mut index_by_id = HashMap::new();
    let mut index_by_name = HashMap::new();

    let company_idx = graph.add_node(SupplyNode {
        id: company.id.clone(),
        name: company.company_name.clone(),
        kind: NodeKind::Company,
        tier: 0,
        mitigation_score: DEFAULT_MITIGATION_SCORE,
    });
    index_by_id.insert(company.id.clone(), company_idx);
    index_by_name.insert(company.company_name.to_lowercase(), company_idx);

    for supplier in suppliers {
        let idx = graph.add_node(SupplyNode {
            id: supplier.id.clone(),
            name: supplier.name.clone(),
            kind: NodeKind::Supplier,
            tier: supplier.tier,
            mitigation_score: DEFAULT_MITIGATION_SCORE,
        });
        index_by_id.insert(supplier.id.clone(), idx);
        index_by_name.insert(supplier.name.to_lowercase(), idx);
    }

    for supplier in suppliers {
        let target = index_by_id[&supplier.id];
        for upstream in &supplier.upstream_suppliers {
            let weight = (upstream.supply_volume_pct / 100.0).clamp(0.0, 1.0);
            let source = match index_by_name.get(&upstream.name.to_lowercase()) {
                Some(idx) => *idx,
                None => {
                    let synthetic_id = format!("{}:upstream:{}", supplier.id, upstream.name);
                    let idx = graph.add_node(SupplyNode {
                        id: synthetic_id.clone(),
                        name: upstream.name.clone(),
                        kind: NodeKind::Supplier,
                        tier: supplier.tier + 1,
                        mitigation_score: DEFAULT_MITIGATION_SCORE,
                    });
                    index_by_id.insert(synthetic_id, idx);
                    idx
                }
            };
            graph.add_edge(source, target, weight);
        }
    }

    for supplier in suppliers {
        let idx = index_by_id[&supplier.id];
        let weight = (supplier.supply_volume_pct / 100.0).clamp(0.0, 1.0);
        if supplier.tier == 1 {
            graph.add_edge(idx, company_idx, weight);
        } else if graph.edges(idx).next().is_none() {
            // Unreferenced tier-2: keep it connected.
            graph.add_edge(idx, company_idx, weight);
        }
    }

    tracing::debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "Supply graph built"
    );

    SupplyGraph {
        graph,
        index_by_id,
        index_by_name,
        company: company_idx,
    }
}

/// Version-keyed cache for the derived graph.
///
/// The store bumps its supplier version on every mutation; a worker asks
/// the cache for the graph at the current version and rebuilds on miss.
/// Single writer, many readers.
#[derive(Default)]
pub struct GraphCache {
    inner: RwLock<Option<(u64, Arc<SupplyGraph>)>>,
}

impl GraphCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, version: u64) -> Option<Arc<SupplyGraph>> {
        let guard = self.inner.read().unwrap();
        match guard.as_ref() {
            Some((v, graph)) if *v == version => Some(graph.clone()),
            _ => None,
        }
    }

    pub fn put(&self, version: u64, graph: Arc<SupplyGraph>) {
        let mut guard = self.inner.write().unwrap();
        *guard = Some((version, graph));
    }
}

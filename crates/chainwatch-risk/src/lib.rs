//! Deterministic risk model: relevance filtering, composite scoring, and
//! graph propagation over the derived supplier graph.
//!
//! Everything in this crate is pure and synchronous; the pipeline workers
//! own all I/O and hand row snapshots in.

pub mod graph;
pub mod propagation;
pub mod relevance;
pub mod scoring;

pub use graph::{build_supply_graph, GraphCache, NodeKind, SupplyGraph, SupplyNode};
pub use propagation::propagate;
pub use relevance::{build_company_keywords, cosine_similarity, is_relevant};
pub use scoring::{calculate_risk_score, score_to_band, ScoreResult};

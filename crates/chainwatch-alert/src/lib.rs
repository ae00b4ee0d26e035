//! Alert generation: threshold gating, alternate-supplier ranking, and
//! recommendation synthesis.

pub mod generator;
pub mod recommend;

pub use generator::{alert_description, alert_title, build_alert, should_create_alert};
pub use recommend::{credit_rating_score, find_alternates, score_alternate};

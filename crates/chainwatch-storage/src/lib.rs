//! Persistence layer for the risk pipeline.
//!
//! A single SQLite database (WAL mode) accessed through SeaORM holds the
//! company profile, suppliers, raw articles, risk events, and alerts. The
//! [`RiskStore`] is the unified async access layer; migrations run on
//! connect. The supplier table carries a process-wide version counter so
//! the derived supply graph can be cached and invalidated on mutation.

pub mod entities;
pub mod store;


pub use store::{
    AlertFilter, AlertRow, ArticleRow, CompanyRow, RiskEventRow, RiskStore, SupplierRow,
};

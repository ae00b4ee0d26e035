use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

pub mod alert;
pub mod article;
pub mod company;
pub mod risk_event;
pub mod supplier;

pub use alert::{AlertFilter, AlertRow};
pub use article::ArticleRow;
pub use company::CompanyRow;
pub use risk_event::RiskEventRow;
pub use supplier::SupplierRow;

/// Unified access layer over the pipeline database (`chainwatch.db`).
///
/// All methods are `async fn` over SeaORM + SQLite. The store also carries
/// the supplier version counter: every mutation of the supplier collection
/// bumps it, which invalidates the cached derived supply graph.
pub struct RiskStore {
    pub(crate) db: DatabaseConnection,
    supplier_version: AtomicU64,
}

impl RiskStore {
    /// Connect to (and initialize) the database under `data_dir`.
    ///
    /// Runs all pending `sea-orm-migration` migrations so the schema is
    /// current before any worker starts.
    pub async fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let db_path = data_dir.join("chainwatch.db");
        let url = format!(
            "sqlite://{}?mode=rwc",
            db_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("non-UTF-8 data_dir path"))?
        );
        let db = Database::connect(&url).await?;

        db.execute_unprepared("PRAGMA journal_mode=WAL;").await?;

        Migrator::up(&db, None).await?;

        tracing::info!(path = %db_path.display(), "Initialized risk store");

        Ok(Self {
            db,
            supplier_version: AtomicU64::new(0),
        })
    }

    /// Underlying connection, for the per-domain store modules.
    pub(crate) fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Current version of the supplier collection. Bumped on every
    /// supplier mutation; the derived-graph cache keys off this value.
    pub fn supplier_version(&self) -> u64 {
        self.supplier_version.load(Ordering::Acquire)
    }

    pub(crate) fn bump_supplier_version(&self) {
        self.supplier_version.fetch_add(1, Ordering::AcqRel);
    }
}

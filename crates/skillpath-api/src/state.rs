//! Application state wiring the progression service to its adapters.
//!
//! AppState holds the concrete service used by both CLI and REST API.
//! `ProgressionService` is generic over catalog/store traits; AppState pins
//! it to the TOML file catalog and the SQLite progress store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use skillpath_core::service::ProgressionService;
use skillpath_infra::catalog::FileCatalog;
use skillpath_infra::config::{load_global_config, resolve_catalog_dir};
use skillpath_infra::filesystem::{ensure_data_dir, resolve_data_dir};
use skillpath_infra::sqlite::pool::database_url;
use skillpath_infra::sqlite::{DatabasePool, SqliteProgressStore};
use skillpath_types::config::GlobalConfig;

/// Progression service pinned to the infra implementations.
pub type ConcreteProgressionService = ProgressionService<FileCatalog, SqliteProgressStore>;

/// Shared application state.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub progression: Arc<ConcreteProgressionService>,
    pub config: Arc<GlobalConfig>,
    pub data_dir: PathBuf,
    pub catalog_dir: PathBuf,
}

impl AppState {
    /// Initialize the application state from the resolved data directory.
    pub async fn init() -> anyhow::Result<Self> {
        Self::open(&resolve_data_dir()).await
    }

    /// Wire the service against a specific data directory: read config,
    /// load the catalog, open the database.
    pub async fn open(data_dir: &Path) -> anyhow::Result<Self> {
        ensure_data_dir(data_dir).await?;

        let config = load_global_config(data_dir).await;
        let catalog_dir = resolve_catalog_dir(&config, data_dir);
        let catalog = FileCatalog::load(&catalog_dir).await?;

        let db_pool = DatabasePool::new(&database_url(data_dir)).await?;
        let store = SqliteProgressStore::new(db_pool);

        let progression = ProgressionService::new(catalog, store).with_config(&config);

        tracing::debug!(
            data_dir = %data_dir.display(),
            catalog_dir = %catalog_dir.display(),
            "application state initialized"
        );

        Ok(Self {
            progression: Arc::new(progression),
            config: Arc::new(config),
            data_dir: data_dir.to_path_buf(),
            catalog_dir,
        })
    }
}

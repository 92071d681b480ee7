//! CLI execution context.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use storefront_commerce::catalog::{Catalog, CatalogItem};
use storefront_commerce::checkout::{PaymentGateway, SimulatedGateway};
use storefront_commerce::orders::{KvOrderStore, OrderBook};
use storefront_commerce::Storefront;
use storefront_store::{FileLock, Store, StoreError};

use crate::config::{CliConfig, CONFIG_FILE_NAMES};
use crate::output::Output;

/// Store key of the stock-bearing catalog snapshot.
pub const CATALOG_KEY: &str = "catalog:items";

/// Lock held while a command changes the stored catalog.
pub const CATALOG_LOCK: &str = "catalog";

/// Execution context for CLI commands.
pub struct Context {
    /// CLI configuration.
    pub config: CliConfig,
    /// File the configuration was read from, if any.
    pub config_path: Option<PathBuf>,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
}

impl Context {
    /// Load context from config file.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let (config, config_path) = match config_path {
            Some(path) => {
                let path = PathBuf::from(path);
                (CliConfig::load(&path)?, Some(path))
            }
            // Try to find config in current directory or parent directories
            None => match Self::find_config(&cwd) {
                Some((path, config)) => (config, Some(path)),
                None => (CliConfig::default(), None),
            },
        };

        Ok(Self {
            config,
            config_path,
            output,
            cwd,
        })
    }

    /// Find config file in directory tree.
    fn find_config(start: &Path) -> Option<(PathBuf, CliConfig)> {
        let mut current = start.to_path_buf();
        loop {
            for name in CONFIG_FILE_NAMES {
                let config_path = current.join(name);
                if config_path.exists() {
                    match CliConfig::load(&config_path) {
                        Ok(config) => return Some((config_path, config)),
                        Err(e) => tracing::warn!(
                            path = %config_path.display(),
                            error = %format!("{:#}", e),
                            "skipping unreadable config"
                        ),
                    }
                }
            }

            if !current.pop() {
                break;
            }
        }

        None
    }

    /// Resolve a path relative to the working directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        if Path::new(path).is_absolute() {
            PathBuf::from(path)
        } else {
            self.cwd.join(path)
        }
    }

    /// Open the store named by the configuration.
    pub fn open_store(&self) -> Result<Arc<Store>> {
        let path = self.resolve_path(&self.config.store.path);
        self.output
            .debug(&format!("Opening store: {}", path.display()));
        let store = Store::open(&path)
            .with_context(|| format!("Failed to open store: {}", path.display()))?;
        Ok(Arc::new(store))
    }

    /// Load the catalog snapshot, seeding it from the config on first run.
    pub fn load_catalog(&self, store: &Store) -> Result<Arc<Catalog>> {
        let items = store.transaction(|tx| {
            if let Some(items) = tx.get::<Vec<CatalogItem>>(CATALOG_KEY)? {
                return Ok(items);
            }
            self.output.debug(&format!(
                "Seeding catalog with {} item(s) from config",
                self.config.catalog.len()
            ));
            tx.set(CATALOG_KEY, &self.config.catalog)?;
            Ok::<_, StoreError>(self.config.catalog.clone())
        })?;

        let catalog = Catalog::new(items).context("Invalid catalog")?;
        Ok(Arc::new(catalog))
    }

    /// Take the catalog lock and bring `catalog` up to date with the store.
    ///
    /// Other commands can change the stored stock between startup and now.
    /// Holding the returned guard until [`Context::save_catalog`] makes the
    /// read, the change and the write one step across processes.
    pub fn lock_catalog(&self, store: &Store, catalog: &Catalog) -> Result<Option<FileLock>> {
        let guard = store
            .named_lock(CATALOG_LOCK)
            .context("Failed to lock catalog")?;
        if let Some(items) = store.get::<Vec<CatalogItem>>(CATALOG_KEY)? {
            catalog.refresh(items).context("Invalid stored catalog")?;
        }
        Ok(guard)
    }

    /// Persist the catalog's current stock and reviews.
    ///
    /// Call with the guard from [`Context::lock_catalog`] held.
    pub fn save_catalog(&self, store: &Store, catalog: &Catalog) -> Result<()> {
        store
            .set(CATALOG_KEY, &catalog.list())
            .context("Failed to save catalog")
    }

    /// The simulated payment gateway described by the config.
    pub fn gateway(&self) -> Arc<dyn PaymentGateway> {
        self.config
            .gateway
            .declined_methods
            .iter()
            .fold(
                SimulatedGateway::new(Duration::from_millis(self.config.gateway.latency_ms)),
                |gateway, method| gateway.decline(method.clone()),
            )
            .shared()
    }

    pub fn order_book(&self, store: &Arc<Store>) -> OrderBook {
        OrderBook::new(Arc::new(KvOrderStore::new(Arc::clone(store))))
    }

    /// Wire up a storefront over the configured store.
    pub fn storefront(&self) -> Result<(Storefront, Arc<Store>)> {
        let store = self.open_store()?;
        let catalog = self.load_catalog(&store)?;
        let shop = Storefront::new(
            self.config.settings.clone(),
            catalog,
            self.gateway(),
            self.order_book(&store),
        )
        .context("Invalid shop settings")?;
        Ok((shop, store))
    }
}

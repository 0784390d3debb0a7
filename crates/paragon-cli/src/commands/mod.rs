//! Subcommands and the helpers they share.

pub mod batch;
pub mod config;
pub mod pantry;
pub mod process;
pub mod resolve;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use paragon_core::models::config::ParagonConfig;
use paragon_core::store::{MemoryStore, ProductStore, SqliteStore};
use paragon_core::ReceiptPipeline;

use crate::llm::ChatCompletionsClient;

/// Load the config given on the command line, else the user config file,
/// else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<ParagonConfig> {
    if let Some(path) = config_path {
        return Ok(ParagonConfig::from_file(Path::new(path))?);
    }

    let default_path = config::default_config_path();
    if default_path.exists() {
        debug!("Loading config from {}", default_path.display());
        Ok(ParagonConfig::from_file(&default_path)?)
    } else {
        Ok(ParagonConfig::default())
    }
}

/// Open the SQLite database at `db`, or fall back to a throwaway in-memory store.
pub fn open_store(db: Option<&PathBuf>) -> anyhow::Result<Arc<dyn ProductStore>> {
    match db {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            debug!("Opening product database {}", path.display());
            Ok(Arc::new(SqliteStore::open(path)?))
        }
        None => Ok(Arc::new(MemoryStore::new())),
    }
}

/// Open the configured database, overridden by `db` when given.
pub fn open_database(config: &ParagonConfig, db: Option<PathBuf>) -> anyhow::Result<Arc<dyn ProductStore>> {
    let path = db.unwrap_or_else(|| config.store.db_path.clone());
    open_store(Some(&path))
}

/// Build the ingestion pipeline, wiring in the model service unless disabled.
pub fn build_pipeline(
    config: &ParagonConfig,
    store: Arc<dyn ProductStore>,
    no_llm: bool,
) -> anyhow::Result<ReceiptPipeline> {
    let pipeline = ReceiptPipeline::new(config, store);
    if no_llm || !config.generative.enabled {
        debug!("Generative extraction disabled");
        return Ok(pipeline);
    }

    match ChatCompletionsClient::from_config(&config.generative) {
        Ok(client) => Ok(pipeline.with_model(config, Arc::new(client))),
        Err(e) => {
            warn!("Could not set up generative model client: {}", e);
            Ok(pipeline)
        }
    }
}

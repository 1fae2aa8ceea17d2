use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

use crate::store::database_path;

/// Default database name
pub const DEFAULT_DATABASE: &str = "galaxyStations";

/// Default collection name
pub const DEFAULT_COLLECTION: &str = "galaxyStations";

/// Where the document store lives and which collection to read
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// Directory holding one database file per database name
    pub endpoint: PathBuf,
    pub database: String,
    pub collection: String,
}

impl StoreConfig {
    pub fn new(endpoint: PathBuf, database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            endpoint,
            database: database.into(),
            collection: collection.into(),
        }
    }

    /// Resolve the endpoint, falling back to the platform data directory
    pub fn resolve(
        endpoint: Option<PathBuf>,
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> Result<Self> {
        let endpoint = match endpoint {
            Some(dir) => dir,
            None => default_endpoint()?,
        };
        Ok(Self::new(endpoint, database, collection))
    }

    /// Path of the configured database file
    pub fn database_path(&self) -> PathBuf {
        database_path(&self.endpoint, &self.database)
    }
}

/// Platform data directory for the store, e.g. `~/.local/share/powerplay-extract`
pub fn default_endpoint() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("", "", "powerplay-extract")
        .context("Could not determine data directory")?;
    Ok(proj_dirs.data_dir().to_path_buf())
}

//! JSON file backed collaborators used by the runner binary

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::{HomologationLookup, ItemKind, Kit, KitCatalogProvider, VehicleAccessoryProvider, VehicleRecord};
use crate::error::LookupError;
use crate::matching::{normalize, NormalizedKey};

async fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(value)
}

/// Kit catalog stored as a JSON array of kits; a missing file is an empty catalog
pub struct JsonFileCatalog {
    path: PathBuf,
}

impl JsonFileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl KitCatalogProvider for JsonFileCatalog {
    async fn kits(&self) -> Result<Vec<Kit>> {
        if !self.path.exists() {
            info!("Kit catalog {} not found, no kits available", self.path.display());
            return Ok(Vec::new());
        }
        let kits: Vec<Kit> = read_json(&self.path).await?;
        debug!("Loaded {} kits from {}", kits.len(), self.path.display());
        Ok(kits)
    }
}

/// Vehicle records stored as a JSON array
pub struct JsonFileVehicles {
    path: PathBuf,
}

impl JsonFileVehicles {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl VehicleAccessoryProvider for JsonFileVehicles {
    async fn vehicles(&self) -> Result<Vec<VehicleRecord>> {
        let vehicles: Vec<VehicleRecord> = read_json(&self.path).await?;
        debug!("Loaded {} vehicles from {}", vehicles.len(), self.path.display());
        Ok(vehicles)
    }
}

/// One row of the homologation export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomologationRecord {
    pub name: String,
    pub kind: ItemKind,
    pub homologated: bool,
}

/// Homologation export stored as a JSON array of records.
///
/// The file is read on first lookup. Items absent from it stay pending.
pub struct JsonFileHomologation {
    path: PathBuf,
    table: OnceCell<HashMap<(NormalizedKey, ItemKind), bool>>,
}

impl JsonFileHomologation {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            table: OnceCell::new(),
        }
    }

    async fn table(&self) -> std::result::Result<&HashMap<(NormalizedKey, ItemKind), bool>, LookupError> {
        self.table
            .get_or_try_init(|| async {
                let records: Vec<HomologationRecord> = read_json(&self.path)
                    .await
                    .map_err(|e| LookupError::Unavailable(format!("{:#}", e)))?;
                Ok::<_, LookupError>(
                    records
                        .into_iter()
                        .map(|r| ((normalize(&r.name), r.kind), r.homologated))
                        .collect(),
                )
            })
            .await
    }
}

#[async_trait]
impl HomologationLookup for JsonFileHomologation {
    async fn lookup(&self, key: &NormalizedKey, kind: ItemKind) -> std::result::Result<Option<bool>, LookupError> {
        let table = self.table().await?;
        Ok(table.get(&(key.clone(), kind)).copied())
    }
}

//! Catalog Module
//!
//! Records read from the surrounding application (kits, vehicles) and the
//! collaborator ports the engine pulls them through.

mod file;
mod memory;

pub use file::{JsonFileCatalog, JsonFileHomologation, JsonFileVehicles};
pub use memory::{InMemoryCatalog, InMemoryHomologation, InMemoryVehicles};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LookupError;
use crate::matching::{normalize, NormalizedKey};

/// Kind of line item in a kit or vehicle record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Equipment,
    Accessory,
    Supply,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Equipment => "equipment",
            ItemKind::Accessory => "accessory",
            ItemKind::Supply => "supply",
        }
    }
}

fn default_quantity() -> u32 {
    1
}

/// A line item as written by the upstream records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    #[serde(alias = "name")]
    pub raw_name: String,
    #[serde(default = "default_quantity", deserialize_with = "quantity_at_least_one")]
    pub quantity: u32,
    pub kind: ItemKind,
}

fn quantity_at_least_one<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = u32::deserialize(deserializer)?;
    Ok(raw.max(1))
}

impl Item {
    pub fn new(raw_name: impl Into<String>, quantity: u32, kind: ItemKind) -> Self {
        Self {
            raw_name: raw_name.into(),
            quantity: quantity.max(1),
            kind,
        }
    }

    pub fn equipment(raw_name: impl Into<String>) -> Self {
        Self::new(raw_name, 1, ItemKind::Equipment)
    }

    pub fn accessory(raw_name: impl Into<String>) -> Self {
        Self::new(raw_name, 1, ItemKind::Accessory)
    }

    pub fn supply(raw_name: impl Into<String>) -> Self {
        Self::new(raw_name, 1, ItemKind::Supply)
    }

    pub fn key(&self) -> NormalizedKey {
        normalize(&self.raw_name)
    }
}

/// An installation kit from the external kit catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kit {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub equipment: Vec<Item>,
    #[serde(default)]
    pub accessories: Vec<Item>,
    #[serde(default)]
    pub supplies: Vec<Item>,
}

impl Kit {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            equipment: Vec::new(),
            accessories: Vec::new(),
            supplies: Vec::new(),
        }
    }

    pub fn with_equipment(mut self, raw_name: impl Into<String>) -> Self {
        self.equipment.push(Item::equipment(raw_name));
        self
    }

    pub fn with_accessory(mut self, raw_name: impl Into<String>) -> Self {
        self.accessories.push(Item::accessory(raw_name));
        self
    }

    pub fn with_supply(mut self, raw_name: impl Into<String>) -> Self {
        self.supplies.push(Item::supply(raw_name));
        self
    }
}

/// A vehicle as supplied by the vehicle/customer records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleRecord {
    pub plate: String,
    #[serde(default)]
    pub usage_type: Option<String>,
    /// Accessories contracted at customer level
    #[serde(default)]
    pub customer_accessories: Vec<String>,
    /// Accessories recorded against this vehicle
    #[serde(default)]
    pub vehicle_accessories: Vec<String>,
}

impl VehicleRecord {
    pub fn new(plate: impl Into<String>) -> Self {
        Self {
            plate: plate.into(),
            usage_type: None,
            customer_accessories: Vec::new(),
            vehicle_accessories: Vec::new(),
        }
    }

    pub fn with_usage_type(mut self, usage_type: impl Into<String>) -> Self {
        self.usage_type = Some(usage_type.into());
        self
    }

    pub fn with_accessories<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.vehicle_accessories.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_customer_accessories<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.customer_accessories.extend(names.into_iter().map(Into::into));
        self
    }

    /// Accessory names used for kit scoring: customer level first, then vehicle level
    pub fn all_accessories(&self) -> Vec<String> {
        self.customer_accessories
            .iter()
            .chain(self.vehicle_accessories.iter())
            .cloned()
            .collect()
    }
}

/// Source of the current kit catalog
#[async_trait]
pub trait KitCatalogProvider: Send + Sync {
    async fn kits(&self) -> Result<Vec<Kit>>;
}

/// Source of the vehicles under review
#[async_trait]
pub trait VehicleAccessoryProvider: Send + Sync {
    async fn vehicles(&self) -> Result<Vec<VehicleRecord>>;
}

/// Per-item homologation status service.
///
/// `Ok(None)` means the answer is still pending.
#[async_trait]
pub trait HomologationLookup: Send + Sync {
    async fn lookup(&self, key: &NormalizedKey, kind: ItemKind) -> std::result::Result<Option<bool>, LookupError>;
}

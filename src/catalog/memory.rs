//! In-memory collaborators for embedding and tests

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{HomologationLookup, ItemKind, Kit, KitCatalogProvider, VehicleAccessoryProvider, VehicleRecord};
use crate::error::LookupError;
use crate::matching::{normalize, NormalizedKey};

/// Kit catalog held in memory; replace it to simulate a catalog refresh
#[derive(Default)]
pub struct InMemoryCatalog {
    kits: Arc<RwLock<Vec<Kit>>>,
}

impl InMemoryCatalog {
    pub fn new(kits: Vec<Kit>) -> Self {
        Self {
            kits: Arc::new(RwLock::new(kits)),
        }
    }

    pub async fn replace(&self, kits: Vec<Kit>) {
        *self.kits.write().await = kits;
    }
}

#[async_trait]
impl KitCatalogProvider for InMemoryCatalog {
    async fn kits(&self) -> Result<Vec<Kit>> {
        Ok(self.kits.read().await.clone())
    }
}

/// Vehicle records held in memory
#[derive(Default)]
pub struct InMemoryVehicles {
    vehicles: Arc<RwLock<Vec<VehicleRecord>>>,
}

impl InMemoryVehicles {
    pub fn new(vehicles: Vec<VehicleRecord>) -> Self {
        Self {
            vehicles: Arc::new(RwLock::new(vehicles)),
        }
    }

    pub async fn replace(&self, vehicles: Vec<VehicleRecord>) {
        *self.vehicles.write().await = vehicles;
    }

    /// Insert or replace a vehicle by plate
    pub async fn upsert(&self, vehicle: VehicleRecord) {
        let mut vehicles = self.vehicles.write().await;
        match vehicles.iter_mut().find(|v| v.plate == vehicle.plate) {
            Some(existing) => *existing = vehicle,
            None => vehicles.push(vehicle),
        }
    }
}

#[async_trait]
impl VehicleAccessoryProvider for InMemoryVehicles {
    async fn vehicles(&self) -> Result<Vec<VehicleRecord>> {
        Ok(self.vehicles.read().await.clone())
    }
}

type Answer = std::result::Result<Option<bool>, LookupError>;

/// Homologation table held in memory.
///
/// Unknown items answer `Ok(None)` (pending). Every call is counted so
/// callers can observe how many lookups reached the backend.
#[derive(Default)]
pub struct InMemoryHomologation {
    answers: RwLock<HashMap<(NormalizedKey, ItemKind), Answer>>,
    calls: AtomicUsize,
}

impl InMemoryHomologation {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, raw_name: &str, kind: ItemKind, homologated: bool) {
        self.answers
            .write()
            .await
            .insert((normalize(raw_name), kind), Ok(Some(homologated)));
    }

    pub async fn set_pending(&self, raw_name: &str, kind: ItemKind) {
        self.answers.write().await.insert((normalize(raw_name), kind), Ok(None));
    }

    pub async fn set_failing(&self, raw_name: &str, kind: ItemKind, error: LookupError) {
        self.answers.write().await.insert((normalize(raw_name), kind), Err(error));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HomologationLookup for InMemoryHomologation {
    async fn lookup(&self, key: &NormalizedKey, kind: ItemKind) -> Answer {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let answers = self.answers.read().await;
        answers.get(&(key.clone(), kind)).cloned().unwrap_or(Ok(None))
    }
}

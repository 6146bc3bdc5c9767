//! Scheduling Session
//!
//! Wires the collaborators to the engine for one operator session: pulls
//! kits and vehicles, keeps the kit suggestions per vehicle (last write
//! wins) and drives the readiness aggregator as selections change.

use anyhow::Result;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog::{HomologationLookup, ItemKind, Kit, KitCatalogProvider, VehicleAccessoryProvider, VehicleRecord};
use crate::classify::CategoryRules;
use crate::config::RulesConfig;
use crate::error::WorkflowError;
use crate::matching::normalize;
use crate::ranking::{score_kits_with, CompatibilityResult};
use crate::readiness::{AccessorySelection, Generation, ReadinessAggregator, ReadinessVerdict};
use crate::workflow::{Stage, VehicleWorkflow};

/// What the scheduling view shows for one vehicle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    pub plate: String,
    pub suggestions: Vec<CompatibilityResult>,
    pub verdict: ReadinessVerdict,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub kit_count: usize,
    pub vehicles: Vec<VehicleSnapshot>,
}

/// Locks are always taken in the order `vehicles`, `kits`, `suggestions`.
pub struct SchedulingSession {
    id: Uuid,
    catalog: Arc<dyn KitCatalogProvider>,
    vehicle_source: Arc<dyn VehicleAccessoryProvider>,
    rules: CategoryRules,
    readiness: ReadinessAggregator,
    kits: RwLock<Vec<Kit>>,
    vehicles: RwLock<Vec<VehicleRecord>>,
    suggestions: RwLock<HashMap<String, Vec<CompatibilityResult>>>,
}

impl SchedulingSession {
    pub fn new(
        catalog: Arc<dyn KitCatalogProvider>,
        vehicle_source: Arc<dyn VehicleAccessoryProvider>,
        lookup: Arc<dyn HomologationLookup>,
    ) -> Self {
        Self::with_rules(catalog, vehicle_source, lookup, &RulesConfig::default())
    }

    pub fn with_rules(
        catalog: Arc<dyn KitCatalogProvider>,
        vehicle_source: Arc<dyn VehicleAccessoryProvider>,
        lookup: Arc<dyn HomologationLookup>,
        rules: &RulesConfig,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            catalog,
            vehicle_source,
            rules: CategoryRules::from_config(rules),
            readiness: ReadinessAggregator::new(lookup).with_module_names(&rules.module_names),
            kits: RwLock::new(Vec::new()),
            vehicles: RwLock::new(Vec::new()),
            suggestions: RwLock::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn readiness(&self) -> &ReadinessAggregator {
        &self.readiness
    }

    /// Pull the catalog; a failing provider leaves the session with no kits
    async fn load_kits(&self) -> usize {
        let kits = match self.catalog.kits().await {
            Ok(kits) => kits,
            Err(e) => {
                warn!("[{}] Kit catalog unavailable: {:#}. No kits offered", self.id, e);
                Vec::new()
            }
        };
        let count = kits.len();
        *self.kits.write().await = kits;
        count
    }

    fn score(&self, kits: &[Kit], vehicle: &VehicleRecord) -> Vec<CompatibilityResult> {
        let accessories = vehicle.all_accessories();
        score_kits_with(&self.rules, &accessories, kits, vehicle.usage_type.as_deref())
            .into_iter()
            .map(|(kit, match_count)| CompatibilityResult {
                kit_id: kit.id.clone(),
                match_count,
            })
            .collect()
    }

    async fn rescore_all(&self) {
        let vehicles = self.vehicles.read().await;
        let kits = self.kits.read().await;
        let mut suggestions = self.suggestions.write().await;
        suggestions.clear();
        for vehicle in vehicles.iter() {
            suggestions.insert(vehicle.plate.clone(), self.score(&kits, vehicle));
        }
    }

    /// Reload everything and recompute every vehicle
    pub async fn refresh(&self) -> Result<SessionReport> {
        let kit_count = self.load_kits().await;
        let vehicles = self.vehicle_source.vehicles().await?;
        info!("[{}] Evaluating {} vehicles against {} kits", self.id, vehicles.len(), kit_count);

        let batch: Vec<(String, AccessorySelection)> = vehicles
            .iter()
            .map(|v| (v.plate.clone(), AccessorySelection::from(v)))
            .collect();

        *self.vehicles.write().await = vehicles;
        self.rescore_all().await;
        let verdicts = self.readiness.recompute_all(&batch).await;

        let suggestions = self.suggestions.read().await;
        let snapshots = verdicts
            .into_iter()
            .map(|verdict| VehicleSnapshot {
                plate: verdict.vehicle_plate.clone(),
                suggestions: suggestions.get(&verdict.vehicle_plate).cloned().unwrap_or_default(),
                verdict,
            })
            .collect();

        Ok(SessionReport {
            session_id: self.id,
            kit_count,
            vehicles: snapshots,
        })
    }

    /// Re-read the kit catalog and rescore; readiness does not depend on kits
    pub async fn refresh_catalog(&self) -> usize {
        let count = self.load_kits().await;
        self.rescore_all().await;
        debug!("[{}] Catalog refreshed, {} kits", self.id, count);
        count
    }

    /// Operator edited a vehicle's accessories.
    ///
    /// The vehicle lock is held until the suggestions are written and the
    /// readiness generation is reserved, so concurrent edits of one vehicle
    /// settle on the last edit for both.
    pub async fn update_accessories(&self, plate: &str, selection: AccessorySelection) -> VehicleSnapshot {
        let mut vehicles = self.vehicles.write().await;
        let index = match vehicles.iter().position(|v| v.plate == plate) {
            Some(i) => i,
            None => {
                vehicles.push(VehicleRecord::new(plate));
                vehicles.len() - 1
            }
        };
        let record = &mut vehicles[index];
        record.customer_accessories = selection.customer.clone();
        record.vehicle_accessories = selection.vehicle.clone();

        let suggestions = {
            let kits = self.kits.read().await;
            self.score(&kits, record)
        };
        self.suggestions
            .write()
            .await
            .insert(plate.to_string(), suggestions.clone());
        let generation = self.readiness.reserve(plate).await;
        drop(vehicles);

        let verdict = self.readiness.recompute_reserved(plate, generation, &selection).await;
        VehicleSnapshot {
            plate: plate.to_string(),
            suggestions,
            verdict,
        }
    }

    /// Change the usage type of a vehicle and rescore it
    pub async fn set_usage_type(&self, plate: &str, usage_type: Option<String>) -> Vec<CompatibilityResult> {
        let mut vehicles = self.vehicles.write().await;
        let Some(record) = vehicles.iter_mut().find(|v| v.plate == plate) else {
            return Vec::new();
        };
        record.usage_type = usage_type;

        let suggestions = {
            let kits = self.kits.read().await;
            self.score(&kits, record)
        };
        self.suggestions
            .write()
            .await
            .insert(plate.to_string(), suggestions.clone());
        suggestions
    }

    /// An item's homologation changed upstream: drop its cached answer and
    /// recompute every vehicle that tracks it
    pub async fn homologation_changed(&self, raw_name: &str, kind: ItemKind) -> Vec<ReadinessVerdict> {
        let key = normalize(raw_name);
        self.readiness.cache().invalidate(&key, kind).await;

        let affected: Vec<(String, AccessorySelection, Generation)> = {
            let vehicles = self.vehicles.read().await;
            let mut affected = Vec::new();
            for vehicle in vehicles.iter() {
                let selection = AccessorySelection::from(vehicle);
                let tracks_item = self
                    .readiness
                    .tracked_items(&selection)
                    .iter()
                    .any(|item| item.key == key && item.kind == kind);
                if tracks_item {
                    let generation = self.readiness.reserve(&vehicle.plate).await;
                    affected.push((vehicle.plate.clone(), selection, generation));
                }
            }
            affected
        };
        info!("[{}] Homologation of {} changed, {} vehicles affected", self.id, key, affected.len());

        join_all(
            affected
                .iter()
                .map(|(plate, selection, generation)| self.readiness.recompute_reserved(plate, *generation, selection)),
        )
        .await
    }

    pub async fn suggestions(&self, plate: &str) -> Vec<CompatibilityResult> {
        self.suggestions.read().await.get(plate).cloned().unwrap_or_default()
    }

    /// Suggested kits in rank order
    pub async fn ranked_kits(&self, plate: &str) -> Vec<Kit> {
        let suggestions = self.suggestions(plate).await;
        let kits = self.kits.read().await;
        suggestions
            .iter()
            .filter_map(|s| kits.iter().find(|k| k.id == s.kit_id).cloned())
            .collect()
    }

    pub async fn is_ready(&self, plate: &str) -> bool {
        self.readiness.is_ready(plate).await
    }

    /// Current verdict; a vehicle never evaluated gets the not-ready placeholder
    pub async fn verdict(&self, plate: &str) -> ReadinessVerdict {
        self.readiness
            .verdict(plate)
            .await
            .unwrap_or_else(|| ReadinessVerdict::unknown(plate))
    }

    /// Advance a vehicle's workflow using the current readiness verdict
    pub async fn advance(&self, workflow: &mut VehicleWorkflow) -> Result<Stage, WorkflowError> {
        let ready = self.is_ready(&workflow.plate).await;
        workflow.advance(ready)
    }
}

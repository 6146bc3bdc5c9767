//! Readiness Module
//!
//! Aggregates per-item homologation status into the per-vehicle "ready to
//! schedule" verdict. Fail-closed: anything without a definite positive
//! answer blocks the vehicle.

mod aggregator;
mod cache;

pub use aggregator::{Generation, ReadinessAggregator};
pub use cache::{CachedLookup, StatusCache, StatusKey};

use serde::{Deserialize, Serialize};

use crate::catalog::{ItemKind, VehicleRecord};
use crate::matching::NormalizedKey;

/// The accessory names currently selected for one vehicle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessorySelection {
    /// Contracted at customer level
    pub customer: Vec<String>,
    /// Recorded against the vehicle itself
    pub vehicle: Vec<String>,
}

impl AccessorySelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selection with vehicle-level accessories only
    pub fn vehicle_only<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            customer: Vec::new(),
            vehicle: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_customer<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.customer.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_vehicle<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.vehicle.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.customer.is_empty() && self.vehicle.is_empty()
    }
}

impl From<&VehicleRecord> for AccessorySelection {
    fn from(record: &VehicleRecord) -> Self {
        Self {
            customer: record.customer_accessories.clone(),
            vehicle: record.vehicle_accessories.clone(),
        }
    }
}

/// One accessory subject to the readiness gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedItem {
    /// First spelling seen in the selection
    pub name: String,
    pub key: NormalizedKey,
    pub kind: ItemKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessVerdict {
    pub vehicle_plate: String,
    pub ready: bool,
    /// Number of accessories the gate looked at
    pub tracked: usize,
    /// Items without a definite answer (pending, unknown or failed lookup)
    pub pending: Vec<String>,
    /// Items explicitly not homologated
    pub blocking: Vec<String>,
}

impl ReadinessVerdict {
    /// Verdict for a vehicle nothing is known about
    pub fn unknown(vehicle_plate: impl Into<String>) -> Self {
        Self {
            vehicle_plate: vehicle_plate.into(),
            ready: false,
            tracked: 0,
            pending: Vec::new(),
            blocking: Vec::new(),
        }
    }
}

//! Kit Compatibility & Readiness Engine
//!
//! Matching and gating core for a fleet-installation workflow:
//! - Free-text item name normalization
//! - Permissive equivalence matching with a curated synonym table
//! - Kit/vehicle category classification
//! - Kit scoring and ranking against a vehicle's accessories
//! - Fail-closed per-vehicle homologation readiness

pub mod catalog;
pub mod classify;
pub mod config;
pub mod error;
pub mod matching;
pub mod ranking;
pub mod readiness;
pub mod session;
pub mod telemetry;
pub mod workflow;

// Re-exports for convenience
pub use catalog::{Item, ItemKind, Kit, VehicleRecord};
pub use classify::{is_category_compatible, kit_category, usage_category, KitCategory, UsageCategory};
pub use matching::{are_equivalent, extract_quantity, normalize, NormalizedKey};
pub use ranking::{rank_kits, score_kits, CompatibilityResult};
pub use readiness::{AccessorySelection, ReadinessAggregator, ReadinessVerdict};
pub use session::SchedulingSession;

//! Category Classifier
//!
//! Derives a kit's functional category from its equipment and a vehicle's
//! required category from its usage-type tag, and decides whether the two
//! are compatible.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::catalog::Kit;
use crate::config::RulesConfig;
use crate::matching::{normalize, NormalizedKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KitCategory {
    Telemetry,
    Tracking,
    Unclassified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageCategory {
    Telemetry,
    TrackingOrCopilot,
    Other,
}

/// Marker and usage-type tables
#[derive(Debug, Clone)]
pub struct CategoryRules {
    telemetry_markers: Vec<NormalizedKey>,
    tracking_markers: Vec<NormalizedKey>,
    telemetry_usage_types: Vec<String>,
    tracking_usage_types: Vec<String>,
}

fn usage_tag(raw: &str) -> String {
    raw.trim().to_lowercase()
}

impl CategoryRules {
    pub fn from_config(rules: &RulesConfig) -> Self {
        let markers = |names: &[String]| {
            names
                .iter()
                .map(|n| normalize(n))
                .filter(|k| !k.is_empty())
                .collect::<Vec<_>>()
        };
        Self {
            telemetry_markers: markers(&rules.telemetry_markers),
            tracking_markers: markers(&rules.tracking_markers),
            telemetry_usage_types: rules.telemetry_usage_types.iter().map(|t| usage_tag(t)).collect(),
            tracking_usage_types: rules.tracking_usage_types.iter().map(|t| usage_tag(t)).collect(),
        }
    }

    fn has_marker(kit: &Kit, markers: &[NormalizedKey]) -> bool {
        kit.equipment.iter().any(|item| {
            let key = item.key();
            markers.iter().any(|marker| key.contains(marker.as_str()))
        })
    }

    /// Telemetry marker is checked first and wins if both are present
    pub fn kit_category(&self, kit: &Kit) -> KitCategory {
        if Self::has_marker(kit, &self.telemetry_markers) {
            KitCategory::Telemetry
        } else if Self::has_marker(kit, &self.tracking_markers) {
            KitCategory::Tracking
        } else {
            KitCategory::Unclassified
        }
    }

    pub fn usage_category(&self, usage_type: Option<&str>) -> UsageCategory {
        let Some(tag) = usage_type.map(usage_tag) else {
            return UsageCategory::Other;
        };
        if self.telemetry_usage_types.contains(&tag) {
            UsageCategory::Telemetry
        } else if self.tracking_usage_types.contains(&tag) {
            UsageCategory::TrackingOrCopilot
        } else {
            UsageCategory::Other
        }
    }

    pub fn is_category_compatible(&self, kit: &Kit, usage_type: Option<&str>) -> bool {
        categories_compatible(self.kit_category(kit), self.usage_category(usage_type))
    }
}

impl Default for CategoryRules {
    fn default() -> Self {
        Self::from_config(&RulesConfig::default())
    }
}

lazy_static! {
    static ref DEFAULT_RULES: CategoryRules = CategoryRules::default();
}

/// Shared rules built from the default configuration
pub fn default_rules() -> &'static CategoryRules {
    &DEFAULT_RULES
}

/// Compatibility table between a kit category and a vehicle usage category
pub fn categories_compatible(kit: KitCategory, usage: UsageCategory) -> bool {
    match (kit, usage) {
        (KitCategory::Unclassified, _) => true,
        (_, UsageCategory::Other) => true,
        (KitCategory::Telemetry, UsageCategory::Telemetry) => true,
        (KitCategory::Tracking, UsageCategory::TrackingOrCopilot) => true,
        _ => false,
    }
}

pub fn kit_category(kit: &Kit) -> KitCategory {
    DEFAULT_RULES.kit_category(kit)
}

pub fn usage_category(usage_type: Option<&str>) -> UsageCategory {
    DEFAULT_RULES.usage_category(usage_type)
}

pub fn is_category_compatible(kit: &Kit, usage_type: Option<&str>) -> bool {
    DEFAULT_RULES.is_category_compatible(kit, usage_type)
}

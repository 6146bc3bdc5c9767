//! Compatibility Scorer & Ranker
//!
//! Counts how many of a vehicle's accessories a kit covers and ranks the
//! category-compatible kits by that count.

use serde::{Deserialize, Serialize};

use crate::catalog::Kit;
use crate::classify::{default_rules, CategoryRules};
use crate::matching::{are_equivalent_keys, normalize, NormalizedKey};

/// Packaging and fastener terms ignored on both sides of a comparison
pub const EXCLUDED_TERMS: &[&str] = &["FITA", "ABRACADEIRA", "ENFORCA GATO", "PARAFUSO", "PORCA", "ARRUELA"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityResult {
    pub kit_id: String,
    pub match_count: usize,
}

/// True for keys that take part in scoring
pub fn is_relevant(key: &NormalizedKey) -> bool {
    !key.is_empty() && !EXCLUDED_TERMS.iter().any(|term| key.contains(term))
}

/// Normalized keys of the kit accessories that count for scoring
pub fn relevant_accessories(kit: &Kit) -> Vec<NormalizedKey> {
    kit.accessories
        .iter()
        .map(|item| item.key())
        .filter(is_relevant)
        .collect()
}

/// Greedy hit count of `vehicle` keys against `kit_items`.
///
/// Each vehicle accessory takes the first unused matching kit item in
/// catalog order. The result never exceeds `kit_items.len()`.
pub fn count_matches(vehicle: &[NormalizedKey], kit_items: &[NormalizedKey]) -> usize {
    let mut used = vec![false; kit_items.len()];
    let mut hits = 0;

    for accessory in vehicle {
        let slot = kit_items
            .iter()
            .enumerate()
            .find(|(i, item)| !used[*i] && are_equivalent_keys(accessory, item))
            .map(|(i, _)| i);
        if let Some(i) = slot {
            used[i] = true;
            hits += 1;
        }
    }

    hits
}

/// Vehicle accessories prepared for scoring
fn vehicle_keys<S: AsRef<str>>(vehicle_accessories: &[S]) -> Vec<NormalizedKey> {
    vehicle_accessories
        .iter()
        .map(|name| normalize(name.as_ref()))
        .filter(is_relevant)
        .collect()
}

/// Score and rank with explicit category rules
pub fn score_kits_with<'a, S: AsRef<str>>(
    rules: &CategoryRules,
    vehicle_accessories: &[S],
    catalog: &'a [Kit],
    usage_type: Option<&str>,
) -> Vec<(&'a Kit, usize)> {
    if vehicle_accessories.is_empty() {
        return Vec::new();
    }
    let vehicle = vehicle_keys(vehicle_accessories);

    let mut scored: Vec<(&Kit, usize)> = catalog
        .iter()
        .filter(|kit| rules.is_category_compatible(kit, usage_type))
        .map(|kit| (kit, count_matches(&vehicle, &relevant_accessories(kit))))
        .filter(|(_, hits)| *hits > 0)
        .collect();

    // stable: ties keep catalog order
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored
}

/// Ranked kits with their match counts
pub fn score_kits<S: AsRef<str>>(
    vehicle_accessories: &[S],
    catalog: &[Kit],
    usage_type: Option<&str>,
) -> Vec<CompatibilityResult> {
    score_kits_with(default_rules(), vehicle_accessories, catalog, usage_type)
        .into_iter()
        .map(|(kit, match_count)| CompatibilityResult {
            kit_id: kit.id.clone(),
            match_count,
        })
        .collect()
}

/// Kits that cover at least one vehicle accessory, best first
pub fn rank_kits<'a, S: AsRef<str>>(
    vehicle_accessories: &[S],
    catalog: &'a [Kit],
    usage_type: Option<&str>,
) -> Vec<&'a Kit> {
    score_kits_with(default_rules(), vehicle_accessories, catalog, usage_type)
        .into_iter()
        .map(|(kit, _)| kit)
        .collect()
}

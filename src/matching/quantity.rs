use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::normalize::{normalize, NormalizedKey, QUANTITY_SUFFIX};

/// Read the `(Nx)` multiplier of a formatted name, defaulting to 1.
///
/// Display and aggregation only; matching ignores quantities.
pub fn extract_quantity(formatted: &str) -> u32 {
    QUANTITY_SUFFIX
        .captures(formatted)
        .and_then(|caps| caps.get(1))
        .and_then(|digits| digits.as_str().parse::<u32>().ok())
        .filter(|&qty| qty > 0)
        .unwrap_or(1)
}

/// Render a name the way the upstream forms write it: `"NAME (Nx)"`.
pub fn format_with_quantity(name: &str, quantity: u32) -> String {
    let base = QUANTITY_SUFFIX.replace(name, "");
    let base = base.trim();
    if quantity > 1 {
        format!("{} ({}x)", base, quantity)
    } else {
        base.to_string()
    }
}

/// One aggregated display line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityLine {
    /// First spelling seen, without its multiplier
    pub name: String,
    pub key: NormalizedKey,
    pub quantity: u32,
}

/// Group formatted names by key and sum their multipliers.
///
/// Blank names are skipped. Output keeps first-seen order.
pub fn merge_quantities<S: AsRef<str>>(names: &[S]) -> Vec<QuantityLine> {
    let mut lines: Vec<QuantityLine> = Vec::new();
    let mut index: HashMap<NormalizedKey, usize> = HashMap::new();

    for raw in names {
        let raw = raw.as_ref();
        let key = normalize(raw);
        if key.is_empty() {
            continue;
        }
        let quantity = extract_quantity(raw);
        match index.get(&key) {
            Some(&pos) => lines[pos].quantity = lines[pos].quantity.saturating_add(quantity),
            None => {
                index.insert(key.clone(), lines.len());
                lines.push(QuantityLine {
                    name: QUANTITY_SUFFIX.replace(raw, "").trim().to_string(),
                    key,
                    quantity,
                });
            }
        }
    }

    lines
}

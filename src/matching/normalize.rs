//! Name Normalizer
//!
//! Turns a raw upstream item name into the comparison key used by every
//! matching decision in the engine.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    /// Trailing `(Nx)` multiplier as written by the upstream forms
    pub(crate) static ref QUANTITY_SUFFIX: Regex =
        Regex::new(r"(?i)\s*\(\s*(\d+)\s*x\s*\)\s*$").unwrap();
}

/// Canonical comparison key for an item name.
///
/// An empty key never matches anything, including another empty key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedKey(String);

impl NormalizedKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Substring test against another key or a raw fragment
    pub fn contains(&self, fragment: &str) -> bool {
        !fragment.is_empty() && self.0.contains(fragment)
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for NormalizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NormalizedKey {
    fn from(raw: &str) -> Self {
        normalize(raw)
    }
}

/// Normalize a raw item name.
///
/// 1. Strip a trailing `(Nx)` multiplier
/// 2. Upper case
/// 3. NFD decomposition, combining marks dropped
/// 4. Anything that is not a letter, digit or whitespace dropped
/// 5. Trim and collapse whitespace runs
///
/// Upper casing runs before decomposition so that case mappings which emit
/// combining marks are cleaned up in the same pass, which keeps the function
/// idempotent.
pub fn normalize(raw: &str) -> NormalizedKey {
    let without_quantity = QUANTITY_SUFFIX.replace(raw, "");

    let cleaned: String = without_quantity
        .to_uppercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    NormalizedKey(cleaned.split_whitespace().collect::<Vec<_>>().join(" "))
}

//! Equivalence Matcher
//!
//! Decides whether two differently worded item names denote the same
//! physical item. Matching is permissive: a false positive is an accepted
//! outcome, a false negative that blocks a ready vehicle is not.

use super::normalize::{normalize, NormalizedKey};

/// A curated group of key fragments that all name one real-world concept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EquivalenceClass {
    pub concept: &'static str,
    /// Fragments in normalized form
    pub fragments: &'static [&'static str],
}

impl EquivalenceClass {
    /// True if any fragment of the class occurs in `key`
    pub fn occurs_in(&self, key: &NormalizedKey) -> bool {
        self.fragments.iter().any(|fragment| key.contains(fragment))
    }
}

/// Synonym table. Static configuration, never mutated at runtime.
pub const EQUIVALENCE_CLASSES: &[EquivalenceClass] = &[
    EquivalenceClass {
        concept: "rfid_reader",
        fragments: &["RFID", "LEITOR RFID", "ID CONDUTOR RFID", "IDENTIFICADOR DE CONDUTOR"],
    },
    EquivalenceClass {
        concept: "siren",
        fragments: &["SIRENE", "BUZZER", "ALARME SONORO"],
    },
    EquivalenceClass {
        concept: "immobilizer",
        fragments: &["BLOQUEIO", "BLOQUEADOR", "RELE DE BLOQUEIO", "CORTA COMBUSTIVEL"],
    },
    EquivalenceClass {
        concept: "panic_button",
        fragments: &["BOTAO DE PANICO", "PANICO"],
    },
    EquivalenceClass {
        concept: "camera",
        fragments: &["CAMERA", "VIDEOTELEMETRIA", "DVR"],
    },
    EquivalenceClass {
        concept: "door_sensor",
        fragments: &["SENSOR DE PORTA", "SENSOR PORTA"],
    },
    EquivalenceClass {
        concept: "temperature_sensor",
        fragments: &["SENSOR DE TEMPERATURA", "TERMOMETRO"],
    },
    EquivalenceClass {
        concept: "driver_keypad",
        fragments: &["TECLADO", "TERMINAL DE DADOS"],
    },
];

/// Compare two raw names.
pub fn are_equivalent(name_a: &str, name_b: &str) -> bool {
    are_equivalent_keys(&normalize(name_a), &normalize(name_b))
}

/// Compare two already normalized keys.
///
/// Exact match, then containment either way, then a shared equivalence
/// class (a fragment of the class in each key, possibly different ones).
pub fn are_equivalent_keys(a: &NormalizedKey, b: &NormalizedKey) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }
    if a.contains(b.as_str()) || b.contains(a.as_str()) {
        return true;
    }
    EQUIVALENCE_CLASSES
        .iter()
        .any(|class| class.occurs_in(a) && class.occurs_in(b))
}

/// First class with a fragment in `key`, if any
pub fn equivalence_class_of(key: &NormalizedKey) -> Option<&'static EquivalenceClass> {
    EQUIVALENCE_CLASSES.iter().find(|class| class.occurs_in(key))
}

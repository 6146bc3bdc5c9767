//! Matching Module
//!
//! Name normalization, quantity annotations and equivalence matching for
//! free-text equipment and accessory names.

mod equivalence;
mod normalize;
mod quantity;

pub use equivalence::{
    are_equivalent, are_equivalent_keys, equivalence_class_of, EquivalenceClass, EQUIVALENCE_CLASSES,
};
pub use normalize::{normalize, NormalizedKey};
pub use quantity::{extract_quantity, format_with_quantity, merge_quantities, QuantityLine};

//! Hash-maps and hash-sets that behave deterministically when the
//! `enhanced-determinism` feature is enabled.
//!
//! Without that feature the maps are plain `hashbrown` maps. Code iterating
//! over one of these maps must not let the iteration order leak into its
//! output unless `enhanced-determinism` is enabled.

/// Deterministic hashmap using [`indexmap::IndexMap`].
#[cfg(feature = "enhanced-determinism")]
pub use indexmap::{map::Entry, IndexMap as HashMap, IndexSet as HashSet};

#[cfg(not(feature = "enhanced-determinism"))]
pub use hashbrown::hash_map::Entry;
/// Hashmap using [`hashbrown::HashMap`].
#[cfg(not(feature = "enhanced-determinism"))]
pub type HashMap<K, V> = hashbrown::HashMap<K, V>;
/// Hashset using [`hashbrown::HashSet`].
#[cfg(not(feature = "enhanced-determinism"))]
pub type HashSet<K> = hashbrown::HashSet<K>;

#[cfg(feature = "std-hash")]
pub mod map {
    pub use std::collections::{HashMap, HashSet};
}

#[cfg(not(feature = "std-hash"))]
pub mod map {
    pub use hashbrown::{HashMap, HashSet};
}

/// Insertion-ordered map hashed with the active default hasher.
pub type OrderedMap<K, V> = indexmap::IndexMap<K, V, crate::hash::BuildHasher>;

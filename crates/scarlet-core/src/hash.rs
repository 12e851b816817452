use core::hash::{BuildHasherDefault, Hash};
use std::hash::Hasher;

#[cfg(feature = "std-hash")]
pub mod default {
    pub use std::collections::hash_map::DefaultHasher;

    #[inline]
    pub fn new() -> DefaultHasher {
        DefaultHasher::new()
    }
}

#[cfg(not(feature = "std-hash"))]
pub mod default {
    pub use ahash::AHasher as DefaultHasher;

    #[inline]
    pub fn new() -> DefaultHasher {
        DefaultHasher::default()
    }
}

/// Hasher builder for ordered maps keyed by node keys and dynamic-list ids.
pub type BuildHasher = BuildHasherDefault<default::DefaultHasher>;

/// Stable fingerprint of a dynamic-list id, used to name it in diagnostics
/// when the id type itself is not printable.
#[inline]
pub fn hash_one<T: Hash>(v: &T) -> u64 {
    let mut h = default::new();
    v.hash(&mut h);
    h.finish()
}

//! Utility types.

type BuildHasher = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;

/// Insertion-ordered map. Iteration order is the order of first insertion,
/// which keeps every table and report reproducible across runs.
pub type Map<K, V> = indexmap::IndexMap<K, V, BuildHasher>;

/// Insertion-ordered set. Same determinism rationale as [`Map`].
pub type Set<T> = indexmap::IndexSet<T, BuildHasher>;

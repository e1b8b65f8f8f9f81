//! Order-preserving collections used throughout the generator.
//!
//! Iteration follows insertion order, so symbol, rule and state numbering
//! only depends on the order of the input rules.

type BuildHasher = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;

pub type Map<K, V> = indexmap::IndexMap<K, V, BuildHasher>;
pub type Set<T> = indexmap::IndexSet<T, BuildHasher>;

//! Compile-time defaults and input validation limits.
//!
//! Tuning parameters live in [`crate::hnsw::HnswConfig`]; the constants here
//! feed its `Default` impl and bound what the public API accepts.

/// Default number of bidirectional links per node above layer 0.
///
/// Higher values improve recall but increase memory and build time.
/// Typical range: 8–48.
pub const DEFAULT_M: usize = 16;

/// Default candidate list width during index construction.
///
/// Wider lists produce a better-connected graph at the cost of build time.
pub const DEFAULT_EF_CONSTRUCTION: usize = 200;

/// Default candidate list width during search.
///
/// The query driver always widens this to at least `k`.
pub const DEFAULT_EF_SEARCH: usize = 50;

/// Default cap on the number of graph layers.
pub const DEFAULT_MAX_LAYERS: usize = 16;

/// Smallest accepted `m`. The level normalization factor defaults to
/// `1 / ln(m)`, which diverges at `m = 1`.
pub const MIN_M: usize = 2;

/// Largest accepted vector dimension.
pub const MAX_DIMENSION: usize = 4096;

/// Largest accepted `k` per query.
pub const MAX_K: usize = 10_000;

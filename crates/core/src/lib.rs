//! # smallworld-core
//!
//! Embeddable in-memory approximate nearest neighbor index built on a
//! Hierarchical Navigable Small World (HNSW) graph.
//!
//! The crate exposes a single thread-safe [`Index`]: inserts take exclusive
//! access, queries run concurrently under shared access. Vectors are owned by
//! the index; callers address points by a stable `u64` id of their choosing.
//!
//! ```no_run
//! use smallworld_core::{HnswConfig, Index};
//!
//! # fn main() -> smallworld_core::Result<()> {
//! let index = Index::new(4, HnswConfig::default())?;
//! index.insert(0, vec![0.0, 0.0, 0.0, 0.0])?;
//! index.insert(1, vec![1.0, 0.0, 0.0, 0.0])?;
//! let nearest = index.knn(&[0.9, 0.1, 0.0, 0.0], 1)?;
//! assert_eq!(nearest, vec![1]);
//! # Ok(())
//! # }
//! ```

/// Compile-time defaults and input validation limits.
pub mod config;
/// Typed error enum shared by all fallible operations.
pub mod error;
/// HNSW graph: structure, insertion, search, and distance metrics.
pub mod hnsw;
/// Thread-safe index facade with precondition checks.
pub mod index;
/// Disk snapshots: versioned header, bincode payload, CRC32 footer.
pub mod snapshot;

pub use error::{IndexError, Result};
pub use hnsw::{DistanceMetric, HnswConfig, HnswGraph};
pub use index::Index;
pub use snapshot::{load_index, save_index};

//! Hierarchical Navigable Small World (HNSW) approximate nearest neighbor graph.
//!
//! The graph is a stack of proximity subgraphs: layer 0 holds every point,
//! higher layers hold exponentially sparser subsets. A query greedily descends
//! from a single entry point at the top layer, then runs a bounded best-first
//! search at layer 0. Insertion runs the same traversal, selects diverse
//! neighbors with the pruning heuristic, and links the new point
//! bidirectionally on every layer it occupies.
//!
//! All distances use plain f32 arithmetic over vectors held in a contiguous
//! arena; neighbor lists store only integer ids.

/// Distance metrics: squared Euclidean (default), cosine, and dot product.
pub mod distance;
/// Candidate record plus the min/max priority queues used during traversal.
pub mod frontier;
/// Graph structure, configuration, layered adjacency, and level sampling.
pub mod graph;
/// Insertion driver, bidirectional linking, and the neighbor heuristic.
pub mod insert;
/// Bounded best-first layer search and the multi-layer KNN driver.
pub mod search;
/// Point store: id mapping, vector arena, and optional user tags.
pub mod store;
/// Epoch-stamped visited set for graph traversal.
pub mod visited;

pub use distance::DistanceMetric;
pub use frontier::Candidate;
pub use graph::{HnswConfig, HnswGraph};
pub use search::{knn_search, search_layer};
pub use store::PointStore;
pub use visited::VisitedSet;

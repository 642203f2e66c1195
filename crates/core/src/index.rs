//! Thread-safe index facade.
//!
//! [`Index`] wraps the graph in a single readers-writer lock: `insert` holds
//! exclusive access for its whole duration, `knn` and the other read paths
//! run concurrently under shared access. Cloning an `Index` produces a new
//! handle to the same shared state.
//!
//! All precondition checks live here so the graph underneath only ever sees
//! well-formed requests, and a failed call never leaves partial state.

use crate::config;
use crate::error::{IndexError, Result};
use crate::hnsw::graph::{HnswConfig, HnswGraph};
use crate::hnsw::search::knn_search;
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

/// Mutable aggregate behind the lock: the graph plus its level-sampling RNG.
#[derive(Debug)]
pub(crate) struct IndexData {
    pub(crate) graph: HnswGraph,
    pub(crate) rng: StdRng,
}

/// A shared handle to an approximate nearest neighbor index.
#[derive(Debug, Clone)]
pub struct Index {
    pub(crate) data: Arc<RwLock<IndexData>>,
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

impl Index {
    /// Create an empty index for vectors of the given dimension.
    ///
    /// Fails with [`IndexError::InvalidParameter`] when the dimension is out
    /// of range or the configuration is inconsistent.
    pub fn new(dimension: usize, config: HnswConfig) -> Result<Self> {
        if dimension == 0 || dimension > config::MAX_DIMENSION {
            return Err(IndexError::InvalidParameter {
                name: "dimension",
                reason: format!(
                    "must be in 1..={}, got {dimension}",
                    config::MAX_DIMENSION
                ),
            });
        }
        config.validate()?;
        let rng = make_rng(config.seed);
        Ok(Self {
            data: Arc::new(RwLock::new(IndexData {
                graph: HnswGraph::new(dimension, config),
                rng,
            })),
        })
    }

    /// Create an index with the default configuration.
    pub fn with_default_config(dimension: usize) -> Result<Self> {
        Self::new(dimension, HnswConfig::default())
    }

    /// Wrap an already-validated graph, re-seeding the RNG from its config.
    pub(crate) fn from_graph(graph: HnswGraph) -> Self {
        let rng = make_rng(graph.config.seed);
        Self {
            data: Arc::new(RwLock::new(IndexData { graph, rng })),
        }
    }

    /// Insert a point under a caller-chosen id.
    ///
    /// Takes the write lock for the whole insertion. Fails with
    /// [`IndexError::DuplicateId`] or [`IndexError::DimensionMismatch`]
    /// without mutating anything.
    pub fn insert(&self, id: u64, vector: Vec<f32>) -> Result<()> {
        self.insert_inner(id, vector, None)
    }

    /// Insert a point carrying an opaque tag returned by [`Index::tag`].
    pub fn insert_with_tag(&self, id: u64, vector: Vec<f32>, tag: String) -> Result<()> {
        self.insert_inner(id, vector, Some(tag))
    }

    fn insert_inner(&self, id: u64, vector: Vec<f32>, tag: Option<String>) -> Result<()> {
        let mut data = self.data.write();
        let IndexData { graph, rng } = &mut *data;
        graph.insert(id, vector, tag, rng)?;
        Ok(())
    }

    /// The `k` approximate nearest neighbors of `query`, nearest first.
    ///
    /// Uses the configured `ef_search` frontier width.
    pub fn knn(&self, query: &[f32], k: usize) -> Result<Vec<u64>> {
        self.knn_inner(query, k, None)
    }

    /// Like [`Index::knn`] with an explicit frontier width for this query.
    ///
    /// Larger `ef` trades latency for recall; it is widened to at least `k`.
    pub fn knn_with_ef(&self, query: &[f32], k: usize, ef: usize) -> Result<Vec<u64>> {
        if ef == 0 {
            return Err(IndexError::InvalidParameter {
                name: "ef",
                reason: "must be positive".to_string(),
            });
        }
        self.knn_inner(query, k, Some(ef))
    }

    fn knn_inner(&self, query: &[f32], k: usize, ef: Option<usize>) -> Result<Vec<u64>> {
        if k == 0 || k > config::MAX_K {
            return Err(IndexError::InvalidParameter {
                name: "k",
                reason: format!("must be in 1..={}, got {k}", config::MAX_K),
            });
        }
        let data = self.data.read();
        let graph = &data.graph;
        if query.len() != graph.store().dimension() {
            return Err(IndexError::DimensionMismatch {
                expected: graph.store().dimension(),
                found: query.len(),
            });
        }
        if graph.is_empty() {
            return Err(IndexError::EmptyIndex);
        }
        let ef = ef.unwrap_or(graph.config.ef_search);
        let found = knn_search(graph, query, k, ef);
        Ok(found
            .into_iter()
            .map(|c| graph.store().external_id(c.id))
            .collect())
    }

    /// Number of stored points.
    pub fn len(&self) -> usize {
        self.data.read().graph.len()
    }

    /// True when no point has been inserted.
    pub fn is_empty(&self) -> bool {
        self.data.read().graph.is_empty()
    }

    /// True when the id has been inserted.
    pub fn contains(&self, id: u64) -> bool {
        self.data.read().graph.store().contains(id)
    }

    /// Copy of the stored vector for an id.
    pub fn get(&self, id: u64) -> Result<Vec<f32>> {
        Ok(self.data.read().graph.store().get(id)?.to_vec())
    }

    /// The tag supplied at insert, if any.
    pub fn tag(&self, id: u64) -> Result<Option<String>> {
        let data = self.data.read();
        let store = data.graph.store();
        let internal = store
            .internal_id(id)
            .ok_or(IndexError::UnknownId { id })?;
        Ok(store.tag(internal).map(str::to_owned))
    }

    /// Vector dimension this index accepts.
    pub fn dimension(&self) -> usize {
        self.data.read().graph.store().dimension()
    }

    /// Copy of the configuration the index was built with.
    pub fn config(&self) -> HnswConfig {
        self.data.read().graph.config.clone()
    }

    /// Check every structural invariant of the underlying graph.
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.data.read().graph.validate()
    }
}

//! HNSW graph structure, configuration, and layered adjacency.
//!
//! [`HnswConfig`] carries the tuning parameters (`m`, `ef_construction`,
//! `ef_search`, metric, seed). [`HnswGraph`] owns the point store and the
//! per-node neighbor lists; a node at level `L` has one list per layer
//! `0..=L`. Layer-0 lists are allocated at their degree cap up front so the
//! hot enumeration path stays on one contiguous block.

use crate::config;
use crate::error::{IndexError, Result};
use crate::hnsw::distance::DistanceMetric;
use crate::hnsw::store::PointStore;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Tuning parameters for an HNSW graph.
///
/// Controls the trade-off between build speed, query speed, recall, and
/// memory. All fields are fixed for the life of the index except
/// `ef_search`, which callers may override per query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HnswConfig {
    /// Bidirectional links per node above layer 0.
    pub m: usize,
    /// Link cap at layer 0 (typically `2 * m`).
    pub m_max0: usize,
    /// Candidate list width during construction.
    pub ef_construction: usize,
    /// Default candidate list width at query time.
    pub ef_search: usize,
    /// Hard cap on the number of layers.
    pub max_layers: usize,
    /// Level-sampling normalization factor. `None` means `1 / ln(m)`.
    #[serde(default)]
    pub level_norm: Option<f64>,
    /// RNG seed for reproducible builds. `None` seeds from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Distance function for similarity computation.
    pub distance_metric: DistanceMetric,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            m: config::DEFAULT_M,
            m_max0: config::DEFAULT_M * 2,
            ef_construction: config::DEFAULT_EF_CONSTRUCTION,
            ef_search: config::DEFAULT_EF_SEARCH,
            max_layers: config::DEFAULT_MAX_LAYERS,
            level_norm: None,
            seed: None,
            distance_metric: DistanceMetric::Euclidean,
        }
    }
}

impl HnswConfig {
    /// Reject parameter combinations the algorithm cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.m < config::MIN_M {
            return Err(IndexError::InvalidParameter {
                name: "m",
                reason: format!("must be at least {}, got {}", config::MIN_M, self.m),
            });
        }
        if self.m_max0 < self.m {
            return Err(IndexError::InvalidParameter {
                name: "m_max0",
                reason: format!("must be at least m ({}), got {}", self.m, self.m_max0),
            });
        }
        if self.ef_construction == 0 {
            return Err(IndexError::InvalidParameter {
                name: "ef_construction",
                reason: "must be positive".to_string(),
            });
        }
        if self.ef_search == 0 {
            return Err(IndexError::InvalidParameter {
                name: "ef_search",
                reason: "must be positive".to_string(),
            });
        }
        if self.max_layers == 0 {
            return Err(IndexError::InvalidParameter {
                name: "max_layers",
                reason: "must be positive".to_string(),
            });
        }
        if let Some(ml) = self.level_norm {
            if !ml.is_finite() || ml < 0.0 {
                return Err(IndexError::InvalidParameter {
                    name: "level_norm",
                    reason: format!("must be finite and non-negative, got {ml}"),
                });
            }
        }
        Ok(())
    }

    /// The effective level normalization factor.
    #[inline]
    pub fn level_norm(&self) -> f64 {
        self.level_norm.unwrap_or_else(|| 1.0 / (self.m as f64).ln())
    }

    /// Neighbor-list cap for a layer.
    #[inline]
    pub fn max_degree(&self, layer: usize) -> usize {
        if layer == 0 {
            self.m_max0
        } else {
            self.m
        }
    }
}

/// The layered proximity graph plus the point store it indexes.
#[derive(Debug, Serialize, Deserialize)]
pub struct HnswGraph {
    pub config: HnswConfig,
    pub(crate) store: PointStore,
    /// Per-node neighbor lists: `neighbors[node][layer]` holds ids on that layer.
    pub(crate) neighbors: Vec<Vec<Vec<u32>>>,
    /// Level assigned to each node at insertion; never changes.
    pub(crate) levels: Vec<u8>,
    /// Global entry point; always a member of the top occupied layer.
    pub(crate) entry_point: Option<u32>,
    /// Highest occupied layer.
    pub(crate) top_layer: usize,
}

impl HnswGraph {
    /// Empty graph for vectors of the given dimension.
    pub fn new(dimension: usize, config: HnswConfig) -> Self {
        Self {
            config,
            store: PointStore::new(dimension),
            neighbors: Vec::new(),
            levels: Vec::new(),
            entry_point: None,
            top_layer: 0,
        }
    }

    /// Number of stored points.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// True when no point has been inserted.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Read access to the point store.
    pub fn store(&self) -> &PointStore {
        &self.store
    }

    /// The global entry point, if any point has been inserted.
    pub fn entry_point(&self) -> Option<u32> {
        self.entry_point
    }

    /// Highest occupied layer. 0 for an empty graph.
    pub fn top_layer(&self) -> usize {
        self.top_layer
    }

    /// Level assigned to a node at insertion.
    #[inline]
    pub fn level(&self, internal: u32) -> usize {
        self.levels[internal as usize] as usize
    }

    /// True when the node is present at the given layer.
    #[inline]
    pub fn has(&self, layer: usize, internal: u32) -> bool {
        (internal as usize) < self.levels.len() && self.level(internal) >= layer
    }

    /// Neighbor ids of a node at a layer. Empty for layers above its level.
    #[inline]
    pub fn neighbor_ids(&self, layer: usize, internal: u32) -> &[u32] {
        let lists = &self.neighbors[internal as usize];
        if layer < lists.len() {
            &lists[layer]
        } else {
            &[]
        }
    }

    /// Overwrite a node's neighbor list at a layer.
    ///
    /// The caller is responsible for keeping the list within the layer's
    /// degree cap; `add_edge` in the insert path is the only writer that
    /// can overflow it and it re-selects before committing.
    pub(crate) fn set_neighbors(&mut self, layer: usize, internal: u32, ids: Vec<u32>) {
        self.neighbors[internal as usize][layer] = ids;
    }

    /// Distance from a query vector to a stored point.
    #[inline]
    pub fn distance_to(&self, query: &[f32], internal: u32) -> f32 {
        self.store
            .distance_to(self.config.distance_metric, internal, query)
    }

    /// Distance between two stored points.
    #[inline]
    pub fn distance_between(&self, a: u32, b: u32) -> f32 {
        self.store.distance(self.config.distance_metric, a, b)
    }

    /// Draw a level for a new node: `⌊−ln(u)·mL⌋` clamped to the layer cap.
    ///
    /// Consumes bits only from the injected RNG.
    pub fn sample_level<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let u: f64 = rng.gen();
        let level = (-u.ln() * self.config.level_norm()).floor();
        // u == 0 yields +inf; the saturating cast plus clamp absorbs it.
        (level as usize).min(self.config.max_layers - 1)
    }

    /// Check every structural invariant of the graph.
    ///
    /// Used after snapshot load and by tests. Covers parallel array lengths,
    /// degree caps, self-loops, duplicate and out-of-bounds neighbor ids,
    /// edge symmetry, layer membership, and entry-point placement.
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.store.validate()?;
        let n = self.store.len();

        if self.levels.len() != n {
            return Err(format!("levels length {} != count {}", self.levels.len(), n));
        }
        if self.neighbors.len() != n {
            return Err(format!(
                "neighbors length {} != count {}",
                self.neighbors.len(),
                n
            ));
        }

        match self.entry_point {
            None => {
                if n > 0 {
                    return Err("non-empty graph has no entry point".to_string());
                }
            }
            Some(ep) => {
                if (ep as usize) >= n {
                    return Err(format!("entry point {ep} out of bounds (count={n})"));
                }
                if self.level(ep) != self.top_layer {
                    return Err(format!(
                        "entry point {ep} sits at level {} but top layer is {}",
                        self.level(ep),
                        self.top_layer
                    ));
                }
            }
        }

        let mut max_level = 0usize;
        for node in 0..n as u32 {
            let level = self.level(node);
            max_level = max_level.max(level);
            let lists = &self.neighbors[node as usize];
            if lists.len() != level + 1 {
                return Err(format!(
                    "node {node} at level {level} has {} layer lists",
                    lists.len()
                ));
            }
            for (layer, list) in lists.iter().enumerate() {
                let cap = self.config.max_degree(layer);
                if list.len() > cap {
                    return Err(format!(
                        "node {node} layer {layer} holds {} neighbors (cap {cap})",
                        list.len()
                    ));
                }
                for (i, &nb) in list.iter().enumerate() {
                    if nb == node {
                        return Err(format!("node {node} layer {layer} links to itself"));
                    }
                    if (nb as usize) >= n {
                        return Err(format!(
                            "node {node} layer {layer} links out of bounds id {nb}"
                        ));
                    }
                    if list[..i].contains(&nb) {
                        return Err(format!(
                            "node {node} layer {layer} links {nb} more than once"
                        ));
                    }
                    if !self.has(layer, nb) {
                        return Err(format!(
                            "node {node} layer {layer} links {nb}, which is absent there"
                        ));
                    }
                    if !self.neighbor_ids(layer, nb).contains(&node) {
                        return Err(format!(
                            "edge {node}->{nb} at layer {layer} has no reverse edge"
                        ));
                    }
                }
            }
        }

        if n > 0 && max_level != self.top_layer {
            return Err(format!(
                "top layer {} != highest node level {max_level}",
                self.top_layer
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_new_graph_is_empty() {
        let g = HnswGraph::new(8, HnswConfig::default());
        assert!(g.is_empty());
        assert_eq!(g.len(), 0);
        assert!(g.entry_point().is_none());
        assert_eq!(g.top_layer(), 0);
        assert!(g.validate().is_ok());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(HnswConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_rejects_degenerate_m() {
        let cfg = HnswConfig {
            m: 1,
            ..HnswConfig::default()
        };
        assert!(matches!(
            cfg.validate().unwrap_err(),
            IndexError::InvalidParameter { name: "m", .. }
        ));
    }

    #[test]
    fn test_config_rejects_small_m_max0() {
        let cfg = HnswConfig {
            m: 16,
            m_max0: 8,
            ..HnswConfig::default()
        };
        assert!(matches!(
            cfg.validate().unwrap_err(),
            IndexError::InvalidParameter { name: "m_max0", .. }
        ));
    }

    #[test]
    fn test_config_rejects_zero_widths() {
        for (name, cfg) in [
            (
                "ef_construction",
                HnswConfig {
                    ef_construction: 0,
                    ..HnswConfig::default()
                },
            ),
            (
                "ef_search",
                HnswConfig {
                    ef_search: 0,
                    ..HnswConfig::default()
                },
            ),
            (
                "max_layers",
                HnswConfig {
                    max_layers: 0,
                    ..HnswConfig::default()
                },
            ),
        ] {
            match cfg.validate().unwrap_err() {
                IndexError::InvalidParameter { name: got, .. } => assert_eq!(got, name),
                other => panic!("expected InvalidParameter, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_level_norm_defaults_to_inverse_ln_m() {
        let cfg = HnswConfig {
            m: 16,
            ..HnswConfig::default()
        };
        let expected = 1.0 / 16f64.ln();
        assert!((cfg.level_norm() - expected).abs() < 1e-12);

        let cfg = HnswConfig {
            level_norm: Some(0.5),
            ..HnswConfig::default()
        };
        assert_eq!(cfg.level_norm(), 0.5);
    }

    #[test]
    fn test_max_degree_doubles_at_layer_zero() {
        let cfg = HnswConfig::default();
        assert_eq!(cfg.max_degree(0), cfg.m_max0);
        assert_eq!(cfg.max_degree(1), cfg.m);
        assert_eq!(cfg.max_degree(7), cfg.m);
    }

    #[test]
    fn test_sample_level_respects_cap() {
        let g = HnswGraph::new(4, HnswConfig::default());
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            assert!(g.sample_level(&mut rng) < g.config.max_layers);
        }
    }

    #[test]
    fn test_sample_level_is_seed_deterministic() {
        let g = HnswGraph::new(4, HnswConfig::default());
        let draw = |seed: u64| -> Vec<usize> {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..64).map(|_| g.sample_level(&mut rng)).collect()
        };
        assert_eq!(draw(42), draw(42));
        assert_ne!(draw(42), draw(43));
    }

    #[test]
    fn test_sample_level_mostly_zero() {
        // Occupancy decays exponentially; layer 0 dominates.
        let g = HnswGraph::new(4, HnswConfig::default());
        let mut rng = StdRng::seed_from_u64(7);
        let zeros = (0..1000)
            .filter(|_| g.sample_level(&mut rng) == 0)
            .count();
        assert!(zeros > 800, "expected mostly level 0, got {zeros}/1000");
    }

    #[test]
    fn test_neighbor_ids_above_level_is_empty() {
        let mut g = HnswGraph::new(2, HnswConfig::default());
        g.store.insert(1, vec![0.0, 0.0], None).unwrap();
        g.levels.push(0);
        g.neighbors.push(vec![Vec::new()]);
        g.entry_point = Some(0);
        assert_eq!(g.neighbor_ids(0, 0), &[] as &[u32]);
        assert_eq!(g.neighbor_ids(5, 0), &[] as &[u32]);
        assert!(g.has(0, 0));
        assert!(!g.has(1, 0));
    }
}

//! Insertion: level sampling, greedy descent, diverse neighbor selection,
//! and bidirectional linking with degree-capped re-selection.
//!
//! An insert either commits the point with all of its edges or, on a
//! precondition failure, changes nothing. Edges stay symmetric at every
//! commit point: whenever re-selection drops a link, the reverse link is
//! dropped with it.

use crate::error::Result;
use crate::hnsw::frontier::{Candidate, MinQueue};
use crate::hnsw::graph::HnswGraph;
use crate::hnsw::search::search_layer;
use crate::hnsw::visited::VisitedSet;
use rand::Rng;
use std::collections::HashSet;

impl HnswGraph {
    /// Insert a point and wire it into every layer up to its sampled level.
    ///
    /// Returns the internal id assigned to the point. Fails with
    /// `DuplicateId` or `DimensionMismatch` before any state changes.
    pub fn insert<R: Rng + ?Sized>(
        &mut self,
        id: u64,
        vector: Vec<f32>,
        tag: Option<String>,
        rng: &mut R,
    ) -> Result<u32> {
        let query = vector.clone();
        let internal = self.store.insert(id, vector, tag)?;
        let level = self.sample_level(rng);

        // First point: it occupies layers 0..=level alone and becomes the
        // entry point.
        let Some(entry) = self.entry_point else {
            self.levels.push(level as u8);
            self.neighbors.push(self.empty_layer_lists(level));
            self.entry_point = Some(internal);
            self.top_layer = level;
            return Ok(internal);
        };

        let top = self.top_layer;
        let mut visited = VisitedSet::with_capacity(self.len());
        let mut ep = entry;

        // Greedy descent through the layers above the new point's level.
        for layer in (level + 1..=top).rev() {
            let found = search_layer(self, &query, std::slice::from_ref(&ep), 1, layer, &mut visited);
            if let Some(nearest) = found.first() {
                ep = nearest.id;
            }
        }

        // Collect diverse neighbors on every layer the point occupies.
        let connect_top = level.min(top);
        let mut links: Vec<Vec<u32>> = vec![Vec::new(); connect_top + 1];
        for layer in (0..=connect_top).rev() {
            let found = search_layer(
                self,
                &query,
                std::slice::from_ref(&ep),
                self.config.ef_construction,
                layer,
                &mut visited,
            );
            let selected = select_neighbors(
                self,
                &query,
                &found,
                self.config.max_degree(layer),
                layer,
                true,
                true,
                Some(internal),
            );
            links[layer] = selected.iter().map(|c| c.id).collect();
            if let Some(nearest) = found.first() {
                ep = nearest.id;
            }
        }

        // Commit the node, then backlink. Backlinking may evict edges on
        // capped neighbors, including the one just added.
        let mut lists = self.empty_layer_lists(level);
        for (layer, selected) in links.into_iter().enumerate() {
            lists[layer].extend(selected);
        }
        self.levels.push(level as u8);
        self.neighbors.push(lists);

        for layer in 0..=connect_top {
            let forward = self.neighbor_ids(layer, internal).to_vec();
            for nb in forward {
                self.add_edge(layer, nb, internal);
            }
        }

        if level > top {
            self.top_layer = level;
            self.entry_point = Some(internal);
        }
        Ok(internal)
    }

    /// One neighbor list per occupied layer, layer 0 pre-sized at its cap.
    fn empty_layer_lists(&self, level: usize) -> Vec<Vec<u32>> {
        (0..=level)
            .map(|layer| Vec::with_capacity(self.config.max_degree(layer)))
            .collect()
    }

    /// Add `new_neighbor` to `node`'s list at `layer`.
    ///
    /// When the list would exceed the layer cap, the node's neighbors are
    /// re-selected from the old list plus the newcomer; every link the
    /// re-selection drops loses its reverse link as well, so the edge set
    /// stays undirected.
    pub(crate) fn add_edge(&mut self, layer: usize, node: u32, new_neighbor: u32) {
        if node == new_neighbor {
            return;
        }
        if self.neighbor_ids(layer, node).contains(&new_neighbor) {
            return;
        }
        let cap = self.config.max_degree(layer);
        if self.neighbor_ids(layer, node).len() < cap {
            self.neighbors[node as usize][layer].push(new_neighbor);
            return;
        }

        let base = self.store.vector(node).to_vec();
        let mut pool: Vec<Candidate> = self
            .neighbor_ids(layer, node)
            .iter()
            .map(|&c| Candidate::new(c, self.distance_to(&base, c)))
            .collect();
        pool.push(Candidate::new(
            new_neighbor,
            self.distance_to(&base, new_neighbor),
        ));

        let keep: Vec<u32> =
            select_neighbors(self, &base, &pool, cap, layer, false, true, Some(node))
                .iter()
                .map(|c| c.id)
                .collect();
        let dropped: Vec<u32> = pool
            .iter()
            .map(|c| c.id)
            .filter(|id| !keep.contains(id))
            .collect();

        self.set_neighbors(layer, node, keep);
        for d in dropped {
            self.remove_edge(layer, d, node);
        }
    }

    /// Remove `to` from `from`'s list at `layer`, if present.
    fn remove_edge(&mut self, layer: usize, from: u32, to: u32) {
        let list = &mut self.neighbors[from as usize][layer];
        if let Some(pos) = list.iter().position(|&x| x == to) {
            list.swap_remove(pos);
        }
    }
}

/// Diverse neighbor selection.
///
/// Picks at most `m` candidates for the point at `query`, preferring
/// candidates that are closer to the query than to anything already picked.
/// This spreads the links across directions instead of clustering them on
/// near-duplicates, which is what keeps the graph navigable.
///
/// `extend_candidates` widens the pool with the candidates' own neighbors at
/// `layer`; `keep_pruned` refills undersized results from the rejected
/// candidates in nearest-first order. `exclude` drops the base point itself
/// from consideration. No candidate is ever picked twice.
#[allow(clippy::too_many_arguments)]
pub(crate) fn select_neighbors(
    graph: &HnswGraph,
    query: &[f32],
    candidates: &[Candidate],
    m: usize,
    layer: usize,
    extend_candidates: bool,
    keep_pruned: bool,
    exclude: Option<u32>,
) -> Vec<Candidate> {
    let mut seen: HashSet<u32> = HashSet::with_capacity(candidates.len());
    let mut working = MinQueue::with_capacity(candidates.len());
    for &c in candidates {
        if Some(c.id) == exclude {
            continue;
        }
        if seen.insert(c.id) {
            working.push(c);
        }
    }
    if extend_candidates {
        for &c in candidates {
            if Some(c.id) == exclude {
                continue;
            }
            for &nb in graph.neighbor_ids(layer, c.id) {
                if Some(nb) == exclude {
                    continue;
                }
                if seen.insert(nb) {
                    working.push(Candidate::new(nb, graph.distance_to(query, nb)));
                }
            }
        }
    }

    let mut selected: Vec<Candidate> = Vec::with_capacity(m);
    let mut discarded = MinQueue::with_capacity(working.len());
    while selected.len() < m {
        let Some(e) = working.pop_nearest() else {
            break;
        };
        // Admit only when every picked neighbor is strictly farther from
        // the candidate than the query is.
        let diverse = selected
            .iter()
            .all(|r| graph.distance_between(e.id, r.id) > e.distance);
        if diverse {
            selected.push(e);
        } else {
            discarded.push(e);
        }
    }

    if keep_pruned {
        while selected.len() < m {
            let Some(e) = discarded.pop_nearest() else {
                break;
            };
            selected.push(e);
        }
    }
    selected
}

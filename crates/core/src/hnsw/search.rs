//! Layer search and the multi-layer KNN query driver.
//!
//! `search_layer` is the kernel everything else is built on: insertion uses
//! it to find link candidates, queries use it for the greedy descent and the
//! wide layer-0 pass.

use crate::hnsw::frontier::{Candidate, MaxQueue, MinQueue};
use crate::hnsw::graph::HnswGraph;
use crate::hnsw::visited::VisitedSet;

/// Bounded best-first search within one layer.
///
/// Returns the `ef` points nearest to `query` reachable from `entries` at
/// `layer`, sorted by ascending distance. `visited` is reset on entry and
/// reused across calls to avoid per-call allocation.
pub fn search_layer(
    graph: &HnswGraph,
    query: &[f32],
    entries: &[u32],
    ef: usize,
    layer: usize,
    visited: &mut VisitedSet,
) -> Vec<Candidate> {
    visited.reset(graph.len());

    let mut frontier = MinQueue::with_capacity(ef * 2);
    let mut nearest = MaxQueue::with_capacity(ef + 1);

    for &ep in entries {
        if visited.mark(ep) {
            let c = Candidate::new(ep, graph.distance_to(query, ep));
            frontier.push(c);
            nearest.push(c);
            if nearest.len() > ef {
                nearest.pop_farthest();
            }
        }
    }

    // Cached farthest-kept distance; avoids a heap peek per neighbor.
    let mut worst = if nearest.len() >= ef {
        nearest.peek_farthest().map_or(f32::MAX, |c| c.distance)
    } else {
        f32::MAX
    };

    while let Some(current) = frontier.pop_nearest() {
        // The frontier is a min-heap: once its head cannot improve the
        // kept set, nothing behind it can either.
        if nearest.len() >= ef && current.distance > worst {
            break;
        }

        for &nb in graph.neighbor_ids(layer, current.id) {
            if !visited.mark(nb) {
                continue;
            }
            let d = graph.distance_to(query, nb);
            if nearest.len() < ef || d < worst {
                let c = Candidate::new(nb, d);
                frontier.push(c);
                nearest.push(c);
                if nearest.len() > ef {
                    nearest.pop_farthest();
                }
                if nearest.len() >= ef {
                    worst = nearest.peek_farthest().map_or(f32::MAX, |c| c.distance);
                }
            }
        }
    }

    nearest.into_ascending()
}

/// Multi-layer KNN: greedy descent through the upper layers, then a wide
/// search at layer 0.
///
/// Returns up to `k` candidates in ascending distance order; the layer-0
/// frontier is widened to `max(ef, k)`. Empty graph yields an empty vector.
pub fn knn_search(graph: &HnswGraph, query: &[f32], k: usize, ef: usize) -> Vec<Candidate> {
    let Some(entry) = graph.entry_point() else {
        return Vec::new();
    };

    let mut visited = VisitedSet::with_capacity(graph.len());
    let mut ep = entry;
    for layer in (1..=graph.top_layer()).rev() {
        let found = search_layer(graph, query, std::slice::from_ref(&ep), 1, layer, &mut visited);
        if let Some(nearest) = found.first() {
            ep = nearest.id;
        }
    }

    let mut results = search_layer(
        graph,
        query,
        std::slice::from_ref(&ep),
        ef.max(k),
        0,
        &mut visited,
    );
    results.truncate(k);
    results
}

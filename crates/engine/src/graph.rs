//! Spill graph between watershed labels
//!
//! Vertices are watershed labels; an edge between two labels carries the
//! lowest elevation at which water can pass from one region to the other
//! (the minimum over all adjacent cell pairs of the higher of the two
//! cell elevations).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Undirected weighted graph over watershed labels.
///
/// Stored as a nested map keyed by label so iteration order is
/// deterministic. Each undirected edge is mirrored in both adjacency maps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpillGraph {
    adj: BTreeMap<i32, BTreeMap<i32, f32>>,
}

impl SpillGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the edge (a, b) with weight `w`, or lower its weight if an
    /// edge already exists with a higher one.
    pub fn relax(&mut self, a: i32, b: i32, w: f32) {
        debug_assert_ne!(a, b, "self edge on label {}", a);
        if a == b {
            return;
        }
        for (u, v) in [(a, b), (b, a)] {
            let slot = self.adj.entry(u).or_default().entry(v).or_insert(w);
            if w < *slot {
                *slot = w;
            }
        }
    }

    /// Weight of the edge (a, b), if present
    pub fn weight(&self, a: i32, b: i32) -> Option<f32> {
        self.adj.get(&a).and_then(|n| n.get(&b)).copied()
    }

    /// Neighbours of `u` with edge weights. Empty for unknown vertices.
    pub fn neighbors(&self, u: i32) -> impl Iterator<Item = (i32, f32)> + '_ {
        self.adj
            .get(&u)
            .into_iter()
            .flat_map(|n| n.iter().map(|(&v, &w)| (v, w)))
    }

    /// All vertices, ascending
    pub fn vertices(&self) -> impl Iterator<Item = i32> + '_ {
        self.adj.keys().copied()
    }

    /// Largest vertex label, if any
    pub fn max_vertex(&self) -> Option<i32> {
        self.adj.keys().next_back().copied()
    }

    /// Each undirected edge exactly once, as (a, b, w) with a < b
    pub fn edges(&self) -> impl Iterator<Item = (i32, i32, f32)> + '_ {
        self.adj.iter().flat_map(|(&a, n)| {
            n.iter()
                .filter(move |&(&b, _)| a < b)
                .map(move |(&b, &w)| (a, b, w))
        })
    }

    /// Number of undirected edges
    pub fn edge_count(&self) -> usize {
        self.adj.values().map(|n| n.len()).sum::<usize>() / 2
    }

    /// Whether the graph has no vertices at all
    pub fn is_empty(&self) -> bool {
        self.adj.is_empty()
    }
}

//! Shared utilities for graph algorithms
//!
//! Provides a read-only, optimized view of the graph topology for algorithm execution.

/// A dense, integer-indexed view of an undirected weighted graph using
/// Compressed Sparse Row (CSR) format.
///
/// Layout and community detection iterate over every node and edge many
/// times per run; a contiguous CSR adjacency is far cheaper to walk than a
/// hash-keyed edge map, so callers project their graph into this view once
/// and hand it to the algorithms.
pub struct GraphView {
    /// Number of nodes
    pub node_count: usize,
    /// Offsets into `targets`. Size = node_count + 1
    pub offsets: Vec<usize>,
    /// Contiguous array of neighbor indices
    pub targets: Vec<usize>,
    /// Edge weights, aligned with `targets`
    pub weights: Vec<f64>,
}

impl GraphView {
    /// Build a view from an undirected edge list. Each `(u, v, w)` entry is
    /// expanded into both adjacency directions.
    pub fn from_edges(node_count: usize, edges: &[(usize, usize, f64)]) -> Self {
        let mut adjacency: Vec<Vec<(usize, f64)>> = vec![Vec::new(); node_count];
        for &(u, v, w) in edges {
            adjacency[u].push((v, w));
            if u != v {
                adjacency[v].push((u, w));
            }
        }

        let mut offsets = Vec::with_capacity(node_count + 1);
        let mut targets = Vec::new();
        let mut weights = Vec::new();

        offsets.push(0);
        for neighbors in adjacency {
            for (target, weight) in neighbors {
                targets.push(target);
                weights.push(weight);
            }
            offsets.push(targets.len());
        }

        Self {
            node_count,
            offsets,
            targets,
            weights,
        }
    }

    /// Get the degree of a node (by index)
    pub fn degree(&self, idx: usize) -> usize {
        self.offsets[idx + 1] - self.offsets[idx]
    }

    /// Get the neighbors of a node
    pub fn neighbors(&self, idx: usize) -> &[usize] {
        &self.targets[self.offsets[idx]..self.offsets[idx + 1]]
    }

    /// Get the weights aligned with `neighbors(idx)`
    pub fn neighbor_weights(&self, idx: usize) -> &[f64] {
        &self.weights[self.offsets[idx]..self.offsets[idx + 1]]
    }

    /// Sum of the weights of all edges incident to a node. Self-loops count
    /// once here; `louvain` accounts for the doubling itself.
    pub fn weighted_degree(&self, idx: usize) -> f64 {
        self.neighbor_weights(idx).iter().sum()
    }

    /// Total weight of all edges in the graph (each undirected edge counted once).
    pub fn total_weight(&self) -> f64 {
        self.weights.iter().sum::<f64>() / 2.0
    }
}

//! Community detection: Louvain modularity maximization.
//!
//! Greedy local moving followed by community aggregation, repeated until
//! modularity stops improving. The visit order is shuffled per level, so two
//! runs (or two backends) may return different but equally valid partitions;
//! callers should assert structural properties, not exact assignments.

use crate::common::GraphView;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;

/// Working copy of one aggregation level.
struct Level {
    view: GraphView,
    /// Weighted degree per node, with self-loops counted twice
    ki: Vec<f64>,
    /// Self-loop weight per node
    self_weight: Vec<f64>,
    /// Twice the total edge weight
    m2: f64,
}

impl Level {
    fn new(view: GraphView) -> Self {
        let n = view.node_count;
        let mut ki = vec![0.0; n];
        let mut self_weight = vec![0.0; n];
        for i in 0..n {
            for (&j, &w) in view.neighbors(i).iter().zip(view.neighbor_weights(i)) {
                ki[i] += w;
                if j == i {
                    // Convention: a self-loop contributes twice to the degree
                    ki[i] += w;
                    self_weight[i] += w;
                }
            }
        }
        let m2 = ki.iter().sum();
        Self {
            view,
            ki,
            self_weight,
            m2,
        }
    }

    /// One pass of greedy local moving. Returns the per-node community
    /// assignment and whether any node moved.
    fn local_moving(&self, rng: &mut StdRng) -> (Vec<usize>, bool) {
        let n = self.view.node_count;
        let mut community: Vec<usize> = (0..n).collect();
        let mut sum_tot: Vec<f64> = self.ki.clone();
        let mut improved = false;

        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(rng);

        let mut moved = true;
        while moved {
            moved = false;
            for &i in &order {
                let old = community[i];

                // Edge weight from i to each neighboring community
                let mut w_to: HashMap<usize, f64> = HashMap::new();
                for (&j, &w) in self
                    .view
                    .neighbors(i)
                    .iter()
                    .zip(self.view.neighbor_weights(i))
                {
                    if j != i {
                        *w_to.entry(community[j]).or_insert(0.0) += w;
                    }
                }

                // Detach i before evaluating candidates
                sum_tot[old] -= self.ki[i];

                let base = *w_to.get(&old).unwrap_or(&0.0) - sum_tot[old] * self.ki[i] / self.m2;
                let mut best = old;
                let mut best_gain = base;
                for (&c, &w) in &w_to {
                    let gain = w - sum_tot[c] * self.ki[i] / self.m2;
                    if gain > best_gain {
                        best_gain = gain;
                        best = c;
                    }
                }

                sum_tot[best] += self.ki[i];
                if best != old {
                    community[i] = best;
                    moved = true;
                    improved = true;
                }
            }
        }

        (community, improved)
    }

    /// Collapse communities into super-nodes, accumulating parallel edges and
    /// turning intra-community weight into self-loops.
    fn aggregate(&self, community: &[usize]) -> (GraphView, Vec<usize>) {
        let renumbered = renumber(community);
        let count = renumbered.iter().map(|&c| c + 1).max().unwrap_or(0);

        let mut merged: HashMap<(usize, usize), f64> = HashMap::new();
        for i in 0..self.view.node_count {
            for (&j, &w) in self
                .view
                .neighbors(i)
                .iter()
                .zip(self.view.neighbor_weights(i))
            {
                // Each undirected edge appears in both adjacency rows; keep one
                if j < i {
                    continue;
                }
                let (a, b) = {
                    let (ca, cb) = (renumbered[i], renumbered[j]);
                    if ca <= cb {
                        (ca, cb)
                    } else {
                        (cb, ca)
                    }
                };
                *merged.entry((a, b)).or_insert(0.0) += w;
            }
        }

        let edges: Vec<(usize, usize, f64)> = merged
            .into_iter()
            .map(|((a, b), w)| (a, b, w))
            .collect();
        (GraphView::from_edges(count, &edges), renumbered)
    }
}

/// Renumber an arbitrary community labeling into contiguous 0-based indices,
/// in order of first appearance.
fn renumber(community: &[usize]) -> Vec<usize> {
    let mut mapping: HashMap<usize, usize> = HashMap::new();
    community
        .iter()
        .map(|&c| {
            let next = mapping.len();
            *mapping.entry(c).or_insert(next)
        })
        .collect()
}

/// Louvain community detection.
///
/// Returns one 0-based community index per node of `view`. The `seed` fixes
/// the visit-order shuffle, so a given seed on a given graph is reproducible.
pub fn louvain(view: &GraphView, seed: u64) -> Vec<usize> {
    let n = view.node_count;
    if n == 0 {
        return Vec::new();
    }

    let mut rng = StdRng::seed_from_u64(seed);

    // node -> community of the current aggregation level, composed down to
    // the original nodes
    let mut assignment: Vec<usize> = (0..n).collect();

    let mut level = Level::new(GraphView::from_edges(
        n,
        &collect_edges(view),
    ));

    loop {
        if level.m2 == 0.0 {
            // No edges: every node is its own community
            return renumber(&assignment);
        }

        let (community, improved) = level.local_moving(&mut rng);
        if !improved {
            return renumber(&assignment);
        }

        let (aggregated, renumbered) = level.aggregate(&community);
        for slot in assignment.iter_mut() {
            *slot = renumbered[*slot];
        }

        if aggregated.node_count == level.view.node_count {
            return renumber(&assignment);
        }
        level = Level::new(aggregated);
    }
}

/// Modularity of a partition over `view`. Used by tests and diagnostics.
pub fn modularity(view: &GraphView, partition: &[usize]) -> f64 {
    let level = Level::new(GraphView::from_edges(
        view.node_count,
        &collect_edges(view),
    ));
    if level.m2 == 0.0 {
        return 0.0;
    }

    let mut internal = 0.0;
    for i in 0..view.node_count {
        for (&j, &w) in view.neighbors(i).iter().zip(view.neighbor_weights(i)) {
            if partition[i] == partition[j] {
                internal += w;
                if j == i {
                    internal += w;
                }
            }
        }
    }

    let count = partition.iter().map(|&c| c + 1).max().unwrap_or(0);
    let mut sum_tot = vec![0.0; count];
    for (i, &c) in partition.iter().enumerate() {
        sum_tot[c] += level.ki[i];
    }

    let m2 = level.m2;
    internal / m2 - sum_tot.iter().map(|s| (s / m2) * (s / m2)).sum::<f64>()
}

fn collect_edges(view: &GraphView) -> Vec<(usize, usize, f64)> {
    let mut edges = Vec::new();
    for i in 0..view.node_count {
        for (&j, &w) in view.neighbors(i).iter().zip(view.neighbor_weights(i)) {
            if j >= i {
                edges.push((i, j, w));
            }
        }
    }
    edges
}

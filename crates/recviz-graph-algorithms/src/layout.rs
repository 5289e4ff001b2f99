//! 2D graph layout: deterministic circular baseline plus iterative
//! force-directed refinement.
//!
//! Two execution strategies share one physics model: a sequential CPU
//! reference (`force_directed`) and a rayon-parallel variant
//! (`force_directed_parallel`). Both return one `(x, y)` pair per node so
//! callers never care which ran.

use crate::common::GraphView;
use rayon::prelude::*;

/// A 2D coordinate pair.
pub type Point = (f64, f64);

/// Force-directed simulation parameters.
#[derive(Debug, Clone)]
pub struct LayoutConfig {
    /// Fixed maximum iteration count
    pub iterations: usize,
    /// Pull toward the layout center, applied every iteration
    pub gravity: f64,
    /// Spring constant for attraction along edges
    pub attraction: f64,
    /// Repulsion constant between all node pairs
    pub repulsion: f64,
    /// Per-iteration displacement clamp, keeps the simulation stable
    pub max_displacement: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            iterations: 1500,
            gravity: 10.0,
            attraction: 0.05,
            repulsion: 5000.0,
            max_displacement: 10.0,
        }
    }
}

/// Place `n` nodes evenly on the unit circle, in index order.
///
/// This is the stable baseline every layout run starts from; it is fully
/// deterministic so repeated builds of the same graph key agree.
pub fn circular_layout(n: usize) -> Vec<Point> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let theta = 2.0 * std::f64::consts::PI * (i as f64) / (n as f64);
            (theta.cos(), theta.sin())
        })
        .collect()
}

/// Rest length of the edge springs, in simulation units.
const SPRING_REST_LENGTH: f64 = 50.0;

/// Guard added to squared distances so coincident nodes do not produce
/// infinite repulsion.
const DIST_EPSILON: f64 = 0.1;

fn repulsion_at(view: &GraphView, positions: &[Point], i: usize, cfg: &LayoutConfig) -> Point {
    let (xi, yi) = positions[i];
    let mut fx = 0.0;
    let mut fy = 0.0;
    for j in 0..view.node_count {
        if j == i {
            continue;
        }
        let dx = xi - positions[j].0;
        let dy = yi - positions[j].1;
        let dist_sq = dx * dx + dy * dy + DIST_EPSILON;
        let force = cfg.repulsion / dist_sq;
        fx += dx * force;
        fy += dy * force;
    }
    (fx, fy)
}

fn attraction_at(view: &GraphView, positions: &[Point], i: usize, cfg: &LayoutConfig) -> Point {
    let (xi, yi) = positions[i];
    let mut fx = 0.0;
    let mut fy = 0.0;
    let neighbors = view.neighbors(i);
    let weights = view.neighbor_weights(i);
    for (&j, &w) in neighbors.iter().zip(weights) {
        if j == i {
            continue;
        }
        let dx = positions[j].0 - xi;
        let dy = positions[j].1 - yi;
        let dist = (dx * dx + dy * dy + DIST_EPSILON).sqrt();
        // Heavier edges pull harder, so frequently-interacting pairs sit closer
        let force = (dist - SPRING_REST_LENGTH) * cfg.attraction * w;
        fx += (dx / dist) * force;
        fy += (dy / dist) * force;
    }
    (fx, fy)
}

fn apply_forces(positions: &mut [Point], forces: &[Point], cfg: &LayoutConfig) {
    // Center of mass, used as the gravity well
    let n = positions.len() as f64;
    let cx = positions.iter().map(|p| p.0).sum::<f64>() / n;
    let cy = positions.iter().map(|p| p.1).sum::<f64>() / n;

    let clamp = cfg.max_displacement;
    for (pos, force) in positions.iter_mut().zip(forces) {
        pos.0 += force.0.clamp(-clamp, clamp);
        pos.1 += force.1.clamp(-clamp, clamp);

        pos.0 += (cx - pos.0) * cfg.gravity * 0.001;
        pos.1 += (cy - pos.1) * cfg.gravity * 0.001;
    }
}

/// Refine `initial` positions with the force simulation. CPU reference
/// implementation, always available.
pub fn force_directed(view: &GraphView, initial: &[Point], cfg: &LayoutConfig) -> Vec<Point> {
    let mut positions = initial.to_vec();
    if view.node_count < 2 {
        return positions;
    }

    for _ in 0..cfg.iterations {
        let forces: Vec<Point> = (0..view.node_count)
            .map(|i| {
                let (rx, ry) = repulsion_at(view, &positions, i, cfg);
                let (ax, ay) = attraction_at(view, &positions, i, cfg);
                (rx + ax, ry + ay)
            })
            .collect();
        apply_forces(&mut positions, &forces, cfg);
    }
    positions
}

/// Accelerated variant of [`force_directed`]: the per-node force pass (the
/// O(n²) hot loop) fans out over the rayon thread pool. Output shape is
/// identical to the CPU reference.
pub fn force_directed_parallel(
    view: &GraphView,
    initial: &[Point],
    cfg: &LayoutConfig,
) -> Vec<Point> {
    let mut positions = initial.to_vec();
    if view.node_count < 2 {
        return positions;
    }

    for _ in 0..cfg.iterations {
        let forces: Vec<Point> = (0..view.node_count)
            .into_par_iter()
            .map(|i| {
                let (rx, ry) = repulsion_at(view, &positions, i, cfg);
                let (ax, ay) = attraction_at(view, &positions, i, cfg);
                (rx + ax, ry + ay)
            })
            .collect();
        apply_forces(&mut positions, &forces, cfg);
    }
    positions
}

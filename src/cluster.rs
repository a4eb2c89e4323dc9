//! Mean-shift clustering of feature points and graph consolidation.
//!
//! Purpose
//! - Skeleton thinning and simplification leave clusters of near-duplicate
//!   feature points (split endpoints, staircase corners). Mean-shift pulls
//!   those together; the forest is then rebuilt over cluster modes and
//!   straightened by splicing out collinear pass-through nodes.
//!
//! Design
//! - Blurring mean-shift: every point relocates to the Gaussian-weighted
//!   centroid of the current shifted set; a point freezes once its per-round
//!   displacement rounds to zero pixels (the 1e-4 epsilon against rounded
//!   integral distances — the tolerance the template constants were tuned
//!   for). A round cap keeps pathological sets best-effort.
//! - Assignment is first-fit over insertion order against `cluster_epsilon`;
//!   it is order-dependent by design, not globally optimal.
//! - The rebuilt graph connects two modes iff any of their original members
//!   were adjacent; clustering never deletes an edge, only coalesces
//!   endpoints.
//! - Straightening splices out any degree-2 node whose incident edges are
//!   within `straighten_tol_deg` of collinear (directly or through the 180°
//!   complement), iterating to a fixed point. Idempotent on straightened
//!   input.

use crate::angle::{collinear_within, elevation, pixel_distance};
use crate::forest::Forest;
use log::warn;
use nalgebra::Point2;
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ClusterParams {
    /// Kernel bandwidth as a fraction of the box's min side.
    pub bandwidth_frac: f64,
    /// Bandwidth increment for the second heuristic's first pass.
    pub bandwidth_bump: f64,
    /// Shifted points within this rounded distance of a mode join it.
    pub cluster_epsilon: f64,
    /// Convergence epsilon compared against the rounded displacement.
    pub shift_epsilon: f64,
    /// Safety cap on mean-shift rounds (best effort beyond it).
    pub max_rounds: usize,
    /// Collinearity tolerance for straightening, degrees.
    pub straighten_tol_deg: f64,
    /// Iteration cap for the straightening fixed point.
    pub straighten_cap: usize,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            bandwidth_frac: 0.1,
            bandwidth_bump: 0.02,
            cluster_epsilon: 2.0,
            shift_epsilon: 1e-4,
            max_rounds: 500,
            straighten_tol_deg: 20.0,
            straighten_cap: 10_000,
        }
    }
}

/// One mean-shift cluster: converged mode plus member bookkeeping.
#[derive(Clone, Debug)]
pub struct Cluster {
    pub mode: Point2<f64>,
    /// Indices of the original points assigned to this cluster.
    pub members: Vec<usize>,
    pub shifted: Vec<Point2<f64>>,
}

#[inline]
fn gaussian_kernel(dist: f64, bandwidth: f64) -> f64 {
    (-0.5 * dist * dist / (bandwidth * bandwidth)).exp()
}

fn shift_point(point: &Point2<f64>, points: &[Point2<f64>], bandwidth: f64) -> Point2<f64> {
    let mut sx = 0.0;
    let mut sy = 0.0;
    let mut total = 0.0;
    for q in points {
        let w = gaussian_kernel(pixel_distance(point, q), bandwidth);
        sx += q.x * w;
        sy += q.y * w;
        total += w;
    }
    if total == 0.0 {
        return *point;
    }
    Point2::new(sx / total, sy / total)
}

/// Run blurring mean-shift until every point's displacement rounds to zero
/// (or the round cap is hit).
pub fn mean_shift(points: &[Point2<f64>], bandwidth: f64, params: &ClusterParams) -> Vec<Point2<f64>> {
    let mut shifted: Vec<Point2<f64>> = points.to_vec();
    let mut frozen = vec![false; points.len()];
    let mut rounds = 0usize;
    loop {
        rounds += 1;
        if rounds > params.max_rounds {
            warn!("mean-shift hit the {} round cap; using best-effort modes", params.max_rounds);
            break;
        }
        let mut max_shift = 0.0f64;
        for i in 0..shifted.len() {
            if frozen[i] {
                continue;
            }
            let moved = shift_point(&shifted[i], &shifted, bandwidth);
            let d = pixel_distance(&moved, &shifted[i]);
            max_shift = max_shift.max(d);
            if d <= params.shift_epsilon {
                frozen[i] = true;
            }
            shifted[i] = moved;
        }
        if max_shift <= params.shift_epsilon {
            break;
        }
    }
    shifted
}

/// First-fit assignment of shifted points to cluster modes, in order.
pub fn assign_clusters(
    points: &[Point2<f64>],
    shifted: &[Point2<f64>],
    cluster_epsilon: f64,
) -> Vec<Cluster> {
    let mut clusters: Vec<Cluster> = Vec::new();
    for (i, s) in shifted.iter().enumerate() {
        let slot = clusters
            .iter()
            .position(|c| pixel_distance(s, &c.mode) <= cluster_epsilon)
            .unwrap_or_else(|| {
                clusters.push(Cluster {
                    mode: *s,
                    members: Vec::new(),
                    shifted: Vec::new(),
                });
                clusters.len() - 1
            });
        clusters[slot].members.push(i);
        clusters[slot].shifted.push(*s);
    }
    clusters
}

/// Cluster a forest's nodes once at `bandwidth` and rebuild the graph over
/// the resulting modes.
pub fn cluster_forest(forest: &Forest, bandwidth: f64, params: &ClusterParams) -> Forest {
    let points: Vec<Point2<f64>> = forest.iter().map(|(_, p)| p).collect();
    let shifted = mean_shift(&points, bandwidth, params);
    let clusters = assign_clusters(&points, &shifted, params.cluster_epsilon);
    rebuild_from_clusters(&clusters, forest)
}

/// Cluster `iters` times: the first pass at `first_bandwidth`, the rest at
/// `later_bandwidth`.
pub fn cluster_forest_iterated(
    forest: &Forest,
    first_bandwidth: f64,
    later_bandwidth: f64,
    iters: usize,
    params: &ClusterParams,
) -> Forest {
    let mut out = forest.clone();
    for it in 0..iters {
        let bw = if it == 0 { first_bandwidth } else { later_bandwidth };
        out = cluster_forest(&out, bw, params);
    }
    out
}

/// Rebuild: one node per cluster mode; modes are connected iff any member of
/// one was adjacent to a member of the other in the source forest.
fn rebuild_from_clusters(clusters: &[Cluster], source: &Forest) -> Forest {
    let mut out = Forest::new();
    for c in clusters {
        out.add_node(c.mode);
    }
    for i in 0..clusters.len() {
        let mut neigh = vec![false; source.len()];
        for &m in &clusters[i].members {
            for &n in source.neighbors(m) {
                neigh[n] = true;
            }
        }
        for (j, cj) in clusters.iter().enumerate().skip(i + 1) {
            if cj.members.iter().any(|&m| neigh[m]) {
                out.add_edge(i, j);
            }
        }
    }
    out
}

/// Splice out collinear degree-2 nodes until none remain.
pub fn straighten_forest(forest: &Forest, params: &ClusterParams) -> Forest {
    let nodes: Vec<Point2<f64>> = forest.iter().map(|(_, p)| p).collect();
    let mut adj: Vec<Vec<usize>> = (0..forest.len()).map(|i| forest.neighbors(i).to_vec()).collect();
    let mut removed = vec![false; nodes.len()];

    let mut iters = 0usize;
    'scan: loop {
        iters += 1;
        if iters > params.straighten_cap {
            warn!("straightening hit the {} iteration cap", params.straighten_cap);
            break;
        }
        for ix in 0..nodes.len() {
            if removed[ix] || adj[ix].len() != 2 {
                continue;
            }
            let (a, b) = (adj[ix][0], adj[ix][1]);
            let e1 = elevation(&nodes[ix], &nodes[a]);
            let e2 = elevation(&nodes[ix], &nodes[b]);
            if !collinear_within(e1, e2, params.straighten_tol_deg) {
                continue;
            }
            // Splice a—ix—b into a—b and drop ix.
            adj[a].push(b);
            if let Some(pos) = adj[a].iter().position(|&n| n == ix) {
                adj[a].remove(pos);
            }
            adj[b].push(a);
            if let Some(pos) = adj[b].iter().position(|&n| n == ix) {
                adj[b].remove(pos);
            }
            adj[ix].clear();
            removed[ix] = true;
            continue 'scan;
        }
        break;
    }

    // Self-loops can appear when a spliced pair was already connected.
    for (ix, list) in adj.iter_mut().enumerate() {
        list.retain(|&n| n != ix);
    }

    let mut out = Forest::new();
    let mut remap = vec![usize::MAX; nodes.len()];
    for (ix, p) in nodes.iter().enumerate() {
        if !removed[ix] {
            remap[ix] = out.add_node(*p);
        }
    }
    for (ix, list) in adj.iter().enumerate() {
        if removed[ix] {
            continue;
        }
        for &n in list {
            if !removed[n] {
                out.push_neighbor(remap[ix], remap[n]);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ClusterParams {
        ClusterParams::default()
    }

    #[test]
    fn mean_shift_converges_on_separated_clusters() {
        let mut pts = Vec::new();
        for d in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)] {
            pts.push(Point2::new(10.0 + d.0, 10.0 + d.1));
            pts.push(Point2::new(60.0 + d.0, 40.0 + d.1));
        }
        let shifted = mean_shift(&pts, 3.0, &params());
        let clusters = assign_clusters(&pts, &shifted, 2.0);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].members.len(), 3);
        assert_eq!(clusters[1].members.len(), 3);
    }

    #[test]
    fn raising_cluster_epsilon_never_increases_cluster_count() {
        let pts: Vec<Point2<f64>> = (0..12).map(|i| Point2::new(i as f64, 0.0)).collect();
        let mut prev = usize::MAX;
        for eps in [0.0, 1.0, 2.0, 4.0, 8.0, 16.0] {
            let n = assign_clusters(&pts, &pts, eps).len();
            assert!(n <= prev, "epsilon {eps} grew the cluster count {prev} -> {n}");
            prev = n;
        }
    }

    #[test]
    fn rebuild_preserves_adjacency_through_merges() {
        // Chain a—b—c where b and c sit on top of each other.
        let mut f = Forest::new();
        let a = f.add_node(Point2::new(0.0, 0.0));
        let b = f.add_node(Point2::new(30.0, 0.0));
        let c = f.add_node(Point2::new(31.0, 0.0));
        let d = f.add_node(Point2::new(60.0, 0.0));
        f.add_edge(a, b);
        f.add_edge(b, c);
        f.add_edge(c, d);
        let clustered = cluster_forest(&f, 2.0, &params());
        assert_eq!(clustered.len(), 3, "b and c should merge");
        // The merged node keeps both outside connections.
        let merged = clustered
            .iter()
            .find(|(ix, _)| clustered.degree(*ix) == 2)
            .expect("merged node has degree 2");
        let p = merged.1;
        assert!((p.x - 30.5).abs() < 1.5 && p.y.abs() < 0.5);
    }

    #[test]
    fn straightening_removes_collinear_pass_through_nodes() {
        let mut f = Forest::new();
        let a = f.add_node(Point2::new(0.0, 0.0));
        let b = f.add_node(Point2::new(20.0, 1.0));
        let c = f.add_node(Point2::new(40.0, 0.0));
        f.add_edge(a, b);
        f.add_edge(b, c);
        let s = straighten_forest(&f, &params());
        assert_eq!(s.len(), 2);
        assert_eq!(s.degree(0), 1);
        assert_eq!(s.degree(1), 1);

        // Idempotent on straightened input.
        let again = straighten_forest(&s, &params());
        assert_eq!(again.len(), 2);
    }

    #[test]
    fn straightening_keeps_real_corners() {
        let mut f = Forest::new();
        let a = f.add_node(Point2::new(0.0, 0.0));
        let b = f.add_node(Point2::new(20.0, 0.0));
        let c = f.add_node(Point2::new(20.0, 20.0));
        f.add_edge(a, b);
        f.add_edge(b, c);
        let s = straighten_forest(&f, &params());
        assert_eq!(s.len(), 3);
    }
}

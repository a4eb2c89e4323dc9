//! Feature-point graph ("forest") extraction from a stroke skeleton.
//!
//! Purpose
//! - Convert the 1-px skeleton into a compact undirected graph whose nodes
//!   are the corners/endpoints/junctions that survive Douglas-Peucker
//!   simplification, ready for clustering and template matching.
//!
//! Design
//! - `trace` splits the skeleton into pixel polylines at branch events.
//! - `simplify` runs Douglas-Peucker per polyline with a tolerance scaled
//!   to the box (`0.1 × min side`).
//! - Assembly deduplicates vertices by source pixel and connects
//!   consecutive simplified vertices. Adjacency lists may hold duplicate
//!   entries: the structure is a multigraph, and degree means list length.
//! - Node order is insertion order everywhere. Downstream cluster
//!   assignment is first-fit over that order, so determinism matters.
//!
//! Despite the name, the graph is not necessarily acyclic — clustering can
//! merge endpoints into cycles.

mod simplify;
mod trace;

pub use simplify::simplify_polyline;

use crate::raster::GrayGrid;
use nalgebra::Point2;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    /// Douglas-Peucker tolerance as a fraction of the box's min side.
    pub tolerance_frac: f64,
    /// Visited-pixel budget per connected trace; exceeding abandons the box.
    pub stack_limit: usize,
    /// Maximum number of polylines; exceeding abandons the box.
    pub line_limit: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            tolerance_frac: 0.1,
            stack_limit: 2000,
            line_limit: 100,
        }
    }
}

/// Undirected feature-point multigraph with insertion-ordered nodes.
#[derive(Clone, Debug, Default)]
pub struct Forest {
    nodes: Vec<Point2<f64>>,
    adj: Vec<Vec<usize>>,
}

impl Forest {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn node(&self, ix: usize) -> Point2<f64> {
        self.nodes[ix]
    }

    #[inline]
    pub fn neighbors(&self, ix: usize) -> &[usize] {
        &self.adj[ix]
    }

    /// Degree counts duplicate (multigraph) entries.
    #[inline]
    pub fn degree(&self, ix: usize) -> usize {
        self.adj[ix].len()
    }

    pub fn add_node(&mut self, p: Point2<f64>) -> usize {
        self.nodes.push(p);
        self.adj.push(Vec::new());
        self.nodes.len() - 1
    }

    pub fn add_edge(&mut self, a: usize, b: usize) {
        self.adj[a].push(b);
        self.adj[b].push(a);
    }

    /// Iterate `(index, position)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Point2<f64>)> + '_ {
        self.nodes.iter().copied().enumerate()
    }

    /// The neighbour of `ix` that is not `not`. With duplicate edges the
    /// first distinct entry wins.
    pub fn other_neighbor(&self, ix: usize, not: usize) -> Option<usize> {
        let list = &self.adj[ix];
        if list.is_empty() {
            return None;
        }
        if list[0] != not {
            return Some(list[0]);
        }
        list.get(1).copied()
    }

    /// Index of the node nearest to `target` by rounded pixel distance,
    /// earliest insertion winning ties.
    pub fn nearest_to(&self, target: &Point2<f64>) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (ix, p) in self.iter() {
            let d = crate::angle::pixel_distance(&p, target);
            match best {
                Some((_, bd)) if bd <= d => {}
                _ => best = Some((ix, d)),
            }
        }
        best.map(|(ix, _)| ix)
    }

    /// One-directional adjacency push, used when a caller rebuilds both
    /// sides of the lists itself.
    pub(crate) fn push_neighbor(&mut self, from: usize, to: usize) {
        self.adj[from].push(to);
    }
}

/// Build the feature forest of a skeletonized grid.
///
/// Returns `None` when the grid holds no ink or a tracing budget was
/// exceeded; both mean "no detection" for the caller.
pub fn build_forest(gray: &GrayGrid, tolerance: f64, params: &ForestParams) -> Option<Forest> {
    if gray.ink_count() == 0 {
        return None;
    }
    let lines = trace::trace_polylines(gray, params)?;

    let mut forest = Forest::new();
    let mut index: HashMap<(i32, i32), usize> = HashMap::new();
    for line in &lines {
        let feats = simplify_polyline(line, tolerance);
        for pair in feats.windows(2) {
            let a = *index.entry(pair[0]).or_insert_with(|| {
                forest.add_node(Point2::new(pair[0].0 as f64, pair[0].1 as f64))
            });
            let b = *index.entry(pair[1]).or_insert_with(|| {
                forest.add_node(Point2::new(pair[1].0 as f64, pair[1].1 as f64))
            });
            forest.add_edge(a, b);
        }
    }
    Some(forest)
}

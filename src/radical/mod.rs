//! Radical (√) classification over a clustered feature forest.
//!
//! Two independent template heuristics run against the same raw forest,
//! each on its own clustering of it: the first expects an overhead bar
//! before the slant, the second starts the slant directly at the top-right
//! anchor and clusters twice with a bumped bandwidth for finer merging.
//! The driver returns the higher-confidence result; acceptance against the
//! threshold is the orchestrator's call.

mod confidence;
mod heuristics;

pub use confidence::{aggregate, band, trapezoid, ConfidenceMap};

use crate::cluster::{cluster_forest, cluster_forest_iterated, straighten_forest, ClusterParams};
use crate::forest::Forest;
use crate::types::Bbox;
use log::debug;
use nalgebra::Point2;
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RadicalParams {
    /// Minimum winning confidence for the orchestrator to accept.
    pub confidence_thresh: f64,
    pub cluster: ClusterParams,
}

impl Default for RadicalParams {
    fn default() -> Self {
        Self {
            confidence_thresh: 0.85,
            cluster: ClusterParams::default(),
        }
    }
}

/// A detected radical: the ordered feature chain from the top-right anchor
/// plus the clustered forest it was matched in.
#[derive(Clone, Debug)]
pub struct Radical {
    /// Top-right feature point the walk started from.
    pub anchor: Point2<f64>,
    /// Feature points in template order (anchor first).
    pub chain: Vec<Point2<f64>>,
    pub forest: Forest,
}

/// Run both radical heuristics and keep the better one.
///
/// `raw` is the unclustered forest of the box, in crop-local coordinates.
pub fn check_radical(raw: &Forest, bbox: &Bbox, params: &RadicalParams) -> (Option<Radical>, f64) {
    let x_span = (bbox.width() - 1) as f64;
    let y_span = (bbox.height() - 1) as f64;
    if x_span == 0.0 || y_span == 0.0 {
        return (None, 0.0);
    }
    let t = x_span.min(y_span);
    let bandwidth = t * params.cluster.bandwidth_frac;

    let clustered = straighten_forest(&cluster_forest(raw, bandwidth, &params.cluster), &params.cluster);
    let (rad1, conf1) = heuristics::radical_with_bar(&clustered, x_span, y_span);

    let reclustered = straighten_forest(
        &cluster_forest_iterated(
            raw,
            bandwidth + params.cluster.bandwidth_bump,
            bandwidth,
            2,
            &params.cluster,
        ),
        &params.cluster,
    );
    let (rad2, conf2) = heuristics::radical_without_bar(&reclustered, x_span, y_span);

    debug!("radical heuristic confidences: {conf1} {conf2}");
    if conf1 >= conf2 {
        (rad1, conf1)
    } else {
        (rad2, conf2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::Forest;

    #[test]
    fn single_stroke_forest_scores_zero() {
        let mut f = Forest::new();
        let a = f.add_node(Point2::new(0.0, 2.0));
        let b = f.add_node(Point2::new(39.0, 2.0));
        f.add_edge(a, b);
        let bbox = Bbox::new(0, 0, 39, 4);
        let (rad, conf) = check_radical(&f, &bbox, &RadicalParams::default());
        assert!(rad.is_none());
        assert_eq!(conf, 0.0);
    }

    #[test]
    fn noisy_chain_is_cleaned_before_matching() {
        // The raw forest carries a split tail endpoint and a collinear
        // mid-bar node; clustering and straightening must remove both
        // before the template walk sees the graph.
        let mut f = Forest::new();
        let anchor = f.add_node(Point2::new(56.0, 6.0));
        let mid_bar = f.add_node(Point2::new(40.0, 6.0));
        let corner = f.add_node(Point2::new(24.0, 6.0));
        let bottom = f.add_node(Point2::new(14.0, 50.0));
        let tail_a = f.add_node(Point2::new(2.0, 37.0));
        let tail_b = f.add_node(Point2::new(1.0, 35.0));
        f.add_edge(anchor, mid_bar);
        f.add_edge(mid_bar, corner);
        f.add_edge(corner, bottom);
        f.add_edge(bottom, tail_a);
        f.add_edge(tail_a, tail_b);
        let bbox = Bbox::new(0, 0, 59, 59);
        let (rad, conf) = check_radical(&f, &bbox, &RadicalParams::default());
        assert!(rad.is_some(), "expected a radical, confidence {conf}");
        assert!(conf >= 0.85, "confidence {conf} below threshold");
    }
}

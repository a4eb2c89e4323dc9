//! The two radical template walks.
//!
//! Both start at the feature node nearest the box's top-right corner and
//! walk the clustered forest edge by edge, checking at every step that the
//! connecting edge's elevation and the vertex degree match the template.
//! Any topology mismatch returns confidence 0 immediately — wrong shape
//! earns no partial credit. Features that pass contribute a banded or
//! trapezoidal score; the aggregate is computed only when the walk
//! consumed the whole forest.
//!
//! Coordinates are local to the cropped box: the top-right corner is
//! (x_span, 0) and the bottom edge is y = y_span.

use super::confidence::{aggregate, band, trapezoid, ConfidenceMap};
use super::Radical;
use crate::angle::{elevation, folded_elevation, pixel_distance};
use crate::forest::Forest;
use log::debug;
use nalgebra::Point2;

// Shared template geometry.
const TOP_RIGHT_TOL_X_FRAC: f64 = 0.5;
const TOP_RIGHT_TOL_Y_FRAC: f64 = 0.2;
const BOTTOM_POINT_Y_TOL_FRAC: f64 = 0.3;
const TAIL_SLANT_LENGTH_RATIO: f64 = 0.8;
const SERIF_ELEVATION: f64 = 40.0;
const SERIF_TOL_SMALL: f64 = 30.0;
const SERIF_TOL: f64 = 55.0;

struct WalkFrame<'a> {
    forest: &'a Forest,
    x_span: f64,
    y_span: f64,
}

impl<'a> WalkFrame<'a> {
    fn anchor(&self) -> Option<usize> {
        let corner = Point2::new(self.x_span, 0.0);
        let ix = self.forest.nearest_to(&corner)?;
        let pos = self.forest.node(ix);
        if (pos.x - self.x_span).abs() >= TOP_RIGHT_TOL_X_FRAC * self.x_span
            || pos.y.abs() >= TOP_RIGHT_TOL_Y_FRAC * self.y_span
        {
            debug!("top-right anchor out of tolerance at ({}, {})", pos.x, pos.y);
            return None;
        }
        if self.forest.degree(ix) != 1 {
            debug!("top-right anchor degree {} != 1", self.forest.degree(ix));
            return None;
        }
        Some(ix)
    }

    fn bottom_point_x_score(&self, x: f64) -> f64 {
        trapezoid(
            x,
            self.y_span * 0.17,
            self.y_span * 0.38,
            -self.y_span * 0.08,
            self.x_span.max(self.y_span),
        )
    }

    fn tail_point_y_score(&self, y: f64) -> f64 {
        trapezoid(
            y,
            0.6 * self.y_span,
            self.y_span + 1.0,
            0.0,
            self.y_span + 5.0,
        )
    }

    /// Optional terminal serif off the tail end. `Ok(true)` means a serif
    /// was consumed and scored, `Ok(false)` that none exists; `Err(())`
    /// fails the walk.
    fn serif(
        &self,
        tail_ix: usize,
        bottom_ix: usize,
        chain: &mut Vec<usize>,
        map: &mut ConfidenceMap,
    ) -> Result<bool, ()> {
        if self.forest.degree(tail_ix) < 2 {
            return Ok(false);
        }
        if self.forest.degree(tail_ix) > 2 {
            debug!("tail end degree {} > 2", self.forest.degree(tail_ix));
            return Err(());
        }
        let serif_ix = self.forest.other_neighbor(tail_ix, bottom_ix).ok_or(())?;
        chain.push(serif_ix);
        if self.forest.degree(serif_ix) > 1 {
            debug!("serif tip is not an endpoint");
            return Err(());
        }
        let tail = self.forest.node(tail_ix);
        let serif = self.forest.node(serif_ix);
        let ele = elevation(&tail, &serif);
        let len = pixel_distance(&tail, &serif);
        if len >= self.y_span / 3.0 {
            debug!("serif too long ({len})");
            return Err(());
        }
        if serif.x > tail.x + 5.0f64.max(0.1 * self.x_span) {
            debug!("serif unusually placed right of the tail end");
            return Err(());
        }
        if (ele - SERIF_ELEVATION).abs() >= SERIF_TOL {
            debug!("serif elevation {ele} out of range");
            return Err(());
        }
        map.set(
            "lastBitElevation",
            band(ele, SERIF_ELEVATION, SERIF_TOL_SMALL, SERIF_TOL),
        );
        Ok(true)
    }

    fn build(&self, chain: Vec<usize>) -> Radical {
        let points: Vec<Point2<f64>> = chain.iter().map(|&ix| self.forest.node(ix)).collect();
        Radical {
            anchor: points[0],
            chain: points,
            forest: self.forest.clone(),
        }
    }
}

/// Radical with an overhead bar: anchor → bar → slant → tail → serif.
pub(crate) fn radical_with_bar(
    forest: &Forest,
    x_span: f64,
    y_span: f64,
) -> (Option<Radical>, f64) {
    const BAR_ELEVATION_TOL: f64 = 60.0;
    const SLANT_ELEVATION: f64 = 75.0;
    const SLANT_TOL_SMALL: f64 = 8.0;
    const SLANT_TOL: f64 = 38.0;
    const TAIL_ELEVATION: f64 = 132.0;
    const TAIL_ELEVATION_TOL: f64 = 60.0;
    const ELEVATION_GAP: f64 = TAIL_ELEVATION - SLANT_ELEVATION;
    const ELEVATION_GAP_TOL: f64 = 80.0;
    const METRIC: f64 = 1.5;
    const METRIC_NO_TAIL: f64 = 1.1;
    const TAIL_ABSENCE_PENALTY: f64 = 0.98;

    if x_span == 0.0 || y_span == 0.0 {
        return (None, 0.0);
    }
    let frame = WalkFrame {
        forest,
        x_span,
        y_span,
    };
    let mut map = ConfidenceMap::new();
    let mut chain: Vec<usize> = Vec::new();

    let Some(anchor_ix) = frame.anchor() else {
        return (None, 0.0);
    };
    chain.push(anchor_ix);

    // Bar: the anchor's single edge, read as a folded elevation near 0°.
    let bar_ix = forest.neighbors(anchor_ix)[0];
    let bar_ele = folded_elevation(&forest.node(bar_ix), &forest.node(anchor_ix));
    debug!("bar elevation {bar_ele}");
    map.set("topBarElevation", band(bar_ele, 0.0, 0.0, BAR_ELEVATION_TOL));
    if forest.degree(bar_ix) != 2 {
        debug!("bar end degree {} != 2", forest.degree(bar_ix));
        return (None, 0.0);
    }
    chain.push(bar_ix);

    // Slant down to the bottom point.
    let Some(bottom_ix) = forest.other_neighbor(bar_ix, anchor_ix) else {
        return (None, 0.0);
    };
    let slant_ele = elevation(&forest.node(bar_ix), &forest.node(bottom_ix));
    debug!("slant elevation {slant_ele}");
    map.set(
        "slantElevation",
        band(slant_ele, SLANT_ELEVATION, SLANT_TOL_SMALL, SLANT_TOL),
    );
    let bottom = forest.node(bottom_ix);
    if (bottom.y - y_span).abs() >= BOTTOM_POINT_Y_TOL_FRAC * y_span {
        debug!("bottom point y {} too far from the box bottom", bottom.y);
        return (None, 0.0);
    }
    map.set("bottomPointX", frame.bottom_point_x_score(bottom.x));
    if forest.degree(bottom_ix) > 2 {
        debug!("bottom point degree {} > 2", forest.degree(bottom_ix));
        return (None, 0.0);
    }
    chain.push(bottom_ix);

    // Optional tail rising left from the bottom point.
    let mut has_tail = false;
    if forest.degree(bottom_ix) >= 2 {
        has_tail = true;
        let Some(tail_ix) = forest.other_neighbor(bottom_ix, bar_ix) else {
            return (None, 0.0);
        };
        chain.push(tail_ix);
        let tail = forest.node(tail_ix);
        let tail_ele = elevation(&bottom, &tail);
        debug!("tail elevation {tail_ele}");
        if tail.y > bottom.y || (tail_ele > 160.0 && tail.x > bottom.x) {
            debug!("tail end unusually placed w.r.t. the bottom point");
            return (None, 0.0);
        }
        if (tail_ele - TAIL_ELEVATION).abs() >= TAIL_ELEVATION_TOL {
            debug!("tail elevation {tail_ele} out of range");
            return (None, 0.0);
        }
        map.set(
            "tailElevation",
            trapezoid(tail_ele, 105.0, 160.0, 70.0, 195.0),
        );
        map.set("tailPointY", frame.tail_point_y_score(tail.y));
        if (tail_ele - slant_ele - ELEVATION_GAP).abs() >= ELEVATION_GAP_TOL
            || tail_ele < slant_ele
        {
            debug!("unusual elevation gap between tail and slant");
            return (None, 0.0);
        }
        let slant_len = pixel_distance(&forest.node(bar_ix), &bottom);
        let tail_len = pixel_distance(&bottom, &tail);
        if slant_len < TAIL_SLANT_LENGTH_RATIO * tail_len {
            debug!("tail length {tail_len} out of proportion to slant {slant_len}");
            return (None, 0.0);
        }
        if frame.serif(tail_ix, bottom_ix, &mut chain, &mut map).is_err() {
            return (None, 0.0);
        }
    }

    if map.get("topBarElevation") == Some(0.0) {
        debug!("bar elevation earned no credit");
        return (None, 0.0);
    }

    let confidence = if has_tail && map.contains("tailElevation") {
        aggregate(METRIC, &map)
    } else {
        aggregate(METRIC_NO_TAIL, &map) * TAIL_ABSENCE_PENALTY
    };

    if forest.len() > map.len() {
        debug!(
            "forest has {} features but only {} were consumed",
            forest.len(),
            map.len()
        );
        return (None, 0.0);
    }

    (Some(frame.build(chain)), confidence)
}

/// Radical without an overhead bar: the slant starts at the anchor.
pub(crate) fn radical_without_bar(
    forest: &Forest,
    x_span: f64,
    y_span: f64,
) -> (Option<Radical>, f64) {
    const SLANT_ELEVATION: f64 = 75.0;
    const SLANT_TOL_SMALL: f64 = 10.0;
    const SLANT_TOL: f64 = 40.0;
    const METRIC: f64 = 1.1;

    if x_span == 0.0 || y_span == 0.0 {
        return (None, 0.0);
    }
    let frame = WalkFrame {
        forest,
        x_span,
        y_span,
    };
    let mut map = ConfidenceMap::new();
    let mut chain: Vec<usize> = Vec::new();

    let Some(anchor_ix) = frame.anchor() else {
        return (None, 0.0);
    };
    chain.push(anchor_ix);

    let bottom_ix = forest.neighbors(anchor_ix)[0];
    let slant_ele = elevation(&forest.node(anchor_ix), &forest.node(bottom_ix));
    debug!("slant elevation {slant_ele}");
    map.set(
        "slantElevation",
        band(slant_ele, SLANT_ELEVATION, SLANT_TOL_SMALL, SLANT_TOL),
    );
    let bottom = forest.node(bottom_ix);
    if (bottom.y - y_span).abs() >= BOTTOM_POINT_Y_TOL_FRAC * y_span {
        debug!("bottom point y {} too far from the box bottom", bottom.y);
        return (None, 0.0);
    }
    map.set("bottomPointX", frame.bottom_point_x_score(bottom.x));
    if forest.degree(bottom_ix) > 2 {
        debug!("bottom point degree {} > 2", forest.degree(bottom_ix));
        return (None, 0.0);
    }
    chain.push(bottom_ix);

    if forest.degree(bottom_ix) != 2 {
        debug!("bottom point degree {} != 2", forest.degree(bottom_ix));
        return (None, 0.0);
    }
    let Some(tail_ix) = forest.other_neighbor(bottom_ix, anchor_ix) else {
        return (None, 0.0);
    };
    chain.push(tail_ix);
    let tail = forest.node(tail_ix);
    let tail_ele = elevation(&bottom, &tail);
    debug!("tail elevation {tail_ele}");
    if tail.y > bottom.y || (tail_ele > 160.0 && tail.x > bottom.x) {
        debug!("tail end unusually placed w.r.t. the bottom point");
        return (None, 0.0);
    }
    map.set(
        "tailElevation",
        trapezoid(tail_ele, 95.0, 140.0, 70.0, 175.0),
    );
    map.set("tailPointY", frame.tail_point_y_score(tail.y));

    let slant_len = pixel_distance(&forest.node(anchor_ix), &bottom);
    let tail_len = pixel_distance(&bottom, &tail);
    if slant_len < TAIL_SLANT_LENGTH_RATIO * tail_len {
        debug!("tail length {tail_len} out of proportion to slant {slant_len}");
        return (None, 0.0);
    }
    if frame.serif(tail_ix, bottom_ix, &mut chain, &mut map).is_err() {
        return (None, 0.0);
    }

    let confidence = aggregate(METRIC, &map);

    if forest.len() > map.len() {
        debug!(
            "forest has {} features but only {} were consumed",
            forest.len(),
            map.len()
        );
        return (None, 0.0);
    }

    (Some(frame.build(chain)), confidence)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_forest(points: &[(f64, f64)]) -> Forest {
        let mut f = Forest::new();
        let ixs: Vec<usize> = points
            .iter()
            .map(|&(x, y)| f.add_node(Point2::new(x, y)))
            .collect();
        for w in ixs.windows(2) {
            f.add_edge(w[0], w[1]);
        }
        f
    }

    #[test]
    fn ideal_bar_radical_scores_high() {
        // anchor, bar corner, bottom, tail end, serif tip in a 60×60 box.
        let f = chain_forest(&[
            (56.0, 6.0),
            (24.0, 6.0),
            (14.0, 50.0),
            (1.0, 36.0),
            (6.0, 31.0),
        ]);
        let (rad, conf) = radical_with_bar(&f, 59.0, 59.0);
        assert!(rad.is_some());
        assert!(conf >= 0.85, "confidence {conf} below threshold");
    }

    #[test]
    fn straight_stroke_is_rejected_by_both() {
        let f = chain_forest(&[(0.0, 2.0), (39.0, 2.0)]);
        let (r1, c1) = radical_with_bar(&f, 39.0, 4.0);
        let (r2, c2) = radical_without_bar(&f, 39.0, 4.0);
        assert!(r1.is_none() && c1 == 0.0);
        assert!(r2.is_none() && c2 == 0.0);
    }

    #[test]
    fn junction_in_the_walk_fails_fast() {
        // A fork at the bottom point (degree 3).
        let mut f = Forest::new();
        let a = f.add_node(Point2::new(56.0, 6.0));
        let b = f.add_node(Point2::new(24.0, 6.0));
        let c = f.add_node(Point2::new(14.0, 50.0));
        let d = f.add_node(Point2::new(1.0, 36.0));
        let e = f.add_node(Point2::new(10.0, 30.0));
        f.add_edge(a, b);
        f.add_edge(b, c);
        f.add_edge(c, d);
        f.add_edge(c, e);
        let (rad, conf) = radical_with_bar(&f, 59.0, 59.0);
        assert!(rad.is_none());
        assert_eq!(conf, 0.0);
    }

    #[test]
    fn barless_radical_matches_second_template() {
        // anchor (top-right), bottom, tail end: no bar segment.
        let f = chain_forest(&[(24.0, 2.0), (12.0, 45.0), (5.0, 31.0)]);
        let (rad, conf) = radical_without_bar(&f, 34.0, 48.0);
        assert!(rad.is_some());
        assert!(conf >= 0.85, "confidence {conf} below threshold");
    }
}

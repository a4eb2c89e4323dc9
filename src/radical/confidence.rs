//! Per-feature confidence scores and their aggregation.
//!
//! Every geometric feature a heuristic checks gets a score in [0, 1]:
//! full credit inside a small tolerance band, linear decay to zero at the
//! outer tolerance — or a two-sided trapezoid when the acceptable value is
//! a range rather than a point. The aggregate is the target metric
//! penalized by the RMS spread of the individual scores. The arithmetic is
//! part of the tuned behaviour; keep it exactly as is.

/// Ordered name → score map. Order is the order features were checked.
#[derive(Clone, Debug, Default)]
pub struct ConfidenceMap {
    entries: Vec<(&'static str, f64)>,
}

impl ConfidenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &'static str, score: f64) {
        self.entries.push((name, score));
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, s)| *s)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn scores(&self) -> impl Iterator<Item = f64> + '_ {
        self.entries.iter().map(|(_, s)| *s)
    }
}

/// Point-target score: 1 inside `tol_small`, linear decay to 0 at `tol`.
pub fn band(val: f64, mean: f64, tol_small: f64, tol: f64) -> f64 {
    let dev = (val - mean).abs();
    if dev > tol {
        return 0.0;
    }
    if dev <= tol_small {
        return 1.0;
    }
    (1.0 - (dev - tol_small) / (tol - tol_small)).max(0.0)
}

/// Range-target score: 0 outside (`b1`, `b2`), 1 inside [`mean1`, `mean2`],
/// linear ramps between. Degenerate means collapse to the boundary
/// midpoint.
pub fn trapezoid(val: f64, mean1: f64, mean2: f64, b1: f64, b2: f64) -> f64 {
    if b1 >= b2 {
        return 0.0;
    }
    let (m1, m2) = if mean1 >= mean2 {
        let mid = (b1 + b2) / 2.0;
        (mid, mid)
    } else {
        (mean1, mean2)
    };
    if val <= b1 || val >= b2 {
        return 0.0;
    }
    if val >= m1 && val <= m2 {
        return 1.0;
    }
    if val < m1 {
        (val - b1) / (m1 - b1)
    } else {
        (b2 - val) / (b2 - m2)
    }
}

/// `metric − sqrt(mean((metric − score)²))` over the map; 0 for an empty
/// map.
pub fn aggregate(metric: f64, map: &ConfidenceMap) -> f64 {
    if map.is_empty() {
        return 0.0;
    }
    let mut acc = 0.0;
    for s in map.scores() {
        acc += (metric - s) * (metric - s);
    }
    metric - (acc / map.len() as f64).sqrt()
}

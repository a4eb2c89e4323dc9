//! Arrow glyph classification.
//!
//! Pipeline per candidate box (the orchestrator applies the size gates and
//! the half-resolution retry): grayscale + threshold, blur + re-threshold
//! to fuse broken strokes, a cheap accumulated-line pre-check, Sobel/NMS/
//! hysteresis edge detection, body-line extraction, strip-tolerant head
//! extraction, and the pairing logic. The result is a binary accept — no
//! confidence score on this track.

mod edges;
mod hough;
mod matching;

pub(crate) use hough::check_lines;

use crate::canvas::{palette, Rgba};
use crate::raster::{binarize, blur_and_darken, GrayGrid, PixelGrid, RasterParams};
use log::debug;
use serde::{Deserialize, Serialize};

/// The eight arrow directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    UpRight,
    UpLeft,
    DownRight,
    DownLeft,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::UpRight => Direction::DownLeft,
            Direction::UpLeft => Direction::DownRight,
            Direction::DownRight => Direction::UpLeft,
            Direction::DownLeft => Direction::UpRight,
        }
    }

    /// Palette color assigned to single-lined arrows of this direction.
    pub fn color(self) -> Rgba {
        match self {
            Direction::Up => palette::UP,
            Direction::Down => palette::DOWN,
            Direction::Left => palette::LEFT,
            Direction::Right => palette::RIGHT,
            Direction::UpRight => palette::UP_RIGHT,
            Direction::UpLeft => palette::UP_LEFT,
            Direction::DownRight => palette::DOWN_RIGHT,
            Direction::DownLeft => palette::DOWN_LEFT,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::UpRight => "up right",
            Direction::UpLeft => "up left",
            Direction::DownRight => "down right",
            Direction::DownLeft => "down left",
        }
    }
}

/// Single- or double-lined stroke style.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Lining {
    Single,
    Double,
}

/// A detected arrow glyph.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Arrow {
    pub direction: Direction,
    /// Present for double-sided arrows (e.g. up-down).
    pub opposite: Option<Direction>,
    pub lining: Lining,
    /// Index of the originating box in the caller's list.
    pub box_index: usize,
}

impl Arrow {
    /// Annotation color: the direction palette for single-lined arrows,
    /// black for double-lined ones.
    pub fn color(&self) -> Rgba {
        match self.lining {
            Lining::Single => self.direction.color(),
            Lining::Double => palette::DOUBLE_LINED,
        }
    }

    pub fn label(&self) -> String {
        let mut s = String::new();
        if self.lining == Lining::Double {
            s.push_str("double lined ");
        }
        s.push_str(self.direction.label());
        if let Some(op) = self.opposite {
            s.push('-');
            s.push_str(op.label());
        }
        s
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ArrowParams {
    /// Angle bin width in degrees; halved once on retry.
    pub angle_step_deg: usize,
    /// Rho strip width for head extraction.
    pub strip_width: usize,
    /// Hysteresis high threshold on the Sobel magnitude.
    pub high_thresh: f64,
    /// Hysteresis low threshold.
    pub low_thresh: f64,
    /// Size gates: reject before any pixel work.
    pub min_side: i32,
    pub min_long_side: i32,
    pub max_short_side: i32,
    pub max_long_side: i32,
    pub max_area: i64,
}

impl Default for ArrowParams {
    fn default() -> Self {
        Self {
            angle_step_deg: 10,
            strip_width: 5,
            high_thresh: 600.0,
            low_thresh: 500.0,
            min_side: 5,
            min_long_side: 40,
            max_short_side: 200,
            max_long_side: 300,
            max_area: 40_000,
        }
    }
}

impl ArrowParams {
    /// True when the box falls outside the plausible arrow envelope.
    pub fn rejects(&self, min_side: i32, max_side: i32) -> bool {
        min_side < self.min_side
            || max_side < self.min_long_side
            || min_side > self.max_short_side
            || max_side > self.max_long_side
            || min_side as i64 * max_side as i64 > self.max_area
    }
}

/// Run the arrow pipeline on one padded crop at the given angle
/// resolution. `box_index` is filled in by the orchestrator.
pub(crate) fn detect_in_grid(
    grid: &PixelGrid,
    raster: &RasterParams,
    params: &ArrowParams,
    angle_bins: usize,
) -> Option<Arrow> {
    let t_max = (grid.w.max(grid.h) - 1) as f64;
    let t_min = (grid.w.min(grid.h) - 1) as f64;

    let gray = binarize(grid, raster.gray_thresh);
    let fat = blur_and_darken(&gray, raster);

    if check_lines(&fat, t_max / 2.0, angle_bins) == 0 {
        debug!("line pre-check found no backed lines");
        return None;
    }

    let mut edge: GrayGrid = edges::detect_edges(&fat, params);
    let bodies = hough::extract_bodies(&mut edge, t_max / 2.0, angle_bins)?;
    if bodies.len() < 2 {
        debug!("only {} body candidate(s)", bodies.len());
        return None;
    }

    // Strongest support first, stray cover discounted.
    let mut bodies = bodies;
    bodies.sort_by_key(|b| std::cmp::Reverse(b.support()));

    matching::match_arrow(&edge, &bodies, params.strip_width, t_min, angle_bins)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposites_pair_up() {
        for d in [
            Direction::Up,
            Direction::Down,
            Direction::Left,
            Direction::Right,
            Direction::UpRight,
            Direction::UpLeft,
            Direction::DownRight,
            Direction::DownLeft,
        ] {
            assert_eq!(d.opposite().opposite(), d);
        }
    }

    #[test]
    fn labels_and_colors_follow_the_palette() {
        let arrow = Arrow {
            direction: Direction::Up,
            opposite: None,
            lining: Lining::Single,
            box_index: 3,
        };
        assert_eq!(arrow.label(), "up");
        assert_eq!(arrow.color(), crate::canvas::palette::UP);

        let double = Arrow {
            direction: Direction::Right,
            opposite: Some(Direction::Left),
            lining: Lining::Double,
            box_index: 0,
        };
        assert_eq!(double.label(), "double lined right-left");
        assert_eq!(double.color(), crate::canvas::palette::DOUBLE_LINED);
    }

    #[test]
    fn envelope_gate_matches_the_documented_bounds() {
        let p = ArrowParams::default();
        assert!(p.rejects(4, 100), "too thin");
        assert!(p.rejects(30, 30), "too short");
        assert!(p.rejects(250, 260), "short side too large");
        assert!(p.rejects(100, 350), "long side too large");
        assert!(p.rejects(180, 250), "area too large");
        assert!(!p.rejects(30, 100));
    }
}

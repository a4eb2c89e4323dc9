//! Per-box raster preprocessing.
//!
//! Purpose
//! - Turn an RGBA crop into a clean binary ink grid for the two recognition
//!   tracks: plain binarization for the radical track, and a thickening
//!   blur + re-darken pass for the arrow track whose strokes are often
//!   one pixel wide or broken.
//!
//! Design
//! - `PixelGrid` is the RGBA crop, `GrayGrid` the binary working grid
//!   (0 = ink, 255 = background), both row-major with `stride == w`.
//! - The blur is a separable Gaussian built from a configurable 1-D kernel
//!   (default 3 taps, σ = 1); rows/columns where the kernel does not fit are
//!   left untouched rather than clamped, so the 1-px crop border stays
//!   background.
//! - Everything here is a pure function of (grid, params); no state is
//!   retained between boxes.

use crate::canvas::{Canvas, Rgba};
use crate::types::Bbox;
use serde::Deserialize;

/// Thresholds and kernel knobs for the preprocessing stage.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RasterParams {
    /// Luma threshold for the generic binarization pass.
    pub gray_thresh: u8,
    /// Darker threshold applied after the blur to re-solidify strokes.
    pub dark_thresh: u8,
    /// 1-D Gaussian kernel size per axis (odd).
    pub kernel_size: usize,
    /// Gaussian sigma.
    pub sigma: f64,
    /// Boxes with more than this percentage of inked area are skipped by
    /// the radical track.
    pub max_ink_coverage: f64,
}

impl Default for RasterParams {
    fn default() -> Self {
        Self {
            gray_thresh: 230,
            dark_thresh: 100,
            kernel_size: 3,
            sigma: 1.0,
            max_ink_coverage: 55.0,
        }
    }
}

/// Owned RGBA crop of one candidate box.
#[derive(Clone, Debug)]
pub struct PixelGrid {
    pub w: usize,
    pub h: usize,
    data: Vec<Rgba>,
}

impl PixelGrid {
    /// Crop `bbox` (expanded by `pad` pixels on every side) from the page.
    /// Out-of-page reads come back white.
    pub fn crop(canvas: &Canvas, bbox: &Bbox, pad: i32) -> Self {
        let x1 = bbox.min_x - pad;
        let y1 = bbox.min_y - pad;
        let w = (bbox.width() + 2 * pad) as usize;
        let h = (bbox.height() + 2 * pad) as usize;
        let mut data = Vec::with_capacity(w * h);
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                data.push(canvas.get(x1 + x, y1 + y));
            }
        }
        Self { w, h, data }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Rgba {
        self.data[y * self.w + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, c: Rgba) {
        self.data[y * self.w + x] = c;
    }

    /// Force near-white pixels (all channels ≥ 225) to pure white. Removes
    /// faint watermark tint that would otherwise survive binarization.
    pub fn clamp_watermark(&mut self) {
        for px in &mut self.data {
            if px[0] >= 225 && px[1] >= 225 && px[2] >= 225 {
                *px = [255, 255, 255, px[3]];
            }
        }
    }

    /// Whiten all pixels covered by `mask_boxes` (page coordinates). Used to
    /// hide horizontal rule/division-bar boxes from the radical track.
    pub fn mask_boxes(&mut self, origin: (i32, i32), mask_boxes: &[Bbox]) {
        for mb in mask_boxes {
            for y in mb.min_y..=mb.max_y {
                for x in mb.min_x..=mb.max_x {
                    let lx = x - origin.0;
                    let ly = y - origin.1;
                    if lx >= 0 && ly >= 0 && (lx as usize) < self.w && (ly as usize) < self.h {
                        let a = self.get(lx as usize, ly as usize)[3];
                        self.set(lx as usize, ly as usize, [255, 255, 255, a]);
                    }
                }
            }
        }
    }
}

/// Binary working grid: 0 = ink, 255 = background.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayGrid {
    pub w: usize,
    pub h: usize,
    pub data: Vec<u8>,
}

impl GrayGrid {
    pub fn blank(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            data: vec![255u8; w * h],
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.w + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: u8) {
        self.data[y * self.w + x] = v;
    }

    #[inline]
    pub fn is_ink(&self, x: usize, y: usize) -> bool {
        self.get(x, y) == 0
    }

    #[inline]
    pub fn ink_at(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.w && (y as usize) < self.h && self.is_ink(x as usize, y as usize)
    }

    pub fn ink_count(&self) -> usize {
        self.data.iter().filter(|&&v| v == 0).count()
    }
}

/// Rec. 601 luma of an RGBA pixel, rounded.
#[inline]
fn luma(px: Rgba) -> u8 {
    (0.299 * px[0] as f64 + 0.587 * px[1] as f64 + 0.114 * px[2] as f64).round() as u8
}

/// Grayscale + binarize at `thresh`: luma below the threshold becomes ink.
pub fn binarize(grid: &PixelGrid, thresh: u8) -> GrayGrid {
    let mut out = GrayGrid::blank(grid.w, grid.h);
    for y in 0..grid.h {
        for x in 0..grid.w {
            let v = if luma(grid.get(x, y)) < thresh { 0 } else { 255 };
            out.set(x, y, v);
        }
    }
    out
}

/// Normalized 1-D Gaussian kernel of `size` taps.
fn gaussian_kernel(size: usize, sigma: f64) -> Vec<f64> {
    let half = (size as isize - 1) / 2;
    let den = 2.0 * sigma * sigma;
    let mut k = Vec::with_capacity(size);
    let mut sum = 0.0;
    for i in -half..=half {
        let v = (-(i * i) as f64 / den).exp();
        k.push(v);
        sum += v;
    }
    for v in &mut k {
        *v /= sum;
    }
    k
}

/// Separable Gaussian blur followed by re-binarization at `dark_thresh`.
///
/// Thickens thin or broken strokes into solid ink so the edge detector has
/// something to bite on.
pub fn blur_and_darken(gray: &GrayGrid, params: &RasterParams) -> GrayGrid {
    let kernel = gaussian_kernel(params.kernel_size, params.sigma);
    let half = kernel.len() / 2;
    let (w, h) = (gray.w, gray.h);

    // Horizontal pass into a temporary, vertical pass out of it; border
    // rows/columns where the kernel hangs over keep their input value.
    let mut tmp = vec![0f64; w * h];
    for y in 0..h {
        for x in 0..w {
            tmp[y * w + x] = if x >= half && x + half < w {
                let mut acc = 0.0;
                for (k, kv) in kernel.iter().enumerate() {
                    acc += gray.get(x + k - half, y) as f64 * kv;
                }
                acc
            } else {
                gray.get(x, y) as f64
            };
        }
    }
    let mut out = GrayGrid::blank(w, h);
    for y in 0..h {
        for x in 0..w {
            let v = if y >= half && y + half < h {
                let mut acc = 0.0;
                for (k, kv) in kernel.iter().enumerate() {
                    acc += tmp[(y + k - half) * w + x] * kv;
                }
                acc
            } else {
                tmp[y * w + x]
            };
            out.set(x, y, if (v.round() as i64) < params.dark_thresh as i64 { 0 } else { 255 });
        }
    }
    out
}

/// Percentage of the grid that is inked.
pub fn ink_coverage_percent(gray: &GrayGrid) -> f64 {
    let total = gray.w * gray.h;
    if total == 0 {
        return 0.0;
    }
    100.0 * gray.ink_count() as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{Canvas, BLACK};
    use crate::types::Bbox;
    use nalgebra::Point2;

    #[test]
    fn binarize_splits_at_threshold() {
        let mut canvas = Canvas::new(4, 1);
        canvas.set(0, 0, [0, 0, 0, 255]);
        canvas.set(1, 0, [229, 229, 229, 255]);
        canvas.set(2, 0, [231, 231, 231, 255]);
        let grid = PixelGrid::crop(&canvas, &Bbox::new(0, 0, 3, 0), 0);
        let gray = binarize(&grid, 230);
        assert!(gray.is_ink(0, 0));
        assert!(gray.is_ink(1, 0));
        assert!(!gray.is_ink(2, 0));
        assert!(!gray.is_ink(3, 0));
    }

    #[test]
    fn watermark_clamp_whitens_near_white() {
        let mut canvas = Canvas::new(1, 1);
        canvas.set(0, 0, [226, 228, 227, 255]);
        let mut grid = PixelGrid::crop(&canvas, &Bbox::new(0, 0, 0, 0), 0);
        grid.clamp_watermark();
        let gray = binarize(&grid, 230);
        assert!(!gray.is_ink(0, 0));
    }

    #[test]
    fn blur_keeps_solid_strokes_and_drops_specks() {
        let mut canvas = Canvas::new(20, 20);
        canvas.draw_line(
            &Point2::new(10.0, 2.0),
            &Point2::new(10.0, 17.0),
            BLACK,
            2,
        );
        canvas.set(3, 3, BLACK);
        let grid = PixelGrid::crop(&canvas, &Bbox::new(0, 0, 19, 19), 0);
        let gray = binarize(&grid, 230);
        let fat = blur_and_darken(&gray, &RasterParams::default());
        // The two-pixel stroke survives re-darkening...
        assert!(fat.is_ink(10, 10) && fat.is_ink(11, 10));
        // ...while the isolated speck blurs above the dark threshold.
        assert!(!fat.is_ink(3, 3));
    }

    #[test]
    fn coverage_is_a_percentage() {
        let mut gray = GrayGrid::blank(10, 10);
        for x in 0..10 {
            gray.set(x, 0, 0);
        }
        let c = ink_coverage_percent(&gray);
        assert!((c - 10.0).abs() < 1e-9);
    }
}

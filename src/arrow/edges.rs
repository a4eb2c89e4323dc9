//! Sobel edge detection with non-maximum suppression and hysteresis.
//!
//! Produces the binary edge map the Hough stages accumulate over. The
//! gradient direction is quantized to one of five tangent codes so the
//! suppression step compares against the two neighbours along the
//! gradient; hysteresis keeps strong edges and promotes weak ones with a
//! strong 8-neighbour.

use crate::raster::GrayGrid;

use super::ArrowParams;

type Kernel3 = [[f64; 3]; 3];

const SOBEL_KERNEL_X: Kernel3 = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
const SOBEL_KERNEL_Y: Kernel3 = [[1.0, 2.0, 1.0], [0.0, 0.0, 0.0], [-1.0, -2.0, -1.0]];

struct Gradient {
    w: usize,
    mag: Vec<f64>,
    /// Quantized tangent code: round(atan(gy/gx)·4/π) in -2..=2.
    tangent: Vec<i8>,
}

impl Gradient {
    #[inline]
    fn at(&self, x: usize, y: usize) -> f64 {
        self.mag[y * self.w + x]
    }
}

fn sobel(gray: &GrayGrid) -> Gradient {
    let (w, h) = (gray.w, gray.h);
    let mut mag = vec![0f64; w * h];
    let mut tangent = vec![2i8; w * h];
    for y in 1..h.saturating_sub(1) {
        for x in 1..w.saturating_sub(1) {
            let mut gx = 0.0;
            let mut gy = 0.0;
            for ky in 0..3 {
                for kx in 0..3 {
                    let v = gray.get(x + kx - 1, y + ky - 1) as f64;
                    gx += SOBEL_KERNEL_X[ky][kx] * v;
                    gy += SOBEL_KERNEL_Y[ky][kx] * v;
                }
            }
            let idx = y * w + x;
            mag[idx] = (gx * gx + gy * gy).sqrt();
            tangent[idx] = if gx == 0.0 {
                2
            } else {
                ((gy / gx).atan() * 4.0 / std::f64::consts::PI).round() as i8
            };
        }
    }
    Gradient { w, mag, tangent }
}

/// Detect edges: Sobel, direction-aware non-maximum suppression and
/// double-threshold hysteresis. Returns a binary grid with edge pixels as
/// ink; borders are always background.
pub(crate) fn detect_edges(gray: &GrayGrid, params: &ArrowParams) -> GrayGrid {
    let (w, h) = (gray.w, gray.h);
    let mut out = GrayGrid::blank(w, h);
    if w < 3 || h < 3 {
        return out;
    }
    let grad = sobel(gray);

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let mag = grad.at(x, y);
            if mag < params.low_thresh {
                continue;
            }

            // Neighbours along the gradient. Suppress only strict
            // non-maxima: flat ridges keep all their pixels, and the rho
            // deduplication downstream merges them.
            let (n1, n2) = match grad.tangent[y * w + x] {
                0 => (grad.at(x - 1, y), grad.at(x + 1, y)),
                1 => (grad.at(x - 1, y - 1), grad.at(x + 1, y + 1)),
                -1 => (grad.at(x - 1, y + 1), grad.at(x + 1, y - 1)),
                _ => (grad.at(x, y - 1), grad.at(x, y + 1)),
            };
            if mag < n1 || mag < n2 {
                continue;
            }

            let strong = mag > params.high_thresh;
            let promoted = !strong
                && (-1..=1).any(|dy: i32| {
                    (-1..=1).any(|dx: i32| {
                        (dx != 0 || dy != 0)
                            && grad.at((x as i32 + dx) as usize, (y as i32 + dy) as usize)
                                > params.high_thresh
                    })
                });
            if strong || promoted {
                out.set(x, y, 0);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stroke_grid(w: usize, h: usize, x0: usize, x1: usize) -> GrayGrid {
        let mut g = GrayGrid::blank(w, h);
        for y in 0..h {
            for x in x0..=x1 {
                g.set(x, y, 0);
            }
        }
        g
    }

    #[test]
    fn vertical_stroke_yields_edges_on_both_sides() {
        let g = stroke_grid(20, 30, 9, 11);
        let edges = detect_edges(&g, &ArrowParams::default());
        // Each interior row crosses the stroke twice; the gradient plateaus
        // two pixels wide on each side, so four edge pixels survive.
        for y in 2..28 {
            let left = (0..10).filter(|&x| edges.is_ink(x, y)).count();
            let right = (10..20).filter(|&x| edges.is_ink(x, y)).count();
            assert_eq!(left, 2, "row {y}: left side");
            assert_eq!(right, 2, "row {y}: right side");
            assert!(!edges.is_ink(10, y), "stroke interior is not an edge");
        }
    }

    #[test]
    fn flat_image_has_no_edges() {
        let g = GrayGrid::blank(16, 16);
        let edges = detect_edges(&g, &ArrowParams::default());
        assert_eq!(edges.ink_count(), 0);
    }

    #[test]
    fn borders_stay_clear() {
        let g = stroke_grid(10, 10, 0, 9);
        let edges = detect_edges(&g, &ArrowParams::default());
        for x in 0..10 {
            assert!(!edges.is_ink(x, 0));
            assert!(!edges.is_ink(x, 9));
        }
    }
}

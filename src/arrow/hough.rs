//! Rho/theta line accumulation and candidate extraction.
//!
//! The accumulator uses `angle_bins` orientation bins over [0, 180°) and a
//! rho axis spanning four times the grid's larger dimension, offset by
//! twice that dimension so every projection lands in range. Bodies come
//! from exact-bin membership; heads reuse the same accumulator with
//! rho strips summed in place so curved head strokes still concentrate in
//! one bin.

use crate::angle::pixel_distance;
use crate::raster::GrayGrid;
use nalgebra::Point2;

/// An accumulated line candidate with its supporting pixels.
#[derive(Clone, Debug)]
pub(crate) struct HoughLine {
    pub pixels: Vec<(i32, i32)>,
    pub endpoints: [(i32, i32); 2],
    pub rho: usize,
    pub theta: usize,
    /// Pixels counted from the ±2 rho band around the line, used to
    /// discount stray-pixel support.
    pub cover_pixels: usize,
}

impl HoughLine {
    fn new(rho: usize, theta: usize) -> Self {
        Self {
            pixels: Vec::new(),
            endpoints: [(0, 0); 2],
            rho,
            theta,
            cover_pixels: 0,
        }
    }

    /// Distance between the lexicographic extreme members.
    pub fn span(&self) -> f64 {
        let a = self.endpoints[0];
        let b = self.endpoints[1];
        pixel_distance(
            &Point2::new(a.0 as f64, a.1 as f64),
            &Point2::new(b.0 as f64, b.1 as f64),
        )
    }

    /// Effective support after discounting band cover.
    pub fn support(&self) -> i64 {
        self.pixels.len() as i64 - self.cover_pixels as i64
    }

    fn set_endpoints(&mut self) {
        if self.pixels.is_empty() {
            return;
        }
        let mut min = self.pixels[0];
        let mut max = self.pixels[0];
        for &p in &self.pixels {
            if p < min {
                min = p;
            }
            if p > max {
                max = p;
            }
        }
        self.endpoints = [min, max];
    }
}

/// True when two member sets touch (any pixel pair closer than 3).
pub(crate) fn adjacent(a: &HoughLine, b: &HoughLine) -> bool {
    for &(ax, ay) in &a.pixels {
        for &(bx, by) in &b.pixels {
            let d = pixel_distance(
                &Point2::new(ax as f64, ay as f64),
                &Point2::new(bx as f64, by as f64),
            );
            if d < 3.0 {
                return true;
            }
        }
    }
    false
}

pub(crate) struct Accumulator {
    pub angle_bins: usize,
    pub rho_bins: usize,
    offset: i64,
    counts: Vec<u32>,
}

impl Accumulator {
    pub fn new(w: usize, h: usize, angle_bins: usize) -> Self {
        let span = w.max(h).saturating_sub(1).max(1);
        Self {
            angle_bins,
            rho_bins: 4 * span,
            offset: 2 * span as i64,
            counts: vec![0u32; 4 * span * angle_bins],
        }
    }

    /// Rho bin of (x, y) projected at orientation bin `q`.
    #[inline]
    pub fn rho_index(&self, x: i32, y: i32, q: usize) -> usize {
        let angle = q as f64 * std::f64::consts::PI / self.angle_bins as f64;
        let r = (angle.cos() * x as f64 + angle.sin() * y as f64).floor() as i64 + self.offset;
        (r.max(0) as usize).min(self.rho_bins - 1)
    }

    #[inline]
    pub fn count(&self, rho: usize, q: usize) -> u32 {
        self.counts[rho * self.angle_bins + q]
    }

    /// Accumulate every ink pixel of `grid` across all orientation bins.
    pub fn accumulate(&mut self, grid: &GrayGrid) {
        for x in 0..grid.w as i32 {
            for y in 0..grid.h as i32 {
                if !grid.ink_at(x, y) {
                    continue;
                }
                for q in 0..self.angle_bins {
                    let r = self.rho_index(x, y, q);
                    self.counts[r * self.angle_bins + q] += 1;
                }
            }
        }
    }

    /// Sum `strip_w` consecutive rho bins into the lowest one, in place.
    /// Ascending order means each addition reads original values.
    pub fn sum_strips(&mut self, strip_w: usize) {
        if strip_w < 2 || self.rho_bins < strip_w {
            return;
        }
        for p in 0..=self.rho_bins - strip_w {
            for q in 0..self.angle_bins {
                let mut acc = self.counts[p * self.angle_bins + q];
                for r in 1..strip_w {
                    acc += self.counts[(p + r) * self.angle_bins + q];
                }
                self.counts[p * self.angle_bins + q] = acc;
            }
        }
    }

    /// Bins whose count exceeds `thresh`, in scan order.
    fn candidates(&self, thresh: f64) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for p in 0..self.rho_bins {
            for q in 0..self.angle_bins {
                if self.count(p, q) as f64 > thresh {
                    out.push((p, q));
                }
            }
        }
        out
    }
}

/// Fill a candidate's member list with the exact-bin ink pixels.
fn collect_members(grid: &GrayGrid, accum: &Accumulator, line: &mut HoughLine) {
    for x in 0..grid.w as i32 {
        for y in 0..grid.h as i32 {
            if grid.ink_at(x, y) && accum.rho_index(x, y, line.theta) == line.rho {
                line.pixels.push((x, y));
            }
        }
    }
    line.set_endpoints();
}

/// Merge near-duplicate lines (|Δrho| < 2, equal theta), pooling pixels.
fn dedup_lines(mut lines: Vec<HoughLine>) -> Vec<HoughLine> {
    let mut out: Vec<HoughLine> = Vec::new();
    while let Some(line) = lines.pop() {
        if let Some(existing) = out.iter_mut().find(|e| {
            (e.rho as i64 - line.rho as i64).abs() < 2 && e.theta == line.theta
        }) {
            existing.pixels.extend_from_slice(&line.pixels);
        } else {
            out.push(line);
        }
    }
    out
}

/// Extract body candidates from the edge map and erase their member pixels
/// so the head search works on what remains. `None` when nothing survives.
pub(crate) fn extract_bodies(
    edge: &mut GrayGrid,
    threshold: f64,
    angle_bins: usize,
) -> Option<Vec<HoughLine>> {
    let mut accum = Accumulator::new(edge.w, edge.h, angle_bins);
    accum.accumulate(edge);

    let mut kept: Vec<HoughLine> = Vec::new();
    for (rho, theta) in accum.candidates(threshold).into_iter().rev() {
        let mut line = HoughLine::new(rho, theta);
        collect_members(edge, &accum, &mut line);
        if line.span() > threshold && line.support() as f64 > 3.0 * threshold / 4.0 {
            kept.push(line);
        }
    }
    let bodies = dedup_lines(kept);
    if bodies.is_empty() {
        return None;
    }
    for b in &bodies {
        for &(x, y) in &b.pixels {
            edge.set(x as usize, y as usize, 255);
        }
    }
    Some(bodies)
}

/// Cheap pre-check run before edge detection: accept the box only when some
/// accumulated line has genuinely adjacent ink backing it. Returns the
/// count of off-line ink pixels within a 5×5 window of any accepted line's
/// members; zero means the box holds no arrow-like structure.
pub(crate) fn check_lines(gray: &GrayGrid, threshold: f64, angle_bins: usize) -> usize {
    let mut accum = Accumulator::new(gray.w, gray.h, angle_bins);
    accum.accumulate(gray);

    let mut accepted: Vec<HoughLine> = Vec::new();
    for (rho, theta) in accum.candidates(threshold).into_iter().rev() {
        let mut line = HoughLine::new(rho, theta);
        collect_members(gray, &accum, &mut line);
        if line.span() > threshold && line.support() as f64 > 3.0 * threshold / 4.0 {
            accepted.push(line);
        }
    }

    // Widen oblique lines by their ±2 rho band; axis-aligned bins are
    // already exact.
    let quarter = angle_bins / 2;
    for line in &mut accepted {
        if line.theta == 0 || line.theta == quarter {
            continue;
        }
        for x in 0..gray.w as i32 {
            for y in 0..gray.h as i32 {
                if !gray.ink_at(x, y) {
                    continue;
                }
                let r = accum.rho_index(x, y, line.theta) as i64;
                if r != line.rho as i64 && (r - line.rho as i64).abs() <= 2 {
                    line.pixels.push((x, y));
                    line.cover_pixels += 1;
                }
            }
        }
    }

    let mut member = vec![false; gray.w * gray.h];
    for line in &accepted {
        for &(x, y) in &line.pixels {
            member[y as usize * gray.w + x as usize] = true;
        }
    }
    let mut count = 0usize;
    for y in 0..gray.h as i32 {
        for x in 0..gray.w as i32 {
            if !member[y as usize * gray.w + x as usize] {
                continue;
            }
            for dy in -2i32..=2 {
                for dx in -2i32..=2 {
                    let nx = x + dx;
                    let ny = y + dy;
                    if gray.ink_at(nx, ny) && !member[ny as usize * gray.w + nx as usize] {
                        count += 1;
                    }
                }
            }
        }
    }
    count
}

/// Head candidates from the strip-summed accumulator, longest first.
pub(crate) fn find_heads(
    min_span: f64,
    min_body_pixels: usize,
    accum: &Accumulator,
    edge: &GrayGrid,
) -> Vec<HoughLine> {
    let thresh = (min_body_pixels as f64 / 20.0).max(20.0);
    let mut kept: Vec<HoughLine> = Vec::new();
    for (rho, theta) in accum.candidates(thresh).into_iter().rev() {
        let mut line = HoughLine::new(rho, theta);
        collect_members(edge, accum, &mut line);
        if line.span() > min_span / 50.0 {
            kept.push(line);
        }
    }
    let mut heads = dedup_lines(kept);
    heads.sort_by(|a, b| b.pixels.len().cmp(&a.pixels.len()));
    heads
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertical_edge_grid() -> GrayGrid {
        let mut g = GrayGrid::blank(40, 80);
        for y in 5..75 {
            g.set(12, y, 0);
            g.set(26, y, 0);
        }
        g
    }

    #[test]
    fn vertical_lines_are_extracted_as_bodies() {
        let mut g = vertical_edge_grid();
        let bodies = extract_bodies(&mut g, 39.5, 18).expect("two vertical bodies");
        assert_eq!(bodies.len(), 2);
        for b in &bodies {
            assert_eq!(b.theta, 0, "vertical strokes project at theta bin 0");
            assert!(b.span() > 39.5);
        }
        // Members were erased from the edge map.
        assert_eq!(g.ink_count(), 0);
    }

    #[test]
    fn sparse_noise_is_not_a_body() {
        let mut g = GrayGrid::blank(40, 80);
        for i in 0..10 {
            g.set((i * 7) % 40, (i * 13) % 80, 0);
        }
        assert!(extract_bodies(&mut g, 39.5, 18).is_none());
    }

    #[test]
    fn check_lines_accepts_backed_lines_and_rejects_bare_ones() {
        let mut g = vertical_edge_grid();
        // A bare pair of lines has no off-line ink nearby.
        assert_eq!(check_lines(&g, 39.5, 18), 0);
        // Ink right next to a line counts as backing.
        g.set(13, 30, 0);
        g.set(14, 31, 0);
        assert!(check_lines(&g, 39.5, 18) > 0);
    }

    #[test]
    fn strip_summation_pools_consecutive_rho_bins() {
        let mut a = Accumulator::new(30, 30, 18);
        let g = {
            let mut g = GrayGrid::blank(30, 30);
            for y in 2..28 {
                g.set(15, y, 0);
            }
            g
        };
        a.accumulate(&g);
        let rho = a.rho_index(15, 10, 0);
        let before = a.count(rho, 0);
        a.sum_strips(5);
        assert!(a.count(rho.saturating_sub(2), 0) >= before);
    }
}

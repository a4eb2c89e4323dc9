//! Zhang-Suen thinning with a double-layer cleanup pass.
//!
//! Purpose
//! - Reduce a binary glyph to a one-pixel-wide stroke skeleton so the
//!   forest builder sees clean topology.
//!
//! Design
//! - Alternating even/odd passes over interior pixels. For each candidate
//!   the 8-neighbour ring p0..p7 (starting west, clockwise through
//!   north-west) yields the transition count `A` (0→1 steps around the
//!   ring) and the ink count `B`; a pixel is marked when `A == 1`,
//!   `2 ≤ B ≤ 6` and the two parity-dependent neighbour products vanish.
//!   Marks are applied after the sweep, never during it.
//! - The loop stops once a full even+odd cycle removes nothing, or after
//!   the iteration cap; the capped result is used as-is (best effort).
//! - A final 2×2 sweep removes the off-diagonal mates of any fully-ink
//!   diagonal pair, which guarantees no 2×2 all-ink block remains and
//!   keeps the downstream graph free of duplicate edges. This can open a
//!   one-pixel gap in rare configurations.

use crate::raster::GrayGrid;
use log::warn;
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SkeletonParams {
    /// Hard cap on thinning passes; reaching it logs and keeps the partial
    /// result.
    pub max_iterations: usize,
}

impl Default for SkeletonParams {
    fn default() -> Self {
        Self { max_iterations: 500 }
    }
}

/// Ring offsets p0..p7, starting west and walking clockwise on screen
/// (x grows right, y grows down):
///
/// ```text
///   p7 p6 p5
///   p0    p4
///   p1 p2 p3
/// ```
const RING: [(i32, i32); 8] = [
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
];

/// Thin `gray` in place and run the double-layer cleanup.
pub fn skeletonize(gray: &mut GrayGrid, params: &SkeletonParams) {
    thin(gray, params);
    remove_double_layer(gray);
}

fn thin(gray: &mut GrayGrid, params: &SkeletonParams) {
    if gray.w < 3 || gray.h < 3 {
        return;
    }
    let mut even_pass = true;
    let mut removed_in_cycle = 0usize;
    let mut iters = 0usize;
    let mut marks: Vec<(usize, usize)> = Vec::new();

    loop {
        iters += 1;
        if iters > params.max_iterations {
            warn!("thinning hit the {} iteration cap; keeping partial skeleton", params.max_iterations);
            break;
        }

        marks.clear();
        for y in 1..gray.h - 1 {
            for x in 1..gray.w - 1 {
                let mut p = [0u8; 8];
                for (k, (dx, dy)) in RING.iter().enumerate() {
                    let ink = gray.is_ink((x as i32 + dx) as usize, (y as i32 + dy) as usize);
                    p[k] = ink as u8;
                }
                let mut a = 0;
                for k in 0..8 {
                    if p[k] == 0 && p[(k + 1) % 8] == 1 {
                        a += 1;
                    }
                }
                let b: u8 = p.iter().sum();
                let (m1, m2) = if even_pass {
                    (p[0] * p[2] * p[4], p[2] * p[4] * p[6])
                } else {
                    (p[0] * p[2] * p[6], p[0] * p[4] * p[6])
                };
                if a == 1 && (2..=6).contains(&b) && m1 == 0 && m2 == 0 {
                    marks.push((x, y));
                }
            }
        }
        even_pass = !even_pass;

        for &(x, y) in &marks {
            if gray.is_ink(x, y) {
                removed_in_cycle += 1;
            }
            gray.set(x, y, 255);
        }
        // `even_pass` has flipped back: one even+odd cycle is complete.
        if even_pass {
            if removed_in_cycle == 0 {
                break;
            }
            removed_in_cycle = 0;
        }
    }
}

/// Erase the off-diagonal mates of every fully-ink diagonal pair in a 2×2
/// window, in both orientations.
fn remove_double_layer(gray: &mut GrayGrid) {
    if gray.w < 2 || gray.h < 2 {
        return;
    }
    for y in 0..gray.h - 1 {
        for x in 0..gray.w - 1 {
            if gray.is_ink(x, y) && gray.is_ink(x + 1, y + 1) {
                gray.set(x + 1, y, 255);
                gray.set(x, y + 1, 255);
            }
            if gray.is_ink(x + 1, y) && gray.is_ink(x, y + 1) {
                gray.set(x + 1, y + 1, 255);
                gray.set(x, y, 255);
            }
        }
    }
}

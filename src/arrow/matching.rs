//! Pairing of body and head candidates into arrows.
//!
//! Double-lined quadruples are tried before single pairs, otherwise a
//! double-lined arrow would also match as a single-lined one built from
//! its outermost edges. A head pair must spread at least 20° apart, sit at
//! least 20° off both bodies, bisect the body orientation (checked against
//! both the direct and the 90°-complement reading so inverted crops still
//! match), and — for single-lined arrows — touch each other. The winning
//! pair's placement against the four box corners picks the direction.

use super::hough::{adjacent, find_heads, Accumulator, HoughLine};
use super::{Arrow, Direction, Lining};
use crate::angle::pixel_distance;
use crate::raster::GrayGrid;
use log::debug;
use nalgebra::Point2;

/// Comparable length (within 25%) and identical quantized orientation.
fn comparable(a: &HoughLine, b: &HoughLine) -> bool {
    if a.theta != b.theta {
        return false;
    }
    let (d1, d2) = (a.span(), b.span());
    if d1 == 0.0 || d2 == 0.0 {
        return false;
    }
    d1.min(d2) / d1.max(d2) >= 0.8
}

/// Angular pairing conditions between two head candidates and the body.
fn heads_form_arrow(
    h1: &HoughLine,
    h2: &HoughLine,
    body_i: usize,
    body_j: usize,
    angle_bins: usize,
) -> bool {
    let ai = 180.0 / angle_bins as f64;
    let quarter = (angle_bins / 2) as i64;
    let (t1, t2) = (h1.theta as i64, h2.theta as i64);
    let (bi, bj) = (body_i as i64, body_j as i64);

    if (t1 - t2).abs() as f64 * ai < 20.0 {
        return false;
    }
    if (t1 - bi).abs() as f64 * ai < 20.0 && (t1 - bj).abs() as f64 * ai < 20.0 {
        return false;
    }
    if (t2 - bi).abs() as f64 * ai < 20.0 && (t2 - bj).abs() as f64 * ai < 20.0 {
        return false;
    }
    let avg = (t1 + t2) as f64 / 2.0;
    let complement = ((bi + quarter) % angle_bins as i64) as f64;
    if avg != bi as f64 && avg != complement {
        return false;
    }
    if bi - t1 != t2 - bi && bi + quarter - t1 != t2 - bi - quarter {
        return false;
    }
    true
}

/// Decide the direction from the head pair's placement against the four
/// box corners. `None` when no corner is close enough relative to the head
/// mass.
fn give_arrow(
    h1: &HoughLine,
    h2: &HoughLine,
    body_theta: usize,
    w: usize,
    h: usize,
    t_min: f64,
    angle_bins: usize,
) -> Option<Direction> {
    let corner_sum = |cx: f64, cy: f64| -> f64 {
        let c = Point2::new(cx, cy);
        h1.pixels
            .iter()
            .chain(h2.pixels.iter())
            .map(|&(x, y)| pixel_distance(&c, &Point2::new(x as f64, y as f64)))
            .sum()
    };
    let d_tl = corner_sum(0.0, 0.0);
    let d_br = corner_sum((w - 1) as f64, (h - 1) as f64);
    let d_tr = corner_sum((w - 1) as f64, 0.0);
    let d_bl = corner_sum(0.0, (h - 1) as f64);

    let portion = t_min * (h1.pixels.len() + h2.pixels.len()) as f64;
    if d_tl > portion && d_br > portion && d_tr > portion && d_bl > portion {
        debug!("head pair too far from every corner");
        return None;
    }

    let quarter = angle_bins / 2;
    let dir = if body_theta == 0 {
        if d_br < d_tl {
            Direction::Down
        } else {
            Direction::Up
        }
    } else if body_theta == quarter {
        if d_br < d_tl {
            Direction::Right
        } else {
            Direction::Left
        }
    } else if body_theta > quarter {
        if d_br < d_tl {
            Direction::DownRight
        } else {
            Direction::UpLeft
        }
    } else if d_bl > d_tr {
        Direction::UpRight
    } else {
        Direction::DownLeft
    };
    Some(dir)
}

/// Search the remaining head candidates for the opposite direction, which
/// upgrades a match into a double-sided arrow.
#[allow(clippy::too_many_arguments)]
fn search_opposite(
    heads: &[HoughLine],
    e1: usize,
    e2: usize,
    bodies: &[HoughLine],
    i: usize,
    j: usize,
    found: Direction,
    dims: (usize, usize),
    t_min: f64,
    angle_bins: usize,
) -> Option<Direction> {
    let want = found.opposite();
    for h1 in e1..heads.len() {
        for h2 in e2..heads.len() {
            if h1 == h2 {
                continue;
            }
            if !heads_form_arrow(&heads[h1], &heads[h2], bodies[i].theta, bodies[j].theta, angle_bins) {
                continue;
            }
            if !adjacent(&heads[h1], &heads[h2]) {
                continue;
            }
            let dir = give_arrow(
                &heads[h1],
                &heads[h2],
                bodies[i].theta,
                dims.0,
                dims.1,
                t_min,
                angle_bins,
            );
            if dir == Some(want) {
                return Some(want);
            }
        }
    }
    None
}

/// Match bodies and heads on the (body-erased) edge map into an arrow.
pub(crate) fn match_arrow(
    edge: &GrayGrid,
    bodies: &[HoughLine],
    strip_width: usize,
    t_min: f64,
    angle_bins: usize,
) -> Option<Arrow> {
    let dims = (edge.w, edge.h);
    let mut accum = Accumulator::new(edge.w, edge.h, angle_bins);
    accum.accumulate(edge);
    accum.sum_strips(strip_width);

    let n = bodies.len();

    // Double-lined: two roughly-collinear pairs of body edges.
    for i in 0..n {
        for j in i + 1..n {
            if !comparable(&bodies[i], &bodies[j]) {
                continue;
            }
            for k in j + 1..n {
                if !comparable(&bodies[j], &bodies[k]) {
                    continue;
                }
                for l in k + 1..n {
                    if !comparable(&bodies[k], &bodies[l]) {
                        continue;
                    }
                    let min_span = [i, j, k, l]
                        .iter()
                        .map(|&b| bodies[b].span())
                        .fold(f64::INFINITY, f64::min);
                    let min_pixels = [i, j, k, l]
                        .iter()
                        .map(|&b| bodies[b].pixels.len())
                        .min()
                        .unwrap_or(0);
                    let heads = find_heads(min_span, min_pixels, &accum, edge);
                    for e1 in 0..heads.len() {
                        for e2 in 0..heads.len() {
                            if e1 == e2 {
                                continue;
                            }
                            if !heads_form_arrow(
                                &heads[e1],
                                &heads[e2],
                                bodies[i].theta,
                                bodies[j].theta,
                                angle_bins,
                            ) {
                                continue;
                            }
                            let Some(dir) = give_arrow(
                                &heads[e1],
                                &heads[e2],
                                bodies[i].theta,
                                dims.0,
                                dims.1,
                                t_min,
                                angle_bins,
                            ) else {
                                continue;
                            };
                            let opposite = search_opposite(
                                &heads, e1, e2, bodies, i, j, dir, dims, t_min, angle_bins,
                            );
                            return Some(Arrow {
                                direction: dir,
                                opposite,
                                lining: Lining::Double,
                                box_index: 0,
                            });
                        }
                    }
                }
            }
        }
    }

    // Single-lined pairs; head adjacency required.
    for i in 0..n {
        for j in i + 1..n {
            if !comparable(&bodies[i], &bodies[j]) {
                continue;
            }
            let min_span = bodies[i].span().min(bodies[j].span());
            let min_pixels = bodies[i].pixels.len().min(bodies[j].pixels.len());
            let heads = find_heads(min_span, min_pixels, &accum, edge);
            for e1 in 0..heads.len() {
                for e2 in 0..heads.len() {
                    if e1 == e2 {
                        continue;
                    }
                    if !heads_form_arrow(
                        &heads[e1],
                        &heads[e2],
                        bodies[i].theta,
                        bodies[j].theta,
                        angle_bins,
                    ) {
                        continue;
                    }
                    if !adjacent(&heads[e1], &heads[e2]) {
                        continue;
                    }
                    let Some(dir) = give_arrow(
                        &heads[e1],
                        &heads[e2],
                        bodies[i].theta,
                        dims.0,
                        dims.1,
                        t_min,
                        angle_bins,
                    ) else {
                        continue;
                    };
                    let opposite = search_opposite(
                        &heads, e1, e2, bodies, i, j, dir, dims, t_min, angle_bins,
                    );
                    return Some(Arrow {
                        direction: dir,
                        opposite,
                        lining: Lining::Single,
                        box_index: 0,
                    });
                }
            }
        }
    }

    debug!("no arrow matched");
    None
}

//! Branch tracing: split a skeleton into simple pixel polylines.
//!
//! A depth-first walk over ink pixels (8-neighbourhood, fixed probe order)
//! grows one polyline until it reaches a branch event — a pixel with more
//! than one unvisited ink neighbour — where the current polyline ends and
//! each outgoing branch starts a fresh polyline seeded with the branch
//! pixel. The walk is iterative with an explicit frame stack; the budget
//! counts visited pixels per connected trace.

use crate::raster::GrayGrid;
use log::debug;

use super::ForestParams;

/// Probe order: E, SE, S, SW, W, NW, N, NE.
const NEIGH: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

struct Frame {
    x: i32,
    y: i32,
    probe: usize,
    branches: usize,
}

/// Trace all polylines of the skeleton. Returns `None` when a budget cap is
/// exceeded, abandoning the whole region.
pub(super) fn trace_polylines(
    gray: &GrayGrid,
    params: &ForestParams,
) -> Option<Vec<Vec<(i32, i32)>>> {
    let (w, h) = (gray.w, gray.h);
    let mut visited = vec![false; w * h];
    let mut lines: Vec<Vec<(i32, i32)>> = Vec::new();
    let mut frames: Vec<Frame> = Vec::new();

    for x in 0..w as i32 {
        for y in 0..h as i32 {
            if !gray.ink_at(x, y) || visited[y as usize * w + x as usize] {
                continue;
            }

            let mut budget = 0usize;
            lines.push(Vec::new());
            visited[y as usize * w + x as usize] = true;
            frames.clear();
            frames.push(enter(gray, &visited, w, x, y, &mut lines, &mut budget));

            while let Some(top_ix) = frames.len().checked_sub(1) {
                if budget > params.stack_limit {
                    debug!("branch trace exceeded the {} pixel budget; abandoning box", params.stack_limit);
                    return None;
                }
                let (px, py, probe, branches) = {
                    let top = &mut frames[top_ix];
                    if top.probe >= NEIGH.len() {
                        frames.pop();
                        continue;
                    }
                    let probe = top.probe;
                    top.probe += 1;
                    (top.x, top.y, probe, top.branches)
                };
                let (dx, dy) = NEIGH[probe];
                let nx = px + dx;
                let ny = py + dy;
                if !gray.ink_at(nx, ny) || visited[ny as usize * w + nx as usize] {
                    continue;
                }
                if branches > 1 {
                    lines.push(vec![(px, py)]);
                }
                visited[ny as usize * w + nx as usize] = true;
                let frame = enter(gray, &visited, w, nx, ny, &mut lines, &mut budget);
                frames.push(frame);
            }

            // Single-pixel fragments carry no segment information.
            if lines.last().map(|l| l.len() <= 1).unwrap_or(false) {
                lines.pop();
            }
            if lines.len() > params.line_limit {
                debug!("branch trace exceeded the {} line limit; abandoning box", params.line_limit);
                return None;
            }
        }
    }

    Some(lines)
}

/// Visit a pixel: append it to the open polyline and prepare its frame.
fn enter(
    gray: &GrayGrid,
    visited: &[bool],
    w: usize,
    x: i32,
    y: i32,
    lines: &mut Vec<Vec<(i32, i32)>>,
    budget: &mut usize,
) -> Frame {
    *budget += 1;
    let mut branches = 0usize;
    for (dx, dy) in NEIGH {
        let nx = x + dx;
        let ny = y + dy;
        if gray.ink_at(nx, ny) && !visited[ny as usize * w + nx as usize] {
            branches += 1;
        }
    }
    lines
        .last_mut()
        .expect("an open polyline always exists while tracing")
        .push((x, y));
    Frame {
        x,
        y,
        probe: 0,
        branches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_from_rows(rows: &[&str]) -> GrayGrid {
        let h = rows.len();
        let w = rows[0].len();
        let mut g = GrayGrid::blank(w, h);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                if ch == '#' {
                    g.set(x, y, 0);
                }
            }
        }
        g
    }

    #[test]
    fn straight_stroke_is_one_polyline() {
        let g = grid_from_rows(&["........", ".######.", "........"]);
        let lines = trace_polylines(&g, &ForestParams::default()).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), 6);
    }

    #[test]
    fn junction_splits_into_branch_polylines() {
        // A T shape: horizontal bar with a stem dropping from its middle.
        let g = grid_from_rows(&[
            ".........",
            ".#######.",
            "....#....",
            "....#....",
            "....#....",
            ".........",
        ]);
        let lines = trace_polylines(&g, &ForestParams::default()).unwrap();
        assert!(
            lines.len() >= 2,
            "expected a split at the junction, got {} line(s)",
            lines.len()
        );
        let total: usize = lines.iter().map(|l| l.len()).sum();
        // Branch seeds duplicate the junction pixel, so the total is at
        // least the ink count.
        assert!(total >= g.ink_count());
    }

    #[test]
    fn line_cap_abandons_the_region() {
        // A comb with many teeth forces many polylines.
        let mut rows = vec!["#".repeat(41)];
        rows.push("#.#.#.#.#.#.#.#.#.#.#.#.#.#.#.#.#.#.#.#.#".into());
        rows.push("#.#.#.#.#.#.#.#.#.#.#.#.#.#.#.#.#.#.#.#.#".into());
        let refs: Vec<&str> = rows.iter().map(|s| s.as_str()).collect();
        let g = grid_from_rows(&refs);
        let params = ForestParams {
            line_limit: 5,
            ..ForestParams::default()
        };
        assert!(trace_polylines(&g, &params).is_none());
    }
}

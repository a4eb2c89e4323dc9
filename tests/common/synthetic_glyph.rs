//! Synthetic page rasters for the detector integration tests.

use glyph_detector::canvas::{Canvas, BLACK};
use glyph_detector::types::Bbox;
use nalgebra::Point2;

/// Blank white page.
pub fn blank_page(w: usize, h: usize) -> Canvas {
    Canvas::new(w, h)
}

fn stroke(canvas: &mut Canvas, from: (i32, i32), to: (i32, i32), thickness: i32) {
    canvas.draw_line(
        &Point2::new(from.0 as f64, from.1 as f64),
        &Point2::new(to.0 as f64, to.1 as f64),
        BLACK,
        thickness,
    );
}

/// A single horizontal stroke through the middle of `bbox`.
pub fn draw_bar(canvas: &mut Canvas, bbox: &Bbox) {
    let y = (bbox.min_y + bbox.max_y) / 2;
    stroke(canvas, (bbox.min_x, y), (bbox.max_x, y), 1);
}

/// A radical glyph filling a 60×60 box: overhead bar, ~75° slant, ~130°
/// tail and a short terminal serif.
pub fn draw_radical(canvas: &mut Canvas, bbox: &Bbox) {
    let (bx, by) = (bbox.min_x, bbox.min_y);
    let at = |x: i32, y: i32| (bx + x, by + y);
    stroke(canvas, at(56, 6), at(24, 6), 1);
    stroke(canvas, at(24, 6), at(14, 50), 1);
    stroke(canvas, at(14, 50), at(1, 36), 1);
    stroke(canvas, at(1, 36), at(6, 31), 1);
}

/// An upward arrow filling a 30×100 box: vertical body with a symmetric
/// chevron head at the top.
pub fn draw_up_arrow(canvas: &mut Canvas, bbox: &Bbox) {
    let (bx, by) = (bbox.min_x, bbox.min_y);
    let at = |x: i32, y: i32| (bx + x, by + y);
    stroke(canvas, at(15, 12), at(15, 88), 2);
    stroke(canvas, at(15, 12), at(3, 36), 2);
    stroke(canvas, at(15, 12), at(27, 36), 2);
}

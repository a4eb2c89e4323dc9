//! Raster glyph pattern recognition for rendered page images.
//!
//! Given candidate bounding boxes cut from a page canvas, the detector
//! decides whether each box depicts a mathematical radical (√) or a
//! directional arrow glyph. The radical track thins the glyph to a
//! skeleton, extracts a feature-point graph, consolidates it with
//! mean-shift clustering and walks two geometric templates with tunable
//! confidence scoring; the arrow track runs edge detection and Hough-style
//! line accumulation, then pairs body and head candidates. Detection is
//! best-effort: every failure path yields "no detection", never an error.

// Public modules (stable-ish surface)
pub mod canvas;
pub mod detector;
pub mod diagnostics;
pub mod io;
pub mod types;

// Stage-level modules – public, but considered unstable internals.
pub mod angle;
pub mod arrow;
pub mod cluster;
pub mod forest;
pub mod radical;
pub mod raster;
pub mod skeleton;

// --- High-level re-exports -------------------------------------------------

pub use crate::arrow::{Arrow, Direction, Lining};
pub use crate::detector::{DetectorParams, SymbolDetector};
pub use crate::radical::Radical;
pub use crate::types::{Bbox, BoxFlags};

/// Small prelude for quick experiments.
///
/// ```no_run
/// use glyph_detector::prelude::*;
///
/// # fn main() {
/// let mut canvas = Canvas::new(640, 480);
/// let boxes = vec![Bbox::new(100, 100, 160, 160)];
/// let mut flags = vec![BoxFlags::default(); boxes.len()];
///
/// let detector = SymbolDetector::new(DetectorParams::default());
/// let report = detector.detect_radicals(&mut canvas, &boxes, &mut flags);
/// println!("found={} in {:.3} ms", report.radical_found, report.total_ms);
/// # }
/// ```
pub mod prelude {
    pub use crate::canvas::Canvas;
    pub use crate::{Arrow, Bbox, BoxFlags, DetectorParams, Direction, SymbolDetector};
}

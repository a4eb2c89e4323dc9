//! Parameter types configuring the per-box driver.
//!
//! Everything the reference behaviour kept in module globals lives here as
//! explicit, serde-friendly config so per-box analysis stays a pure
//! function of (pixels, params) and boxes can be processed concurrently.

use crate::arrow::ArrowParams;
use crate::forest::ForestParams;
use crate::radical::RadicalParams;
use crate::raster::RasterParams;
use crate::skeleton::SkeletonParams;
use serde::Deserialize;

/// Detector-wide parameters for both recognition tracks.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    pub raster: RasterParams,
    pub skeleton: SkeletonParams,
    pub forest: ForestParams,
    pub radical: RadicalParams,
    pub arrow: ArrowParams,
    pub gates: RadicalGates,
    pub render: RenderParams,
    /// Whiten near-white (watermark) pixels before the radical track.
    pub clamp_watermark: bool,
    /// Whiten sibling boxes shaped like division bars before the radical
    /// track.
    pub mask_rule_boxes: bool,
}

/// Size gates for the radical track.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RadicalGates {
    /// Boxes with a smaller min side are skipped.
    pub min_side: i32,
    /// Boxes with a larger pixel area are skipped.
    pub max_area: i64,
    /// Division-bar mask shape: height cap and width range.
    pub rule_max_height: i32,
    pub rule_min_width: i32,
    pub rule_max_width: i32,
}

impl Default for RadicalGates {
    fn default() -> Self {
        Self {
            min_side: 5,
            max_area: 150_000,
            rule_max_height: 5,
            rule_min_width: 15,
            rule_max_width: 75,
        }
    }
}

/// Canvas annotation switches.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RenderParams {
    /// Outline accepted radical boxes in green.
    pub draw_boxes: bool,
    /// Render the matched forest over accepted radical boxes.
    pub show_forest: bool,
    /// Outline arrow boxes in the detected arrow's color.
    pub draw_arrows: bool,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            draw_boxes: true,
            show_forest: false,
            draw_arrows: true,
        }
    }
}

//! Serializable per-box and per-page reports.

use crate::types::Bbox;
use serde::Serialize;

/// Why a box never reached the recognition pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    TooSmall,
    TooBig,
    TooMuchInk,
}

/// Stage timings for one radical-track box, milliseconds.
#[derive(Clone, Copy, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTimings {
    pub thinning_ms: f64,
    pub forest_ms: f64,
    pub heuristics_ms: f64,
    pub draw_ms: f64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RadicalBoxReport {
    pub index: usize,
    pub bbox: Bbox,
    pub skipped: Option<SkipReason>,
    pub confidence: f64,
    pub found: bool,
    pub timings: StageTimings,
    pub total_ms: f64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RadicalPageReport {
    pub radical_found: bool,
    pub total_ms: f64,
    pub boxes: Vec<RadicalBoxReport>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrowBoxReport {
    pub index: usize,
    pub bbox: Bbox,
    pub skipped: Option<SkipReason>,
    /// Label of the detected arrow, e.g. "double lined up-down".
    pub detected: Option<String>,
    /// Whether the half-resolution retry produced the match.
    pub retried: bool,
    pub total_ms: f64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrowPageReport {
    pub arrows_found: usize,
    pub total_ms: f64,
    pub boxes: Vec<ArrowBoxReport>,
}

//! Per-box driver for both recognition tracks.
//!
//! The detector owns the parameters and exposes sequential entry points
//! plus rayon-parallel variants. Per-box analysis is a pure function of
//! (pixel region, params): the parallel variants snapshot pixel reads per
//! box and defer flag writes and canvas annotation to a serial merge, so
//! results are identical to the sequential path.

use super::params::DetectorParams;
use crate::arrow::{self, Arrow};
use crate::canvas::{palette, Canvas};
use crate::diagnostics::{
    ArrowBoxReport, ArrowPageReport, RadicalBoxReport, RadicalPageReport, SkipReason,
    StageTimings,
};
use crate::forest::build_forest;
use crate::radical::{check_radical, Radical};
use crate::raster::{binarize, ink_coverage_percent, PixelGrid};
use crate::skeleton::skeletonize;
use crate::types::{Bbox, BoxFlags};
use log::{debug, info};
use nalgebra::Point2;
use rayon::prelude::*;
use std::time::Instant;

/// Glyph pattern detector for radical and arrow candidates.
pub struct SymbolDetector {
    params: DetectorParams,
}

struct RadicalAnalysis {
    report: RadicalBoxReport,
    radical: Option<Radical>,
}

struct ArrowAnalysis {
    report: ArrowBoxReport,
    arrow: Option<Arrow>,
}

impl SymbolDetector {
    pub fn new(params: DetectorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    /// Analyze a single box and return the full radical (if any) together
    /// with its confidence. The page entry points consume only the flags;
    /// this is the hook for callers that want the feature chain itself.
    pub fn radical_in_box(&self, canvas: &Canvas, bbox: &Bbox) -> (Option<Radical>, f64) {
        let boxes = [*bbox];
        let analysis = self.analyze_radical_box(canvas, &boxes, 0, &[]);
        (analysis.radical, analysis.report.confidence)
    }

    /// Run the radical track over every box, writing detection flags onto
    /// the caller-owned `flags` slice (parallel to `boxes`).
    pub fn detect_radicals(
        &self,
        canvas: &mut Canvas,
        boxes: &[Bbox],
        flags: &mut [BoxFlags],
    ) -> RadicalPageReport {
        debug_assert_eq!(boxes.len(), flags.len(), "flags must parallel boxes");
        let start = Instant::now();
        let masks = self.rule_masks(boxes);
        let mut reports = Vec::with_capacity(boxes.len());
        for index in 0..boxes.len() {
            let analysis = self.analyze_radical_box(canvas, boxes, index, &masks);
            self.apply_radical(canvas, boxes, flags, &analysis);
            reports.push(analysis.report);
        }
        Self::radical_page_report(reports, start)
    }

    /// Parallel variant of [`detect_radicals`](Self::detect_radicals);
    /// canvas writes are merged serially afterwards.
    pub fn detect_radicals_par(
        &self,
        canvas: &mut Canvas,
        boxes: &[Bbox],
        flags: &mut [BoxFlags],
    ) -> RadicalPageReport {
        let start = Instant::now();
        let masks = self.rule_masks(boxes);
        let snapshot = &*canvas;
        let analyses: Vec<RadicalAnalysis> = (0..boxes.len())
            .into_par_iter()
            .map(|index| self.analyze_radical_box(snapshot, boxes, index, &masks))
            .collect();
        let mut reports = Vec::with_capacity(boxes.len());
        for analysis in analyses {
            self.apply_radical(canvas, boxes, flags, &analysis);
            reports.push(analysis.report);
        }
        Self::radical_page_report(reports, start)
    }

    /// Run the arrow track over every box, annotating the canvas with each
    /// detection's palette color.
    pub fn detect_arrows(&self, canvas: &mut Canvas, boxes: &[Bbox]) -> (Vec<Arrow>, ArrowPageReport) {
        let start = Instant::now();
        let mut arrows = Vec::new();
        let mut reports = Vec::with_capacity(boxes.len());
        for index in 0..boxes.len() {
            let analysis = self.analyze_arrow_box(canvas, &boxes[index], index);
            if let Some(arrow) = analysis.arrow {
                self.apply_arrow(canvas, &boxes[index], &arrow);
                arrows.push(arrow);
            }
            reports.push(analysis.report);
        }
        (arrows, Self::arrow_page_report(reports, start))
    }

    /// Parallel variant of [`detect_arrows`](Self::detect_arrows).
    pub fn detect_arrows_par(
        &self,
        canvas: &mut Canvas,
        boxes: &[Bbox],
    ) -> (Vec<Arrow>, ArrowPageReport) {
        let start = Instant::now();
        let snapshot = &*canvas;
        let analyses: Vec<ArrowAnalysis> = boxes
            .par_iter()
            .enumerate()
            .map(|(index, bbox)| self.analyze_arrow_box(snapshot, bbox, index))
            .collect();
        let mut arrows = Vec::new();
        let mut reports = Vec::with_capacity(boxes.len());
        for analysis in analyses {
            if let Some(arrow) = analysis.arrow {
                self.apply_arrow(canvas, &boxes[arrow.box_index], &arrow);
                arrows.push(arrow);
            }
            reports.push(analysis.report);
        }
        (arrows, Self::arrow_page_report(reports, start))
    }

    /// Division-bar-shaped sibling boxes to whiten before radical analysis.
    fn rule_masks(&self, boxes: &[Bbox]) -> Vec<Bbox> {
        if !self.params.mask_rule_boxes {
            return Vec::new();
        }
        let g = &self.params.gates;
        boxes
            .iter()
            .filter(|b| {
                b.height() <= g.rule_max_height
                    && b.width() >= g.rule_min_width
                    && b.width() <= g.rule_max_width
            })
            .copied()
            .collect()
    }

    fn analyze_radical_box(
        &self,
        canvas: &Canvas,
        boxes: &[Bbox],
        index: usize,
        masks: &[Bbox],
    ) -> RadicalAnalysis {
        let bbox = boxes[index];
        let box_start = Instant::now();
        let mut report = RadicalBoxReport {
            index,
            bbox,
            skipped: None,
            confidence: 0.0,
            found: false,
            timings: StageTimings::default(),
            total_ms: 0.0,
        };

        if bbox.min_side() < self.params.gates.min_side {
            debug!("box {index}: too small");
            report.skipped = Some(SkipReason::TooSmall);
            report.total_ms = ms(box_start);
            return RadicalAnalysis { report, radical: None };
        }
        if bbox.area() > self.params.gates.max_area {
            debug!("box {index}: too big ({})", bbox.area());
            report.skipped = Some(SkipReason::TooBig);
            report.total_ms = ms(box_start);
            return RadicalAnalysis { report, radical: None };
        }

        let mut grid = PixelGrid::crop(canvas, &bbox, 0);
        if self.params.clamp_watermark {
            grid.clamp_watermark();
        }
        if !masks.is_empty() {
            grid.mask_boxes((bbox.min_x, bbox.min_y), masks);
        }
        let mut gray = binarize(&grid, self.params.raster.gray_thresh);

        let coverage = ink_coverage_percent(&gray);
        if coverage > self.params.raster.max_ink_coverage {
            debug!("box {index}: {coverage:.1}% inked, over the coverage gate");
            report.skipped = Some(SkipReason::TooMuchInk);
            report.total_ms = ms(box_start);
            return RadicalAnalysis { report, radical: None };
        }

        let stage = Instant::now();
        skeletonize(&mut gray, &self.params.skeleton);
        report.timings.thinning_ms = ms(stage);

        let stage = Instant::now();
        let tolerance = self.params.forest.tolerance_frac * bbox.min_side() as f64;
        let forest = build_forest(&gray, tolerance, &self.params.forest);
        report.timings.forest_ms = ms(stage);
        let Some(forest) = forest else {
            report.total_ms = ms(box_start);
            return RadicalAnalysis { report, radical: None };
        };

        let stage = Instant::now();
        let (radical, confidence) = check_radical(&forest, &bbox, &self.params.radical);
        report.timings.heuristics_ms = ms(stage);
        report.confidence = confidence;

        let accepted = confidence >= self.params.radical.confidence_thresh;
        report.found = accepted && radical.is_some();
        report.total_ms = ms(box_start);
        let found = report.found;
        RadicalAnalysis {
            report,
            radical: if found { radical } else { None },
        }
    }

    fn apply_radical(
        &self,
        canvas: &mut Canvas,
        boxes: &[Bbox],
        flags: &mut [BoxFlags],
        analysis: &RadicalAnalysis,
    ) {
        let index = analysis.report.index;
        let Some(radical) = &analysis.radical else {
            return;
        };
        let bbox = boxes[index];
        flags[index].is_radical_sym = true;
        flags[index].is_math_sym = true;
        info!(
            "box {index}: radical detected with confidence {:.3}",
            analysis.report.confidence
        );
        if self.params.render.show_forest {
            self.draw_forest(canvas, &bbox, radical);
        }
        if self.params.render.draw_boxes {
            canvas.outline_box(&bbox, palette::ACCEPTED);
        }
    }

    /// Render the matched forest over its (cleared) box.
    fn draw_forest(&self, canvas: &mut Canvas, bbox: &Bbox, radical: &Radical) {
        canvas.clear_box(bbox);
        let origin = Point2::new(bbox.min_x as f64, bbox.min_y as f64);
        let forest = &radical.forest;
        for (ix, p) in forest.iter() {
            let from = origin + p.coords;
            for &n in forest.neighbors(ix) {
                if n > ix {
                    let to = origin + forest.node(n).coords;
                    canvas.draw_line(&from, &to, palette::ACCEPTED, 1);
                }
            }
            canvas.plot(&from, palette::FOREST);
        }
    }

    fn analyze_arrow_box(&self, canvas: &Canvas, bbox: &Bbox, index: usize) -> ArrowAnalysis {
        let box_start = Instant::now();
        let mut report = ArrowBoxReport {
            index,
            bbox: *bbox,
            skipped: None,
            detected: None,
            retried: false,
            total_ms: 0.0,
        };

        if self.params.arrow.rejects(bbox.min_side(), bbox.max_side()) {
            debug!("box {index}: outside the arrow envelope");
            let undersized = bbox.min_side() < self.params.arrow.min_side
                || bbox.max_side() < self.params.arrow.min_long_side;
            report.skipped = Some(if undersized {
                SkipReason::TooSmall
            } else {
                SkipReason::TooBig
            });
            report.total_ms = ms(box_start);
            return ArrowAnalysis { report, arrow: None };
        }

        let grid = PixelGrid::crop(canvas, bbox, 1);
        let bins = 180 / self.params.arrow.angle_step_deg;
        let mut arrow =
            arrow::detect_in_grid(&grid, &self.params.raster, &self.params.arrow, bins);
        if arrow.is_none() {
            // One retry at half the angle resolution.
            arrow = arrow::detect_in_grid(&grid, &self.params.raster, &self.params.arrow, bins * 2);
            report.retried = arrow.is_some();
        }
        if let Some(a) = &mut arrow {
            a.box_index = index;
            report.detected = Some(a.label());
        }
        report.total_ms = ms(box_start);
        ArrowAnalysis { report, arrow }
    }

    fn apply_arrow(&self, canvas: &mut Canvas, bbox: &Bbox, arrow: &Arrow) {
        info!("box {}: {} arrow detected", arrow.box_index, arrow.label());
        if self.params.render.draw_arrows {
            canvas.outline_box(bbox, arrow.color());
        }
    }

    fn radical_page_report(boxes: Vec<RadicalBoxReport>, start: Instant) -> RadicalPageReport {
        RadicalPageReport {
            radical_found: boxes.iter().any(|b| b.found),
            total_ms: ms(start),
            boxes,
        }
    }

    fn arrow_page_report(boxes: Vec<ArrowBoxReport>, start: Instant) -> ArrowPageReport {
        ArrowPageReport {
            arrows_found: boxes.iter().filter(|b| b.detected.is_some()).count(),
            total_ms: ms(start),
            boxes,
        }
    }
}

#[inline]
fn ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}

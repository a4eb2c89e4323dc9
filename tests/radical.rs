mod common;

use common::synthetic_glyph::{blank_page, draw_bar, draw_radical};
use glyph_detector::detector::{DetectorParams, SymbolDetector};
use glyph_detector::types::{Bbox, BoxFlags};

#[test]
fn synthetic_radical_is_accepted_with_high_confidence() {
    let mut canvas = blank_page(200, 200);
    let bbox = Bbox::new(20, 30, 79, 89);
    draw_radical(&mut canvas, &bbox);

    let detector = SymbolDetector::new(DetectorParams::default());
    let boxes = [bbox];
    let mut flags = [BoxFlags::default()];
    let report = detector.detect_radicals(&mut canvas, &boxes, &mut flags);

    assert!(
        report.radical_found,
        "expected a radical, confidence {:.3}",
        report.boxes[0].confidence
    );
    assert!(
        report.boxes[0].confidence >= 0.85,
        "confidence {:.3} below the acceptance threshold",
        report.boxes[0].confidence
    );
    assert!(flags[0].is_radical_sym);
    assert!(flags[0].is_math_sym);
}

#[test]
fn straight_stroke_is_rejected_by_both_heuristics() {
    let mut canvas = blank_page(120, 60);
    let bbox = Bbox::new(10, 20, 49, 24);
    draw_bar(&mut canvas, &bbox);

    let detector = SymbolDetector::new(DetectorParams::default());
    let boxes = [bbox];
    let mut flags = [BoxFlags::default()];
    let report = detector.detect_radicals(&mut canvas, &boxes, &mut flags);

    assert!(!report.radical_found);
    assert_eq!(report.boxes[0].confidence, 0.0);
    assert!(!flags[0].is_radical_sym);
    assert!(!flags[0].is_math_sym);
}

#[test]
fn oversized_and_undersized_boxes_are_gated_out() {
    let mut canvas = blank_page(600, 600);
    let tiny = Bbox::new(10, 10, 12, 13);
    let huge = Bbox::new(0, 0, 499, 399);
    draw_radical(&mut canvas, &Bbox::new(0, 0, 59, 59));

    let detector = SymbolDetector::new(DetectorParams::default());
    let boxes = [tiny, huge];
    let mut flags = [BoxFlags::default(); 2];
    let report = detector.detect_radicals(&mut canvas, &boxes, &mut flags);

    assert!(!report.radical_found);
    assert!(report.boxes[0].skipped.is_some(), "tiny box must be skipped");
    assert!(report.boxes[1].skipped.is_some(), "huge box must be skipped");
}

#[test]
fn parallel_and_sequential_results_agree() {
    let mut canvas_a = blank_page(200, 200);
    let bbox = Bbox::new(20, 30, 79, 89);
    draw_radical(&mut canvas_a, &bbox);
    let mut canvas_b = canvas_a.clone();

    let detector = SymbolDetector::new(DetectorParams::default());
    let boxes = [bbox];

    let mut flags_a = [BoxFlags::default()];
    let seq = detector.detect_radicals(&mut canvas_a, &boxes, &mut flags_a);
    let mut flags_b = [BoxFlags::default()];
    let par = detector.detect_radicals_par(&mut canvas_b, &boxes, &mut flags_b);

    assert_eq!(seq.radical_found, par.radical_found);
    assert_eq!(seq.boxes[0].confidence, par.boxes[0].confidence);
    assert_eq!(flags_a[0].is_radical_sym, flags_b[0].is_radical_sym);
    assert_eq!(canvas_a.as_raw(), canvas_b.as_raw());
}

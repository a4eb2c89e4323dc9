mod common;

use common::synthetic_glyph::{blank_page, draw_up_arrow};
use glyph_detector::canvas::palette;
use glyph_detector::detector::{DetectorParams, SymbolDetector};
use glyph_detector::types::Bbox;
use glyph_detector::{Direction, Lining};

#[test]
fn vertical_stroke_with_chevron_reads_up() {
    let mut canvas = blank_page(120, 160);
    let bbox = Bbox::new(10, 10, 39, 109);
    draw_up_arrow(&mut canvas, &bbox);

    let detector = SymbolDetector::new(DetectorParams::default());
    let (arrows, report) = detector.detect_arrows(&mut canvas, &[bbox]);

    assert_eq!(arrows.len(), 1, "expected one arrow: {:?}", report.boxes);
    let arrow = &arrows[0];
    assert_eq!(arrow.direction, Direction::Up);
    assert_eq!(arrow.lining, Lining::Single);
    assert_eq!(arrow.opposite, None);
    assert_eq!(arrow.box_index, 0);
    assert_eq!(arrow.color(), palette::UP, "up arrows use the up palette color");
    assert_eq!(report.arrows_found, 1);
}

#[test]
fn out_of_envelope_boxes_reject_before_any_pixel_work() {
    let mut canvas = blank_page(500, 500);
    // Longest side over 300px and area over 40,000px².
    let long = Bbox::new(10, 10, 130, 320);
    let wide = Bbox::new(0, 0, 249, 179);
    draw_up_arrow(&mut canvas, &Bbox::new(10, 10, 39, 109));
    let before = canvas.as_raw().to_vec();

    let detector = SymbolDetector::new(DetectorParams::default());
    let (arrows, report) = detector.detect_arrows(&mut canvas, &[long, wide]);

    assert!(arrows.is_empty());
    assert!(report.boxes.iter().all(|b| b.skipped.is_some()));
    assert_eq!(
        canvas.as_raw(),
        &before[..],
        "rejected boxes must leave the canvas untouched"
    );
}

#[test]
fn blank_box_detects_nothing() {
    let mut canvas = blank_page(200, 200);
    let bbox = Bbox::new(20, 20, 59, 119);

    let detector = SymbolDetector::new(DetectorParams::default());
    let (arrows, report) = detector.detect_arrows(&mut canvas, &[bbox]);

    assert!(arrows.is_empty());
    assert_eq!(report.arrows_found, 0);
    assert!(report.boxes[0].skipped.is_none(), "the box passes the gate");
    assert!(report.boxes[0].detected.is_none());
}

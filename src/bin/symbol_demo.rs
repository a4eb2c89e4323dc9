use glyph_detector::canvas::Canvas;
use glyph_detector::detector::{DetectorParams, SymbolDetector};
use glyph_detector::io::{load_rgba_image, save_canvas_png, write_json_file};
use glyph_detector::types::{Bbox, BoxFlags};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct DemoConfig {
    /// Page image to analyze.
    pub input: PathBuf,
    /// Candidate boxes as [minX, minY, maxX, maxY] in page pixels.
    pub boxes: Vec<[i32; 4]>,
    #[serde(default)]
    pub track: Track,
    #[serde(default)]
    pub params: DetectorParams,
    pub output: DemoOutputConfig,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    Radicals,
    Arrows,
    #[default]
    Both,
}

#[derive(Debug, Deserialize)]
pub struct DemoOutputConfig {
    #[serde(rename = "annotated_image")]
    pub annotated_image: PathBuf,
    #[serde(rename = "report_json")]
    pub report_json: PathBuf,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DemoReport {
    radicals: Option<glyph_detector::diagnostics::RadicalPageReport>,
    arrows: Option<glyph_detector::diagnostics::ArrowPageReport>,
    flags: Vec<BoxFlags>,
}

pub fn load_config(path: &Path) -> Result<DemoConfig, String> {
    let data = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    serde_json::from_str(&data)
        .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config = load_config(Path::new(&config_path))?;

    let mut canvas: Canvas = load_rgba_image(&config.input)?;
    let boxes: Vec<Bbox> = config
        .boxes
        .iter()
        .map(|b| Bbox::new(b[0], b[1], b[2], b[3]))
        .collect();
    let mut flags = vec![BoxFlags::default(); boxes.len()];

    let detector = SymbolDetector::new(config.params);

    let radicals = (config.track != Track::Arrows)
        .then(|| detector.detect_radicals(&mut canvas, &boxes, &mut flags));
    let arrows = (config.track != Track::Radicals).then(|| {
        let (found, report) = detector.detect_arrows(&mut canvas, &boxes);
        for arrow in &found {
            println!("box {}: {} arrow", arrow.box_index, arrow.label());
        }
        report
    });

    if let Some(r) = &radicals {
        println!(
            "radical track: found={} over {} boxes in {:.1} ms",
            r.radical_found,
            r.boxes.len(),
            r.total_ms
        );
    }
    if let Some(a) = &arrows {
        println!(
            "arrow track: {} arrow(s) over {} boxes in {:.1} ms",
            a.arrows_found,
            a.boxes.len(),
            a.total_ms
        );
    }

    save_canvas_png(&canvas, &config.output.annotated_image)?;
    write_json_file(
        &config.output.report_json,
        &DemoReport {
            radicals,
            arrows,
            flags,
        },
    )?;

    println!(
        "Saved annotated page to {} and report to {}",
        config.output.annotated_image.display(),
        config.output.report_json.display()
    );
    Ok(())
}

fn usage() -> String {
    "Usage: symbol_demo <config.json>".to_string()
}

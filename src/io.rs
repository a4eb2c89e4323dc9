//! I/O helpers for page images and JSON reports.
//!
//! - `load_rgba_image`: read a PNG/JPEG/etc. into a [`Canvas`].
//! - `save_canvas_png`: write the (annotated) canvas back to disk.
//! - `write_json_file`: pretty-print a serializable value to disk.

use crate::canvas::Canvas;
use image::RgbaImage;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Load an image from disk and convert it to an RGBA canvas.
pub fn load_rgba_image(path: &Path) -> Result<Canvas, String> {
    let img = image::open(path)
        .map_err(|e| format!("Failed to open {}: {e}", path.display()))?
        .into_rgba8();
    let (w, h) = (img.width() as usize, img.height() as usize);
    Canvas::from_rgba8(w, h, img.into_raw())
        .ok_or_else(|| format!("Unexpected buffer size for {}", path.display()))
}

/// Save the canvas as a PNG.
pub fn save_canvas_png(canvas: &Canvas, path: &Path) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let image: RgbaImage =
        RgbaImage::from_raw(canvas.w as u32, canvas.h as u32, canvas.as_raw().to_vec())
            .ok_or_else(|| "Failed to create image buffer".to_string())?;
    image
        .save(path)
        .map_err(|e| format!("Failed to save {}: {e}", path.display()))
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize JSON for {}: {e}", path.display()))?;
    fs::write(path, json).map_err(|e| format!("Failed to write JSON {}: {e}", path.display()))
}

fn ensure_parent_dir(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
        }
    }
    Ok(())
}

//! Orchestrator for per-box glyph recognition.
//!
//! Overview
//! - Applies the size gates before any pixel work, crops each candidate
//!   box from the shared canvas and dispatches to one of the two tracks:
//!   radical (threshold → thin → forest → cluster → template walk with a
//!   confidence threshold) or arrow (threshold → blur → line pre-check →
//!   edges → Hough bodies/heads → pairing, binary accept).
//! - On success the radical track writes detection flags onto the caller's
//!   box entities; the arrow track annotates the canvas in the direction's
//!   palette color and reports the arrow record.
//! - Both tracks allocate fresh state per box, so the same box can go
//!   through either track independently, and the `_par` variants can fan
//!   out across boxes safely.
//!
//! Modules
//! - [`params`] – configuration types used by the detector and the demo
//!   tool.
//! - `pipeline` – the [`SymbolDetector`] implementation.

pub mod params;
mod pipeline;

pub use params::{DetectorParams, RadicalGates, RenderParams};
pub use pipeline::SymbolDetector;

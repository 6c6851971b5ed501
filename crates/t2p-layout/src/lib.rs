// this_file: crates/t2p-layout/src/lib.rs

//! Chunk-based text layout.
//!
//! Leaves are shaped, grouped into lines by baseline (or by reference path),
//! measured net of trailing spacing and anchored once per line. Painting walks
//! the placed glyphs through the outline cache and the path emitter.

pub mod engine;
pub mod measure;
pub mod span;

pub use engine::{anchor_offset, LayoutEngine, LayoutLine, LineDecoration, PaintedText, PlacedGlyph, TextLayout};
pub use measure::{measure_leaf, LeafRun, LocalGlyph};
pub use span::{LeafSpan, TextBlock, TextPathRef, TextStyle};

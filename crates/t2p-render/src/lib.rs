// this_file: crates/t2p-render/src/lib.rs

//! Geometry side of t2p: glyph outlines, baked transforms, textPath
//! sampling, decoration rectangles and path-data serialization.

pub mod decoration;
pub mod emit;
pub mod outlines;
pub mod textpath;
pub mod transform;

pub use decoration::{DecorationMetrics, DecorationRun};
pub use emit::{PathEmitter, Placement};
pub use outlines::{GlyphOutline, OutlineCache, OutlineCommand, DEFAULT_OUTLINE_CACHE};
pub use textpath::PathGeometry;
pub use transform::{length_scale, parse_any, parse_flattenable};

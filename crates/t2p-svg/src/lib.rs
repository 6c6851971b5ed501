// this_file: crates/t2p-svg/src/lib.rs

//! SVG side of t2p: an owned document model, the text property cascade and
//! the driver that swaps `<text>` elements for outline paths.

pub mod convert;
pub mod css;
pub mod document;
pub mod output;
pub mod props;
pub mod spans;

pub use convert::{check_draft_markers, ConversionResult, Converter};
pub use css::StyleMap;
pub use document::{Document, Element, NewNode, NodeId, NodeKind, QName};
pub use output::{OutputBuilder, Replacement, TransformMode, FORWARDED_ATTRIBUTES};
pub use props::ComputedText;
pub use spans::{collect_spans, LeafOrigin, SpanTree, Viewport};

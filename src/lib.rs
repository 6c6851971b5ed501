// this_file: src/lib.rs

//! t2p converts SVG `<text>` elements into font-independent `<path>` outlines.
//!
//! ```no_run
//! use std::sync::Arc;
//! use t2p::{ConversionOptions, Converter, FontCache, FontCacheConfig};
//!
//! let cache = Arc::new(FontCache::new(FontCacheConfig::from_env()));
//! let converter = Converter::with_cache(ConversionOptions::default(), cache);
//! let (svg, result) = converter
//!     .convert_str(r#"<svg xmlns="http://www.w3.org/2000/svg"><text y="20">Hi</text></svg>"#)?;
//! println!("{} paths\n{svg}", result.path_count);
//! # Ok::<(), t2p::T2pError>(())
//! ```

pub use t2p_core::{
    ConversionOptions, Direction, FontKey, FontStyle, GlyphDecodeError, MissingFontError, Result,
    T2pError, TextAnchor,
};
pub use t2p_fontdb::{FallbackRule, FallbackTable, FontCache, FontCacheConfig, MatcherKind, StaticMatcher};
pub use t2p_svg::{check_draft_markers, ConversionResult, Converter, Document};

pub mod model {
    pub use t2p_core::*;
}

pub mod fontdb {
    pub use t2p_fontdb::*;
}

pub mod layout {
    pub use t2p_layout::*;
}

pub mod render {
    pub use t2p_render::*;
}

pub mod shaping {
    pub use t2p_hb::*;
}

pub mod svg {
    pub use t2p_svg::*;
}

pub mod unicode {
    pub use t2p_unicode::*;
}

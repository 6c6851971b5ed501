// this_file: backends/t2p-core/src/lib.rs

//! Core types, error taxonomy and shared caches for the t2p text-to-path converter.

pub mod cache;
pub mod diagnostics;
pub mod error;
pub mod traits;
pub mod types;
pub mod utils;

pub use cache::{CacheStats, FontBytes, FontData, FontDataCache};
pub use diagnostics::ConversionDiagnostics;
pub use error::{GlyphDecodeError, MissingFontError, T2pError};
pub use traits::{FontLocation, FontMatcher, MatchQuery};
pub use types::{
    ConversionOptions, Direction, FeatureSetting, FontKey, FontRole, FontStyle, ScriptBucket,
    ShapedGlyph, TextAnchor, TextDecoration, TextRun, VariationSetting,
};

/// Result type for t2p operations
pub type Result<T> = std::result::Result<T, T2pError>;

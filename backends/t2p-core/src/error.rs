// this_file: backends/t2p-core/src/error.rs

//! Error taxonomy shared by every t2p crate.

use crate::types::FontStyle;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A font request that could not be satisfied.
///
/// Raised both when no face matches the requested family and when neither the
/// primary nor the selected fallback face carries a glyph for some characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingFontError {
    pub family: String,
    pub weight: u16,
    pub style: FontStyle,
    pub stretch: String,
    pub missing_chars: Vec<char>,
}

impl MissingFontError {
    pub fn new(family: impl Into<String>, weight: u16, style: FontStyle, stretch: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            weight,
            style,
            stretch: stretch.into(),
            missing_chars: Vec::new(),
        }
    }

    pub fn with_chars(mut self, chars: impl IntoIterator<Item = char>) -> Self {
        for ch in chars {
            if !self.missing_chars.contains(&ch) {
                self.missing_chars.push(ch);
            }
        }
        self
    }

    /// Identity used when collapsing repeated reports across a document.
    pub fn dedup_key(&self) -> (String, u16, FontStyle, String) {
        (
            self.family.to_lowercase(),
            self.weight,
            self.style,
            self.stretch.to_lowercase(),
        )
    }

    /// Fold another report for the same font into this one.
    pub fn absorb(&mut self, other: &MissingFontError) {
        for &ch in &other.missing_chars {
            if !self.missing_chars.contains(&ch) {
                self.missing_chars.push(ch);
            }
        }
    }
}

impl fmt::Display for MissingFontError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "font not found: {} (weight {}, {}, {})",
            self.family,
            self.weight,
            self.style.as_str(),
            self.stretch
        )?;
        if !self.missing_chars.is_empty() {
            f.write_str(" lacks glyphs for")?;
            for ch in &self.missing_chars {
                write!(f, " U+{:04X}", *ch as u32)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for MissingFontError {}

/// One glyph whose outline could not be decoded. Recovered locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphDecodeError {
    pub font: PathBuf,
    pub glyph_id: u16,
    pub character: Option<char>,
}

impl fmt::Display for GlyphDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "glyph {} in {} has no decodable outline", self.glyph_id, self.font.display())?;
        if let Some(ch) = self.character {
            write!(f, " (U+{:04X})", ch as u32)?;
        }
        Ok(())
    }
}

impl std::error::Error for GlyphDecodeError {}

/// Errors produced while converting text to paths.
#[derive(Debug, Error)]
pub enum T2pError {
    #[error(transparent)]
    MissingFont(#[from] MissingFontError),

    #[error("{} missing font(s): {}", .0.len(), join_missing(.0))]
    MissingFonts(Vec<MissingFontError>),

    #[error("Unsupported document structure: {reason}")]
    DocumentStructure { reason: String },

    #[error("Failed to load font at {path}: {source}")]
    FontLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid font file at {path} (face {face_index}): {reason}")]
    InvalidFont {
        path: PathBuf,
        face_index: u32,
        reason: String,
    },

    #[error("Font matcher timed out after {timeout_ms}ms for pattern {pattern}")]
    MatcherTimeout { pattern: String, timeout_ms: u64 },

    #[error("XML error: {0}")]
    Xml(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn join_missing(errors: &[MissingFontError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl T2pError {
    pub fn font_load(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FontLoad {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_font(path: impl Into<PathBuf>, face_index: u32, reason: impl Into<String>) -> Self {
        Self::InvalidFont {
            path: path.into(),
            face_index,
            reason: reason.into(),
        }
    }

    pub fn structure(reason: impl Into<String>) -> Self {
        Self::DocumentStructure {
            reason: reason.into(),
        }
    }

    /// Every missing-font report carried by this error, if any.
    pub fn missing_fonts(&self) -> Vec<&MissingFontError> {
        match self {
            Self::MissingFont(err) => vec![err],
            Self::MissingFonts(errs) => errs.iter().collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_font_display() {
        let err = MissingFontError::new("Nope Sans", 700, FontStyle::Italic, "normal")
            .with_chars(['\u{0627}', '\u{0627}', 'x']);
        let msg = err.to_string();
        assert!(msg.contains("Nope Sans"));
        assert!(msg.contains("weight 700"));
        assert!(msg.contains("italic"));
        assert!(msg.contains("U+0627"));
        assert_eq!(err.missing_chars.len(), 2);
    }

    #[test]
    fn test_dedup_key_ignores_case() {
        let a = MissingFontError::new("Foo", 400, FontStyle::Normal, "normal");
        let b = MissingFontError::new("FOO", 400, FontStyle::Normal, "Normal");
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn test_absorb_merges_chars() {
        let mut a = MissingFontError::new("Foo", 400, FontStyle::Normal, "normal").with_chars(['a']);
        let b = MissingFontError::new("Foo", 400, FontStyle::Normal, "normal").with_chars(['a', 'b']);
        a.absorb(&b);
        assert_eq!(a.missing_chars, vec!['a', 'b']);
    }

    #[test]
    fn test_aggregate_error_lists_all_fonts() {
        let err = T2pError::MissingFonts(vec![
            MissingFontError::new("Foo", 400, FontStyle::Normal, "normal"),
            MissingFontError::new("Bar", 700, FontStyle::Normal, "normal"),
        ]);
        let msg = err.to_string();
        assert!(msg.starts_with("2 missing font(s)"));
        assert!(msg.contains("Foo") && msg.contains("Bar"));
        assert_eq!(err.missing_fonts().len(), 2);
    }

    #[test]
    fn test_structure_error_message() {
        let err = T2pError::structure("sodipodi markup");
        assert!(err.to_string().contains("sodipodi markup"));
        assert!(err.missing_fonts().is_empty());
    }

    #[test]
    fn test_glyph_decode_display() {
        let err = GlyphDecodeError {
            font: PathBuf::from("/tmp/a.ttf"),
            glyph_id: 42,
            character: Some('A'),
        };
        assert!(err.to_string().contains("glyph 42"));
        assert!(err.to_string().contains("U+0041"));
    }
}

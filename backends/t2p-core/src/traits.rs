// this_file: backends/t2p-core/src/traits.rs

//! Seams between the converter and external font-matching services.

use crate::types::FontStyle;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A face on disk, as answered by a matcher.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FontLocation {
    pub path: PathBuf,
    pub face_index: u32,
}

impl FontLocation {
    pub fn new(path: impl Into<PathBuf>, face_index: u32) -> Self {
        Self {
            path: path.into(),
            face_index,
        }
    }
}

/// Structured request handed to a [`FontMatcher`].
///
/// Mirrors the fontconfig pattern grammar: every field except the family is
/// optional so callers can express progressively looser candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchQuery {
    pub family: String,
    pub style_name: Option<String>,
    pub weight: Option<u16>,
    pub slant: Option<FontStyle>,
    pub width: Option<String>,
    pub lang: Option<String>,
}

impl MatchQuery {
    pub fn family(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            ..Default::default()
        }
    }

    /// Query addressed only by language, e.g. `:lang=ar`.
    pub fn lang(lang: impl Into<String>) -> Self {
        Self {
            lang: Some(lang.into()),
            ..Default::default()
        }
    }

    pub fn with_style_name(mut self, name: impl Into<String>) -> Self {
        self.style_name = Some(name.into());
        self
    }

    pub fn with_weight(mut self, weight: u16) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn with_slant(mut self, slant: FontStyle) -> Self {
        self.slant = Some(slant);
        self
    }

    pub fn with_width(mut self, width: impl Into<String>) -> Self {
        self.width = Some(width.into());
        self
    }

    /// Render as a fontconfig pattern string.
    pub fn to_pattern(&self) -> String {
        let mut pattern = self.family.clone();
        if let Some(style) = &self.style_name {
            pattern.push_str(":style=");
            pattern.push_str(style);
        }
        if let Some(weight) = self.weight {
            pattern.push_str(&format!(":weight={weight}"));
        }
        if let Some(slant) = self.slant.filter(FontStyle::is_slanted) {
            pattern.push_str(":slant=");
            pattern.push_str(slant.as_str());
        }
        if let Some(width) = &self.width {
            pattern.push_str(":width=");
            pattern.push_str(width);
        }
        if let Some(lang) = &self.lang {
            pattern.push_str(":lang=");
            pattern.push_str(lang);
        }
        pattern
    }
}

/// System font-matching facility (fontconfig or equivalent).
///
/// Implementations must bound their own latency; a stalled lookup is reported
/// as [`crate::T2pError::MatcherTimeout`] rather than blocking forever.
pub trait FontMatcher: Send + Sync {
    /// Matcher name for diagnostics
    fn name(&self) -> &str;

    /// Answers are explicit aliases and skip family-name verification.
    fn is_authoritative(&self) -> bool {
        false
    }

    /// Resolve a query to a face on disk, `Ok(None)` when nothing matches.
    fn match_query(&self, query: &MatchQuery) -> Result<Option<FontLocation>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_rendering() {
        let q = MatchQuery::family("Arial")
            .with_style_name("Italic")
            .with_weight(400)
            .with_slant(FontStyle::Italic);
        assert_eq!(q.to_pattern(), "Arial:style=Italic:weight=400:slant=italic");
    }

    #[test]
    fn test_normal_slant_is_omitted() {
        let q = MatchQuery::family("Arial")
            .with_slant(FontStyle::Normal)
            .with_width("condensed");
        assert_eq!(q.to_pattern(), "Arial:width=condensed");
    }

    #[test]
    fn test_lang_pattern() {
        assert_eq!(MatchQuery::lang("ar").to_pattern(), ":lang=ar");
    }
}

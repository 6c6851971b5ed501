// this_file: backends/t2p-core/src/types.rs

//! Data model shared across segmentation, shaping, layout and emission.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Slant requested for a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
    Oblique,
}

impl FontStyle {
    /// Parse a CSS `font-style` value. Unknown values resolve to normal.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "italic" => Self::Italic,
            v if v.starts_with("oblique") => Self::Oblique,
            _ => Self::Normal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Italic => "italic",
            Self::Oblique => "oblique",
        }
    }

    pub fn is_slanted(&self) -> bool {
        !matches!(self, Self::Normal)
    }
}

/// Map generic aliases onto their CSS spelling.
pub fn normalize_generic_family(family: &str) -> String {
    let trimmed = family.trim().trim_matches(|c| c == '"' || c == '\'').trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "sans" => "sans-serif".to_string(),
        "mono" => "monospace".to_string(),
        _ => trimmed.to_string(),
    }
}

/// Immutable description of a requested face.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FontKey {
    pub family: String,
    pub weight: u16,
    pub style: FontStyle,
    pub stretch: String,
    /// Editor hint of the form `"Family, Style"`.
    pub vendor_spec: Option<String>,
}

impl Default for FontKey {
    fn default() -> Self {
        Self::new("Arial")
    }
}

impl FontKey {
    pub fn new(family: impl Into<String>) -> Self {
        Self {
            family: normalize_generic_family(&family.into()),
            weight: 400,
            style: FontStyle::Normal,
            stretch: "normal".to_string(),
            vendor_spec: None,
        }
    }

    pub fn with_weight(mut self, weight: u16) -> Self {
        self.weight = weight.clamp(100, 900);
        self
    }

    pub fn with_style(mut self, style: FontStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_stretch(mut self, stretch: impl Into<String>) -> Self {
        self.stretch = stretch.into();
        self
    }

    pub fn with_vendor_spec(mut self, spec: impl Into<String>) -> Self {
        let spec = spec.into();
        self.vendor_spec = if spec.trim().is_empty() { None } else { Some(spec) };
        self
    }

    /// Canonical lowercase key: `family:weight:style:stretch:vendor`.
    pub fn cache_key(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}",
            self.family,
            self.weight,
            self.style.as_str(),
            self.stretch,
            self.vendor_spec.as_deref().unwrap_or("")
        )
        .to_lowercase()
    }
}

/// Horizontal text direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Direction {
    #[default]
    #[serde(rename = "ltr")]
    LeftToRight,
    #[serde(rename = "rtl")]
    RightToLeft,
}

impl Direction {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ltr" => Some(Self::LeftToRight),
            "rtl" => Some(Self::RightToLeft),
            _ => None,
        }
    }

    pub fn is_rtl(&self) -> bool {
        matches!(self, Self::RightToLeft)
    }
}

/// Coarse script classification used for run splitting and fallback selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptBucket {
    Latin,
    Arabic,
    Cjk,
    Neutral,
}

impl ScriptBucket {
    /// ISO 15924 tag handed to the shaper.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Latin => "Latn",
            Self::Arabic => "Arab",
            Self::Cjk => "Hani",
            Self::Neutral => "Zyyy",
        }
    }
}

/// A maximal substring sharing one direction and one script bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    /// Byte range into the segmented text.
    pub range: Range<usize>,
    pub direction: Direction,
    pub script: ScriptBucket,
}

/// One glyph as returned by the shaper, in font units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapedGlyph {
    pub glyph_id: u16,
    /// Byte offset of the source cluster in the leaf text.
    pub cluster: usize,
    pub x_advance: i32,
    pub y_advance: i32,
    pub x_offset: i32,
    pub y_offset: i32,
}

/// Which face produced a shaped segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontRole {
    Primary,
    Fallback,
}

/// An OpenType feature toggle such as `'liga' 0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureSetting {
    pub tag: String,
    pub value: u32,
}

/// A variation axis coordinate such as `'wght' 650`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariationSetting {
    pub tag: String,
    pub value: f32,
}

/// Line anchoring, from `text-anchor` or legacy `text-align`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAnchor {
    #[default]
    Start,
    Middle,
    End,
}

impl TextAnchor {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "start" => Some(Self::Start),
            "middle" => Some(Self::Middle),
            "end" => Some(Self::End),
            _ => None,
        }
    }

    /// Map CSS `text-align` onto an anchor.
    pub fn from_text_align(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "center" => Some(Self::Middle),
            "left" => Some(Self::Start),
            "right" => Some(Self::End),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Middle => "middle",
            Self::End => "end",
        }
    }
}

/// Decoration lines requested by `text-decoration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TextDecoration {
    pub underline: bool,
    pub line_through: bool,
}

impl TextDecoration {
    pub fn parse(value: &str) -> Self {
        let lower = value.to_ascii_lowercase();
        Self {
            underline: lower.contains("underline"),
            line_through: lower.contains("line-through"),
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.underline && !self.line_through
    }
}

/// Options recognised by the converter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionOptions {
    /// Decimal places written for every path coordinate.
    pub precision: usize,
    /// Forward `style` and `class` verbatim onto generated paths.
    pub preserve_styles: bool,
    /// Overrides the `direction` property of every text element.
    pub base_direction: Option<Direction>,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            precision: 6,
            preserve_styles: false,
            base_direction: None,
        }
    }
}

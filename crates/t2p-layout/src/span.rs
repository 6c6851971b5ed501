// this_file: crates/t2p-layout/src/span.rs

//! Layout input: resolved leaf spans and the text block they belong to.

use t2p_core::{
    Direction, FeatureSetting, FontKey, TextAnchor, TextDecoration, VariationSetting,
};
use t2p_render::PathGeometry;

/// Computed text properties of one leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font: FontKey,
    pub font_size: f64,
    pub letter_spacing: f64,
    pub word_spacing: f64,
    pub anchor: TextAnchor,
    pub decoration: TextDecoration,
    pub features: Vec<FeatureSetting>,
    pub variations: Vec<VariationSetting>,
    pub lang: Option<String>,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font: FontKey::default(),
            font_size: 16.0,
            letter_spacing: 0.0,
            word_spacing: 0.0,
            anchor: TextAnchor::Start,
            decoration: TextDecoration::default(),
            features: Vec::new(),
            variations: Vec::new(),
            lang: None,
        }
    }
}

/// One literal text run of the text/tspan/textPath tree.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafSpan {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub explicit_x: bool,
    pub explicit_y: bool,
    /// Per-character horizontal shifts.
    pub dx: Vec<f64>,
    /// Per-character baseline shifts.
    pub dy: Vec<f64>,
    pub style: TextStyle,
    pub on_path: bool,
}

impl LeafSpan {
    pub fn new(text: impl Into<String>, x: f64, y: f64, style: TextStyle) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            explicit_x: false,
            explicit_y: false,
            dx: Vec::new(),
            dy: Vec::new(),
            style,
            on_path: false,
        }
    }

    pub fn explicit(mut self, x: bool, y: bool) -> Self {
        self.explicit_x = x;
        self.explicit_y = y;
        self
    }

    pub fn has_explicit_position(&self) -> bool {
        self.explicit_x || self.explicit_y
    }
}

/// Reference geometry for leaves laid out along a path.
#[derive(Debug, Clone)]
pub struct TextPathRef {
    pub geometry: PathGeometry,
    /// Already resolved and clamped to `[0, length]`.
    pub start_offset: f64,
}

/// Everything laid out for one `<text>` element.
#[derive(Debug, Clone)]
pub struct TextBlock {
    pub leaves: Vec<LeafSpan>,
    pub x: f64,
    pub y: f64,
    /// Anchor of the text element, resolved once per line.
    pub anchor: TextAnchor,
    pub direction: Direction,
    pub path: Option<TextPathRef>,
}

impl TextBlock {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            leaves: Vec::new(),
            x,
            y,
            anchor: TextAnchor::Start,
            direction: Direction::LeftToRight,
            path: None,
        }
    }

    pub fn with_anchor(mut self, anchor: TextAnchor) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn push(&mut self, leaf: LeafSpan) -> &mut Self {
        self.leaves.push(leaf);
        self
    }
}

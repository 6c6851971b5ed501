// this_file: backends/t2p-core/src/diagnostics.rs

//! Conversion diagnostics helpers used for structured debug logging.

use crate::types::{Direction, FontKey, TextAnchor};
use log::{debug, log_enabled, Level};

const PREVIEW_CHARS: usize = 24;

/// Lightweight snapshot of one text element as it enters layout.
#[derive(Debug)]
pub struct ConversionDiagnostics<'a> {
    element_id: Option<&'a str>,
    preview: String,
    font: &'a FontKey,
    font_size: f32,
    anchor: TextAnchor,
    direction: Direction,
    leaf_count: usize,
    flattened: bool,
}

impl<'a> ConversionDiagnostics<'a> {
    /// Capture the diagnostic snapshot for the provided element.
    pub fn new(
        element_id: Option<&'a str>,
        text: &str,
        font: &'a FontKey,
        font_size: f32,
        anchor: TextAnchor,
        direction: Direction,
    ) -> Self {
        let mut preview: String = text.chars().take(PREVIEW_CHARS).collect();
        if text.chars().count() > PREVIEW_CHARS {
            preview.push('…');
        }
        Self {
            element_id,
            preview,
            font,
            font_size,
            anchor,
            direction,
            leaf_count: 0,
            flattened: true,
        }
    }

    pub fn with_leaf_count(mut self, leaf_count: usize) -> Self {
        self.leaf_count = leaf_count;
        self
    }

    /// Record whether the element transform could be baked into outlines.
    pub fn with_flattened(mut self, flattened: bool) -> Self {
        self.flattened = flattened;
        self
    }

    pub fn preview(&self) -> &str {
        &self.preview
    }

    /// Emit the diagnostic snapshot at debug level when logging is enabled.
    pub fn log(&self) {
        if log_enabled!(target: "t2p::convert", Level::Debug) {
            debug!(
                target: "t2p::convert",
                "id={id} text={text:?} font={font} size={size:.2} anchor={anchor} dir={dir} leaves={leaves} flattened={flat}",
                id = self.element_id.unwrap_or("<anon>"),
                text = self.preview,
                font = self.font.cache_key(),
                size = self.font_size,
                anchor = self.anchor.as_str(),
                dir = if self.direction.is_rtl() { "rtl" } else { "ltr" },
                leaves = self.leaf_count,
                flat = self.flattened,
            );
        }
    }
}

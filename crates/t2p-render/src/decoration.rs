// this_file: crates/t2p-render/src/decoration.rs

//! Underline and line-through rectangles.

use crate::emit::PathEmitter;
use kurbo::{Affine, Point};
use t2p_core::TextDecoration;
use t2p_fontdb::{LineMetrics, ResolvedFont};

/// Underline and strikeout bands in font units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecorationMetrics {
    pub underline: LineMetrics,
    pub strikeout: LineMetrics,
}

impl DecorationMetrics {
    /// Metrics used when a face declares none, as fractions of the em.
    pub fn fallback(units_per_em: u16) -> Self {
        let em = units_per_em as f32;
        Self {
            underline: LineMetrics {
                position: -0.1 * em,
                thickness: 0.05 * em,
            },
            strikeout: LineMetrics {
                position: 0.3 * em,
                thickness: 0.05 * em,
            },
        }
    }

    pub fn from_font(font: &ResolvedFont) -> Self {
        let defaults = Self::fallback(font.units_per_em());
        Self {
            underline: font.underline().unwrap_or(defaults.underline),
            strikeout: font.strikeout().unwrap_or(defaults.strikeout),
        }
    }
}

/// Horizontal extent of decorated text on one baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecorationRun {
    pub start_x: f64,
    pub end_x: f64,
    pub baseline: f64,
    /// font-size / units-per-em of the font supplying the metrics
    pub scale: f64,
    pub metrics: DecorationMetrics,
}

impl DecorationRun {
    /// Corner points of every requested band, underline first.
    pub fn rects(&self, decoration: TextDecoration) -> Vec<[Point; 4]> {
        let mut rects = Vec::new();
        if decoration.underline {
            rects.push(self.band(self.metrics.underline));
        }
        if decoration.line_through {
            rects.push(self.band(self.metrics.strikeout));
        }
        rects
    }

    fn band(&self, metrics: LineMetrics) -> [Point; 4] {
        let top = self.baseline - metrics.position as f64 * self.scale;
        let bottom = top + metrics.thickness as f64 * self.scale;
        [
            Point::new(self.start_x, top),
            Point::new(self.end_x, top),
            Point::new(self.end_x, bottom),
            Point::new(self.start_x, bottom),
        ]
    }

    /// Path data for every requested band, through the baked matrix.
    pub fn emit(
        &self,
        emitter: &PathEmitter,
        decoration: TextDecoration,
        matrix: Option<Affine>,
    ) -> Vec<String> {
        self.rects(decoration)
            .iter()
            .map(|rect| emitter.polygon(rect, matrix))
            .collect()
    }
}

// this_file: crates/t2p-layout/src/measure.rs

//! Per-leaf pen walk: glyph offsets relative to the leaf start, advance and
//! trailing spacing. Placement and width measurement share this walk so they
//! can never disagree.

use crate::span::LeafSpan;
use std::collections::HashSet;
use std::sync::Arc;
use t2p_core::ShapedGlyph;
use t2p_hb::ShapedText;

/// A glyph positioned relative to its leaf.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalGlyph {
    /// Index into the leaf's shaped segments.
    pub segment: usize,
    pub glyph: ShapedGlyph,
    pub character: Option<char>,
    /// Origin x from the leaf start, `x_offset` included.
    pub pen_x: f64,
    /// Σdy so far within the leaf minus `y_offset`, y down.
    pub shift_y: f64,
    pub scale: f64,
}

/// Result of walking one leaf.
#[derive(Debug, Clone)]
pub struct LeafRun {
    pub shaped: Arc<ShapedText>,
    pub glyphs: Vec<LocalGlyph>,
    /// Pen advance including spacing after the final cluster.
    pub advance: f64,
    /// Letter and word spacing contributed by the final cluster.
    pub trailing: f64,
    /// Σdy over the leaf.
    pub dy_total: f64,
}

impl LeafRun {
    /// Advance net of trailing spacing.
    pub fn width(&self) -> f64 {
        self.advance - self.trailing
    }

    /// Scale of the first logical segment, if any.
    pub fn first_scale(&self, font_size: f64) -> Option<f64> {
        self.shaped
            .segments
            .first()
            .map(|s| s.scale(font_size as f32) as f64)
    }
}

/// Walk `shaped` in visual order applying dx/dy and spacing once per cluster.
pub fn measure_leaf(leaf: &LeafSpan, shaped: Arc<ShapedText>) -> LeafRun {
    let char_starts: Vec<(usize, char)> = leaf.text.char_indices().collect();
    let char_at = |cluster: usize| -> Option<(usize, char)> {
        let idx = char_starts.partition_point(|(start, _)| *start <= cluster);
        idx.checked_sub(1).map(|i| (i, char_starts[i].1))
    };

    let style = &leaf.style;
    let mut glyphs = Vec::with_capacity(shaped.glyph_count());
    let mut seen = HashSet::new();
    let mut pen = 0.0;
    let mut dy_acc = 0.0;
    let mut trailing = 0.0;

    for &seg_idx in &shaped.visual_order {
        let segment = &shaped.segments[seg_idx];
        let scale = segment.scale(style.font_size as f32) as f64;
        for glyph in &segment.glyphs {
            let located = char_at(glyph.cluster);
            let first_in_cluster = seen.insert(glyph.cluster);
            let mut spacing = 0.0;
            if first_in_cluster {
                if let Some((ci, ch)) = located {
                    pen += leaf.dx.get(ci).copied().unwrap_or(0.0);
                    dy_acc += leaf.dy.get(ci).copied().unwrap_or(0.0);
                    spacing = style.letter_spacing;
                    if ch == ' ' {
                        spacing += style.word_spacing;
                    }
                }
            }

            glyphs.push(LocalGlyph {
                segment: seg_idx,
                glyph: *glyph,
                character: located.map(|(_, ch)| ch),
                pen_x: pen + glyph.x_offset as f64 * scale,
                shift_y: dy_acc - glyph.y_offset as f64 * scale,
                scale,
            });

            pen += glyph.x_advance as f64 * scale + spacing;
            if first_in_cluster {
                trailing = spacing;
            }
        }
    }

    LeafRun {
        shaped,
        glyphs,
        advance: pen,
        trailing,
        dy_total: dy_acc,
    }
}

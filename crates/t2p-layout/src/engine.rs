// this_file: crates/t2p-layout/src/engine.rs

//! Line grouping, anchor resolution and glyph placement.

use crate::measure::{measure_leaf, LeafRun};
use crate::span::{LeafSpan, TextBlock};
use kurbo::{Affine, Point, Vec2};
use log::{debug, warn};
use t2p_core::{Direction, GlyphDecodeError, Result, TextAnchor, TextDecoration};
use t2p_hb::{ShapeRequest, Shaper};
use t2p_render::{DecorationMetrics, DecorationRun, OutlineCache, PathEmitter, Placement};
use t2p_unicode::is_default_ignorable;

const BASELINE_EPSILON: f64 = 1e-6;

/// Offset applied to a line of `width` for `anchor`.
pub fn anchor_offset(anchor: TextAnchor, width: f64, direction: Direction) -> f64 {
    match (anchor, direction) {
        (TextAnchor::Start, Direction::LeftToRight) => 0.0,
        (TextAnchor::Start, Direction::RightToLeft) => -width,
        (TextAnchor::Middle, _) => -width / 2.0,
        (TextAnchor::End, Direction::LeftToRight) => -width,
        (TextAnchor::End, Direction::RightToLeft) => 0.0,
    }
}

/// A glyph with its final placement, before the element matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedGlyph {
    pub leaf: usize,
    pub segment: usize,
    pub glyph_id: u16,
    pub character: Option<char>,
    pub placement: Placement,
}

/// Decoration bands of one line, painted into the first decorated leaf.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineDecoration {
    pub leaf: usize,
    /// Union of the bands requested by the line's leaves.
    pub decoration: TextDecoration,
    pub run: DecorationRun,
}

/// Leaves sharing one baseline (or one reference path).
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutLine {
    pub leaves: Vec<usize>,
    pub baseline: f64,
    pub base_x: f64,
    /// Measured width net of trailing spacing.
    pub width: f64,
    pub anchor_offset: f64,
    pub on_path: bool,
    pub glyphs: Vec<PlacedGlyph>,
    /// Never set for lines on a path.
    pub decoration: Option<LineDecoration>,
}

/// Shaped leaves plus their lines.
#[derive(Debug, Clone)]
pub struct TextLayout {
    pub runs: Vec<LeafRun>,
    pub lines: Vec<LayoutLine>,
}

impl TextLayout {
    pub fn glyph_count(&self) -> usize {
        self.lines.iter().map(|l| l.glyphs.len()).sum()
    }
}

/// Path data per leaf, in leaf order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaintedText {
    pub leaves: Vec<String>,
    pub glyph_count: usize,
    pub decode_errors: Vec<GlyphDecodeError>,
}

impl PaintedText {
    /// Every leaf's data joined into one `d` value.
    pub fn joined(&self) -> String {
        self.leaves
            .iter()
            .filter(|d| !d.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Lays out [`TextBlock`]s and paints them into path data.
pub struct LayoutEngine<'a> {
    shaper: &'a Shaper,
    outlines: &'a OutlineCache,
}

impl<'a> LayoutEngine<'a> {
    pub fn new(shaper: &'a Shaper, outlines: &'a OutlineCache) -> Self {
        Self { shaper, outlines }
    }

    /// Shape every leaf, group lines and place glyphs.
    pub fn layout(&self, block: &TextBlock) -> Result<TextLayout> {
        let mut runs = Vec::with_capacity(block.leaves.len());
        for leaf in &block.leaves {
            let request = ShapeRequest {
                text: &leaf.text,
                font: &leaf.style.font,
                base: block.direction,
                features: &leaf.style.features,
                variations: &leaf.style.variations,
                lang: leaf.style.lang.as_deref(),
            };
            let shaped = self.shaper.shape(&request)?;
            runs.push(measure_leaf(leaf, shaped));
        }

        let lines = group_lines(block)
            .into_iter()
            .map(|(on_path, leaves)| place_line(block, &runs, leaves, on_path))
            .collect::<Vec<_>>();
        for line in &lines {
            debug!(
                target: "t2p::layout",
                "line y={} leaves={} width={:.3} anchor_offset={:.3} path={}",
                line.baseline,
                line.leaves.len(),
                line.width,
                line.anchor_offset,
                line.on_path
            );
        }
        Ok(TextLayout { runs, lines })
    }

    /// Emit outlines and decorations for every leaf, through `matrix`.
    ///
    /// Glyphs that fail to decode are skipped and reported; their advance is
    /// already part of the layout.
    pub fn paint(
        &self,
        block: &TextBlock,
        layout: &TextLayout,
        matrix: Option<Affine>,
        emitter: &PathEmitter,
    ) -> Result<PaintedText> {
        let mut painted = PaintedText {
            leaves: vec![String::new(); block.leaves.len()],
            ..Default::default()
        };

        for line in &layout.lines {
            for placed in &line.glyphs {
                if placed.glyph_id == 0 {
                    continue;
                }
                let segment = &layout.runs[placed.leaf].shaped.segments[placed.segment];
                match self
                    .outlines
                    .outline(&segment.font, placed.glyph_id, &segment.variations)?
                {
                    Some(outline) => {
                        let placement = placed.placement.with_matrix(matrix);
                        emitter.emit_into(&mut painted.leaves[placed.leaf], &outline, &placement);
                        painted.glyph_count += 1;
                    }
                    None if is_blank(placed.character) => {}
                    None => {
                        let err = GlyphDecodeError {
                            font: segment.font.path().to_path_buf(),
                            glyph_id: placed.glyph_id,
                            character: placed.character,
                        };
                        warn!(target: "t2p::layout", "{err}");
                        painted.decode_errors.push(err);
                    }
                }
            }

            if let Some(deco) = &line.decoration {
                for d in deco.run.emit(emitter, deco.decoration, matrix) {
                    let out = &mut painted.leaves[deco.leaf];
                    if !out.is_empty() {
                        out.push(' ');
                    }
                    out.push_str(&d);
                }
            }
        }
        Ok(painted)
    }
}

fn is_blank(ch: Option<char>) -> bool {
    ch.map_or(true, |c| c.is_whitespace() || is_default_ignorable(c))
}

/// Split leaves into lines: (on path, leaf indices).
fn group_lines(block: &TextBlock) -> Vec<(bool, Vec<usize>)> {
    let mut lines: Vec<(bool, Vec<usize>, f64)> = Vec::new();
    for (idx, leaf) in block.leaves.iter().enumerate() {
        let on_path = leaf.on_path && block.path.is_some();
        let starts_line = match lines.last() {
            None => true,
            Some((line_on_path, _, _)) if *line_on_path != on_path => true,
            Some((true, _, _)) => false,
            Some((false, _, y)) => (leaf.y - y).abs() > BASELINE_EPSILON || leaf.explicit_x,
        };
        if starts_line {
            lines.push((on_path, Vec::new(), leaf.y));
        }
        if let Some((_, leaves, _)) = lines.last_mut() {
            leaves.push(idx);
        }
    }
    lines
        .into_iter()
        .map(|(on_path, leaves, _)| (on_path, leaves))
        .collect()
}

fn place_line(block: &TextBlock, runs: &[LeafRun], leaves: Vec<usize>, on_path: bool) -> LayoutLine {
    let first = &block.leaves[leaves[0]];
    let baseline = first.y;
    let base_x = leaves
        .iter()
        .map(|&i| &block.leaves[i])
        .find(|leaf| leaf.has_explicit_position())
        .map_or(block.x, |leaf| leaf.x);

    let advance: f64 = leaves.iter().map(|&i| runs[i].advance).sum();
    let trailing = leaves
        .iter()
        .rev()
        .map(|&i| &runs[i])
        .find(|run| !run.glyphs.is_empty())
        .map_or(0.0, |run| run.trailing);
    let width = advance - trailing;
    let line_offset = anchor_offset(block.anchor, width, block.direction);

    let mut glyphs = Vec::new();
    let mut cursor = 0.0;
    let mut dy_line = 0.0;
    for &idx in &leaves {
        let leaf: &LeafSpan = &block.leaves[idx];
        let run = &runs[idx];
        // a leaf with its own anchor is shifted by that anchor alone
        let leaf_x = if leaf.style.anchor != block.anchor {
            cursor + anchor_offset(leaf.style.anchor, run.width(), block.direction)
        } else {
            line_offset + cursor
        };

        for local in &run.glyphs {
            let placement = match (&block.path, on_path) {
                (Some(path), true) => {
                    let length = path.geometry.length();
                    let arc = (path.start_offset + leaf_x + local.pen_x).clamp(0.0, length);
                    let (point, tangent) = path.geometry.sample(arc);
                    let normal = Vec2::new(-tangent.y, tangent.x);
                    let origin = point + normal * (dy_line + local.shift_y);
                    Placement::new(origin, local.scale).with_rotation(tangent)
                }
                _ => Placement::new(
                    Point::new(base_x + leaf_x + local.pen_x, baseline + dy_line + local.shift_y),
                    local.scale,
                ),
            };
            glyphs.push(PlacedGlyph {
                leaf: idx,
                segment: local.segment,
                glyph_id: local.glyph.glyph_id,
                character: local.character,
                placement,
            });
        }

        cursor += run.advance;
        dy_line += run.dy_total;
    }

    let decoration = if on_path {
        None
    } else {
        line_decoration(block, runs, &leaves, base_x + line_offset, width, baseline)
    };

    LayoutLine {
        leaves,
        baseline,
        base_x,
        width,
        anchor_offset: line_offset,
        on_path,
        glyphs,
        decoration,
    }
}

/// One band set spanning the whole measured line.
///
/// Metrics come from the first font of the line's first shaped leaf; the band
/// follows the `dy` shift applied at the start of the line.
fn line_decoration(
    block: &TextBlock,
    runs: &[LeafRun],
    leaves: &[usize],
    start_x: f64,
    width: f64,
    baseline: f64,
) -> Option<LineDecoration> {
    let mut decoration = TextDecoration::default();
    let mut owner = None;
    for &idx in leaves {
        let requested = block.leaves[idx].style.decoration;
        if requested.is_empty() || runs[idx].glyphs.is_empty() {
            continue;
        }
        decoration.underline |= requested.underline;
        decoration.line_through |= requested.line_through;
        owner.get_or_insert(idx);
    }
    let leaf = owner?;

    let &dominant = leaves.iter().find(|&&i| !runs[i].glyphs.is_empty())?;
    let run = &runs[dominant];
    let segment = run.shaped.segments.first()?;
    let scale = run.first_scale(block.leaves[dominant].style.font_size)?;
    let shift = block.leaves[leaves[0]].dy.first().copied().unwrap_or(0.0);
    Some(LineDecoration {
        leaf,
        decoration,
        run: DecorationRun {
            start_x,
            end_x: start_x + width,
            baseline: baseline + shift,
            scale,
            metrics: DecorationMetrics::from_font(&segment.font),
        },
    })
}

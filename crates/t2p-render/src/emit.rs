// this_file: crates/t2p-render/src/emit.rs

//! Serialize recorded outlines as SVG path data.
//!
//! Font-unit points go through scale (with the y flip), the textPath rotation,
//! the glyph origin and finally the baked element matrix.

use crate::outlines::{GlyphOutline, OutlineCommand};
use kurbo::{Affine, Point, Vec2};
use t2p_core::utils::write_number;

/// Where and how one glyph lands in user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub origin: Point,
    /// font-size / units-per-em
    pub scale: f64,
    /// Unit tangent for glyphs on a path.
    pub rotation: Option<Vec2>,
    pub matrix: Option<Affine>,
}

impl Placement {
    pub fn new(origin: Point, scale: f64) -> Self {
        Self {
            origin,
            scale,
            rotation: None,
            matrix: None,
        }
    }

    pub fn with_rotation(mut self, tangent: Vec2) -> Self {
        self.rotation = Some(tangent);
        self
    }

    pub fn with_matrix(mut self, matrix: Option<Affine>) -> Self {
        self.matrix = matrix;
        self
    }

    /// Map a font-unit point to the output coordinate.
    pub fn map(&self, px: f32, py: f32) -> Point {
        let lx = px as f64 * self.scale;
        let ly = -(py as f64) * self.scale;
        let (rx, ry) = match self.rotation {
            Some(t) => (lx * t.x - ly * t.y, lx * t.y + ly * t.x),
            None => (lx, ly),
        };
        let p = Point::new(self.origin.x + rx, self.origin.y + ry);
        match self.matrix {
            Some(m) => m * p,
            None => p,
        }
    }
}

/// Writes `M/L/Q/C/Z` path data at a fixed decimal precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathEmitter {
    precision: usize,
}

impl Default for PathEmitter {
    fn default() -> Self {
        Self { precision: 6 }
    }
}

impl PathEmitter {
    pub fn new(precision: usize) -> Self {
        Self { precision }
    }

    pub fn precision(&self) -> usize {
        self.precision
    }

    /// Path data for one glyph.
    pub fn emit(&self, outline: &GlyphOutline, placement: &Placement) -> String {
        let mut out = String::with_capacity(outline.commands().len() * 24);
        self.emit_into(&mut out, outline, placement);
        out
    }

    /// Append path data for one glyph to `out`, space-separated from what is there.
    pub fn emit_into(&self, out: &mut String, outline: &GlyphOutline, placement: &Placement) {
        for command in outline.commands() {
            match command {
                OutlineCommand::MoveTo(x, y) => {
                    self.op(out, 'M');
                    self.point(out, placement.map(*x, *y));
                }
                OutlineCommand::LineTo(x, y) => {
                    self.op(out, 'L');
                    self.point(out, placement.map(*x, *y));
                }
                OutlineCommand::QuadTo {
                    ctrl_x,
                    ctrl_y,
                    x,
                    y,
                } => {
                    self.op(out, 'Q');
                    self.point(out, placement.map(*ctrl_x, *ctrl_y));
                    self.point(out, placement.map(*x, *y));
                }
                OutlineCommand::CurveTo {
                    ctrl1_x,
                    ctrl1_y,
                    ctrl2_x,
                    ctrl2_y,
                    x,
                    y,
                } => {
                    self.op(out, 'C');
                    self.point(out, placement.map(*ctrl1_x, *ctrl1_y));
                    self.point(out, placement.map(*ctrl2_x, *ctrl2_y));
                    self.point(out, placement.map(*x, *y));
                }
                OutlineCommand::Close => self.op(out, 'Z'),
            }
        }
    }

    /// Closed polygon in already-final coordinates, after `matrix`.
    pub fn polygon(&self, points: &[Point], matrix: Option<Affine>) -> String {
        let mut out = String::new();
        for (i, p) in points.iter().enumerate() {
            let p = matrix.map_or(*p, |m| m * *p);
            self.op(&mut out, if i == 0 { 'M' } else { 'L' });
            self.point(&mut out, p);
        }
        if !points.is_empty() {
            self.op(&mut out, 'Z');
        }
        out
    }

    fn op(&self, out: &mut String, op: char) {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push(op);
    }

    fn point(&self, out: &mut String, p: Point) {
        out.push(' ');
        write_number(out, p.x, self.precision);
        out.push(' ');
        write_number(out, p.y, self.precision);
    }
}

// this_file: crates/t2p-render/src/textpath.rs

//! Arc-length sampling of textPath reference geometry.

use kurbo::{Affine, BezPath, ParamCurve, ParamCurveArclen, ParamCurveDeriv, PathSeg, Point, Vec2};

const ACCURACY: f64 = 1e-3;

/// A reference path measured by arc length.
#[derive(Debug, Clone)]
pub struct PathGeometry {
    segments: Vec<(PathSeg, f64)>,
    length: f64,
}

impl PathGeometry {
    /// Parse path data, applying the referenced element's own `transform`.
    pub fn from_svg(d: &str, transform: Option<Affine>) -> Option<Self> {
        let mut path = BezPath::from_svg(d).ok()?;
        if let Some(m) = transform {
            path.apply_affine(m);
        }
        Some(Self::new(&path))
    }

    pub fn new(path: &BezPath) -> Self {
        let segments: Vec<(PathSeg, f64)> = path
            .segments()
            .map(|seg| {
                let len = seg.arclen(ACCURACY);
                (seg, len)
            })
            .collect();
        let length = segments.iter().map(|(_, len)| len).sum();
        Self { segments, length }
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Resolve a `startOffset` value: an absolute length or a percentage of
    /// the total length, clamped to `[0, length]`.
    pub fn start_offset(&self, value: &str) -> f64 {
        let value = value.trim();
        let offset = match value.strip_suffix('%') {
            Some(pct) => pct.trim().parse::<f64>().unwrap_or(0.0) / 100.0 * self.length,
            None => value
                .trim_end_matches("px")
                .parse::<f64>()
                .unwrap_or(0.0),
        };
        offset.clamp(0.0, self.length)
    }

    /// Point and unit tangent at arc position `arc`, clamped onto the path.
    pub fn sample(&self, arc: f64) -> (Point, Vec2) {
        let Some((last, _)) = self.segments.last() else {
            return (Point::ZERO, Vec2::new(1.0, 0.0));
        };
        let mut remaining = arc.clamp(0.0, self.length);
        for (seg, len) in &self.segments {
            if remaining <= *len {
                let t = if *len > 0.0 {
                    seg.inv_arclen(remaining, ACCURACY)
                } else {
                    0.0
                };
                return (seg.eval(t), tangent(seg, t));
            }
            remaining -= len;
        }
        (last.eval(1.0), tangent(last, 1.0))
    }
}

fn tangent(seg: &PathSeg, t: f64) -> Vec2 {
    let d = seg.to_cubic().deriv().eval(t).to_vec2();
    let d = if d.hypot() > 1e-12 {
        d
    } else {
        seg.end() - seg.start()
    };
    let len = d.hypot();
    if len > 1e-12 {
        d / len
    } else {
        Vec2::new(1.0, 0.0)
    }
}

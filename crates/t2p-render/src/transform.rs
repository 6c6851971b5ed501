// this_file: crates/t2p-render/src/transform.rs

//! Reduce SVG transform lists to a single affine matrix.

use kurbo::Affine;
use svgtypes::{TransformListParser, TransformListToken};

/// Parse a transform list made only of `matrix`, `translate` and `scale`.
///
/// Returns `None` when the list contains `rotate`/`skewX`/`skewY` or does not
/// parse, in which case the attribute has to be kept verbatim.
pub fn parse_flattenable(value: &str) -> Option<Affine> {
    compose(value, false)
}

/// Parse any transform list, rotation and skew included.
pub fn parse_any(value: &str) -> Option<Affine> {
    compose(value, true)
}

fn compose(value: &str, allow_rotation: bool) -> Option<Affine> {
    let mut matrix = Affine::IDENTITY;
    for token in TransformListParser::from(value) {
        let step = match token.ok()? {
            TransformListToken::Matrix { a, b, c, d, e, f } => Affine::new([a, b, c, d, e, f]),
            TransformListToken::Translate { tx, ty } => Affine::translate((tx, ty)),
            TransformListToken::Scale { sx, sy } => Affine::scale_non_uniform(sx, sy),
            TransformListToken::Rotate { angle } if allow_rotation => {
                Affine::rotate(angle.to_radians())
            }
            TransformListToken::SkewX { angle } if allow_rotation => {
                Affine::skew(angle.to_radians().tan(), 0.0)
            }
            TransformListToken::SkewY { angle } if allow_rotation => {
                Affine::skew(0.0, angle.to_radians().tan())
            }
            _ => return None,
        };
        // later entries apply first
        matrix = matrix * step;
    }
    Some(matrix)
}

/// Average axis scale of `matrix`, used to rescale forwarded lengths.
pub fn length_scale(matrix: &Affine) -> f64 {
    let [a, b, c, d, _, _] = matrix.as_coeffs();
    let sx = a.hypot(b);
    let sy = c.hypot(d);
    let avg = (sx + sy) / 2.0;
    if avg.is_finite() && avg > 0.0 {
        avg
    } else if sx.max(sy) > 0.0 {
        sx.max(sy)
    } else {
        1.0
    }
}

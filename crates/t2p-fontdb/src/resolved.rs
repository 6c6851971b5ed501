// this_file: crates/t2p-fontdb/src/resolved.rs

//! A loaded, verified face.

use std::collections::HashMap;
use std::path::Path;
use t2p_core::{FontData, FontKey, FontLocation, Result, T2pError};
use ttf_parser::name_id;

/// Decoration line metrics in font units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMetrics {
    pub position: f32,
    pub thickness: f32,
}

impl From<ttf_parser::LineMetrics> for LineMetrics {
    fn from(m: ttf_parser::LineMetrics) -> Self {
        Self {
            position: m.position as f32,
            thickness: m.thickness as f32,
        }
    }
}

/// Declared range of one variation axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisRange {
    pub tag: String,
    pub min: f32,
    pub default: f32,
    pub max: f32,
}

/// Font bytes plus everything the pipeline needs without reparsing.
pub struct ResolvedFont {
    key: FontKey,
    location: FontLocation,
    data: FontData,
    family_name: String,
    units_per_em: u16,
    coverage: HashMap<u32, u16>,
    underline: Option<LineMetrics>,
    strikeout: Option<LineMetrics>,
    axes: Vec<AxisRange>,
}

impl std::fmt::Debug for ResolvedFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedFont")
            .field("family", &self.family_name)
            .field("path", &self.location.path)
            .field("face_index", &self.location.face_index)
            .field("glyphs", &self.coverage.len())
            .finish()
    }
}

impl ResolvedFont {
    /// Parse `data` and collect coverage, metrics and axes.
    pub fn load(key: FontKey, location: FontLocation, data: FontData) -> Result<Self> {
        let face = ttf_parser::Face::parse(&data, location.face_index).map_err(|e| {
            T2pError::invalid_font(location.path.clone(), location.face_index, e.to_string())
        })?;

        let mut coverage = HashMap::new();
        if let Some(cmap) = face.tables().cmap {
            for subtable in cmap.subtables {
                if !subtable.is_unicode() {
                    continue;
                }
                subtable.codepoints(|cp| {
                    if let Some(gid) = subtable.glyph_index(cp) {
                        if gid.0 != 0 {
                            coverage.entry(cp).or_insert(gid.0);
                        }
                    }
                });
            }
        }

        let family_name = face_family(&face).unwrap_or_else(|| key.family.clone());
        let axes = face
            .variation_axes()
            .into_iter()
            .map(|axis| AxisRange {
                tag: axis.tag.to_string(),
                min: axis.min_value,
                default: axis.def_value,
                max: axis.max_value,
            })
            .collect();

        Ok(Self {
            units_per_em: face.units_per_em(),
            underline: face.underline_metrics().map(Into::into),
            strikeout: face.strikeout_metrics().map(Into::into),
            family_name,
            coverage,
            axes,
            key,
            location,
            data,
        })
    }

    /// Parsed face borrowing the shared bytes.
    pub fn face(&self) -> Result<ttf_parser::Face<'_>> {
        ttf_parser::Face::parse(&self.data, self.location.face_index).map_err(|e| {
            T2pError::invalid_font(self.location.path.clone(), self.location.face_index, e.to_string())
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn key(&self) -> &FontKey {
        &self.key
    }

    pub fn location(&self) -> &FontLocation {
        &self.location
    }

    pub fn path(&self) -> &Path {
        &self.location.path
    }

    pub fn face_index(&self) -> u32 {
        self.location.face_index
    }

    /// Family name reported by the face itself.
    pub fn family_name(&self) -> &str {
        &self.family_name
    }

    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    pub fn glyph_for(&self, ch: char) -> Option<u16> {
        self.coverage.get(&(ch as u32)).copied()
    }

    pub fn covers(&self, ch: char) -> bool {
        self.coverage.contains_key(&(ch as u32))
    }

    pub fn coverage_count(&self, chars: &[char]) -> usize {
        chars.iter().filter(|ch| self.covers(**ch)).count()
    }

    pub fn underline(&self) -> Option<LineMetrics> {
        self.underline
    }

    pub fn strikeout(&self) -> Option<LineMetrics> {
        self.strikeout
    }

    pub fn axes(&self) -> &[AxisRange] {
        &self.axes
    }

    /// Clamp `value` into the declared range of `tag`, `None` if the face lacks the axis.
    pub fn clamp_variation(&self, tag: &str, value: f32) -> Option<f32> {
        self.axes
            .iter()
            .find(|axis| axis.tag == tag)
            .map(|axis| value.clamp(axis.min, axis.max))
    }
}

/// Typographic family (name ID 16) with the legacy family (ID 1) as fallback.
pub fn face_family(face: &ttf_parser::Face<'_>) -> Option<String> {
    let lookup = |id: u16| {
        face.names()
            .into_iter()
            .filter(|name| name.name_id == id)
            .find_map(|name| name.to_string())
            .filter(|s| !s.trim().is_empty())
    };
    lookup(name_id::TYPOGRAPHIC_FAMILY).or_else(|| lookup(name_id::FAMILY))
}

// this_file: backends/t2p-hb/src/lib.rs

//! Shaping orchestration on top of rustybuzz.
//!
//! Text is segmented into direction+script runs, each run is split by
//! per-character font coverage (primary face or one script fallback) and every
//! resulting segment is shaped on its own. Segments come back in logical order
//! together with their bidi levels and the visual order.

pub mod fallback;

use fallback::{missing_chars, select_fallback, split_by_coverage};
use log::debug;
use lru::LruCache;
use parking_lot::Mutex;
use rustybuzz::ttf_parser::Tag;
use rustybuzz::{Feature, Language, UnicodeBuffer, Variation};
use std::num::NonZeroUsize;
use std::ops::Range;
use std::str::FromStr;
use std::sync::Arc;
use t2p_core::{
    Direction, FeatureSetting, FontKey, FontRole, MissingFontError, Result, ShapedGlyph, T2pError,
    VariationSetting,
};
use t2p_fontdb::{FontCache, ResolvedFont};
use t2p_unicode::{bidi_level, visual_order, Segmenter};

const DEFAULT_SHAPE_CACHE: usize = 256;

/// Everything that influences shaping of one leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeRequest<'a> {
    pub text: &'a str,
    pub font: &'a FontKey,
    pub base: Direction,
    pub features: &'a [FeatureSetting],
    pub variations: &'a [VariationSetting],
    pub lang: Option<&'a str>,
}

impl<'a> ShapeRequest<'a> {
    pub fn new(text: &'a str, font: &'a FontKey) -> Self {
        Self {
            text,
            font,
            base: Direction::LeftToRight,
            features: &[],
            variations: &[],
            lang: None,
        }
    }

    fn cache_key(&self) -> String {
        let mut key = format!(
            "{}|{}|{}|{}",
            self.font.cache_key(),
            self.base.is_rtl(),
            self.lang.unwrap_or(""),
            self.text
        );
        for f in self.features {
            key.push_str(&format!("|f:{}={}", f.tag, f.value));
        }
        for v in self.variations {
            key.push_str(&format!("|v:{}={}", v.tag, v.value));
        }
        key
    }
}

/// Glyphs produced by one face for one contiguous byte range.
#[derive(Debug, Clone)]
pub struct ShapedSegment {
    pub font: Arc<ResolvedFont>,
    pub role: FontRole,
    pub range: Range<usize>,
    pub direction: Direction,
    pub level: u8,
    /// Variation coordinates applied while shaping, already clamped.
    pub variations: Vec<VariationSetting>,
    /// Glyphs in visual order within the segment.
    pub glyphs: Vec<ShapedGlyph>,
}

impl ShapedSegment {
    /// Scale from font units to user units at `font_size`.
    pub fn scale(&self, font_size: f32) -> f32 {
        font_size / self.font.units_per_em().max(1) as f32
    }
}

/// All segments of one leaf text.
#[derive(Debug, Clone)]
pub struct ShapedText {
    pub segments: Vec<ShapedSegment>,
    /// Indices into `segments`, left to right.
    pub visual_order: Vec<usize>,
}

impl ShapedText {
    pub fn visual(&self) -> impl Iterator<Item = &ShapedSegment> + '_ {
        self.visual_order.iter().map(move |&i| &self.segments[i])
    }

    pub fn glyph_count(&self) -> usize {
        self.segments.iter().map(|s| s.glyphs.len()).sum()
    }

    /// Face of the first logical segment.
    pub fn first_font(&self) -> Option<&Arc<ResolvedFont>> {
        self.segments.first().map(|s| &s.font)
    }
}

/// Shapes leaf texts against fonts from a shared [`FontCache`].
pub struct Shaper {
    cache: Arc<FontCache>,
    segmenter: Segmenter,
    shaped: Mutex<LruCache<String, Arc<ShapedText>>>,
}

impl Shaper {
    pub fn new(cache: Arc<FontCache>) -> Self {
        Self::with_capacity(cache, DEFAULT_SHAPE_CACHE)
    }

    pub fn with_capacity(cache: Arc<FontCache>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache,
            segmenter: Segmenter::new(),
            shaped: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn font_cache(&self) -> &Arc<FontCache> {
        &self.cache
    }

    pub fn segmenter(&self) -> &Segmenter {
        &self.segmenter
    }

    /// Shape one leaf.
    ///
    /// Fails with [`T2pError::MissingFont`] when the primary face cannot be
    /// resolved or when some character has no glyph in either the primary or
    /// the selected fallback face.
    pub fn shape(&self, request: &ShapeRequest<'_>) -> Result<Arc<ShapedText>> {
        let cache_key = request.cache_key();
        if let Some(hit) = self.shaped.lock().get(&cache_key) {
            return Ok(hit.clone());
        }

        let shaped = Arc::new(self.shape_uncached(request)?);
        self.shaped.lock().put(cache_key, shaped.clone());
        Ok(shaped)
    }

    fn shape_uncached(&self, request: &ShapeRequest<'_>) -> Result<ShapedText> {
        let key = request.font;
        let primary = self.cache.resolve(key)?;
        let missing = missing_chars(request.text, &primary);
        let fallback = if missing.is_empty() {
            None
        } else {
            Some(select_fallback(&self.cache, key, &missing)?)
        };

        let primary_variations = clamp_variations(&primary, request.variations);
        let features = to_features(request.features);
        let language = request.lang.and_then(|l| Language::from_str(l).ok());

        let mut uncovered = Vec::new();
        let mut segments = Vec::new();
        for run in self.segmenter.segment(request.text, request.base) {
            let spans = split_by_coverage(
                request.text,
                &run,
                &primary,
                fallback.as_deref(),
                &mut uncovered,
            );
            for span in spans {
                let (font, variations) = match (span.role, &fallback) {
                    (FontRole::Fallback, Some(fb)) => (fb.clone(), Vec::new()),
                    _ => (primary.clone(), primary_variations.clone()),
                };
                let glyphs = shape_segment(
                    &font,
                    &request.text[span.range.clone()],
                    span.range.start,
                    run.direction,
                    &features,
                    &variations,
                    language.as_ref(),
                )?;
                segments.push(ShapedSegment {
                    role: span.role,
                    range: span.range,
                    direction: run.direction,
                    level: bidi_level(run.direction, request.base),
                    variations,
                    glyphs,
                    font,
                });
            }
        }

        if !uncovered.is_empty() {
            return Err(T2pError::MissingFont(
                MissingFontError::new(&key.family, key.weight, key.style, &key.stretch)
                    .with_chars(uncovered),
            ));
        }

        let levels: Vec<u8> = segments.iter().map(|s| s.level).collect();
        let visual_order = visual_order(&levels);
        debug!(
            target: "t2p::shape",
            "shaped {:?} into {} segment(s) with {} fallback",
            request.text,
            segments.len(),
            fallback.as_ref().map(|f| f.family_name()).unwrap_or("no")
        );
        Ok(ShapedText {
            segments,
            visual_order,
        })
    }
}

fn to_features(settings: &[FeatureSetting]) -> Vec<Feature> {
    settings
        .iter()
        .map(|f| Feature::new(Tag::from_bytes_lossy(f.tag.as_bytes()), f.value, ..))
        .collect()
}

/// Keep axes the face declares, clamped into range.
fn clamp_variations(font: &ResolvedFont, settings: &[VariationSetting]) -> Vec<VariationSetting> {
    settings
        .iter()
        .filter_map(|v| {
            font.clamp_variation(&v.tag, v.value).map(|value| VariationSetting {
                tag: v.tag.clone(),
                value,
            })
        })
        .collect()
}

fn shape_segment(
    font: &ResolvedFont,
    text: &str,
    base_offset: usize,
    direction: Direction,
    features: &[Feature],
    variations: &[VariationSetting],
    language: Option<&Language>,
) -> Result<Vec<ShapedGlyph>> {
    if text.is_empty() {
        return Ok(Vec::new());
    }
    let mut face = rustybuzz::Face::from_slice(font.data(), font.face_index()).ok_or_else(|| {
        T2pError::invalid_font(font.path(), font.face_index(), "shaper rejected face")
    })?;
    if !variations.is_empty() {
        let coords: Vec<Variation> = variations
            .iter()
            .map(|v| Variation {
                tag: Tag::from_bytes_lossy(v.tag.as_bytes()),
                value: v.value,
            })
            .collect();
        face.set_variations(&coords);
    }

    let mut buffer = UnicodeBuffer::new();
    buffer.push_str(text);
    buffer.set_direction(match direction {
        Direction::LeftToRight => rustybuzz::Direction::LeftToRight,
        Direction::RightToLeft => rustybuzz::Direction::RightToLeft,
    });
    if let Some(lang) = language {
        buffer.set_language(lang.clone());
    }
    buffer.guess_segment_properties();

    let output = rustybuzz::shape(&face, features, buffer);
    Ok(output
        .glyph_infos()
        .iter()
        .zip(output.glyph_positions())
        .map(|(info, pos)| ShapedGlyph {
            glyph_id: info.glyph_id as u16,
            cluster: base_offset + info.cluster as usize,
            x_advance: pos.x_advance,
            y_advance: pos.y_advance,
            x_offset: pos.x_offset,
            y_offset: pos.y_offset,
        })
        .collect())
}

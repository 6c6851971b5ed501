// this_file: crates/t2p-svg/src/convert.rs

//! Document driver: guard, plan every text element read-only, then apply all
//! replacements to a copy and swap it in.

use crate::document::{Document, NodeId};
use crate::output::{OutputBuilder, Replacement, TransformMode};
use crate::spans::collect_spans;
use log::{debug, info};
use std::path::Path;
use std::sync::Arc;
use t2p_core::{
    ConversionDiagnostics, ConversionOptions, GlyphDecodeError, MissingFontError, Result,
    T2pError,
};
use t2p_fontdb::{FontCache, FontCacheConfig};
use t2p_hb::Shaper;
use t2p_layout::{LayoutEngine, PaintedText};
use t2p_render::{length_scale, parse_flattenable, OutlineCache, PathEmitter, DEFAULT_OUTLINE_CACHE};

const DRAFT_MARKER: &str = "sodipodi";
const PLAIN_SVG_HINT: &str = "please export the file from inkscape using the plain svg option!";

/// Summary of one successful conversion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionResult {
    /// Text elements replaced.
    pub text_count: usize,
    /// Path elements emitted.
    pub path_count: usize,
    pub glyph_count: usize,
    /// Glyphs whose outline could not be decoded; they were skipped.
    pub skipped_glyphs: Vec<GlyphDecodeError>,
}

struct Planned {
    replacement: Replacement,
    glyph_count: usize,
    skipped: Vec<GlyphDecodeError>,
}

/// Converts SVG text elements into outline paths.
///
/// A converter owns its shaping and outline caches and shares the font cache
/// it was given, so one instance can serve many documents.
pub struct Converter {
    options: ConversionOptions,
    shaper: Shaper,
    outlines: OutlineCache,
    emitter: PathEmitter,
}

impl Converter {
    /// Converter over a private font cache configured from the environment.
    pub fn new(options: ConversionOptions) -> Self {
        Self::with_cache(options, Arc::new(FontCache::new(FontCacheConfig::from_env())))
    }

    /// Converter over a caller-provided, possibly pre-warmed, font cache.
    pub fn with_cache(options: ConversionOptions, cache: Arc<FontCache>) -> Self {
        Self {
            emitter: PathEmitter::new(options.precision),
            options,
            shaper: Shaper::new(cache),
            outlines: OutlineCache::new(DEFAULT_OUTLINE_CACHE),
        }
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    pub fn font_cache(&self) -> &Arc<FontCache> {
        self.shaper.font_cache()
    }

    /// Replace every text element of `doc`.
    ///
    /// On error `doc` is left exactly as it was.
    pub fn convert_document(&self, doc: &mut Document) -> Result<ConversionResult> {
        check_draft_markers(doc)?;

        let texts = doc.elements_named("text");
        if texts.is_empty() {
            debug!(target: "t2p::convert", "no text elements");
            return Ok(ConversionResult::default());
        }

        let engine = LayoutEngine::new(&self.shaper, &self.outlines);
        let mut plan = Vec::with_capacity(texts.len());
        let mut missing: Vec<MissingFontError> = Vec::new();
        for &text in &texts {
            match self.plan_element(doc, text, &engine) {
                Ok(planned) => plan.push((text, planned)),
                Err(T2pError::MissingFont(err)) => merge_missing(&mut missing, err),
                Err(T2pError::MissingFonts(errs)) => {
                    for err in errs {
                        merge_missing(&mut missing, err);
                    }
                }
                Err(err) => return Err(err),
            }
        }
        if missing.len() == 1 {
            if let Some(err) = missing.pop() {
                return Err(T2pError::MissingFont(err));
            }
        }
        if !missing.is_empty() {
            return Err(T2pError::MissingFonts(missing));
        }

        let mut converted = doc.clone();
        let mut result = ConversionResult::default();
        for (text, planned) in plan {
            let node = converted.build(&planned.replacement.node);
            converted.replace(text, node)?;
            result.text_count += 1;
            result.path_count += planned.replacement.path_count;
            result.glyph_count += planned.glyph_count;
            result.skipped_glyphs.extend(planned.skipped);
        }

        let leftover = converted.elements_named("text").len();
        if leftover > 0 {
            return Err(T2pError::Internal(format!(
                "{leftover} text element(s) left after conversion"
            )));
        }
        *doc = converted;

        info!(
            target: "t2p::convert",
            "converted {} text element(s) into {} path(s), {} glyph(s), {} skipped",
            result.text_count,
            result.path_count,
            result.glyph_count,
            result.skipped_glyphs.len()
        );
        Ok(result)
    }

    /// Parse, convert and serialize an SVG string.
    pub fn convert_str(&self, svg: &str) -> Result<(String, ConversionResult)> {
        let mut doc = Document::parse(svg)?;
        let result = self.convert_document(&mut doc)?;
        Ok((doc.to_xml(), result))
    }

    /// Convert `input` into `output`. Nothing is written on failure.
    pub fn convert_file(&self, input: &Path, output: &Path) -> Result<ConversionResult> {
        let svg = std::fs::read_to_string(input)?;
        let (converted, result) = self.convert_str(&svg)?;
        std::fs::write(output, converted)?;
        debug!(
            target: "t2p::convert",
            "wrote {} -> {}",
            input.display(),
            output.display()
        );
        Ok(result)
    }

    fn plan_element(
        &self,
        doc: &Document,
        text: NodeId,
        engine: &LayoutEngine<'_>,
    ) -> Result<Planned> {
        let tree = collect_spans(doc, text, self.options.base_direction);
        let element = doc.element(text);

        let raw_transform = element.and_then(|el| el.attr("transform"));
        let (matrix, transform) = match raw_transform {
            None => (None, TransformMode::None),
            Some(value) => match parse_flattenable(value) {
                Some(m) => (Some(m), TransformMode::Baked(length_scale(&m))),
                None => (None, TransformMode::Kept(value)),
            },
        };

        let font = tree.computed.font_key();
        ConversionDiagnostics::new(
            element.and_then(|el| el.id()),
            &tree.text(),
            &font,
            tree.computed.font_size as f32,
            tree.block.anchor,
            tree.block.direction,
        )
        .with_leaf_count(tree.block.leaves.len())
        .with_flattened(!matches!(transform, TransformMode::Kept(_)))
        .log();

        let painted = if tree.is_empty() {
            PaintedText::default()
        } else {
            let layout = engine.layout(&tree.block)?;
            engine.paint(&tree.block, &layout, matrix, &self.emitter)?
        };

        let builder = OutputBuilder {
            preserve_styles: self.options.preserve_styles,
            precision: self.options.precision,
            transform,
        };
        let replacement = builder.build(doc, text, &tree, &painted);
        Ok(Planned {
            replacement,
            glyph_count: painted.glyph_count,
            skipped: painted.decode_errors,
        })
    }
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("options", &self.options)
            .field("outlines", &self.outlines.len())
            .finish()
    }
}

/// Reject documents that still carry editor draft markup.
pub fn check_draft_markers(doc: &Document) -> Result<()> {
    let is_marker = |namespace: Option<&str>, qualified: &str| {
        namespace.is_some_and(|ns| ns.contains(DRAFT_MARKER)) || qualified.contains(DRAFT_MARKER)
    };
    for id in doc.descendants(doc.root()) {
        let Some(el) = doc.element(id) else {
            continue;
        };
        let marked = is_marker(el.name.namespace.as_deref(), &el.name.qualified())
            || el
                .attributes
                .iter()
                .any(|a| is_marker(a.name.namespace.as_deref(), &a.name.qualified()));
        if marked {
            return Err(T2pError::structure(format!(
                "draft markup <{}> found; {PLAIN_SVG_HINT}",
                el.name.qualified()
            )));
        }
    }
    Ok(())
}

fn merge_missing(missing: &mut Vec<MissingFontError>, err: MissingFontError) {
    match missing.iter_mut().find(|m| m.dedup_key() == err.dedup_key()) {
        Some(existing) => existing.absorb(&err),
        None => missing.push(err),
    }
}

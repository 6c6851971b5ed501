// this_file: crates/t2p-render/src/outlines.rs

//! Glyph outline recording and the shared outline cache.

use log::debug;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use t2p_core::{Result, VariationSetting};
use t2p_fontdb::ResolvedFont;
use ttf_parser::{GlyphId, OutlineBuilder, Tag};

/// Default number of glyph outlines kept by [`OutlineCache`].
pub const DEFAULT_OUTLINE_CACHE: usize = 4096;

/// Recorded outline commands for a glyph, in font units (y up).
#[derive(Debug, Clone, PartialEq)]
pub enum OutlineCommand {
    MoveTo(f32, f32),
    LineTo(f32, f32),
    QuadTo {
        ctrl_x: f32,
        ctrl_y: f32,
        x: f32,
        y: f32,
    },
    CurveTo {
        ctrl1_x: f32,
        ctrl1_y: f32,
        ctrl2_x: f32,
        ctrl2_y: f32,
        x: f32,
        y: f32,
    },
    Close,
}

/// Geometry container for a recorded glyph outline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlyphOutline {
    commands: Vec<OutlineCommand>,
}

impl GlyphOutline {
    pub fn from_commands(commands: Vec<OutlineCommand>) -> Self {
        Self { commands }
    }

    pub fn commands(&self) -> &[OutlineCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Record the outline of `glyph_id`, `None` when the face yields nothing.
///
/// Blank glyphs (space) and undecodable ones both come back as `None`; the
/// caller tells them apart by the source character.
pub fn glyph_outline(face: &ttf_parser::Face<'_>, glyph_id: u16) -> Option<GlyphOutline> {
    let mut recorder = RecordingOutline::default();
    face.outline_glyph(GlyphId(glyph_id), &mut recorder)?;
    let outline = recorder.finish();
    (!outline.is_empty()).then_some(outline)
}

#[derive(Default)]
struct RecordingOutline {
    commands: Vec<OutlineCommand>,
}

impl RecordingOutline {
    fn finish(self) -> GlyphOutline {
        GlyphOutline {
            commands: self.commands,
        }
    }
}

impl OutlineBuilder for RecordingOutline {
    fn move_to(&mut self, x: f32, y: f32) {
        self.commands.push(OutlineCommand::MoveTo(x, y));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.commands.push(OutlineCommand::LineTo(x, y));
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.commands.push(OutlineCommand::QuadTo {
            ctrl_x: x1,
            ctrl_y: y1,
            x,
            y,
        });
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.commands.push(OutlineCommand::CurveTo {
            ctrl1_x: x1,
            ctrl1_y: y1,
            ctrl2_x: x2,
            ctrl2_y: y2,
            x,
            y,
        });
    }

    fn close(&mut self) {
        self.commands.push(OutlineCommand::Close);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct OutlineKey {
    path: PathBuf,
    face_index: u32,
    glyph_id: u16,
    variations: Vec<(String, u32)>,
}

impl OutlineKey {
    fn new(font: &ResolvedFont, glyph_id: u16, variations: &[VariationSetting]) -> Self {
        Self {
            path: font.path().to_path_buf(),
            face_index: font.face_index(),
            glyph_id,
            variations: variations
                .iter()
                .map(|v| (v.tag.clone(), v.value.to_bits()))
                .collect(),
        }
    }
}

/// Bounded LRU of recorded outlines shared across conversions.
pub struct OutlineCache {
    entries: Mutex<LruCache<OutlineKey, Option<Arc<GlyphOutline>>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl Default for OutlineCache {
    fn default() -> Self {
        Self::new(DEFAULT_OUTLINE_CACHE)
    }
}

impl std::fmt::Debug for OutlineCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutlineCache")
            .field("len", &self.entries.lock().len())
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish()
    }
}

impl OutlineCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Outline of `glyph_id` in `font` at the given variation coordinates.
    ///
    /// `Ok(None)` means the glyph produced no contours. Only a face that no
    /// longer parses is an error.
    pub fn outline(
        &self,
        font: &ResolvedFont,
        glyph_id: u16,
        variations: &[VariationSetting],
    ) -> Result<Option<Arc<GlyphOutline>>> {
        let key = OutlineKey::new(font, glyph_id, variations);
        if let Some(hit) = self.entries.lock().get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(hit.clone());
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let mut face = font.face()?;
        for v in variations {
            face.set_variation(Tag::from_bytes_lossy(v.tag.as_bytes()), v.value);
        }
        let outline = glyph_outline(&face, glyph_id).map(Arc::new);
        if outline.is_none() {
            debug!(
                target: "t2p::render",
                "glyph {glyph_id} of {} has no outline",
                font.path().display()
            );
        }
        self.entries.lock().put(key, outline.clone());
        Ok(outline)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// (hits, misses)
    pub fn stats(&self) -> (usize, usize) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

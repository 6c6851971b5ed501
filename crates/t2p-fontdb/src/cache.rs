// this_file: crates/t2p-fontdb/src/cache.rs

//! Font resolution with a persisted index, negative cache and quarantine.

use crate::config::FontCacheConfig;
use crate::fallback::FallbackTable;
use crate::index::{style_label, style_tokens, FontIndex, IndexEntry, Quarantine};
use crate::matcher::matcher_for;
use crate::resolved::{face_family, ResolvedFont};
use dashmap::{DashMap, DashSet};
use log::{debug, info, warn};
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use t2p_core::utils::{is_font_file, normalize_font_name, system_font_dirs};
use t2p_core::{
    FontDataCache, FontKey, FontLocation, FontMatcher, FontStyle, MatchQuery, MissingFontError,
    Result, T2pError,
};
use walkdir::WalkDir;

const WEIGHT_NAMES: [(u16, &str); 9] = [
    (100, "Thin"),
    (200, "ExtraLight"),
    (300, "Light"),
    (400, "Regular"),
    (500, "Medium"),
    (600, "SemiBold"),
    (700, "Bold"),
    (800, "ExtraBold"),
    (900, "Black"),
];

fn weight_name(weight: u16) -> Option<&'static str> {
    WEIGHT_NAMES.iter().find(|(w, _)| *w == weight).map(|(_, n)| *n)
}

/// fontconfig width token for a CSS stretch keyword.
pub fn stretch_token(stretch: &str) -> Option<&'static str> {
    Some(match stretch.trim().to_ascii_lowercase().as_str() {
        "ultra-condensed" => "ultracondensed",
        "extra-condensed" => "extracondensed",
        "condensed" => "condensed",
        "semi-condensed" => "semicondensed",
        "semi-expanded" => "semiexpanded",
        "expanded" => "expanded",
        "extra-expanded" => "extraexpanded",
        "ultra-expanded" => "ultraexpanded",
        _ => return None,
    })
}

/// Matcher queries for a request, most specific first.
pub fn candidate_queries(family: &str, weight: u16, style: FontStyle, stretch: &str) -> Vec<MatchQuery> {
    let mut queries = Vec::new();
    if weight == 400 {
        match style {
            FontStyle::Normal => {
                if family.eq_ignore_ascii_case("arial") {
                    queries.push(MatchQuery::family(family).with_style_name("Regular"));
                }
                queries.push(MatchQuery::family(family).with_style_name("Regular").with_weight(400));
            }
            FontStyle::Italic => queries.push(
                MatchQuery::family(family)
                    .with_style_name("Italic")
                    .with_weight(400)
                    .with_slant(FontStyle::Italic),
            ),
            FontStyle::Oblique => {}
        }
    } else {
        if let Some(name) = weight_name(weight) {
            queries.push(MatchQuery::family(family).with_style_name(name));
        }
        queries.push(MatchQuery::family(family).with_weight(weight));
    }

    let mut base = MatchQuery::family(family).with_slant(style);
    if let Some(width) = stretch_token(stretch) {
        base = base.with_width(width);
    }
    queries.push(base);
    queries
}

/// Split `"Family, Style"` into its parts.
pub fn parse_vendor_spec(spec: &str) -> (String, Option<String>) {
    let s = spec.trim().trim_matches(|c| c == '\'' || c == '"').trim();
    match s.split_once(',') {
        Some((family, style)) => {
            let style = style.trim();
            (family.trim().to_string(), (!style.is_empty()).then(|| style.to_string()))
        }
        None => (s.to_string(), None),
    }
}

fn is_generic_sans(family: &str) -> bool {
    matches!(family.to_ascii_lowercase().as_str(), "sans-serif" | "sans")
}

/// Whether a face's own family name satisfies the request.
pub fn family_matches(requested: &str, actual: &str) -> bool {
    let want = normalize_font_name(requested);
    let got = normalize_font_name(actual);
    !want.is_empty() && (want == got || got.contains(&want))
}

/// Snapshot of cache sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FontCacheStats {
    pub resolved: usize,
    pub negative: usize,
    pub indexed: usize,
    pub quarantined: usize,
    pub mapped_files: usize,
}

/// Resolves [`FontKey`]s to loaded faces.
///
/// Shared across threads through `Arc`; every disk write goes through a
/// single writer lock.
pub struct FontCache {
    config: FontCacheConfig,
    matcher: Box<dyn FontMatcher>,
    data: FontDataCache,
    resolved: DashMap<(String, bool), Arc<ResolvedFont>>,
    negative: DashSet<(String, bool)>,
    index: RwLock<FontIndex>,
    index_checked: OnceCell<()>,
    quarantine: RwLock<Quarantine>,
    write_lock: Mutex<()>,
}

impl FontCache {
    /// Cache using the matcher named in `config`.
    pub fn new(config: FontCacheConfig) -> Self {
        let matcher = matcher_for(config.matcher, config.matcher_timeout_ms, &config.extra_font_dirs);
        Self::with_matcher(config, matcher)
    }

    pub fn with_matcher(config: FontCacheConfig, matcher: Box<dyn FontMatcher>) -> Self {
        let index = config
            .index_file()
            .map(|path| FontIndex::load(&path))
            .unwrap_or_default();
        let quarantine = config
            .quarantine_file()
            .map(|path| Quarantine::load(&path))
            .unwrap_or_default();
        debug!(
            target: "t2p::fontdb",
            "font cache ready: matcher={} indexed={} quarantined={}",
            matcher.name(),
            index.len(),
            quarantine.len()
        );
        Self {
            config,
            matcher,
            data: FontDataCache::new(),
            resolved: DashMap::new(),
            negative: DashSet::new(),
            index: RwLock::new(index),
            index_checked: OnceCell::new(),
            quarantine: RwLock::new(quarantine),
            write_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &FontCacheConfig {
        &self.config
    }

    pub fn fallbacks(&self) -> &FallbackTable {
        &self.config.fallbacks
    }

    pub fn matcher_name(&self) -> &str {
        self.matcher.name()
    }

    /// Resolve with family verification.
    pub fn resolve(&self, key: &FontKey) -> Result<Arc<ResolvedFont>> {
        self.resolve_with(key, true)
    }

    /// Resolve a request. With `strict` unset the matcher's answer is
    /// accepted even when the face reports a different family.
    pub fn resolve_with(&self, key: &FontKey, strict: bool) -> Result<Arc<ResolvedFont>> {
        let cache_key = (key.cache_key(), strict);
        if let Some(font) = self.resolved.get(&cache_key) {
            return Ok(font.clone());
        }
        let missing = || MissingFontError::new(&key.family, key.weight, key.style, &key.stretch);
        if self.negative.contains(&cache_key) {
            return Err(missing().into());
        }

        let (family, style_hint) = match &key.vendor_spec {
            Some(spec) => {
                let (family, style) = parse_vendor_spec(spec);
                (if family.is_empty() { key.family.clone() } else { family }, style)
            }
            None => (key.family.clone(), None),
        };

        match self.lookup(key, &family, style_hint.as_deref(), strict)? {
            Some(font) => {
                debug!(
                    target: "t2p::fontdb",
                    "resolved {} -> {} ({})",
                    cache_key.0,
                    font.path().display(),
                    font.family_name()
                );
                self.resolved.insert(cache_key, font.clone());
                Ok(font)
            }
            None => {
                debug!(target: "t2p::fontdb", "no face for {}", cache_key.0);
                self.negative.insert(cache_key);
                Err(missing().into())
            }
        }
    }

    /// Resolve one fallback candidate: a family name or a `:lang=xx` hint.
    ///
    /// Returns `Ok(None)` when the candidate is not available.
    pub fn resolve_fallback(
        &self,
        candidate: &str,
        weight: u16,
        style: FontStyle,
    ) -> Result<Option<Arc<ResolvedFont>>> {
        if let Some(lang) = candidate.strip_prefix(":lang=") {
            let cache_key = (format!(":lang={lang}:{weight}:{}", style.as_str()).to_lowercase(), false);
            if let Some(font) = self.resolved.get(&cache_key) {
                return Ok(Some(font.clone()));
            }
            if self.negative.contains(&cache_key) {
                return Ok(None);
            }
            let mut query = MatchQuery::lang(lang).with_weight(weight);
            query.slant = Some(style);
            let key = FontKey::new(candidate).with_weight(weight).with_style(style);
            let found = match self.query_matcher(&query) {
                Some(location) => self.load_checked(&key, location, None)?,
                None => None,
            };
            return Ok(match found {
                Some(font) => {
                    self.resolved.insert(cache_key, font.clone());
                    Some(font)
                }
                None => {
                    self.negative.insert(cache_key);
                    None
                }
            });
        }

        let key = FontKey::new(candidate).with_weight(weight).with_style(style);
        match self.resolve_with(&key, false) {
            Ok(font) => Ok(Some(font)),
            Err(T2pError::MissingFont(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn lookup(
        &self,
        key: &FontKey,
        family: &str,
        style_hint: Option<&str>,
        strict: bool,
    ) -> Result<Option<Arc<ResolvedFont>>> {
        self.ensure_index();
        let wanted: BTreeSet<String> = match style_hint {
            Some(hint) => style_tokens(hint),
            None => style_tokens(&style_label(key.weight, key.style, &key.stretch)),
        };
        let hit = {
            let quarantine = self.quarantine.read();
            self.index
                .read()
                .find(family, &wanted, |e| quarantine.contains(&e.path, e.font_index))
                .map(IndexEntry::location)
        };
        if let Some(location) = hit {
            if let Some(font) = self.load_checked(key, location, None)? {
                return Ok(Some(font));
            }
        }

        let verify = (strict && !self.matcher.is_authoritative() && !is_generic_sans(family))
            .then_some(family);
        for query in candidate_queries(family, key.weight, key.style, &key.stretch) {
            if let Some(location) = self.query_matcher(&query) {
                if let Some(font) = self.load_checked(key, location, verify)? {
                    return Ok(Some(font));
                }
            }
        }

        if family.eq_ignore_ascii_case("sans-serif") {
            return self.lookup(key, "sans", style_hint, strict);
        }
        Ok(None)
    }

    /// Build and persist the index on first use when none was loaded.
    ///
    /// A stale on-disk version loads as empty and is rebuilt here too.
    fn ensure_index(&self) {
        if self.config.index_file().is_none() {
            return;
        }
        self.index_checked.get_or_init(|| {
            if !self.index.read().is_empty() {
                return;
            }
            debug!(target: "t2p::fontdb", "font index empty; building it");
            if let Err(err) = self.prewarm() {
                warn!(target: "t2p::fontdb", "cannot build font index: {err}");
            }
        });
    }

    fn query_matcher(&self, query: &MatchQuery) -> Option<FontLocation> {
        match self.matcher.match_query(query) {
            Ok(found) => found,
            Err(err @ T2pError::MatcherTimeout { .. }) => {
                warn!(target: "t2p::fontdb", "{err}");
                None
            }
            Err(err) => {
                warn!(target: "t2p::fontdb", "{} matcher failed: {err}", self.matcher.name());
                None
            }
        }
    }

    /// Load a face, quarantining it on parse failure and rejecting it when
    /// `verify_family` does not match its own name.
    fn load_checked(
        &self,
        key: &FontKey,
        location: FontLocation,
        verify_family: Option<&str>,
    ) -> Result<Option<Arc<ResolvedFont>>> {
        if self.is_quarantined(&location.path, location.face_index) {
            return Ok(None);
        }
        let data = match self.data.load(&location.path) {
            Ok(data) => data,
            Err(err) => {
                warn!(target: "t2p::fontdb", "{err}");
                return Ok(None);
            }
        };
        let font = match ResolvedFont::load(key.clone(), location.clone(), data) {
            Ok(font) => font,
            Err(err) => {
                warn!(target: "t2p::fontdb", "quarantining face: {err}");
                self.quarantine_face(&location.path, location.face_index)?;
                return Ok(None);
            }
        };
        if let Some(requested) = verify_family {
            if !family_matches(requested, font.family_name()) {
                debug!(
                    target: "t2p::fontdb",
                    "rejecting {} for {requested:?}: face reports {:?}",
                    location.path.display(),
                    font.family_name()
                );
                return Ok(None);
            }
        }
        Ok(Some(Arc::new(font)))
    }

    pub fn is_quarantined(&self, path: &Path, face_index: u32) -> bool {
        self.quarantine.read().contains(path, face_index)
    }

    /// Record a face that failed to parse and persist the quarantine list.
    pub fn quarantine_face(&self, path: &Path, face_index: u32) -> Result<()> {
        let added = self.quarantine.write().insert(path, face_index);
        if added {
            self.data.evict(path);
            self.save_quarantine()?;
        }
        Ok(())
    }

    /// Forget every quarantined face, on disk too.
    pub fn clear_quarantine(&self) -> Result<()> {
        self.quarantine.write().clear();
        self.negative.clear();
        self.save_quarantine()
    }

    fn save_quarantine(&self) -> Result<()> {
        if let Some(path) = self.config.quarantine_file() {
            let _guard = self.write_lock.lock();
            self.quarantine.read().save(&path)?;
        }
        Ok(())
    }

    /// Scan font directories, rebuild the index and persist it.
    ///
    /// Returns the number of indexed faces.
    pub fn prewarm(&self) -> Result<usize> {
        let mut dirs = if self.config.scan_system_dirs {
            system_font_dirs()
        } else {
            Vec::new()
        };
        dirs.extend(self.config.extra_font_dirs.iter().cloned());

        let mut entries = Vec::new();
        let mut failed = Vec::new();
        for dir in dirs {
            let dir = shellexpand::tilde(&dir).into_owned();
            for entry in WalkDir::new(&dir)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file() && is_font_file(e.path()))
            {
                self.index_file(entry.path(), &mut entries, &mut failed);
            }
        }

        {
            let mut quarantine = self.quarantine.write();
            for (path, index) in &failed {
                quarantine.insert(path, *index);
            }
        }
        let count = entries.len();
        *self.index.write() = FontIndex::new(entries);
        self.negative.clear();
        info!(
            target: "t2p::fontdb",
            "prewarm indexed {count} faces, {} unreadable",
            failed.len()
        );

        if let Some(path) = self.config.index_file() {
            let _guard = self.write_lock.lock();
            self.index.read().save(&path)?;
        }
        self.save_quarantine()?;
        Ok(count)
    }

    fn index_file(
        &self,
        path: &Path,
        entries: &mut Vec<IndexEntry>,
        failed: &mut Vec<(std::path::PathBuf, u32)>,
    ) {
        let Ok(bytes) = std::fs::read(path) else {
            return;
        };
        let faces = ttf_parser::fonts_in_collection(&bytes).unwrap_or(1);
        for face_index in 0..faces {
            if self.is_quarantined(path, face_index) {
                continue;
            }
            match ttf_parser::Face::parse(&bytes, face_index) {
                Ok(face) => {
                    if let Some(entry) = IndexEntry::from_face(path, face_index, &face) {
                        entries.push(entry);
                    } else {
                        debug!(
                            target: "t2p::fontdb",
                            "skipping unnamed face {}#{face_index} ({:?})",
                            path.display(),
                            face_family(&face)
                        );
                    }
                }
                Err(err) => {
                    warn!(target: "t2p::fontdb", "cannot parse {}#{face_index}: {err}", path.display());
                    failed.push((path.to_path_buf(), face_index));
                }
            }
        }
    }

    pub fn stats(&self) -> FontCacheStats {
        FontCacheStats {
            resolved: self.resolved.len(),
            negative: self.negative.len(),
            indexed: self.index.read().len(),
            quarantined: self.quarantine.read().len(),
            mapped_files: self.data.stats().file_count,
        }
    }

    /// Drop resolved faces and negative results. Persisted state is untouched.
    pub fn clear(&self) {
        self.resolved.clear();
        self.negative.clear();
        self.data.clear();
    }
}

impl std::fmt::Debug for FontCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontCache")
            .field("matcher", &self.matcher.name())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FontCacheConfig;
    use crate::matcher::{FontdbMatcher, StaticMatcher};
    use std::path::PathBuf;

    fn fonts_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../testdata/fonts")
    }

    fn static_cache() -> FontCache {
        let matcher = StaticMatcher::new();
        matcher
            .register("Arial", fonts_dir().join("DejaVuSans.ttf"), 0)
            .register("DejaVu Serif", fonts_dir().join("DejaVuSerif.ttf"), 0)
            .register_lang("ar", fonts_dir().join("DejaVuSans.ttf"), 0);
        FontCache::with_matcher(FontCacheConfig::ephemeral(), Box::new(matcher))
    }

    #[test]
    fn test_candidate_queries_regular() {
        let patterns: Vec<String> = candidate_queries("Arial", 400, FontStyle::Normal, "normal")
            .iter()
            .map(MatchQuery::to_pattern)
            .collect();
        assert_eq!(
            patterns,
            vec!["Arial:style=Regular", "Arial:style=Regular:weight=400", "Arial"]
        );
    }

    #[test]
    fn test_candidate_queries_bold_condensed_italic() {
        let patterns: Vec<String> =
            candidate_queries("Futura", 700, FontStyle::Italic, "semi-condensed")
                .iter()
                .map(MatchQuery::to_pattern)
                .collect();
        assert_eq!(
            patterns,
            vec![
                "Futura:style=Bold",
                "Futura:weight=700",
                "Futura:slant=italic:width=semicondensed"
            ]
        );
    }

    #[test]
    fn test_vendor_spec_parsing() {
        assert_eq!(
            parse_vendor_spec("'.New York, Italic'"),
            (".New York".to_string(), Some("Italic".to_string()))
        );
        assert_eq!(parse_vendor_spec("Futura"), ("Futura".to_string(), None));
    }

    #[test]
    fn test_family_matching() {
        assert!(family_matches("DejaVu Sans", "DejaVu Sans"));
        assert!(family_matches("dejavusans", "DejaVu Sans"));
        assert!(family_matches("DejaVu", "DejaVu Sans"));
        assert!(!family_matches("Helvetica", "DejaVu Sans"));
    }

    #[test]
    fn test_resolve_is_cached() {
        let cache = static_cache();
        let a = cache.resolve(&FontKey::new("Arial")).unwrap();
        let b = cache.resolve(&FontKey::new("arial")).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.family_name(), "DejaVu Sans");
        assert_eq!(cache.stats().resolved, 1);
    }

    #[test]
    fn test_missing_family_is_negative_cached() {
        let cache = static_cache();
        let key = FontKey::new("Nope Grotesk").with_weight(700);
        let err = cache.resolve(&key).unwrap_err();
        match &err {
            T2pError::MissingFont(m) => {
                assert_eq!(m.family, "Nope Grotesk");
                assert_eq!(m.weight, 700);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(cache.resolve(&key).is_err());
        assert_eq!(cache.stats().negative, 1);
    }

    #[test]
    fn test_strict_verification_rejects_substitutes() {
        let matcher = FontdbMatcher::from_dirs(&[fonts_dir()]);
        let cache = FontCache::with_matcher(FontCacheConfig::ephemeral(), Box::new(matcher));
        assert!(cache.resolve(&FontKey::new("Helvetica")).is_err());
        let serif = cache.resolve(&FontKey::new("DejaVu Serif")).unwrap();
        assert_eq!(serif.family_name(), "DejaVu Serif");
    }

    #[test]
    fn test_lang_fallback() {
        let cache = static_cache();
        let font = cache
            .resolve_fallback(":lang=ar", 400, FontStyle::Normal)
            .unwrap()
            .unwrap();
        assert!(font.covers('\u{0627}'));
        assert!(cache
            .resolve_fallback(":lang=zh-cn", 400, FontStyle::Normal)
            .unwrap()
            .is_none());
        assert!(cache
            .resolve_fallback("Last Resort", 400, FontStyle::Normal)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_prewarm_indexes_and_quarantines() {
        let dir = tempfile::tempdir().unwrap();
        let fonts = dir.path().join("fonts");
        std::fs::create_dir_all(&fonts).unwrap();
        std::fs::copy(fonts_dir().join("DejaVuSerif.ttf"), fonts.join("DejaVuSerif.ttf")).unwrap();
        std::fs::write(fonts.join("broken.ttf"), b"not a font at all").unwrap();

        let config = FontCacheConfig {
            index_path: Some(dir.path().join("cache/font_cache.json")),
            extra_font_dirs: vec![fonts.to_string_lossy().into_owned()],
            scan_system_dirs: false,
            ..FontCacheConfig::default()
        };
        let cache = FontCache::with_matcher(config.clone(), Box::new(StaticMatcher::new()));
        let count = cache.prewarm().unwrap();
        assert!(count >= 1);
        assert!(cache.is_quarantined(&fonts.join("broken.ttf"), 0));
        assert!(dir.path().join("cache/font_cache.json").exists());
        assert!(dir.path().join("cache/corrupted_fonts.json").exists());

        // A fresh cache resolves from the persisted index without any matcher help.
        let reloaded = FontCache::with_matcher(config, Box::new(StaticMatcher::new()));
        assert!(reloaded.is_quarantined(&fonts.join("broken.ttf"), 0));
        let font = reloaded.resolve(&FontKey::new("DejaVu Serif")).unwrap();
        assert!(font.path().ends_with("DejaVuSerif.ttf"));

        reloaded.clear_quarantine().unwrap();
        assert!(!reloaded.is_quarantined(&fonts.join("broken.ttf"), 0));
    }

    #[test]
    fn test_first_resolve_builds_and_saves_index() {
        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("cache/font_cache.json");
        let config = FontCacheConfig {
            index_path: Some(index_path.clone()),
            extra_font_dirs: vec![fonts_dir().to_string_lossy().into_owned()],
            scan_system_dirs: false,
            ..FontCacheConfig::default()
        };
        let matcher = StaticMatcher::new();
        matcher.register("DejaVu Sans", fonts_dir().join("DejaVuSans.ttf"), 0);
        let cache = FontCache::with_matcher(config.clone(), Box::new(matcher));
        assert_eq!(cache.stats().indexed, 0);

        let font = cache.resolve(&FontKey::new("DejaVu Sans")).unwrap();
        assert!(font.path().ends_with("DejaVuSans.ttf"));
        assert!(index_path.exists());
        assert!(cache.stats().indexed >= 2);

        // stale versions are rebuilt on the next first lookup
        std::fs::write(&index_path, r#"{"version": 1, "fonts": []}"#).unwrap();
        let rebuilt = FontCache::with_matcher(config, Box::new(StaticMatcher::new()));
        assert_eq!(rebuilt.stats().indexed, 0);
        let serif = rebuilt.resolve(&FontKey::new("DejaVu Serif")).unwrap();
        assert!(serif.path().ends_with("DejaVuSerif.ttf"));
        assert!(rebuilt.stats().indexed >= 2);
    }

    #[test]
    fn test_ephemeral_cache_never_builds_index() {
        let cache = static_cache();
        cache.resolve(&FontKey::new("Arial")).unwrap();
        assert_eq!(cache.stats().indexed, 0);
    }

    #[test]
    fn test_corrupt_match_is_quarantined_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.ttf");
        std::fs::write(&bad, vec![0u8; 32]).unwrap();
        let matcher = StaticMatcher::new();
        matcher.register("Broken", &bad, 0);
        let cache = FontCache::with_matcher(FontCacheConfig::ephemeral(), Box::new(matcher));
        assert!(cache.resolve(&FontKey::new("Broken")).is_err());
        assert!(cache.is_quarantined(&bad, 0));
    }
}

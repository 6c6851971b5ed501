// this_file: crates/t2p-fontdb/src/index.rs

//! Persisted font index and quarantine list.
//!
//! The index maps family/style names to faces on disk so repeated runs can
//! skip the system matcher. Faces that fail to parse are quarantined in a
//! separate file and never retried.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use t2p_core::{FontLocation, FontStyle, Result};
use ttf_parser::name_id;

/// Bumped whenever the on-disk entry layout changes.
pub const INDEX_VERSION: u32 = 2;

/// One indexed face. Names are stored lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub path: PathBuf,
    pub font_index: u32,
    pub families: Vec<String>,
    pub styles: Vec<String>,
    pub ps: String,
    pub weight: u16,
}

impl IndexEntry {
    /// Build an entry from a parsed face. Faces without a family name are skipped.
    pub fn from_face(path: &Path, font_index: u32, face: &ttf_parser::Face<'_>) -> Option<Self> {
        let mut families = Vec::new();
        let mut styles = Vec::new();
        let mut ps = String::new();

        for name in face.names() {
            let Some(value) = name.to_string() else {
                continue;
            };
            let value = value.trim().to_lowercase();
            if value.is_empty() {
                continue;
            }
            match name.name_id {
                name_id::TYPOGRAPHIC_FAMILY | name_id::FAMILY => push_unique(&mut families, value),
                name_id::TYPOGRAPHIC_SUBFAMILY | name_id::SUBFAMILY => push_unique(&mut styles, value),
                name_id::POST_SCRIPT_NAME if ps.is_empty() => ps = value,
                _ => {}
            }
        }

        if families.is_empty() {
            return None;
        }
        Some(Self {
            path: path.to_path_buf(),
            font_index,
            families,
            styles,
            ps,
            weight: face.weight().to_number(),
        })
    }

    pub fn location(&self) -> FontLocation {
        FontLocation::new(self.path.clone(), self.font_index)
    }

    fn family_hit(&self, family: &str) -> bool {
        let wanted = family.trim().to_lowercase();
        let wanted_bare = wanted.trim_start_matches('.');
        self.families
            .iter()
            .chain(std::iter::once(&self.ps))
            .any(|name| *name == wanted || name.trim_start_matches('.') == wanted_bare)
    }
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontIndex {
    pub version: u32,
    pub fonts: Vec<IndexEntry>,
}

impl FontIndex {
    pub fn new(fonts: Vec<IndexEntry>) -> Self {
        Self {
            version: INDEX_VERSION,
            fonts,
        }
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Read a persisted index.
    ///
    /// A missing, unreadable or outdated file yields an empty index; entries
    /// whose file disappeared are dropped.
    pub fn load(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(_) => return Self::new(Vec::new()),
        };
        let mut index: FontIndex = match serde_json::from_str(&text) {
            Ok(index) => index,
            Err(err) => {
                warn!(target: "t2p::fontdb", "ignoring unreadable font index {}: {err}", path.display());
                return Self::new(Vec::new());
            }
        };
        if index.version != INDEX_VERSION {
            info!(
                target: "t2p::fontdb",
                "font index {} has version {}, expected {INDEX_VERSION}; rebuilding",
                path.display(),
                index.version
            );
            return Self::new(Vec::new());
        }
        index.fonts.retain(|entry| entry.path.exists());
        info!(target: "t2p::fontdb", "loaded {} indexed faces from {}", index.len(), path.display());
        index
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_atomic(path, &serde_json::to_vec_pretty(self)?)
    }

    /// Exact lookup: family (or PostScript name) must match and the wanted
    /// style tokens must be a subset of one of the entry's styles.
    pub fn find(
        &self,
        family: &str,
        wanted: &BTreeSet<String>,
        skip: impl Fn(&IndexEntry) -> bool,
    ) -> Option<&IndexEntry> {
        self.fonts.iter().filter(|e| !skip(e)).find(|entry| {
            entry.family_hit(family) && {
                let normal = ["normal".to_string()];
                let styles: &[String] = if entry.styles.is_empty() { &normal } else { &entry.styles };
                styles.iter().any(|s| wanted.is_subset(&style_tokens(s)))
            }
        })
    }
}

/// Faces known to fail parsing, keyed by (path, face index).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Quarantine {
    entries: HashSet<(PathBuf, u32)>,
}

#[derive(Serialize, Deserialize)]
struct QuarantineFile {
    corrupted: Vec<QuarantineRecord>,
}

#[derive(Serialize, Deserialize)]
struct QuarantineRecord {
    path: PathBuf,
    font_index: u32,
}

impl Quarantine {
    pub fn load(path: &Path) -> Self {
        let Ok(text) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str::<QuarantineFile>(&text) {
            Ok(file) => Self {
                entries: file
                    .corrupted
                    .into_iter()
                    .map(|r| (r.path, r.font_index))
                    .collect(),
            },
            Err(err) => {
                warn!(target: "t2p::fontdb", "ignoring unreadable quarantine file {}: {err}", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut corrupted: Vec<QuarantineRecord> = self
            .entries
            .iter()
            .map(|(path, font_index)| QuarantineRecord {
                path: path.clone(),
                font_index: *font_index,
            })
            .collect();
        corrupted.sort_by(|a, b| (&a.path, a.font_index).cmp(&(&b.path, b.font_index)));
        write_atomic(path, &serde_json::to_vec_pretty(&QuarantineFile { corrupted })?)
    }

    /// Returns true if the entry was newly added.
    pub fn insert(&mut self, path: &Path, font_index: u32) -> bool {
        self.entries.insert((path.to_path_buf(), font_index))
    }

    pub fn contains(&self, path: &Path, font_index: u32) -> bool {
        self.entries.contains(&(path.to_path_buf(), font_index))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Write through a sibling temp file and rename into place.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Canonical spelling of one style token.
pub fn normalize_style_token(token: &str) -> String {
    let t = token.trim().to_lowercase();
    let t = t
        .replace("semi-light", "light")
        .replace("book", "normal")
        .replace("ultra-heavy", "heavy")
        .replace("medium", "normal");
    match t.as_str() {
        "regular" | "plain" | "roman" => "normal".to_string(),
        _ => t,
    }
}

/// Split a style name on camelCase, `-`, `_` and whitespace into normalized tokens.
pub fn style_tokens(style: &str) -> BTreeSet<String> {
    let mut spaced = String::with_capacity(style.len() + 4);
    let mut prev_lower = false;
    for ch in style.chars() {
        if prev_lower && ch.is_uppercase() {
            spaced.push(' ');
        }
        prev_lower = ch.is_lowercase();
        spaced.push(if ch == '-' || ch == '_' { ' ' } else { ch });
    }
    spaced
        .split_whitespace()
        .map(normalize_style_token)
        .collect()
}

/// Style label describing a CSS request, e.g. `bold italic condensed`.
pub fn style_label(weight: u16, style: FontStyle, stretch: &str) -> String {
    let mut parts = vec![match weight {
        w if w >= 800 => "heavy",
        w if w >= 700 => "bold",
        w if w >= 600 => "semibold",
        w if w >= 500 => "medium",
        w if w <= 300 => "light",
        _ => "normal",
    }
    .to_string()];
    if style.is_slanted() {
        parts.push("italic".to_string());
    }
    let stretch = stretch.trim().to_lowercase();
    if !stretch.is_empty() && stretch != "normal" {
        parts.push(stretch);
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(family: &str, style: &str) -> IndexEntry {
        IndexEntry {
            path: PathBuf::from(format!("/fonts/{family}-{style}.ttf")),
            font_index: 0,
            families: vec![family.to_lowercase()],
            styles: vec![style.to_lowercase()],
            ps: format!("{family}-{style}").to_lowercase(),
            weight: 400,
        }
    }

    #[test]
    fn test_style_tokens_split_and_normalize() {
        let tokens = style_tokens("SemiBoldItalic");
        assert!(tokens.contains("semi") && tokens.contains("bold") && tokens.contains("italic"));
        assert_eq!(style_tokens("Regular"), BTreeSet::from(["normal".to_string()]));
        assert_eq!(style_tokens("Book"), BTreeSet::from(["normal".to_string()]));
        assert_eq!(style_tokens("bold_italic").len(), 2);
    }

    #[test]
    fn test_style_label() {
        assert_eq!(style_label(400, FontStyle::Normal, "normal"), "normal");
        assert_eq!(style_label(700, FontStyle::Italic, "normal"), "bold italic");
        assert_eq!(style_label(900, FontStyle::Oblique, "condensed"), "heavy italic condensed");
        assert_eq!(style_label(300, FontStyle::Normal, ""), "light");
    }

    #[test]
    fn test_find_requires_style_subset() {
        let index = FontIndex::new(vec![entry("Futura", "Bold"), entry("Futura", "Regular")]);
        let normal = style_tokens(&style_label(400, FontStyle::Normal, "normal"));
        let bold = style_tokens(&style_label(700, FontStyle::Normal, "normal"));
        let hit = index.find("Futura", &normal, |_| false).unwrap();
        assert!(hit.styles[0].contains("regular"));
        let hit = index.find("futura", &bold, |_| false).unwrap();
        assert!(hit.styles[0].contains("bold"));
        assert!(index.find("Gill Sans", &normal, |_| false).is_none());
    }

    #[test]
    fn test_find_matches_postscript_and_dot_prefix() {
        let mut e = entry(".New York", "Regular");
        e.ps = ".newyork-regular".into();
        let index = FontIndex::new(vec![e]);
        let normal = style_tokens("normal");
        assert!(index.find("New York", &normal, |_| false).is_some());
        assert!(index.find(".NewYork-Regular", &normal, |_| false).is_some());
    }

    #[test]
    fn test_find_honours_skip() {
        let index = FontIndex::new(vec![entry("Futura", "Regular")]);
        let normal = style_tokens("normal");
        assert!(index.find("Futura", &normal, |_| true).is_none());
    }

    #[test]
    fn test_index_roundtrip_drops_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let font = dir.path().join("real.ttf");
        std::fs::write(&font, b"\0").unwrap();
        let mut real = entry("Real", "Regular");
        real.path = font.clone();
        let index = FontIndex::new(vec![real, entry("Gone", "Regular")]);

        let path = dir.path().join("nested/font_cache.json");
        index.save(&path).unwrap();
        let loaded = FontIndex::load(&path);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.fonts[0].path, font);
    }

    #[test]
    fn test_version_mismatch_discards_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("font_cache.json");
        std::fs::write(&path, r#"{"version": 1, "fonts": []}"#).unwrap();
        let loaded = FontIndex::load(&path);
        assert!(loaded.is_empty());
        assert_eq!(loaded.version, INDEX_VERSION);
    }

    #[test]
    fn test_quarantine_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupted_fonts.json");
        let mut q = Quarantine::default();
        assert!(q.insert(Path::new("/bad.ttf"), 0));
        assert!(!q.insert(Path::new("/bad.ttf"), 0));
        q.save(&path).unwrap();

        let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["corrupted"][0]["font_index"], 0);

        let loaded = Quarantine::load(&path);
        assert!(loaded.contains(Path::new("/bad.ttf"), 0));
        assert!(!loaded.contains(Path::new("/bad.ttf"), 1));
    }
}

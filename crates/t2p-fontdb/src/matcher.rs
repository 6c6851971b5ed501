// this_file: crates/t2p-fontdb/src/matcher.rs

//! System font matchers.

use crate::config::MatcherKind;
use fontdb::{Database, Family, Query, Source, Stretch, Style, Weight};
use log::{debug, warn};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use t2p_core::{FontLocation, FontMatcher, FontStyle, MatchQuery, Result, T2pError};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Build the matcher selected by `kind`.
pub fn matcher_for(kind: MatcherKind, timeout_ms: u64, extra_dirs: &[String]) -> Box<dyn FontMatcher> {
    match kind {
        MatcherKind::Fontconfig => Box::new(FontconfigMatcher::new(timeout_ms)),
        MatcherKind::Fontdb => Box::new(FontdbMatcher::new(extra_dirs.to_vec())),
        MatcherKind::Auto => {
            let fc = FontconfigMatcher::new(timeout_ms);
            if fc.is_available() {
                Box::new(fc)
            } else {
                debug!(target: "t2p::fontdb", "fc-match unavailable, using in-process font database");
                Box::new(FontdbMatcher::new(extra_dirs.to_vec()))
            }
        }
    }
}

/// Queries fontconfig through the `fc-match` executable.
pub struct FontconfigMatcher {
    program: String,
    timeout: Duration,
    available: OnceCell<bool>,
}

impl FontconfigMatcher {
    pub fn new(timeout_ms: u64) -> Self {
        Self::with_program("fc-match", timeout_ms)
    }

    /// Use a different executable, e.g. a wrapper script.
    pub fn with_program(program: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            program: program.into(),
            timeout: Duration::from_millis(timeout_ms.max(1)),
            available: OnceCell::new(),
        }
    }

    pub fn is_available(&self) -> bool {
        *self.available.get_or_init(|| {
            matches!(self.run(&["--version"]), Ok(Some(_)))
        })
    }

    /// Run the matcher, killing it once the timeout elapses.
    ///
    /// `Ok(None)` means the program could not be started or exited non-zero.
    fn run(&self, args: &[&str]) -> Result<Option<String>> {
        let mut child = match Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(err) => {
                debug!(target: "t2p::fontdb", "cannot start {}: {err}", self.program);
                return Ok(None);
            }
        };

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if started.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(T2pError::MatcherTimeout {
                    pattern: args.join(" "),
                    timeout_ms: self.timeout.as_millis() as u64,
                });
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        let mut stdout = String::new();
        if let Some(mut out) = child.stdout.take() {
            out.read_to_string(&mut stdout)?;
        }
        Ok(status.success().then_some(stdout))
    }
}

/// Parse `%{file}\n%{index}` output.
fn parse_fc_output(output: &str) -> Option<FontLocation> {
    let mut lines = output.lines();
    let path = lines.next()?.trim();
    if path.is_empty() {
        return None;
    }
    let face_index = lines
        .next()
        .and_then(|l| l.trim().parse::<u32>().ok())
        .unwrap_or(0);
    let path = PathBuf::from(path);
    path.exists().then(|| FontLocation::new(path, face_index))
}

impl FontMatcher for FontconfigMatcher {
    fn name(&self) -> &str {
        "fontconfig"
    }

    fn match_query(&self, query: &MatchQuery) -> Result<Option<FontLocation>> {
        let pattern = query.to_pattern();
        let output = self
            .run(&["--format=%{file}\n%{index}", &pattern])
            .map_err(|err| match err {
                T2pError::MatcherTimeout { timeout_ms, .. } => T2pError::MatcherTimeout {
                    pattern: pattern.clone(),
                    timeout_ms,
                },
                other => other,
            })?;
        let location = output.as_deref().and_then(parse_fc_output);
        debug!(target: "t2p::fontdb", "fc-match {pattern:?} -> {location:?}");
        Ok(location)
    }
}

/// Sample character used to answer `:lang=` queries without fontconfig.
fn lang_sample(lang: &str) -> Option<char> {
    let lang = lang.to_ascii_lowercase();
    let primary = lang.split(['-', '_']).next().unwrap_or("");
    Some(match primary {
        "ar" | "fa" | "ur" => '\u{0627}',
        "he" | "yi" => '\u{05D0}',
        "zh" => '\u{4E2D}',
        "ja" => '\u{3042}',
        "ko" => '\u{D55C}',
        "el" => '\u{03B1}',
        "ru" | "uk" | "bg" => '\u{0434}',
        "th" => '\u{0E01}',
        "hi" => '\u{0915}',
        _ => return None,
    })
}

fn weight_from_style_name(name: &str) -> Option<u16> {
    let lower = name.to_ascii_lowercase();
    Some(match lower.as_str() {
        "thin" => 100,
        "extralight" => 200,
        "light" => 300,
        "regular" | "italic" => 400,
        "medium" => 500,
        "semibold" => 600,
        "bold" => 700,
        "extrabold" => 800,
        "black" => 900,
        _ => return None,
    })
}

fn stretch_from_token(token: &str) -> Stretch {
    match token {
        "ultracondensed" => Stretch::UltraCondensed,
        "extracondensed" => Stretch::ExtraCondensed,
        "condensed" => Stretch::Condensed,
        "semicondensed" => Stretch::SemiCondensed,
        "semiexpanded" => Stretch::SemiExpanded,
        "expanded" => Stretch::Expanded,
        "extraexpanded" => Stretch::ExtraExpanded,
        "ultraexpanded" => Stretch::UltraExpanded,
        _ => Stretch::Normal,
    }
}

/// In-process matcher over an indexed `fontdb` database.
///
/// The system scan runs on first use.
pub struct FontdbMatcher {
    extra_dirs: Vec<String>,
    db: OnceCell<Database>,
}

impl FontdbMatcher {
    pub fn new(extra_dirs: Vec<String>) -> Self {
        Self {
            extra_dirs,
            db: OnceCell::new(),
        }
    }

    /// Matcher over an explicit set of directories, without system fonts.
    pub fn from_dirs(dirs: &[PathBuf]) -> Self {
        let mut db = Database::new();
        for dir in dirs {
            db.load_fonts_dir(dir);
        }
        Self {
            extra_dirs: Vec::new(),
            db: OnceCell::with_value(db),
        }
    }

    fn database(&self) -> &Database {
        self.db.get_or_init(|| {
            let mut db = Database::new();
            db.load_system_fonts();
            for dir in &self.extra_dirs {
                db.load_fonts_dir(shellexpand::tilde(dir).into_owned());
            }
            debug!(target: "t2p::fontdb", "fontdb indexed {} faces", db.len());
            db
        })
    }

    fn location_of(db: &Database, id: fontdb::ID) -> Option<FontLocation> {
        let face = db.face(id)?;
        let path: &Path = match &face.source {
            Source::File(path) => path,
            Source::SharedFile(path, _) => path,
            Source::Binary(_) => return None,
        };
        Some(FontLocation::new(path.to_path_buf(), face.index))
    }

    fn covering_face(db: &Database, sample: char) -> Option<FontLocation> {
        db.faces().find_map(|face| {
            let covers = db
                .with_face_data(face.id, |data, index| {
                    ttf_parser::Face::parse(data, index)
                        .ok()
                        .and_then(|f| f.glyph_index(sample))
                        .is_some()
                })
                .unwrap_or(false);
            if covers {
                Self::location_of(db, face.id)
            } else {
                None
            }
        })
    }
}

impl FontMatcher for FontdbMatcher {
    fn name(&self) -> &str {
        "fontdb"
    }

    fn match_query(&self, query: &MatchQuery) -> Result<Option<FontLocation>> {
        let db = self.database();
        if query.family.is_empty() {
            let Some(sample) = query.lang.as_deref().and_then(lang_sample) else {
                return Ok(None);
            };
            return Ok(Self::covering_face(db, sample));
        }

        let family = match query.family.to_ascii_lowercase().as_str() {
            "sans-serif" | "sans" => Family::SansSerif,
            "serif" => Family::Serif,
            "monospace" | "mono" => Family::Monospace,
            "cursive" => Family::Cursive,
            "fantasy" => Family::Fantasy,
            _ => Family::Name(&query.family),
        };
        let weight = query
            .weight
            .or_else(|| query.style_name.as_deref().and_then(weight_from_style_name))
            .unwrap_or(400);
        let style = match query.slant {
            Some(FontStyle::Italic) => Style::Italic,
            Some(FontStyle::Oblique) => Style::Oblique,
            _ => Style::Normal,
        };
        let families = [family];
        let id = db.query(&Query {
            families: &families,
            weight: Weight(weight),
            stretch: query.width.as_deref().map(stretch_from_token).unwrap_or_default(),
            style,
        });
        Ok(id.and_then(|id| Self::location_of(db, id)))
    }
}

/// Explicit family registry, for bundled fonts and tests.
///
/// Registrations are aliases chosen by the caller, so answers skip family
/// name verification.
#[derive(Default)]
pub struct StaticMatcher {
    families: RwLock<HashMap<String, FontLocation>>,
    langs: RwLock<HashMap<String, FontLocation>>,
}

impl StaticMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, family: &str, path: impl Into<PathBuf>, face_index: u32) -> &Self {
        self.families
            .write()
            .insert(family.trim().to_lowercase(), FontLocation::new(path, face_index));
        self
    }

    pub fn register_lang(&self, lang: &str, path: impl Into<PathBuf>, face_index: u32) -> &Self {
        self.langs
            .write()
            .insert(lang.trim().to_lowercase(), FontLocation::new(path, face_index));
        self
    }
}

impl FontMatcher for StaticMatcher {
    fn name(&self) -> &str {
        "static"
    }

    fn is_authoritative(&self) -> bool {
        true
    }

    fn match_query(&self, query: &MatchQuery) -> Result<Option<FontLocation>> {
        if query.family.is_empty() {
            let found = query
                .lang
                .as_ref()
                .and_then(|lang| self.langs.read().get(&lang.to_lowercase()).cloned());
            return Ok(found);
        }
        let found = self.families.read().get(&query.family.to_lowercase()).cloned();
        if found.is_none() {
            warn!(target: "t2p::fontdb", "static matcher has no entry for {:?}", query.family);
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fonts_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../testdata/fonts")
    }

    #[test]
    fn test_parse_fc_output() {
        let font = fonts_dir().join("DejaVuSans.ttf");
        let out = format!("{}\n0", font.display());
        let loc = parse_fc_output(&out).unwrap();
        assert_eq!(loc.path, font);
        assert_eq!(loc.face_index, 0);
        assert!(parse_fc_output("").is_none());
        assert!(parse_fc_output("/no/such/file.ttf\n0").is_none());
    }

    #[test]
    fn test_missing_program_is_not_available() {
        let fc = FontconfigMatcher::with_program("t2p-definitely-not-installed", 100);
        assert!(!fc.is_available());
        assert_eq!(fc.match_query(&MatchQuery::family("Arial")).unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_stalled_matcher_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("slow-fc");
        std::fs::write(&script, "#!/bin/sh\nsleep 5\n").unwrap();
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let fc = FontconfigMatcher::with_program(script.to_string_lossy(), 50);
        let started = Instant::now();
        let err = fc.match_query(&MatchQuery::family("Arial")).unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(4));
        match err {
            T2pError::MatcherTimeout { pattern, timeout_ms } => {
                assert_eq!(pattern, "Arial");
                assert_eq!(timeout_ms, 50);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_fontdb_matcher_over_test_fonts() {
        let matcher = FontdbMatcher::from_dirs(&[fonts_dir()]);
        let loc = matcher
            .match_query(&MatchQuery::family("DejaVu Serif").with_weight(400))
            .unwrap()
            .unwrap();
        assert!(loc.path.ends_with("DejaVuSerif.ttf"));

        let hebrew = matcher.match_query(&MatchQuery::lang("he")).unwrap().unwrap();
        assert!(hebrew.path.ends_with("DejaVuSans.ttf"));
    }

    #[test]
    fn test_static_matcher() {
        let matcher = StaticMatcher::new();
        matcher
            .register("Arial", fonts_dir().join("DejaVuSans.ttf"), 0)
            .register_lang("ar", fonts_dir().join("DejaVuSans.ttf"), 0);
        assert!(matcher.match_query(&MatchQuery::family("arial")).unwrap().is_some());
        assert!(matcher.match_query(&MatchQuery::lang("AR")).unwrap().is_some());
        assert!(matcher.match_query(&MatchQuery::family("Helvetica")).unwrap().is_none());
        assert!(matcher.is_authoritative());
    }

    #[test]
    fn test_style_name_weights() {
        assert_eq!(weight_from_style_name("SemiBold"), Some(600));
        assert_eq!(weight_from_style_name("Fancy"), None);
        assert_eq!(stretch_from_token("semicondensed"), Stretch::SemiCondensed);
    }
}

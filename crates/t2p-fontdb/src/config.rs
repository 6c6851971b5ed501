// this_file: crates/t2p-fontdb/src/config.rs

//! Font cache configuration.

use crate::fallback::FallbackTable;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use t2p_core::Result;

/// Environment variable overriding the persisted index location.
pub const CACHE_ENV_VAR: &str = "T2P_FONT_CACHE";

const CACHE_SUBDIR: &str = "text2path";
const INDEX_FILE: &str = "font_cache.json";
const QUARANTINE_FILE: &str = "corrupted_fonts.json";

/// Which system matcher answers font queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatcherKind {
    /// fontconfig when `fc-match` responds, in-process fontdb otherwise
    #[default]
    Auto,
    Fontconfig,
    Fontdb,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontCacheConfig {
    /// Explicit index file. `None` uses the platform cache directory.
    pub index_path: Option<PathBuf>,
    /// Read and write the index and quarantine files.
    pub persist: bool,
    pub matcher: MatcherKind,
    pub matcher_timeout_ms: u64,
    /// Scanned by `prewarm` in addition to the system font directories.
    pub extra_font_dirs: Vec<String>,
    /// Include the platform font directories when building the index.
    pub scan_system_dirs: bool,
    pub fallbacks: FallbackTable,
}

impl Default for FontCacheConfig {
    fn default() -> Self {
        Self {
            index_path: None,
            persist: true,
            matcher: MatcherKind::Auto,
            matcher_timeout_ms: 5_000,
            extra_font_dirs: Vec::new(),
            scan_system_dirs: true,
            fallbacks: FallbackTable::default(),
        }
    }
}

impl FontCacheConfig {
    /// Defaults plus `T2P_FONT_CACHE` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(path) = std::env::var_os(CACHE_ENV_VAR).filter(|v| !v.is_empty()) {
            config.index_path = Some(PathBuf::from(path));
        }
        config
    }

    /// Configuration that never touches disk state.
    pub fn ephemeral() -> Self {
        Self {
            persist: false,
            ..Self::default()
        }
    }

    /// Read a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn index_file(&self) -> Option<PathBuf> {
        if !self.persist {
            return None;
        }
        self.index_path
            .clone()
            .or_else(|| dirs::cache_dir().map(|dir| dir.join(CACHE_SUBDIR).join(INDEX_FILE)))
    }

    /// Quarantine file, stored next to the index.
    pub fn quarantine_file(&self) -> Option<PathBuf> {
        let index = self.index_file()?;
        let dir = index.parent().map(Path::to_path_buf).unwrap_or_default();
        Some(dir.join(QUARANTINE_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quarantine_sits_next_to_index() {
        let config = FontCacheConfig {
            index_path: Some(PathBuf::from("/tmp/x/custom.json")),
            ..Default::default()
        };
        assert_eq!(config.index_file(), Some(PathBuf::from("/tmp/x/custom.json")));
        assert_eq!(
            config.quarantine_file(),
            Some(PathBuf::from("/tmp/x/corrupted_fonts.json"))
        );
    }

    #[test]
    fn test_ephemeral_has_no_files() {
        let config = FontCacheConfig::ephemeral();
        assert!(config.index_file().is_none());
        assert!(config.quarantine_file().is_none());
    }

    #[test]
    fn test_load_partial_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"matcher": "fontdb", "matcher_timeout_ms": 250}"#).unwrap();
        let config = FontCacheConfig::load(&path).unwrap();
        assert_eq!(config.matcher, MatcherKind::Fontdb);
        assert_eq!(config.matcher_timeout_ms, 250);
        assert!(config.persist);
        assert!(config.scan_system_dirs);
        assert!(!config.fallbacks.rules.is_empty());
    }

    #[test]
    fn test_default_index_location() {
        let config = FontCacheConfig::default();
        if let Some(path) = config.index_file() {
            assert!(path.ends_with("text2path/font_cache.json"));
        }
    }
}

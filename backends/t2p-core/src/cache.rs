// this_file: backends/t2p-core/src/cache.rs

//! Shared font byte storage backed by memory maps.

use crate::{Result, T2pError};
use dashmap::DashMap;
use memmap2::Mmap;
use std::fs::File;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Raw font bytes, either mapped from disk or held in memory.
pub enum FontBytes {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Deref for FontBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Self::Mapped(map) => &map[..],
            Self::Owned(bytes) => &bytes[..],
        }
    }
}

impl AsRef<[u8]> for FontBytes {
    fn as_ref(&self) -> &[u8] {
        &self[..]
    }
}

impl std::fmt::Debug for FontBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::Mapped(_) => "Mapped",
            Self::Owned(_) => "Owned",
        };
        f.debug_struct("FontBytes")
            .field("kind", &kind)
            .field("len", &self.len())
            .finish()
    }
}

/// Shared handle to font bytes.
pub type FontData = Arc<FontBytes>;

/// Process-local cache of font files keyed by path.
#[derive(Default)]
pub struct FontDataCache {
    /// Memory-mapped font files
    files: DashMap<PathBuf, FontData>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl FontDataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or map a font file
    pub fn load(&self, path: &Path) -> Result<FontData> {
        if let Some(data) = self.files.get(path) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(data.clone());
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let file = File::open(path).map_err(|e| T2pError::font_load(path, e))?;
        // SAFETY: font files are treated as read-only for the lifetime of the map.
        let mmap = unsafe { Mmap::map(&file).map_err(|e| T2pError::font_load(path, e))? };

        let data = Arc::new(FontBytes::Mapped(mmap));
        self.files.insert(path.to_owned(), data.clone());
        Ok(data)
    }

    /// Register in-memory bytes under a path-like key.
    pub fn insert_owned(&self, key: impl Into<PathBuf>, bytes: Vec<u8>) -> FontData {
        let data = Arc::new(FontBytes::Owned(bytes));
        self.files.insert(key.into(), data.clone());
        data
    }

    /// Drop a file so the next load re-reads it.
    pub fn evict(&self, path: &Path) {
        self.files.remove(path);
    }

    pub fn clear(&self) {
        self.files.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            file_count: self.files.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub file_count: usize,
    pub hits: usize,
    pub misses: usize,
}

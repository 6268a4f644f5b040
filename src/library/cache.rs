//! Read-only lookup into the directory of already converted PCM files.

use std::fs;
use std::path::{Path, PathBuf};

use super::model::TARGET_FORMAT;

#[derive(Debug, Clone)]
pub struct PcmCache {
    dir: PathBuf,
}

impl PcmCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Where a converted copy of `source` lives (whether or not it exists).
    pub fn entry_path(&self, source: &Path) -> Option<PathBuf> {
        let stem = source.file_stem()?;
        let mut name = stem.to_os_string();
        name.push(".");
        name.push(TARGET_FORMAT);
        Some(self.dir.join(name))
    }

    /// Cached conversion for `source`, or `None` when missing or stale.
    pub fn lookup(&self, source: &Path) -> Option<PathBuf> {
        let cached = self.entry_path(source)?;
        let cached_meta = fs::metadata(&cached).ok()?;
        if !cached_meta.is_file() {
            return None;
        }

        // A source we cannot stat cannot be proven newer.
        let source_modified = fs::metadata(source).and_then(|m| m.modified()).ok();
        let cached_modified = cached_meta.modified().ok();
        match (source_modified, cached_modified) {
            (Some(src), Some(cache)) if src > cache => {
                log::debug!("stale pcm cache for {}", source.display());
                None
            }
            _ => Some(cached),
        }
    }
}

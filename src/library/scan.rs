use std::path::Path;

use lofty::prelude::{Accessor, TaggedFileExt};
use walkdir::WalkDir;

use crate::config::LibrarySettings;

use super::cache::PcmCache;
use super::model::{LibraryEntry, TARGET_FORMAT};

fn is_audio_file(path: &Path, settings: &LibrarySettings) -> bool {
    let exts: Vec<String> = settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Tagged title if the file carries one, else the file stem.
fn display_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("UNKNOWN")
        .to_string();

    // Raw PCM has no container for lofty to probe.
    let is_pcm = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case(TARGET_FORMAT));
    if is_pcm {
        return stem;
    }

    lofty::read_from_path(path)
        .ok()
        .and_then(|tagged| {
            let tag = tagged.primary_tag().or_else(|| tagged.first_tag())?;
            let title = tag.title()?;
            let title = title.trim();
            (!title.is_empty()).then(|| title.to_string())
        })
        .unwrap_or(stem)
}

impl LibraryEntry {
    /// Build an entry for a single file, resolving its cached conversion.
    pub fn from_path(path: &Path, cache: &PcmCache) -> Self {
        let entry = LibraryEntry::new(display_name(path), path);
        if entry.is_pcm() {
            return entry;
        }
        let cached = cache.lookup(path);
        entry.with_cached_pcm(cached)
    }
}

pub fn scan(dir: &Path, settings: &LibrarySettings, cache: &PcmCache) -> Vec<LibraryEntry> {
    let mut entries: Vec<LibraryEntry> = Vec::new();

    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    for entry in walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if path.is_file()
            && (settings.include_hidden || !is_hidden(path))
            && is_audio_file(path, settings)
        {
            entries.push(LibraryEntry::from_path(path, cache));
        }
    }

    entries.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    log::debug!("scanned {} library entries under {}", entries.len(), dir.display());
    entries
}

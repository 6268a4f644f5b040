use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// One sprite as listed by the sprite catalog JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SpriteEntry {
    pub name: String,
    pub author: String,
    /// Download URL of the `.zspr`.
    pub file: String,
    /// URL of a preview image.
    pub preview: String,
    pub tags: Vec<String>,
    pub usage: Vec<String>,
}

impl SpriteEntry {
    /// Case-insensitive match against name, author and tags. A blank query matches.
    pub fn matches(&self, query: &str) -> bool {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&q)
            || self.author.to_lowercase().contains(&q)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&q))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("failed to read sprite catalog {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed sprite catalog: {0}")]
    Json(#[from] serde_json::Error),
}

/// Sprite listing plus the directory its downloaded files live in.
///
/// The parsed listing is kept until `invalidate` is called; the owner decides
/// how long that is.
#[derive(Debug)]
pub struct SpriteCatalog {
    cache_dir: PathBuf,
    entries: Option<Vec<SpriteEntry>>,
}

impl SpriteCatalog {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            entries: None,
        }
    }

    /// Parse `listing` unless a listing is already held.
    pub fn load_or_cached(&mut self, listing: &Path) -> Result<&[SpriteEntry], CatalogError> {
        if self.entries.is_none() {
            let json = fs::read_to_string(listing).map_err(|source| CatalogError::Io {
                path: listing.to_path_buf(),
                source,
            })?;
            let entries: Vec<SpriteEntry> = serde_json::from_str(&json)?;
            log::debug!("loaded {} sprites from {}", entries.len(), listing.display());
            self.entries = Some(entries);
        }
        Ok(self.entries.as_deref().unwrap_or_default())
    }

    pub fn invalidate(&mut self) {
        self.entries = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.entries.is_some()
    }

    pub fn entries(&self) -> &[SpriteEntry] {
        self.entries.as_deref().unwrap_or_default()
    }

    pub fn filter(&self, query: &str) -> Vec<&SpriteEntry> {
        self.entries().iter().filter(|e| e.matches(query)).collect()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&SpriteEntry> {
        let name = name.trim();
        self.entries()
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
    }

    /// Where the downloaded `.zspr` for `entry` is stored.
    pub fn local_path(&self, entry: &SpriteEntry) -> PathBuf {
        self.cache_dir
            .join(format!("{}.zspr", sanitize_file_name(&entry.name)))
    }

    /// The downloaded file for `entry`, if present.
    pub fn cached_file(&self, entry: &SpriteEntry) -> Option<PathBuf> {
        let path = self.local_path(entry);
        path.is_file().then_some(path)
    }
}

/// `"12 sprites"` or `"3 / 12 sprites"` when a filter hides some.
pub fn status_line(shown: usize, total: usize) -> String {
    if shown == total {
        format!("{total} sprites")
    } else {
        format!("{shown} / {total} sprites")
    }
}

/// Drop characters that are not allowed in file names on common platforms.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .filter(|&c| {
            !c.is_control() && !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|')
        })
        .collect()
}

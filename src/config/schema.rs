use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::apply::OverwriteMode;

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/msupack/config.toml` or `~/.config/msupack/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `MSUPACK__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub apply: ApplySettings,
    pub library: LibrarySettings,
    pub sprites: SpriteSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApplySettings {
    /// What to do when output files already exist.
    pub overwrite_mode: OverwriteMode,
    /// Answer given to the conflict prompt when stdin is not a terminal.
    /// Must be `overwrite` or `skip`.
    pub non_interactive_resolution: OverwriteMode,
    /// Output directory used when `--out` is not given.
    pub output_dir: Option<PathBuf>,
}

impl Default for ApplySettings {
    fn default() -> Self {
        Self {
            overwrite_mode: OverwriteMode::Ask,
            non_interactive_resolution: OverwriteMode::Skip,
            output_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// File extensions to treat as audio (case-insensitive, without dot).
    pub extensions: Vec<String>,
    /// Whether to follow symlinks during scanning.
    pub follow_links: bool,
    /// Whether to include hidden files/directories (dotfiles).
    pub include_hidden: bool,
    /// Whether to recurse into subdirectories.
    pub recursive: bool,
    /// Optional cap on directory recursion depth.
    pub max_depth: Option<usize>,
    /// Directory holding converted `.pcm` files. Defaults to the user cache dir.
    pub cache_dir: Option<PathBuf>,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            extensions: vec![
                "pcm".into(),
                "wav".into(),
                "mp3".into(),
                "flac".into(),
                "ogg".into(),
            ],
            follow_links: true,
            include_hidden: false,
            recursive: true,
            max_depth: None,
            cache_dir: None,
        }
    }
}

impl LibrarySettings {
    pub fn resolved_cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| default_cache_root().join("pcm"))
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SpriteSettings {
    /// Local JSON listing of known sprites (same shape as the public sprite API).
    pub catalog_file: Option<PathBuf>,
    /// Directory holding downloaded `.zspr` files. Defaults to the user cache dir.
    pub cache_dir: Option<PathBuf>,
}

impl SpriteSettings {
    pub fn resolved_cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| default_cache_root().join("sprites"))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// One of `off`, `error`, `warn`, `info`, `debug`, `trace`.
    pub level: String,
    /// Write the log to this file instead of stderr.
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
        }
    }
}

fn default_cache_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("msupack")
}

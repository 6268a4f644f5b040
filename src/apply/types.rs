//! Request and result types for an apply run.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::SlotIdError;

/// How to treat destination files that already exist.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverwriteMode {
    /// Pause and ask the caller through a `ConflictPrompt`.
    #[default]
    Ask,
    /// Replace every existing destination.
    Overwrite,
    /// Leave existing destinations untouched and do not report them as written.
    Skip,
}

/// A playback slot number as typed by the user.
///
/// Ordered by numeric value so `"10"` sorts after `"2"`; the original text is
/// kept for naming output files.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotId {
    number: u32,
    text: String,
}

impl SlotId {
    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl FromStr for SlotId {
    type Err = SlotIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SlotIdError(s.to_string()));
        }
        let number = text.parse().map_err(|_| SlotIdError(s.to_string()))?;
        Ok(Self {
            number,
            text: text.to_string(),
        })
    }
}

impl Ord for SlotId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.number
            .cmp(&other.number)
            .then_with(|| self.text.cmp(&other.text))
    }
}

impl PartialOrd for SlotId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// The engine's unit of work.
#[derive(Debug, Clone)]
pub struct ApplyRequest {
    pub rom_source: PathBuf,
    pub output_dir: PathBuf,
    /// Slot -> resolved audio file; iteration order is numeric slot order.
    pub tracks: BTreeMap<SlotId, PathBuf>,
    pub overwrite_mode: OverwriteMode,
    /// Overrides the ROM file stem for every produced file.
    pub output_base_name: Option<String>,
    /// `.zspr`/`.spr` file to inject into the copied ROM.
    pub sprite_source: Option<PathBuf>,
}

impl ApplyRequest {
    pub fn new(rom_source: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            rom_source: rom_source.into(),
            output_dir: output_dir.into(),
            tracks: BTreeMap::new(),
            overwrite_mode: OverwriteMode::Ask,
            output_base_name: None,
            sprite_source: None,
        }
    }

    pub fn with_track(mut self, slot: SlotId, source: impl Into<PathBuf>) -> Self {
        self.tracks.insert(slot, source.into());
        self
    }

    pub fn with_overwrite_mode(mut self, mode: OverwriteMode) -> Self {
        self.overwrite_mode = mode;
        self
    }

    pub fn with_base_name(mut self, name: impl Into<String>) -> Self {
        self.output_base_name = Some(name.into());
        self
    }

    pub fn with_sprite(mut self, sprite: impl Into<PathBuf>) -> Self {
        self.sprite_source = Some(sprite.into());
        self
    }

    pub fn has_sprite(&self) -> bool {
        self.sprite_source.is_some()
    }

    /// Number of progress steps for this request: validate, conflicts, mkdir,
    /// ROM, optional sprite, marker, then one per track.
    pub fn total_steps(&self) -> usize {
        4 + self.tracks.len() + usize::from(self.has_sprite())
    }
}

/// A destination that already exists before the run writes anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyConflict {
    pub file_name: String,
    pub dest_path: PathBuf,
}

/// Destinations actually written, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplySuccess {
    pub files_written: Vec<PathBuf>,
}

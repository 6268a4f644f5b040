use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::types::{ApplyConflict, ApplyRequest, SlotId};

pub const MARKER_EXTENSION: &str = "msu";
pub const TRACK_EXTENSION: &str = "pcm";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTrack {
    pub slot: SlotId,
    pub source: PathBuf,
    pub dest: PathBuf,
}

/// Every destination a request will produce, rooted at its output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPlan {
    pub base_name: OsString,
    pub rom_dest: PathBuf,
    pub marker_dest: PathBuf,
    /// In ascending numeric slot order.
    pub tracks: Vec<PlannedTrack>,
}

/// Trimmed `output_base_name` when non-blank, else the ROM's file stem.
pub fn base_name(request: &ApplyRequest) -> OsString {
    match request.output_base_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => OsString::from(name),
        _ => request
            .rom_source
            .file_stem()
            .map(|s| s.to_os_string())
            .unwrap_or_default(),
    }
}

fn with_suffix(base: &OsString, suffix: &str) -> OsString {
    let mut name = base.clone();
    name.push(suffix);
    name
}

pub fn plan(request: &ApplyRequest) -> OutputPlan {
    let base = base_name(request);
    let dir = &request.output_dir;

    // Copied verbatim, so `Game.SFC` stays `.SFC`.
    let rom_ext = request
        .rom_source
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let tracks = request
        .tracks
        .iter()
        .map(|(slot, source)| PlannedTrack {
            slot: slot.clone(),
            source: source.clone(),
            dest: dir.join(with_suffix(&base, &format!("-{slot}.{TRACK_EXTENSION}"))),
        })
        .collect();

    OutputPlan {
        rom_dest: dir.join(with_suffix(&base, &rom_ext)),
        marker_dest: dir.join(with_suffix(&base, &format!(".{MARKER_EXTENSION}"))),
        tracks,
        base_name: base,
    }
}

impl OutputPlan {
    /// All destinations in execution order.
    pub fn destinations(&self) -> impl Iterator<Item = &Path> {
        [self.rom_dest.as_path(), self.marker_dest.as_path()]
            .into_iter()
            .chain(self.tracks.iter().map(|t| t.dest.as_path()))
    }

    /// Destinations that already exist.
    pub fn conflicts(&self) -> Vec<ApplyConflict> {
        self.destinations()
            .filter(|dest| dest.exists())
            .map(|dest| ApplyConflict {
                file_name: dest
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                dest_path: dest.to_path_buf(),
            })
            .collect()
    }
}

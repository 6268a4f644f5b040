use std::path::PathBuf;

use clap::{ArgGroup, Parser};

use crate::apply::{OverwriteMode, SlotId, SlotIdError};

#[derive(thiserror::Error, Debug)]
pub enum UsageError {
    #[error("--track expects <slot>=<file>, got {0:?}")]
    BadTrack(String),

    #[error(transparent)]
    BadSlot(#[from] SlotIdError),

    #[error("slot {0} given more than once")]
    DuplicateSlot(SlotId),

    #[error("{0} is required")]
    Required(&'static str),

    #[error("track {slot} ({}) is {format} and has no cached PCM conversion", .path.display())]
    NeedsConversion {
        slot: SlotId,
        path: PathBuf,
        format: String,
    },
}

#[derive(Parser, Debug, Default)]
#[command(name = "msupack", version, about = "Assemble MSU-1 music packs")]
#[command(group(ArgGroup::new("mode").args(["ask", "overwrite", "skip"])))]
pub struct Args {
    /// Source ROM image
    #[arg(long, value_name = "FILE")]
    pub rom: Option<PathBuf>,

    /// Output directory (defaults to `apply.output_dir`)
    #[arg(short, long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Track for a playback slot, repeatable
    #[arg(short = 't', long = "track", value_name = "SLOT=FILE", value_parser = parse_track)]
    pub tracks: Vec<(SlotId, PathBuf)>,

    /// Base name for every output file instead of the ROM's stem
    #[arg(long, value_name = "BASE")]
    pub name: Option<String>,

    /// Sprite file, or the name of a downloaded catalog sprite
    #[arg(long, value_name = "FILE|NAME")]
    pub sprite: Option<String>,

    /// Ask before replacing existing output files
    #[arg(long)]
    pub ask: bool,

    /// Replace existing output files
    #[arg(long)]
    pub overwrite: bool,

    /// Leave existing output files alone
    #[arg(long)]
    pub skip: bool,

    /// List the audio files under DIR and their conversion state
    #[arg(long, value_name = "DIR")]
    pub library: Option<PathBuf>,

    /// List catalog sprites, optionally filtered by QUERY
    #[arg(long, value_name = "QUERY", num_args = 0..=1, default_missing_value = "")]
    pub sprites: Option<String>,

    /// Print the effective configuration as TOML
    #[arg(long)]
    pub print_config: bool,

    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// The overwrite policy picked on the command line, if any.
    pub fn mode(&self) -> Option<OverwriteMode> {
        if self.ask {
            Some(OverwriteMode::Ask)
        } else if self.overwrite {
            Some(OverwriteMode::Overwrite)
        } else if self.skip {
            Some(OverwriteMode::Skip)
        } else {
            None
        }
    }
}

fn parse_track(arg: &str) -> Result<(SlotId, PathBuf), UsageError> {
    let (slot, path) = arg
        .split_once('=')
        .filter(|(_, p)| !p.is_empty())
        .ok_or_else(|| UsageError::BadTrack(arg.to_string()))?;
    Ok((slot.parse()?, PathBuf::from(path)))
}

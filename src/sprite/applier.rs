use std::io;
use std::path::Path;

/// Validates a sprite patch and injects it into a ROM image in place.
pub trait SpriteApplier {
    fn validate(&self, patch: &Path) -> Result<(), SpriteError>;
    fn apply(&self, patch: &Path, rom: &Path) -> Result<(), SpriteError>;
}

impl<T: SpriteApplier + ?Sized> SpriteApplier for &T {
    fn validate(&self, patch: &Path) -> Result<(), SpriteError> {
        (**self).validate(patch)
    }

    fn apply(&self, patch: &Path, rom: &Path) -> Result<(), SpriteError> {
        (**self).apply(patch, rom)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SpriteError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("not a ZSPR or SPR file ({0} bytes)")]
    UnknownFormat(usize),

    #[error("unsupported ZSPR version {0}")]
    UnsupportedVersion(u8),

    #[error("{what} block at {offset:#x}+{len:#x} runs past the end of the file ({file_len:#x})")]
    Truncated {
        what: &'static str,
        offset: usize,
        len: usize,
        file_len: usize,
    },

    #[error("{what} block is {len:#x} bytes, expected {expected}")]
    BadBlockSize {
        what: &'static str,
        len: usize,
        expected: &'static str,
    },

    #[error("ROM is too small for a sprite ({0:#x} bytes)")]
    RomTooSmall(usize),
}

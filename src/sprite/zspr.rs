//! Link sprite patches in ZSPR (versioned, with header) and raw SPR form.
//!
//! ZSPR header, little endian:
//! magic `ZSPR` (4), version (1), checksum (4), gfx offset (4), gfx size (2),
//! palette offset (4), palette size (2), sprite type (2), reserved (6).

use std::fs;
use std::path::Path;

use super::applier::{SpriteApplier, SpriteError};

const MAGIC: &[u8; 4] = b"ZSPR";
const HEADER_LEN: usize = 29;
const SUPPORTED_VERSION: u8 = 1;

const GFX_LEN: usize = 0x7000;
const PALETTE_LEN: usize = 120;
const PALETTE_WITH_GLOVES_LEN: usize = 124;
const SPR_LEN: usize = GFX_LEN + PALETTE_LEN;

const ROM_GFX_OFFSET: usize = 0x80000;
const ROM_PALETTE_OFFSET: usize = 0xDD308;
const ROM_GLOVE_OFFSETS: [usize; 2] = [0xDEDF5, 0xDEDF7];
const ROM_MIN_LEN: usize = ROM_GLOVE_OFFSETS[1] + 2;

/// Size of the optional copier header some dumps carry.
const COPIER_HEADER_LEN: usize = 0x200;

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct SpriteData<'a> {
    pub gfx: &'a [u8],
    pub palette: &'a [u8],
    pub gloves: Option<&'a [u8]>,
}

fn read_u16(bytes: &[u8], at: usize) -> usize {
    u16::from_le_bytes([bytes[at], bytes[at + 1]]) as usize
}

fn read_u32(bytes: &[u8], at: usize) -> usize {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]) as usize
}

fn block<'a>(
    bytes: &'a [u8],
    what: &'static str,
    offset: usize,
    len: usize,
) -> Result<&'a [u8], SpriteError> {
    offset
        .checked_add(len)
        .and_then(|end| bytes.get(offset..end))
        .ok_or(SpriteError::Truncated {
            what,
            offset,
            len,
            file_len: bytes.len(),
        })
}

pub(crate) fn parse(bytes: &[u8]) -> Result<SpriteData<'_>, SpriteError> {
    if bytes.len() >= HEADER_LEN && bytes.starts_with(MAGIC) {
        return parse_zspr(bytes);
    }
    if bytes.len() == SPR_LEN {
        return Ok(SpriteData {
            gfx: &bytes[..GFX_LEN],
            palette: &bytes[GFX_LEN..],
            gloves: None,
        });
    }
    Err(SpriteError::UnknownFormat(bytes.len()))
}

fn parse_zspr(bytes: &[u8]) -> Result<SpriteData<'_>, SpriteError> {
    let version = bytes[4];
    if version != SUPPORTED_VERSION {
        return Err(SpriteError::UnsupportedVersion(version));
    }

    let gfx = block(bytes, "graphics", read_u32(bytes, 9), read_u16(bytes, 13))?;
    if gfx.len() != GFX_LEN {
        return Err(SpriteError::BadBlockSize {
            what: "graphics",
            len: gfx.len(),
            expected: "0x7000",
        });
    }

    let palette_block = block(bytes, "palette", read_u32(bytes, 15), read_u16(bytes, 19))?;
    let (palette, gloves) = match palette_block.len() {
        PALETTE_LEN => (palette_block, None),
        PALETTE_WITH_GLOVES_LEN => (
            &palette_block[..PALETTE_LEN],
            Some(&palette_block[PALETTE_LEN..]),
        ),
        len => {
            return Err(SpriteError::BadBlockSize {
                what: "palette",
                len,
                expected: "120 or 124",
            });
        }
    };

    Ok(SpriteData {
        gfx,
        palette,
        gloves,
    })
}

/// Writes `sprite` into `rom`, honoring a copier header.
pub(crate) fn patch_rom(rom: &mut [u8], sprite: &SpriteData<'_>) -> Result<(), SpriteError> {
    let header = if rom.len() % 0x400 == COPIER_HEADER_LEN {
        COPIER_HEADER_LEN
    } else {
        0
    };
    if rom.len() < header + ROM_MIN_LEN {
        return Err(SpriteError::RomTooSmall(rom.len()));
    }

    let gfx_at = header + ROM_GFX_OFFSET;
    rom[gfx_at..gfx_at + GFX_LEN].copy_from_slice(sprite.gfx);

    let palette_at = header + ROM_PALETTE_OFFSET;
    rom[palette_at..palette_at + PALETTE_LEN].copy_from_slice(sprite.palette);

    if let Some(gloves) = sprite.gloves {
        for (i, offset) in ROM_GLOVE_OFFSETS.iter().enumerate() {
            let at = header + offset;
            rom[at..at + 2].copy_from_slice(&gloves[i * 2..i * 2 + 2]);
        }
    }
    Ok(())
}

/// `SpriteApplier` for `.zspr` and `.spr` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZsprApplier;

impl SpriteApplier for ZsprApplier {
    fn validate(&self, patch: &Path) -> Result<(), SpriteError> {
        let bytes = fs::read(patch)?;
        parse(&bytes).map(|_| ())
    }

    fn apply(&self, patch: &Path, rom: &Path) -> Result<(), SpriteError> {
        let bytes = fs::read(patch)?;
        let sprite = parse(&bytes)?;

        let mut image = fs::read(rom)?;
        patch_rom(&mut image, &sprite)?;
        fs::write(rom, &image)?;
        log::debug!("injected sprite {} into {}", patch.display(), rom.display());
        Ok(())
    }
}

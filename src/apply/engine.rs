use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use crate::sprite::SpriteApplier;

use super::cancel::CancelToken;
use super::error::ApplyError;
use super::negotiate::ConflictPrompt;
use super::plan::{OutputPlan, plan};
use super::types::{ApplyConflict, ApplyRequest, ApplySuccess, OverwriteMode};

/// Receives progress and conflict prompts from a running engine.
pub trait ApplyObserver {
    /// Called before each step. `current` never decreases within a run and
    /// the last call has `current == total`.
    fn progress(&mut self, step: &str, current: usize, total: usize);

    /// Called at most once per run, only under `OverwriteMode::Ask` with a
    /// non-empty conflict set. The run stays suspended until the prompt is
    /// answered or dropped.
    fn conflicts(&mut self, prompt: ConflictPrompt);
}

/// Builds the output bundle for one `ApplyRequest` at a time.
pub struct ApplyEngine<A> {
    applier: A,
}

impl<A: SpriteApplier> ApplyEngine<A> {
    pub fn new(applier: A) -> Self {
        Self { applier }
    }

    pub fn run<O: ApplyObserver>(
        &mut self,
        request: &ApplyRequest,
        observer: &mut O,
        cancel: &CancelToken,
    ) -> Result<ApplySuccess, ApplyError> {
        let total = request.total_steps();

        observer.progress("Validating inputs...", 0, total);
        cancel.check()?;
        self.validate(request)?;

        let plan = plan(request);
        log::debug!(
            "planned {} outputs under {} (base {:?})",
            plan.tracks.len() + 2,
            request.output_dir.display(),
            plan.base_name
        );

        observer.progress("Checking for conflicts...", 1, total);
        let conflicts = plan.conflicts();
        let mode = if !conflicts.is_empty() && request.overwrite_mode == OverwriteMode::Ask {
            log::info!("{} output file(s) already exist, asking", conflicts.len());
            negotiate(&conflicts, observer)?
        } else {
            request.overwrite_mode
        };

        let skip: HashSet<PathBuf> = if mode == OverwriteMode::Skip {
            conflicts.into_iter().map(|c| c.dest_path).collect()
        } else {
            HashSet::new()
        };
        let overwrite = mode == OverwriteMode::Overwrite;
        if overwrite {
            refuse_self_copies(request, &plan)?;
        }

        // Negotiation is over; nothing below waits on the caller.
        observer.progress("Creating output directory...", 2, total);
        cancel.check()?;
        fs::create_dir_all(&request.output_dir)
            .map_err(ApplyError::io("create output directory", &request.output_dir))?;

        let mut written = Vec::new();

        observer.progress("Copying ROM...", 3, total);
        cancel.check()?;
        let rom_written = !skip.contains(&plan.rom_dest);
        if rom_written {
            copy_file(&request.rom_source, &plan.rom_dest, overwrite)
                .map_err(ApplyError::io("copy ROM", &plan.rom_dest))?;
            written.push(plan.rom_dest.clone());
        } else {
            log::info!("skipping existing {}", plan.rom_dest.display());
        }

        let mut marker_step = 4;
        if let Some(sprite) = request.sprite_source.as_deref() {
            if rom_written {
                observer.progress("Applying sprite...", 4, total);
                cancel.check()?;
                // A failure here leaves the copied ROM in place.
                self.applier
                    .apply(sprite, &plan.rom_dest)
                    .map_err(ApplyError::SpriteInjection)?;
                marker_step = 5;
            }
        }

        observer.progress("Writing .msu marker...", marker_step, total);
        cancel.check()?;
        if skip.contains(&plan.marker_dest) {
            log::info!("skipping existing {}", plan.marker_dest.display());
        } else {
            fs::write(&plan.marker_dest, b"")
                .map_err(ApplyError::io("write marker", &plan.marker_dest))?;
            written.push(plan.marker_dest.clone());
        }

        for (i, track) in plan.tracks.iter().enumerate() {
            observer.progress(
                &format!("Copying track {}...", track.slot),
                marker_step + 1 + i,
                total,
            );
            cancel.check()?;

            if skip.contains(&track.dest) {
                log::info!("skipping existing {}", track.dest.display());
                continue;
            }
            copy_file(&track.source, &track.dest, overwrite)
                .map_err(ApplyError::io("copy track", &track.dest))?;
            written.push(track.dest.clone());
        }

        observer.progress("Done.", total, total);
        log::info!("wrote {} file(s)", written.len());
        Ok(ApplySuccess {
            files_written: written,
        })
    }

    /// Existence and sprite format checks; touches nothing on disk.
    fn validate(&self, request: &ApplyRequest) -> Result<(), ApplyError> {
        if !request.rom_source.is_file() {
            return Err(ApplyError::MissingRom(request.rom_source.clone()));
        }

        for (slot, path) in &request.tracks {
            if !path.is_file() {
                return Err(ApplyError::MissingTrack {
                    slot: slot.clone(),
                    path: path.clone(),
                });
            }
        }

        if let Some(sprite) = &request.sprite_source {
            if !sprite.is_file() {
                return Err(ApplyError::MissingSprite(sprite.clone()));
            }
            self.applier
                .validate(sprite)
                .map_err(ApplyError::InvalidSprite)?;
        }

        Ok(())
    }
}

fn negotiate<O: ApplyObserver>(
    conflicts: &[ApplyConflict],
    observer: &mut O,
) -> Result<OverwriteMode, ApplyError> {
    let (prompt, pending) = ConflictPrompt::new(conflicts.to_vec());
    observer.conflicts(prompt);

    let resolution = pending.wait();
    log::info!("conflict resolution: {resolution:?}");
    resolution.effective_mode().ok_or(ApplyError::Cancelled)
}

/// Overwriting a file with itself truncates it before it is read, so any
/// source that is also its own destination stops the run here.
fn refuse_self_copies(request: &ApplyRequest, plan: &OutputPlan) -> Result<(), ApplyError> {
    let pairs = std::iter::once((request.rom_source.as_path(), plan.rom_dest.as_path()))
        .chain(plan.tracks.iter().map(|t| (t.source.as_path(), t.dest.as_path())));

    for (src, dest) in pairs {
        if same_file(src, dest) {
            return Err(ApplyError::SourceIsDestination(dest.to_path_buf()));
        }
    }
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Copy `src` to `dest`. Without `overwrite` an existing `dest` is an
/// `AlreadyExists` error rather than being replaced.
fn copy_file(src: &Path, dest: &Path, overwrite: bool) -> io::Result<()> {
    if overwrite {
        fs::copy(src, dest)?;
        return Ok(());
    }

    let mut input = File::open(src)?;
    let mut output = OpenOptions::new().write(true).create_new(true).open(dest)?;
    io::copy(&mut input, &mut output)?;
    Ok(())
}

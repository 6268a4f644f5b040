use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::Parser;

use crate::apply::{ApplyEngine, ApplyJob, ApplyRequest};
use crate::config::{self, Settings};
use crate::library::{self, LibraryEntry, PcmCache};
use crate::sprite::{SpriteCatalog, ZsprApplier, status_line};

mod args;
mod logging;
mod prompt;
mod settings;

use args::{Args, UsageError};


pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let settings = settings::load_settings();
    logging::init_logging(&settings, args.verbose);
    if let Some(path) = config::resolve_config_path() {
        log::debug!("config path: {}", path.display());
    }

    if args.print_config {
        print!("{}", settings.to_toml()?);
        return Ok(());
    }

    let cache = PcmCache::new(settings.library.resolved_cache_dir());

    if let Some(dir) = &args.library {
        list_library(dir, &settings, &cache);
        return Ok(());
    }

    let mut catalog = SpriteCatalog::new(settings.sprites.resolved_cache_dir());

    if let Some(query) = &args.sprites {
        return list_sprites(&mut catalog, &settings, query);
    }

    let request = build_request(&args, &settings, &cache, &mut catalog)?;
    log::info!(
        "applying {} track(s) from {} into {}",
        request.tracks.len(),
        request.rom_source.display(),
        request.output_dir.display()
    );

    let job = ApplyJob::spawn(ApplyEngine::new(ZsprApplier), request);
    let token = job.cancel_token();
    ctrlc::set_handler(move || {
        log::info!("interrupted, stopping at the next step");
        token.cancel();
    })?;

    let mut observer = prompt::TerminalObserver::new(
        std::io::stdin().is_terminal(),
        settings.apply.non_interactive_resolution,
    );
    let success = job.wait(&mut observer)?;

    for path in &success.files_written {
        println!("{}", path.display());
    }
    Ok(())
}

/// Turn command line arguments into an engine request, resolving tracks
/// through the PCM cache and sprite names through the catalog.
fn build_request(
    args: &Args,
    settings: &Settings,
    cache: &PcmCache,
    catalog: &mut SpriteCatalog,
) -> Result<ApplyRequest, UsageError> {
    let rom = args.rom.clone().ok_or(UsageError::Required("--rom"))?;
    let out = args
        .out
        .clone()
        .or_else(|| settings.apply.output_dir.clone())
        .ok_or(UsageError::Required("--out"))?;

    let mut request = ApplyRequest::new(rom, out)
        .with_overwrite_mode(args.mode().unwrap_or(settings.apply.overwrite_mode));

    for (slot, path) in &args.tracks {
        if request.tracks.contains_key(slot) {
            return Err(UsageError::DuplicateSlot(slot.clone()));
        }
        // The engine reports missing sources by path.
        if !path.is_file() {
            request = request.with_track(slot.clone(), path.clone());
            continue;
        }

        let entry = LibraryEntry::from_path(path, cache);
        if entry.needs_conversion() {
            return Err(UsageError::NeedsConversion {
                slot: slot.clone(),
                path: path.clone(),
                format: entry.format_tag(),
            });
        }
        if entry.is_cached() {
            log::debug!(
                "slot {slot}: using cached {}",
                entry.assignable_path().display()
            );
        }
        request = request.with_track(slot.clone(), entry.assignable_path());
    }

    if let Some(name) = &args.name {
        request = request.with_base_name(name.clone());
    }

    if let Some(sprite) = &args.sprite {
        request = request.with_sprite(resolve_sprite(sprite, settings, catalog));
    }

    Ok(request)
}

/// A sprite argument is a file path, or the name of an already downloaded
/// catalog sprite. Anything else is passed through for the engine to reject.
fn resolve_sprite(sprite: &str, settings: &Settings, catalog: &mut SpriteCatalog) -> PathBuf {
    let as_path = PathBuf::from(sprite);
    if as_path.is_file() {
        return as_path;
    }

    let Some(listing) = settings.sprites.catalog_file.as_deref() else {
        return as_path;
    };
    if let Err(e) = catalog.load_or_cached(listing) {
        log::warn!("{e}");
        return as_path;
    }

    match catalog.find_by_name(sprite) {
        Some(entry) => catalog.cached_file(entry).unwrap_or_else(|| {
            log::warn!("sprite {:?} is in the catalog but not downloaded", entry.name);
            as_path
        }),
        None => as_path,
    }
}

fn list_library(dir: &Path, settings: &Settings, cache: &PcmCache) {
    for entry in library::scan(dir, &settings.library, cache) {
        let status = if entry.is_pcm() {
            "ready"
        } else if entry.is_cached() {
            "cached"
        } else {
            "convert"
        };
        print!(
            "{:<5} {:<7} {}  {}",
            entry.format_tag(),
            status,
            entry.name,
            entry.source_path().display()
        );
        match entry.cached_pcm_path() {
            Some(pcm) => println!(" -> {}", pcm.display()),
            None => println!(),
        }
    }
}

fn list_sprites(
    catalog: &mut SpriteCatalog,
    settings: &Settings,
    query: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let listing = settings
        .sprites
        .catalog_file
        .as_deref()
        .ok_or("sprites.catalog_file is not configured")?;
    let total = catalog.load_or_cached(listing)?.len();

    let shown = catalog.filter(query);
    for entry in &shown {
        let marker = if catalog.cached_file(entry).is_some() {
            "*"
        } else {
            " "
        };
        if entry.author.is_empty() {
            println!("{marker} {}", entry.name);
        } else {
            println!("{marker} {} (by {})", entry.name, entry.author);
        }
    }
    println!("{}", status_line(shown.len(), total));
    Ok(())
}

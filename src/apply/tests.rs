use super::cancel::CancelToken;
use super::job::ApplyEvent;
use super::negotiate::Resolution;
use super::plan::plan;
use super::*;
use crate::sprite::{SpriteApplier, SpriteError, ZsprApplier};
use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn slot(s: &str) -> SlotId {
    s.parse().unwrap()
}

#[derive(Default)]
struct FakeApplier {
    reject: bool,
    fail_apply: bool,
    applied: RefCell<Vec<(PathBuf, PathBuf)>>,
}

impl SpriteApplier for FakeApplier {
    fn validate(&self, _patch: &Path) -> Result<(), SpriteError> {
        if self.reject {
            return Err(SpriteError::UnknownFormat(3));
        }
        Ok(())
    }

    fn apply(&self, patch: &Path, rom: &Path) -> Result<(), SpriteError> {
        if self.fail_apply {
            return Err(SpriteError::Io(io::Error::other("rom locked")));
        }
        self.applied
            .borrow_mut()
            .push((patch.to_path_buf(), rom.to_path_buf()));
        Ok(())
    }
}

#[derive(Default)]
struct Recorder {
    steps: Vec<(String, usize, usize)>,
    prompts: Vec<Vec<ApplyConflict>>,
    /// `None` drops the prompt unanswered.
    answer: Option<Resolution>,
    cancel_at: Option<(&'static str, CancelToken)>,
}

impl ApplyObserver for Recorder {
    fn progress(&mut self, step: &str, current: usize, total: usize) {
        self.steps.push((step.to_string(), current, total));
        if let Some((prefix, token)) = &self.cancel_at {
            if step.starts_with(prefix) {
                token.cancel();
            }
        }
    }

    fn conflicts(&mut self, prompt: ConflictPrompt) {
        self.prompts.push(prompt.conflicts().to_vec());
        if let Some(answer) = self.answer {
            prompt.respond(answer);
        }
    }
}

impl Recorder {
    fn answering(answer: Resolution) -> Self {
        Self {
            answer: Some(answer),
            ..Self::default()
        }
    }

    fn assert_progress_well_formed(&self) {
        let (_, last, total) = self.steps.last().cloned().unwrap();
        assert_eq!(last, total);
        assert!(self.steps.windows(2).all(|w| w[0].1 <= w[1].1));
        assert!(self.steps.iter().all(|(_, _, t)| *t == total));
    }

    fn step_index(&self, prefix: &str) -> Option<usize> {
        self.steps
            .iter()
            .find(|(s, _, _)| s.starts_with(prefix))
            .map(|(_, i, _)| *i)
    }
}

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/game.sfc"), b"rom image").unwrap();
        fs::write(dir.path().join("src/a.pcm"), b"track a").unwrap();
        fs::write(dir.path().join("src/b.pcm"), b"track b").unwrap();
        fs::write(dir.path().join("src/link.zspr"), b"sprite").unwrap();
        Self { dir }
    }

    fn src_dir(&self) -> PathBuf {
        self.dir.path().join("src")
    }

    fn src(&self, name: &str) -> PathBuf {
        self.src_dir().join(name)
    }

    fn out(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    fn out_file(&self, name: &str) -> PathBuf {
        self.out().join(name)
    }

    fn request(&self, mode: OverwriteMode) -> ApplyRequest {
        ApplyRequest::new(self.src("game.sfc"), self.out())
            .with_track(slot("1"), self.src("a.pcm"))
            .with_track(slot("2"), self.src("b.pcm"))
            .with_overwrite_mode(mode)
    }

    fn preexisting(&self, name: &str) {
        fs::create_dir_all(self.out()).unwrap();
        fs::write(self.out_file(name), b"old").unwrap();
    }
}

fn run(request: &ApplyRequest, observer: &mut Recorder) -> Result<ApplySuccess, ApplyError> {
    ApplyEngine::new(ZsprApplier).run(request, observer, &CancelToken::new())
}

#[test]
fn empty_destination_writes_rom_marker_and_tracks_in_order() {
    let fx = Fixture::new();
    let mut rec = Recorder::default();

    let result = run(&fx.request(OverwriteMode::Overwrite), &mut rec).unwrap();

    assert_eq!(
        result.files_written,
        vec![
            fx.out_file("game.sfc"),
            fx.out_file("game.msu"),
            fx.out_file("game-1.pcm"),
            fx.out_file("game-2.pcm"),
        ]
    );
    assert_eq!(fs::read(fx.out_file("game.sfc")).unwrap(), b"rom image");
    assert_eq!(fs::metadata(fx.out_file("game.msu")).unwrap().len(), 0);
    assert_eq!(fs::read(fx.out_file("game-2.pcm")).unwrap(), b"track b");
    assert!(rec.prompts.is_empty());
    assert_eq!(rec.steps.len(), 8);
    rec.assert_progress_well_formed();
}

#[test]
fn tracks_are_numbered_by_numeric_slot_order() {
    let fx = Fixture::new();
    fs::write(fx.src("c.pcm"), b"track c").unwrap();
    let request = ApplyRequest::new(fx.src("game.sfc"), fx.out())
        .with_track(slot("2"), fx.src("a.pcm"))
        .with_track(slot("10"), fx.src("b.pcm"))
        .with_track(slot("1"), fx.src("c.pcm"))
        .with_overwrite_mode(OverwriteMode::Overwrite);

    let result = run(&request, &mut Recorder::default()).unwrap();

    let names: Vec<String> = result.files_written[2..]
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["game-1.pcm", "game-2.pcm", "game-10.pcm"]);
    assert_eq!(fs::read(fx.out_file("game-10.pcm")).unwrap(), b"track b");
}

#[test]
fn slot_ids_must_be_non_negative_integers() {
    assert!("a".parse::<SlotId>().is_err());
    assert!("-1".parse::<SlotId>().is_err());
    assert!("".parse::<SlotId>().is_err());
    assert!("1.5".parse::<SlotId>().is_err());

    let padded = slot(" 07 ");
    assert_eq!(padded.number(), 7);
    assert_eq!(padded.as_str(), "07");
    assert!(slot("9") < slot("10"));
}

#[test]
fn slot_text_is_kept_in_file_names() {
    let fx = Fixture::new();
    let request =
        ApplyRequest::new(fx.src("game.sfc"), fx.out()).with_track(slot("007"), fx.src("a.pcm"));

    let plan = plan(&request);
    assert_eq!(plan.tracks[0].dest, fx.out_file("game-007.pcm"));
}

#[test]
fn skip_mode_leaves_conflicts_alone() {
    let fx = Fixture::new();
    fx.preexisting("game.msu");
    fx.preexisting("game-2.pcm");
    let mut rec = Recorder::default();

    let result = run(&fx.request(OverwriteMode::Skip), &mut rec).unwrap();

    assert_eq!(
        result.files_written,
        vec![fx.out_file("game.sfc"), fx.out_file("game-1.pcm")]
    );
    assert_eq!(fs::read(fx.out_file("game.msu")).unwrap(), b"old");
    assert_eq!(fs::read(fx.out_file("game-2.pcm")).unwrap(), b"old");
    assert!(rec.prompts.is_empty());
    rec.assert_progress_well_formed();
}

#[test]
fn overwrite_mode_replaces_existing_content() {
    let fx = Fixture::new();
    fx.preexisting("game.sfc");
    fx.preexisting("game.msu");
    fx.preexisting("game-1.pcm");

    let result = run(&fx.request(OverwriteMode::Overwrite), &mut Recorder::default()).unwrap();

    assert_eq!(result.files_written.len(), 4);
    assert_eq!(fs::read(fx.out_file("game.sfc")).unwrap(), b"rom image");
    assert_eq!(fs::metadata(fx.out_file("game.msu")).unwrap().len(), 0);
    assert_eq!(fs::read(fx.out_file("game-1.pcm")).unwrap(), b"track a");
}

#[test]
fn ask_without_conflicts_never_prompts() {
    let fx = Fixture::new();
    let mut rec = Recorder::default();

    let result = run(&fx.request(OverwriteMode::Ask), &mut rec).unwrap();

    assert_eq!(result.files_written.len(), 4);
    assert!(rec.prompts.is_empty());
}

#[test]
fn ask_prompts_once_with_conflicts_in_plan_order() {
    let fx = Fixture::new();
    fx.preexisting("game-2.pcm");
    fx.preexisting("game.sfc");
    let mut rec = Recorder::answering(Resolution::Skip);

    let result = run(&fx.request(OverwriteMode::Ask), &mut rec).unwrap();

    assert_eq!(rec.prompts.len(), 1);
    assert_eq!(
        rec.prompts[0],
        vec![
            ApplyConflict {
                file_name: "game.sfc".into(),
                dest_path: fx.out_file("game.sfc"),
            },
            ApplyConflict {
                file_name: "game-2.pcm".into(),
                dest_path: fx.out_file("game-2.pcm"),
            },
        ]
    );
    assert_eq!(
        result.files_written,
        vec![fx.out_file("game.msu"), fx.out_file("game-1.pcm")]
    );
    assert_eq!(fs::read(fx.out_file("game.sfc")).unwrap(), b"old");
}

#[test]
fn ask_resolved_with_overwrite_writes_everything() {
    let fx = Fixture::new();
    fx.preexisting("game-1.pcm");
    let mut rec = Recorder::answering(Resolution::Overwrite);

    let result = run(&fx.request(OverwriteMode::Ask), &mut rec).unwrap();

    assert_eq!(result.files_written.len(), 4);
    assert_eq!(fs::read(fx.out_file("game-1.pcm")).unwrap(), b"track a");
}

#[test]
fn overwriting_into_the_rom_directory_keeps_the_source_rom() {
    let fx = Fixture::new();
    let request = ApplyRequest::new(fx.src("game.sfc"), fx.src_dir())
        .with_track(slot("1"), fx.src("a.pcm"))
        .with_overwrite_mode(OverwriteMode::Ask);
    let mut rec = Recorder::answering(Resolution::Overwrite);

    let err = run(&request, &mut rec).unwrap_err();

    assert_eq!(rec.prompts.len(), 1);
    assert!(matches!(err, ApplyError::SourceIsDestination(ref p) if *p == fx.src("game.sfc")));
    assert_eq!(fs::read(fx.src("game.sfc")).unwrap(), b"rom image");
    assert!(!fx.src("game.msu").exists());
    assert!(!fx.src("game-1.pcm").exists());
}

#[test]
fn track_already_at_its_destination_is_not_truncated() {
    let fx = Fixture::new();
    fx.preexisting("game-1.pcm");
    let request = ApplyRequest::new(fx.src("game.sfc"), fx.out())
        .with_track(slot("1"), fx.out_file("game-1.pcm"))
        .with_overwrite_mode(OverwriteMode::Overwrite);

    let err = run(&request, &mut Recorder::default()).unwrap_err();

    assert!(matches!(
        err,
        ApplyError::SourceIsDestination(ref p) if *p == fx.out_file("game-1.pcm")
    ));
    assert_eq!(fs::read(fx.out_file("game-1.pcm")).unwrap(), b"old");
    assert!(!fx.out_file("game.sfc").exists());
}

#[test]
fn skipping_into_the_rom_directory_adds_only_new_files() {
    let fx = Fixture::new();
    let request = ApplyRequest::new(fx.src("game.sfc"), fx.src_dir())
        .with_track(slot("1"), fx.src("a.pcm"))
        .with_overwrite_mode(OverwriteMode::Skip);

    let result = run(&request, &mut Recorder::default()).unwrap();

    assert_eq!(
        result.files_written,
        vec![fx.src("game.msu"), fx.src("game-1.pcm")]
    );
    assert_eq!(fs::read(fx.src("game.sfc")).unwrap(), b"rom image");
}

#[test]
fn unanswered_prompt_cancels_before_writing() {
    let fx = Fixture::new();
    fx.preexisting("game.msu");
    let mut rec = Recorder::default();

    let err = run(&fx.request(OverwriteMode::Ask), &mut rec).unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(rec.prompts.len(), 1);
    assert!(!fx.out_file("game.sfc").exists());
    assert!(!fx.out_file("game-1.pcm").exists());
}

#[test]
fn answering_ask_means_cancelled() {
    let fx = Fixture::new();
    fx.preexisting("game.sfc");
    let mut rec = Recorder::answering(Resolution::from(OverwriteMode::Ask));

    let err = run(&fx.request(OverwriteMode::Ask), &mut rec).unwrap_err();

    assert!(matches!(err, ApplyError::Cancelled));
    assert_eq!(fs::read(fx.out_file("game.sfc")).unwrap(), b"old");
}

#[test]
fn cancel_before_start_writes_nothing() {
    let fx = Fixture::new();
    let token = CancelToken::new();
    token.cancel();

    let err = ApplyEngine::new(ZsprApplier)
        .run(
            &fx.request(OverwriteMode::Overwrite),
            &mut Recorder::default(),
            &token,
        )
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(!fx.out().exists());
}

#[test]
fn cancel_after_rom_copy_keeps_only_rom() {
    let fx = Fixture::new();
    let token = CancelToken::new();
    let mut rec = Recorder {
        cancel_at: Some(("Writing .msu", token.clone())),
        ..Recorder::default()
    };

    let err = ApplyEngine::new(ZsprApplier)
        .run(&fx.request(OverwriteMode::Overwrite), &mut rec, &token)
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(fx.out_file("game.sfc").exists());
    assert!(!fx.out_file("game.msu").exists());
    assert!(!fx.out_file("game-1.pcm").exists());
}

#[test]
fn cancel_between_tracks_stops_further_copies() {
    let fx = Fixture::new();
    let token = CancelToken::new();
    let mut rec = Recorder {
        cancel_at: Some(("Copying track 2", token.clone())),
        ..Recorder::default()
    };

    let err = ApplyEngine::new(ZsprApplier)
        .run(&fx.request(OverwriteMode::Overwrite), &mut rec, &token)
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(fx.out_file("game-1.pcm").exists());
    assert!(!fx.out_file("game-2.pcm").exists());
}

#[test]
fn missing_inputs_fail_before_any_side_effect() {
    let fx = Fixture::new();

    let no_rom = ApplyRequest::new(fx.src("nope.sfc"), fx.out());
    let err = run(&no_rom, &mut Recorder::default()).unwrap_err();
    assert!(matches!(err, ApplyError::MissingRom(ref p) if p == &fx.src("nope.sfc")));

    let no_track = fx.request(OverwriteMode::Overwrite).with_track(slot("3"), fx.src("gone.pcm"));
    let err = run(&no_track, &mut Recorder::default()).unwrap_err();
    assert!(matches!(err, ApplyError::MissingTrack { ref slot, .. } if slot.as_str() == "3"));
    assert!(err.to_string().contains("gone.pcm"));

    let no_sprite = fx.request(OverwriteMode::Overwrite).with_sprite(fx.src("gone.zspr"));
    let err = run(&no_sprite, &mut Recorder::default()).unwrap_err();
    assert!(matches!(err, ApplyError::MissingSprite(_)));

    assert!(!fx.out().exists());
}

#[test]
fn invalid_sprite_fails_before_any_side_effect() {
    let fx = Fixture::new();
    let applier = FakeApplier {
        reject: true,
        ..FakeApplier::default()
    };
    let request = fx.request(OverwriteMode::Overwrite).with_sprite(fx.src("link.zspr"));

    let err = ApplyEngine::new(&applier)
        .run(&request, &mut Recorder::default(), &CancelToken::new())
        .unwrap_err();

    assert!(matches!(err, ApplyError::InvalidSprite(_)));
    assert!(!fx.out().exists());
    assert!(applier.applied.borrow().is_empty());
}

#[test]
fn sprite_is_applied_to_copied_rom() {
    let fx = Fixture::new();
    let applier = FakeApplier::default();
    let request = fx.request(OverwriteMode::Overwrite).with_sprite(fx.src("link.zspr"));
    let mut rec = Recorder::default();

    let result = ApplyEngine::new(&applier)
        .run(&request, &mut rec, &CancelToken::new())
        .unwrap();

    assert_eq!(result.files_written.len(), 4);
    assert_eq!(
        *applier.applied.borrow(),
        vec![(fx.src("link.zspr"), fx.out_file("game.sfc"))]
    );
    assert_eq!(rec.step_index("Applying sprite"), Some(4));
    assert_eq!(rec.step_index("Writing .msu"), Some(5));
    assert_eq!(rec.steps.last().unwrap().2, 7);
    rec.assert_progress_well_formed();
}

#[test]
fn sprite_failure_keeps_copied_rom() {
    let fx = Fixture::new();
    let applier = FakeApplier {
        fail_apply: true,
        ..FakeApplier::default()
    };
    let request = fx.request(OverwriteMode::Overwrite).with_sprite(fx.src("link.zspr"));

    let err = ApplyEngine::new(&applier)
        .run(&request, &mut Recorder::default(), &CancelToken::new())
        .unwrap_err();

    assert!(matches!(err, ApplyError::SpriteInjection(_)));
    assert!(err.to_string().starts_with("Sprite injection failed"));
    assert!(fx.out_file("game.sfc").exists());
    assert!(!fx.out_file("game.msu").exists());
}

#[test]
fn skipped_rom_is_not_patched() {
    let fx = Fixture::new();
    fx.preexisting("game.sfc");
    let applier = FakeApplier::default();
    let request = fx.request(OverwriteMode::Skip).with_sprite(fx.src("link.zspr"));
    let mut rec = Recorder::default();

    let result = ApplyEngine::new(&applier)
        .run(&request, &mut rec, &CancelToken::new())
        .unwrap();

    assert!(applier.applied.borrow().is_empty());
    assert_eq!(rec.step_index("Applying sprite"), None);
    assert_eq!(rec.step_index("Writing .msu"), Some(4));
    assert_eq!(result.files_written.len(), 3);
    rec.assert_progress_well_formed();
}

#[test]
fn base_name_override_is_trimmed_and_blank_falls_back() {
    let fx = Fixture::new();

    let named = fx.request(OverwriteMode::Overwrite).with_base_name("  My Pack ");
    let plan_named = plan(&named);
    assert_eq!(plan_named.rom_dest, fx.out_file("My Pack.sfc"));
    assert_eq!(plan_named.marker_dest, fx.out_file("My Pack.msu"));
    assert_eq!(plan_named.tracks[1].dest, fx.out_file("My Pack-2.pcm"));

    let blank = fx.request(OverwriteMode::Overwrite).with_base_name("   ");
    assert_eq!(plan(&blank).rom_dest, fx.out_file("game.sfc"));
}

#[test]
fn rom_extension_is_copied_verbatim() {
    let request = ApplyRequest::new("/roms/Zelda.SFC", "/out");
    assert_eq!(plan(&request).rom_dest, PathBuf::from("/out/Zelda.SFC"));

    let bare = ApplyRequest::new("/roms/zelda", "/out");
    let plan = plan(&bare);
    assert_eq!(plan.rom_dest, PathBuf::from("/out/zelda"));
    assert_eq!(plan.marker_dest, PathBuf::from("/out/zelda.msu"));
}

#[test]
fn io_errors_name_the_step_and_path() {
    let fx = Fixture::new();
    // A regular file where the output directory should be.
    fs::write(fx.out(), b"in the way").unwrap();

    let err = run(&fx.request(OverwriteMode::Overwrite), &mut Recorder::default()).unwrap_err();

    assert!(matches!(err, ApplyError::Io { step: "create output directory", .. }));
    assert!(!err.is_cancelled());
}

#[test]
fn job_relays_prompt_to_calling_thread() {
    let fx = Fixture::new();
    fx.preexisting("game.sfc");

    let job = ApplyJob::spawn(ApplyEngine::new(ZsprApplier), fx.request(OverwriteMode::Ask));
    let mut rec = Recorder::answering(Resolution::Overwrite);
    let result = job.wait(&mut rec).unwrap();

    assert_eq!(rec.prompts.len(), 1);
    assert_eq!(result.files_written.len(), 4);
    assert_eq!(fs::read(fx.out_file("game.sfc")).unwrap(), b"rom image");
    rec.assert_progress_well_formed();
}

#[test]
fn job_with_dropped_prompt_reports_cancellation() {
    let fx = Fixture::new();
    fx.preexisting("game.msu");

    let job = ApplyJob::spawn(ApplyEngine::new(ZsprApplier), fx.request(OverwriteMode::Ask));
    let err = job.wait(&mut Recorder::default()).unwrap_err();

    assert!(err.is_cancelled());
    assert!(!fx.out_file("game-1.pcm").exists());
}

#[test]
fn job_events_can_be_consumed_directly() {
    let fx = Fixture::new();
    let job = ApplyJob::spawn(
        ApplyEngine::new(ZsprApplier),
        fx.request(OverwriteMode::Overwrite),
    );

    let mut progress = 0;
    let outcome = loop {
        match job.events().recv().unwrap() {
            ApplyEvent::Progress { .. } => progress += 1,
            ApplyEvent::Conflicts(prompt) => prompt.cancel(),
            ApplyEvent::Finished(result) => break result,
        }
    };

    assert_eq!(progress, 8);
    assert_eq!(outcome.unwrap().files_written.len(), 4);
}

#[test]
fn job_cancelled_while_prompt_is_open_stops_before_writing() {
    let fx = Fixture::new();
    fx.preexisting("game.sfc");
    let job = ApplyJob::spawn(ApplyEngine::new(ZsprApplier), fx.request(OverwriteMode::Ask));

    let outcome = loop {
        match job.events().recv().unwrap() {
            ApplyEvent::Progress { .. } => {}
            ApplyEvent::Conflicts(prompt) => {
                job.cancel_token().cancel();
                prompt.resolve(OverwriteMode::Overwrite);
            }
            ApplyEvent::Finished(result) => break result,
        }
    };

    assert!(outcome.unwrap_err().is_cancelled());
    assert_eq!(fs::read(fx.out_file("game.sfc")).unwrap(), b"old");
    assert!(!fx.out_file("game.msu").exists());
}

use std::path::{Path, PathBuf};

/// Extension (without dot, lowercase) of the format the MSU-1 player consumes.
pub const TARGET_FORMAT: &str = "pcm";

/// A source path together with the lowercase extension derived from it.
///
/// Both halves are always replaced together so the derived format flags can
/// never disagree with the path they came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFile {
    path: PathBuf,
    ext: String,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        Self { path, ext }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ext(&self) -> &str {
        &self.ext
    }
}

/// One audio source candidate for a playback slot and its cache state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryEntry {
    /// Display name, usually the file stem or the tagged title.
    pub name: String,
    source: SourceFile,
    /// `None` when not converted yet, or when the source is newer than the cache.
    cached_pcm: Option<PathBuf>,
}

impl LibraryEntry {
    pub fn new(name: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source: SourceFile::new(source),
            cached_pcm: None,
        }
    }

    pub fn with_cached_pcm(mut self, cached: Option<PathBuf>) -> Self {
        self.cached_pcm = cached;
        self
    }

    pub fn source_path(&self) -> &Path {
        self.source.path()
    }

    /// Replace the source path; the extension is re-derived in the same assignment.
    pub fn set_source_path(&mut self, path: impl Into<PathBuf>) {
        self.source = SourceFile::new(path);
    }

    pub fn cached_pcm_path(&self) -> Option<&Path> {
        self.cached_pcm.as_deref()
    }

    pub fn set_cached_pcm_path(&mut self, path: Option<PathBuf>) {
        self.cached_pcm = path;
    }

    /// Uppercase extension without the dot, e.g. `WAV`.
    pub fn format_tag(&self) -> String {
        self.source.ext().to_uppercase()
    }

    pub fn is_pcm(&self) -> bool {
        self.source.ext() == TARGET_FORMAT
    }

    pub fn is_cached(&self) -> bool {
        self.cached_pcm.is_some()
    }

    pub fn needs_conversion(&self) -> bool {
        !self.is_pcm() && !self.is_cached()
    }

    /// The path a slot should point at: the cached conversion if any, else the source.
    pub fn assignable_path(&self) -> &Path {
        self.cached_pcm.as_deref().unwrap_or(self.source.path())
    }
}

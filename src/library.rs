//! Audio sources that can be assigned to MSU-1 playback slots.
//!
//! A `LibraryEntry` pairs a source file with an optional cached PCM
//! conversion; `scan` builds entries from a directory tree.

mod cache;
mod model;
mod scan;

pub use cache::PcmCache;
pub use model::LibraryEntry;
pub use scan::scan;

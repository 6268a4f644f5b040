//! Link sprite patches: validation, ROM injection and the sprite catalog.

mod applier;
mod catalog;
mod zspr;

pub use applier::{SpriteApplier, SpriteError};
pub use catalog::{SpriteCatalog, status_line};
pub use zspr::ZsprApplier;

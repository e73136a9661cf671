//! Data models for Diary

mod identity;
mod note;
mod profile;

pub use identity::{Identity, Role};
pub use note::{NewNote, NoteColor, NoteId, NoteRecord, ADMIN_FALLBACK_COLOR, DEFAULT_NOTE_COLOR};
pub use profile::Profile;

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] diary_core::Error),
    #[error(transparent)]
    Auth(#[from] diary_core::backend::AuthError),
    #[error(transparent)]
    Store(#[from] diary_core::backend::StoreError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No note content provided")]
    EmptyContent,
    #[error("Note ID cannot be empty")]
    EmptyNoteId,
    #[error("Note not found for id/prefix: {0}")]
    NoteNotFound(String),
    #[error("{0}")]
    AmbiguousNoteId(String),
    #[error("Editor command failed: {0}")]
    EditorFailed(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Not signed in. Run `diary login` or `diary signup` first.")]
    NotSignedIn,
    #[error("This command is only available to the administrator.")]
    AdminOnly,
    /// Already shown to the user by the surface.
    #[error("action failed")]
    Reported,
    #[error(
        "Backend is not configured. Run `diary config init` or set DIARY_SUPABASE_URL and DIARY_SUPABASE_ANON_KEY."
    )]
    BackendNotConfigured,
}

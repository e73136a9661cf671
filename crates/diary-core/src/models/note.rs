//! Note model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};
use crate::lock::Lock;

/// Background tag used when the author picks no color.
pub const DEFAULT_NOTE_COLOR: &str = "#ffe4ec";

/// Background used in the administrator panel for notes without a color.
pub const ADMIN_FALLBACK_COLOR: &str = "#fff0f5";

/// Store-assigned note identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NoteId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Display color tag, kept as the raw CSS-style value the author chose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteColor(String);

impl NoteColor {
    /// Build a color, falling back to the default tag for blank input.
    pub fn new(value: impl AsRef<str>) -> Self {
        let value = value.as_ref().trim();
        if value.is_empty() {
            Self::default()
        } else {
            Self(value.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NoteColor {
    fn default() -> Self {
        Self(DEFAULT_NOTE_COLOR.to_string())
    }
}

impl fmt::Display for NoteColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored diary note.
///
/// `owner_id` is fixed at creation and always equals the creating identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub id: NoteId,
    pub owner_id: String,
    pub owner_email: String,
    pub text: String,
    pub color: Option<NoteColor>,
    pub lock: Option<Lock>,
    /// `None` while the server timestamp is still pending
    pub created_at: Option<DateTime<Utc>>,
}

impl NoteRecord {
    pub const fn is_locked(&self) -> bool {
        self.lock.is_some()
    }

    /// Creation time, treating a pending server timestamp as `now`.
    pub fn created_or(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.created_at.unwrap_or(now)
    }
}

/// A validated note draft, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote {
    pub text: String,
    pub color: NoteColor,
    pub lock: Option<Lock>,
}

impl NewNote {
    /// Validate user input.
    ///
    /// Text must be non-empty after trimming. A blank passphrase means no
    /// lock; a non-blank one is trimmed and encoded.
    pub fn new(text: &str, color: &str, passphrase: Option<&str>) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Validation("Please write something!".to_string()));
        }

        let lock = passphrase
            .map(str::trim)
            .filter(|passphrase| !passphrase.is_empty())
            .map(Lock::from_passphrase);

        Ok(Self {
            text: text.to_string(),
            color: NoteColor::new(color),
            lock,
        })
    }
}

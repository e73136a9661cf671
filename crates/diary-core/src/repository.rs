//! Note repository: turns note operations into document-store calls.
//!
//! Owns no data. Ordering is always newest first; text and date filters are
//! applied after the fetch.

use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::backend::{Document, DocumentStore, DocumentWrite, Fields, Query};
use crate::error::{Error, Result};
use crate::lock::Lock;
use crate::models::{NewNote, NoteColor, NoteId, NoteRecord};
use crate::util::contains_ignore_case;

pub const NOTES_COLLECTION: &str = "notes";

const OWNER_ID: &str = "owner_id";
const OWNER_EMAIL: &str = "owner_email";
const TEXT: &str = "text";
const COLOR: &str = "color";
const LOCK: &str = "lock";
const CREATED_AT: &str = "created_at";

/// Client-side filters for an owner's notes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteFilter {
    /// Case-insensitive substring of the note text
    pub text: Option<String>,
    /// Exact local calendar date of creation
    pub date: Option<NaiveDate>,
}

impl NoteFilter {
    pub fn text(mut self, needle: impl Into<String>) -> Self {
        self.text = Some(needle.into());
        self
    }

    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn matches(&self, record: &NoteRecord, now: DateTime<Utc>) -> bool {
        if let Some(date) = self.date {
            if local_date(record.created_or(now)) != date {
                return false;
            }
        }
        match self.text.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => contains_ignore_case(&record.text, needle),
            _ => true,
        }
    }
}

/// Calendar date of `instant` in the local time zone.
pub fn local_date(instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&Local).date_naive()
}

#[derive(Debug, Deserialize)]
struct NoteFields {
    owner_id: String,
    #[serde(default)]
    owner_email: Option<String>,
    #[serde(default)]
    text: String,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    lock: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

pub struct NoteRepository<S> {
    store: Arc<S>,
}

impl<S> Clone for NoteRepository<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: DocumentStore> NoteRepository<S> {
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Store a new note owned by `owner_id`.
    pub async fn create(&self, owner_id: &str, owner_email: &str, note: &NewNote) -> Result<NoteId> {
        if note.text.trim().is_empty() {
            return Err(Error::Validation("Please write something!".to_string()));
        }

        let lock = note
            .lock
            .as_ref()
            .map_or(Value::Null, |lock| Value::String(lock.encoded().to_string()));
        let write = DocumentWrite::new()
            .field(OWNER_ID, owner_id)
            .field(OWNER_EMAIL, owner_email)
            .field(TEXT, note.text.trim())
            .field(COLOR, note.color.as_str())
            .field(LOCK, lock)
            .server_timestamp(CREATED_AT);

        let id = self.store.create(NOTES_COLLECTION, write).await?;
        tracing::debug!("Created note {} for {}", id, owner_id);
        Ok(NoteId::new(id))
    }

    pub async fn get(&self, id: &NoteId) -> Result<Option<NoteRecord>> {
        self.store
            .get(NOTES_COLLECTION, id.as_str())
            .await?
            .map(parse_note)
            .transpose()
    }

    /// Notes owned by `owner_id`, newest first, narrowed by `filter`.
    pub async fn list_owned(&self, owner_id: &str, filter: &NoteFilter) -> Result<Vec<NoteRecord>> {
        let query = Query::new()
            .where_eq(OWNER_ID, owner_id)
            .order_by_desc(CREATED_AT);
        let now = Utc::now();
        let notes = self
            .fetch(query)
            .await?
            .into_iter()
            .filter(|note| filter.matches(note, now))
            .collect();
        Ok(notes)
    }

    /// Every note from every owner, newest first.
    ///
    /// Meant for the administrator panel. Nothing here checks the caller:
    /// real isolation has to come from the store's own access rules.
    pub async fn list_all(&self, email_filter: Option<&str>) -> Result<Vec<NoteRecord>> {
        let query = Query::new().order_by_desc(CREATED_AT);
        let needle = email_filter.map(str::trim).filter(|needle| !needle.is_empty());
        let notes = self
            .fetch(query)
            .await?
            .into_iter()
            .filter(|note| needle.map_or(true, |needle| contains_ignore_case(&note.owner_email, needle)))
            .collect();
        Ok(notes)
    }

    /// Overwrite the text of a note. A note that vanished in the meantime is
    /// not reported.
    pub async fn update_text(&self, id: &NoteId, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Validation("Note text cannot be empty".to_string()));
        }

        let mut fields = Fields::new();
        fields.insert(TEXT.to_string(), Value::String(text.to_string()));
        self.store.update(NOTES_COLLECTION, id.as_str(), fields).await?;
        Ok(())
    }

    /// Remove a note. Deleting an unknown id succeeds.
    pub async fn delete(&self, id: &NoteId) -> Result<()> {
        self.store.delete(NOTES_COLLECTION, id.as_str()).await?;
        Ok(())
    }

    async fn fetch(&self, query: Query) -> Result<Vec<NoteRecord>> {
        self.store
            .query(NOTES_COLLECTION, query)
            .await?
            .into_iter()
            .map(parse_note)
            .collect()
    }
}

fn parse_note(document: Document) -> Result<NoteRecord> {
    let fields: NoteFields = serde_json::from_value(document.fields.into())
        .map_err(|error| Error::Malformed(format!("note {}: {error}", document.id)))?;
    Ok(NoteRecord {
        id: NoteId::new(document.id),
        owner_id: fields.owner_id,
        owner_email: fields.owner_email.unwrap_or_default(),
        text: fields.text,
        color: fields.color.filter(|color| !color.trim().is_empty()).map(NoteColor::new),
        lock: fields.lock.filter(|lock| !lock.is_empty()).map(Lock::from_encoded),
        created_at: fields.created_at,
    })
}

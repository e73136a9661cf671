//! Note renderer: turns note records into interactive rows.
//!
//! [`RenderedList`] is the only holder of what is currently on screen, so
//! export and share read from it rather than fetching again.

use chrono::{DateTime, Local, Utc};

use crate::error::{Error, Result};
use crate::lock::Lock;
use crate::models::{NoteId, NoteRecord, ADMIN_FALLBACK_COLOR, DEFAULT_NOTE_COLOR};

pub const LOCKED_PLACEHOLDER: &str = "🔒 Locked Note";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Who is looking at the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Viewer {
    Owner,
    Administrator,
}

/// Controls offered on a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Affordance {
    Edit,
    Save,
    ExportPdf,
    Print,
    Share,
    Delete,
    Unlock,
}

impl Affordance {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Edit => "Edit",
            Self::Save => "Save",
            Self::ExportPdf => "PDF",
            Self::Print => "Print",
            Self::Share => "Share",
            Self::Delete => "Delete",
            Self::Unlock => "Unlock",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowBody {
    Text(String),
    Locked,
}

impl RowBody {
    pub fn display_text(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Locked => LOCKED_PLACEHOLDER,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowMode {
    ReadOnly,
    Editing,
}

/// One visible note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRow {
    pub id: NoteId,
    pub color: String,
    pub timestamp_label: String,
    /// Author shown in the administrator panel
    pub owner_label: Option<String>,
    pub body: RowBody,
    pub mode: RowMode,
    viewer: Viewer,
    lock: Option<Lock>,
}

impl NoteRow {
    fn from_record(record: &NoteRecord, viewer: Viewer, now: DateTime<Utc>) -> Self {
        let locked = viewer == Viewer::Owner && record.is_locked();
        let body = if locked {
            RowBody::Locked
        } else {
            RowBody::Text(record.text.clone())
        };

        let (color, timestamp_label, owner_label) = match viewer {
            Viewer::Owner => (
                record
                    .color
                    .as_ref()
                    .map_or(DEFAULT_NOTE_COLOR, |color| color.as_str())
                    .to_string(),
                format_timestamp(record.created_or(now)),
                None,
            ),
            Viewer::Administrator => {
                let owner = if record.owner_email.is_empty() {
                    "unknown".to_string()
                } else {
                    record.owner_email.clone()
                };
                (
                    record
                        .color
                        .as_ref()
                        .map_or(ADMIN_FALLBACK_COLOR, |color| color.as_str())
                        .to_string(),
                    record
                        .created_at
                        .map_or_else(|| "-".to_string(), format_timestamp),
                    Some(owner),
                )
            }
        };

        Self {
            id: record.id.clone(),
            color,
            timestamp_label,
            owner_label,
            body,
            mode: RowMode::ReadOnly,
            viewer,
            lock: if locked { record.lock.clone() } else { None },
        }
    }

    pub const fn is_locked(&self) -> bool {
        matches!(self.body, RowBody::Locked)
    }

    /// Header line: time for owners, `email | time` for the administrator.
    pub fn header(&self) -> String {
        match &self.owner_label {
            Some(owner) => format!("{owner} | {}", self.timestamp_label),
            None => self.timestamp_label.clone(),
        }
    }

    /// Controls for this row given its viewer, lock state and mode.
    pub fn affordances(&self) -> Vec<Affordance> {
        let toggle = match self.mode {
            RowMode::ReadOnly => Affordance::Edit,
            RowMode::Editing => Affordance::Save,
        };
        match (self.viewer, self.is_locked()) {
            (Viewer::Owner, true) => vec![Affordance::Unlock, Affordance::Delete],
            (Viewer::Owner, false) => vec![
                toggle,
                Affordance::ExportPdf,
                Affordance::Print,
                Affordance::Share,
                Affordance::Delete,
            ],
            (Viewer::Administrator, _) => vec![toggle, Affordance::Delete],
        }
    }

    pub fn offers(&self, affordance: Affordance) -> bool {
        self.affordances().contains(&affordance)
    }
}

/// Format a creation time in local time.
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant
        .with_timezone(&Local)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// The visible list for one viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedList {
    viewer: Viewer,
    rows: Vec<NoteRow>,
}

impl RenderedList {
    pub const fn new(viewer: Viewer) -> Self {
        Self {
            viewer,
            rows: Vec::new(),
        }
    }

    pub const fn viewer(&self) -> Viewer {
        self.viewer
    }

    /// Replace every row with freshly rendered `records`.
    pub fn replace(&mut self, records: &[NoteRecord]) {
        let now = Utc::now();
        self.rows = records
            .iter()
            .map(|record| NoteRow::from_record(record, self.viewer, now))
            .collect();
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn rows(&self) -> &[NoteRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, id: &NoteId) -> Option<&NoteRow> {
        self.rows.iter().find(|row| &row.id == id)
    }

    fn row_mut(&mut self, id: &NoteId) -> Result<&mut NoteRow> {
        self.rows
            .iter_mut()
            .find(|row| &row.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Switch a row to editable. Locked rows cannot be edited.
    pub fn begin_edit(&mut self, id: &NoteId) -> Result<&NoteRow> {
        let row = self.row_mut(id)?;
        if row.is_locked() {
            return Err(Error::Validation("Unlock the note before editing it".to_string()));
        }
        row.mode = RowMode::Editing;
        Ok(row)
    }

    /// Replace the working text of a row that is being edited.
    pub fn set_draft(&mut self, id: &NoteId, text: &str) -> Result<()> {
        let row = self.row_mut(id)?;
        if row.mode != RowMode::Editing {
            return Err(Error::Validation("Press Edit before changing the note".to_string()));
        }
        row.body = RowBody::Text(text.to_string());
        Ok(())
    }

    /// Working text of a row being edited.
    pub fn draft(&self, id: &NoteId) -> Result<String> {
        let row = self
            .row(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        if row.mode != RowMode::Editing {
            return Err(Error::Validation("Press Edit before saving the note".to_string()));
        }
        Ok(row.body.display_text().trim().to_string())
    }

    /// Back to read-only after a successful save.
    pub fn finish_edit(&mut self, id: &NoteId, saved_text: &str) -> Result<()> {
        let row = self.row_mut(id)?;
        row.body = RowBody::Text(saved_text.to_string());
        row.mode = RowMode::ReadOnly;
        Ok(())
    }

    /// Check an unlock attempt. The row stays locked either way.
    pub fn verify_unlock(&self, id: &NoteId, candidate: &str) -> Result<()> {
        let row = self
            .row(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        match &row.lock {
            Some(lock) if lock.matches(candidate) => Ok(()),
            Some(_) => Err(Error::AuthorizationMismatch),
            None => Err(Error::Validation("This note is not locked".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NoteColor;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn record(id: &str, text: &str, lock: Option<&str>) -> NoteRecord {
        NoteRecord {
            id: NoteId::from(id),
            owner_id: "a".to_string(),
            owner_email: "a@example.com".to_string(),
            text: text.to_string(),
            color: Some(NoteColor::new("#abcdef")),
            lock: lock.map(Lock::from_passphrase),
            created_at: Some(Utc.with_ymd_and_hms(2024, 5, 17, 12, 0, 0).unwrap()),
        }
    }

    #[test]
    fn owner_sees_placeholder_for_locked_notes() {
        let mut list = RenderedList::new(Viewer::Owner);
        list.replace(&[record("n1", "hi", Some("secret"))]);

        let row = &list.rows()[0];
        assert_eq!(row.body, RowBody::Locked);
        assert_eq!(row.body.display_text(), LOCKED_PLACEHOLDER);
        assert_eq!(row.affordances(), vec![Affordance::Unlock, Affordance::Delete]);
    }

    #[test]
    fn administrator_always_sees_plaintext() {
        let mut list = RenderedList::new(Viewer::Administrator);
        list.replace(&[record("n1", "hi", Some("secret"))]);

        let row = &list.rows()[0];
        assert_eq!(row.body, RowBody::Text("hi".to_string()));
        assert_eq!(row.affordances(), vec![Affordance::Edit, Affordance::Delete]);
        assert_eq!(row.owner_label.as_deref(), Some("a@example.com"));
        assert!(row.header().starts_with("a@example.com | "));
    }

    #[test]
    fn unlocked_owner_row_offers_full_actions() {
        let mut list = RenderedList::new(Viewer::Owner);
        list.replace(&[record("n1", "hi", None)]);

        assert_eq!(
            list.rows()[0].affordances(),
            vec![
                Affordance::Edit,
                Affordance::ExportPdf,
                Affordance::Print,
                Affordance::Share,
                Affordance::Delete,
            ]
        );
        assert_eq!(list.rows()[0].color, "#abcdef");
    }

    #[test]
    fn fallback_colors_differ_by_viewer() {
        let mut plain = record("n1", "hi", None);
        plain.color = None;

        let mut owner = RenderedList::new(Viewer::Owner);
        owner.replace(std::slice::from_ref(&plain));
        assert_eq!(owner.rows()[0].color, DEFAULT_NOTE_COLOR);

        let mut admin = RenderedList::new(Viewer::Administrator);
        admin.replace(&[plain]);
        assert_eq!(admin.rows()[0].color, ADMIN_FALLBACK_COLOR);
    }

    #[test]
    fn admin_label_fallbacks() {
        let mut pending = record("n1", "hi", None);
        pending.created_at = None;
        pending.owner_email = String::new();

        let mut admin = RenderedList::new(Viewer::Administrator);
        admin.replace(&[pending]);
        assert_eq!(admin.rows()[0].header(), "unknown | -");
    }

    #[test]
    fn edit_toggles_between_modes() {
        let mut list = RenderedList::new(Viewer::Owner);
        list.replace(&[record("n1", "hi", None)]);
        let id = NoteId::from("n1");

        list.begin_edit(&id).unwrap();
        assert_eq!(list.row(&id).unwrap().mode, RowMode::Editing);
        assert!(list.row(&id).unwrap().offers(Affordance::Save));
        assert!(!list.row(&id).unwrap().offers(Affordance::Edit));

        list.set_draft(&id, "  changed  ").unwrap();
        assert_eq!(list.draft(&id).unwrap(), "changed");

        list.finish_edit(&id, "changed").unwrap();
        let row = list.row(&id).unwrap();
        assert_eq!(row.mode, RowMode::ReadOnly);
        assert_eq!(row.body, RowBody::Text("changed".to_string()));
    }

    #[test]
    fn locked_rows_cannot_be_edited() {
        let mut list = RenderedList::new(Viewer::Owner);
        list.replace(&[record("n1", "hi", Some("secret"))]);
        assert!(matches!(
            list.begin_edit(&NoteId::from("n1")),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn draft_requires_edit_mode() {
        let mut list = RenderedList::new(Viewer::Owner);
        list.replace(&[record("n1", "hi", None)]);
        assert!(list.draft(&NoteId::from("n1")).is_err());
        assert!(list.set_draft(&NoteId::from("n1"), "x").is_err());
    }

    #[test]
    fn verify_unlock_checks_passphrase_and_keeps_placeholder() {
        let mut list = RenderedList::new(Viewer::Owner);
        list.replace(&[record("n1", "hi", Some("secret")), record("n2", "open", None)]);
        let id = NoteId::from("n1");

        assert!(matches!(
            list.verify_unlock(&id, "wrong"),
            Err(Error::AuthorizationMismatch)
        ));
        list.verify_unlock(&id, "secret").unwrap();
        assert_eq!(list.row(&id).unwrap().body, RowBody::Locked);

        assert!(matches!(
            list.verify_unlock(&NoteId::from("n2"), "x"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            list.verify_unlock(&NoteId::from("zz"), "x"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn replace_drops_previous_rows() {
        let mut list = RenderedList::new(Viewer::Owner);
        list.replace(&[record("n1", "hi", None), record("n2", "there", None)]);
        list.replace(&[record("n3", "new", None)]);
        assert_eq!(list.len(), 1);
        assert!(list.row(&NoteId::from("n1")).is_none());

        list.clear();
        assert!(list.is_empty());
    }
}

//! Terminal rendering of the diary.

use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Mutex;

use serde::Serialize;

use diary_core::app::{Control, Surface};
use diary_core::render::{Affordance, NoteRow, RenderedList, RowMode};
use diary_core::session::{ProfileCard, View};

/// How lists reach the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ListOutput {
    Hidden = 0,
    Text = 1,
    Json = 2,
}

impl ListOutput {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Text,
            2 => Self::Json,
            _ => Self::Hidden,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NoteListItem {
    pub id: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub locked: bool,
    pub text: String,
    pub color: String,
    pub actions: Vec<&'static str>,
}

impl From<&NoteRow> for NoteListItem {
    fn from(row: &NoteRow) -> Self {
        Self {
            id: row.id.to_string(),
            created_at: row.timestamp_label.clone(),
            owner: row.owner_label.clone(),
            locked: row.is_locked(),
            text: row.body.display_text().to_string(),
            color: row.color.clone(),
            actions: row.affordances().into_iter().map(Affordance::label).collect(),
        }
    }
}

/// Text lines for one row: header with id, then the body.
pub fn format_row_lines(row: &NoteRow) -> Vec<String> {
    let short_id = row.id.as_str().chars().take(8).collect::<String>();
    let editing = if row.mode == RowMode::Editing {
        " (editing)"
    } else {
        ""
    };
    let actions = row
        .affordances()
        .into_iter()
        .map(Affordance::label)
        .collect::<Vec<_>>()
        .join(" · ");

    let mut lines = vec![format!("{short_id}  {}{editing}  [{actions}]", row.header())];
    lines.extend(
        row.body
            .display_text()
            .lines()
            .map(|line| format!("    {line}")),
    );
    lines
}

/// [`Surface`] over stdin/stdout.
pub struct TerminalSurface {
    list_output: AtomicU8,
    announce_views: AtomicBool,
    preset_confirmation: Mutex<Option<bool>>,
    assume_yes: bool,
}

impl TerminalSurface {
    pub const fn new(assume_yes: bool) -> Self {
        Self {
            list_output: AtomicU8::new(ListOutput::Hidden as u8),
            announce_views: AtomicBool::new(false),
            preset_confirmation: Mutex::new(None),
            assume_yes,
        }
    }

    /// Answer the next confirmation without reading stdin. The shell reads
    /// the answer from its own line stream.
    pub fn preset_confirmation(&self, answer: bool) {
        *self
            .preset_confirmation
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(answer);
    }

    fn take_preset(&self) -> Option<bool> {
        self.preset_confirmation
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take()
    }

    pub fn set_list_output(&self, output: ListOutput) {
        self.list_output.store(output as u8, Ordering::Relaxed);
    }

    pub fn list_output(&self) -> ListOutput {
        ListOutput::from_u8(self.list_output.load(Ordering::Relaxed))
    }

    /// Print view switches, used by the interactive shell.
    pub fn set_announce_views(&self, announce: bool) {
        self.announce_views.store(announce, Ordering::Relaxed);
    }

    fn read_line(prompt: &str) -> Option<String> {
        print!("{prompt} ");
        io::stdout().flush().ok()?;
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

impl Surface for TerminalSurface {
    fn alert(&self, message: &str) {
        println!("{message}");
    }

    fn confirm(&self, message: &str) -> bool {
        if let Some(answer) = self.take_preset() {
            return answer;
        }
        if self.assume_yes {
            return true;
        }
        if !io::stdin().is_terminal() {
            eprintln!("{message} (pass --yes to confirm non-interactively)");
            return false;
        }
        Self::read_line(&format!("{message} [y/N]"))
            .is_some_and(|answer| matches!(answer.trim(), "y" | "Y" | "yes"))
    }

    fn prompt(&self, message: &str) -> Option<String> {
        Self::read_line(message).filter(|answer| !answer.is_empty())
    }

    fn status(&self, message: &str) {
        println!("{message}");
    }

    fn show_view(&self, view: View) {
        if !self.announce_views.load(Ordering::Relaxed) {
            return;
        }
        match view {
            View::Auth => println!("== Signed out =="),
            View::Diary => println!("== My diary =="),
            View::Admin => println!("== Admin panel =="),
        }
    }

    fn show_profile(&self, card: Option<&ProfileCard>) {
        if !self.announce_views.load(Ordering::Relaxed) {
            return;
        }
        if let Some(card) = card {
            println!("{} <{}>", card.name, card.email);
        }
    }

    fn render_list(&self, list: &RenderedList) {
        match self.list_output() {
            ListOutput::Hidden => {}
            ListOutput::Text => {
                if list.is_empty() {
                    println!("(no notes)");
                }
                for row in list.rows() {
                    for line in format_row_lines(row) {
                        println!("{line}");
                    }
                }
            }
            ListOutput::Json => {
                let items = list.rows().iter().map(NoteListItem::from).collect::<Vec<_>>();
                match serde_json::to_string_pretty(&items) {
                    Ok(json) => println!("{json}"),
                    Err(error) => eprintln!("Failed to serialize notes: {error}"),
                }
            }
        }
    }

    fn show_note_draft(&self, text: &str) {
        if self.announce_views.load(Ordering::Relaxed) && !text.is_empty() {
            println!("draft: {text}");
        }
    }

    fn set_enabled(&self, control: Control, enabled: bool) {
        tracing::trace!(?control, enabled, "control state");
    }
}

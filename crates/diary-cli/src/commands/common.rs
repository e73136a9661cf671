use std::env;
use std::io::{self, BufRead, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use diary_core::actions::{Action, ActionInput, ActionTable};
use diary_core::app::{DiaryApp, Surface};
use diary_core::backend::supabase::{SupabaseDocumentStore, SupabaseIdentityProvider};
use diary_core::config::DiaryConfig;
use diary_core::render::{RenderedList, RowBody};
use diary_core::{NoteId, Role};

use crate::auth::SupabaseBackend;
use crate::config::load_effective;
use crate::error::CliError;
use crate::platform::terminal_platform;
use crate::surface::TerminalSurface;

pub type CliApp = DiaryApp<SupabaseIdentityProvider, SupabaseDocumentStore>;

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub assume_yes: bool,
    /// Where exported PDFs land
    pub output_dir: PathBuf,
}

impl SessionOptions {
    pub fn new(assume_yes: bool) -> Self {
        Self {
            assume_yes,
            output_dir: PathBuf::from("."),
        }
    }

    #[must_use]
    pub fn with_output_dir(mut self, dir: Option<PathBuf>) -> Self {
        if let Some(dir) = dir {
            self.output_dir = dir;
        }
        self
    }
}

/// A configured application with the stored session restored.
pub struct Session {
    pub app: CliApp,
    pub actions: ActionTable<CliApp>,
    pub surface: Arc<TerminalSurface>,
    pub config: DiaryConfig,
}

impl Session {
    pub async fn open(options: &SessionOptions) -> Result<Self, CliError> {
        let config = load_effective().map_err(CliError::Config)?;
        let backend = SupabaseBackend::from_config(&config)?;
        backend.restore().await?;

        let surface = Arc::new(TerminalSurface::new(options.assume_yes));
        let mut app = DiaryApp::new(
            backend.identity,
            backend.store,
            config.admin_email.clone(),
            Arc::clone(&surface) as Arc<dyn Surface>,
            terminal_platform(options.output_dir.clone()),
        );
        app.refresh_identity().await;

        Ok(Self {
            app,
            actions: CliApp::action_table(),
            surface,
            config,
        })
    }

    /// Run an action. Failures were already shown by the surface.
    pub async fn perform(&mut self, action: Action, input: ActionInput) -> Result<(), CliError> {
        self.app
            .perform(&self.actions, action.name(), input)
            .await
            .map_err(|_| CliError::Reported)
    }

    pub fn require_user(&self) -> Result<(), CliError> {
        match self.app.role() {
            Role::User => Ok(()),
            Role::Administrator => Err(CliError::Config(
                "The administrator account has no personal diary. Use `diary admin`.".to_string(),
            )),
            Role::Anonymous => Err(CliError::NotSignedIn),
        }
    }

    pub fn require_admin(&self) -> Result<(), CliError> {
        match self.app.role() {
            Role::Administrator => Ok(()),
            Role::User => Err(CliError::AdminOnly),
            Role::Anonymous => Err(CliError::NotSignedIn),
        }
    }
}

/// Picks the rendered list a command works on.
pub type ListSelector = fn(&Session) -> &RenderedList;

pub fn owner_list(session: &Session) -> &RenderedList {
    session.app.my_notes()
}

pub fn admin_list(session: &Session) -> &RenderedList {
    session.app.all_notes()
}

/// Resolve `#N` (1-based row number), a full id, or a unique id prefix
/// against the rendered rows.
pub fn resolve_note_ref(list: &RenderedList, raw: &str) -> Result<NoteId, CliError> {
    let raw = normalize_note_identifier(raw)?;

    if let Some(index) = raw.strip_prefix('#') {
        return index
            .parse::<usize>()
            .ok()
            .and_then(|index| index.checked_sub(1))
            .and_then(|index| list.rows().get(index))
            .map(|row| row.id.clone())
            .ok_or(CliError::NoteNotFound(raw));
    }

    if let Some(row) = list.rows().iter().find(|row| row.id.as_str() == raw) {
        return Ok(row.id.clone());
    }

    let matches = list
        .rows()
        .iter()
        .filter(|row| row.id.as_str().starts_with(&raw))
        .collect::<Vec<_>>();
    match matches.as_slice() {
        [] => Err(CliError::NoteNotFound(raw)),
        [row] => Ok(row.id.clone()),
        _ => Err(CliError::AmbiguousNoteId(format!(
            "Note ID prefix '{raw}' matches {} notes; use more characters",
            matches.len()
        ))),
    }
}

/// Current text of an unlocked row, for seeding the editor.
pub fn row_text(list: &RenderedList, id: &NoteId) -> Option<String> {
    match &list.row(id)?.body {
        RowBody::Text(text) => Some(text.clone()),
        RowBody::Locked => None,
    }
}

pub fn normalize_note_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyNoteId)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn resolve_note_content(content_parts: &[String]) -> Result<String, CliError> {
    if let Some(content) = normalize_content(&content_parts.join(" ")) {
        return Ok(content);
    }

    if let Some(content) = read_piped_stdin()? {
        return Ok(content);
    }

    if let Some(content) = capture_editor_input_with_initial("")? {
        return Ok(content);
    }

    Err(CliError::EmptyContent)
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

/// Read a secret from the terminal when it was not passed as a flag.
pub fn read_secret(label: &str, provided: Option<String>) -> Result<String, CliError> {
    if let Some(value) = provided {
        return Ok(value);
    }
    print!("{label}: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

pub fn capture_editor_input_with_initial(
    initial_content: &str,
) -> Result<Option<String>, CliError> {
    let editor = preferred_editor();
    let temp_file = create_temp_note_file_path();
    std::fs::write(&temp_file, initial_content)?;

    let launch_result = launch_editor(&editor, &temp_file);
    let note_content = std::fs::read_to_string(&temp_file)?;
    let _ = std::fs::remove_file(&temp_file);

    launch_result?;
    Ok(normalize_content(&note_content))
}

pub fn launch_editor(editor: &str, file_path: &Path) -> Result<(), CliError> {
    match Command::new(editor).arg(file_path).status() {
        Ok(status) => {
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            let mut parts = editor.split_whitespace();
            let Some(program) = parts.next() else {
                return Err(CliError::EditorFailed("empty EDITOR command".into()));
            };

            let mut command = Command::new(program);
            command.args(parts).arg(file_path);

            let status = command.status()?;
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) => Err(CliError::Io(err)),
    }
}

pub fn preferred_editor() -> String {
    env::var("VISUAL")
        .or_else(|_| env::var("EDITOR"))
        .unwrap_or_else(|_| default_editor().to_string())
}

pub const fn default_editor() -> &'static str {
    if cfg!(windows) {
        "notepad"
    } else {
        "vi"
    }
}

pub fn create_temp_note_file_path() -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    env::temp_dir().join(format!("diary-note-{}-{now}.txt", std::process::id()))
}

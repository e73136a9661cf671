use diary_core::actions::{Action, ActionInput};

use super::common::{resolve_note_content, Session, SessionOptions};
use crate::error::CliError;

pub async fn run_add(
    options: &SessionOptions,
    content_parts: &[String],
    lock: Option<String>,
    color: Option<String>,
) -> Result<(), CliError> {
    let mut session = Session::open(options).await?;
    session.require_user()?;
    let content = resolve_note_content(content_parts)?;

    let form = session.app.note_form_mut();
    form.text = content;
    form.passphrase = lock.unwrap_or_default();
    if let Some(color) = color {
        form.color = color;
    }
    session.perform(Action::SaveNote, ActionInput::none()).await?;

    match session.app.my_notes().rows().first() {
        Some(row) if row.is_locked() => println!("Saved locked note {}", row.id),
        Some(row) => println!("Saved note {}", row.id),
        None => println!("Saved note"),
    }
    Ok(())
}

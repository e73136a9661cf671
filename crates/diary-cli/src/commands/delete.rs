use diary_core::actions::{Action, ActionInput};

use super::common::{owner_list, resolve_note_ref, ListSelector, Session, SessionOptions};
use crate::error::CliError;

pub async fn run_delete(options: &SessionOptions, id: &str) -> Result<(), CliError> {
    let mut session = Session::open(options).await?;
    session.require_user()?;
    delete_row(&mut session, Action::Delete, owner_list, id).await
}

/// Declining the confirmation leaves the note in place.
pub async fn delete_row(
    session: &mut Session,
    action: Action,
    list: ListSelector,
    raw_id: &str,
) -> Result<(), CliError> {
    let id = resolve_note_ref(list(session), raw_id)?;
    session.perform(action, ActionInput::note(id.clone())).await?;

    if list(session).row(&id).is_some() {
        println!("Kept note {id}");
    } else {
        println!("Deleted note {id}");
    }
    Ok(())
}

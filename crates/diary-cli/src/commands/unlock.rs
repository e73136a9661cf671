use diary_core::actions::{Action, ActionInput};

use super::common::{resolve_note_ref, Session, SessionOptions};
use crate::error::CliError;

/// Without `--passphrase` the surface prompts for it.
pub async fn run_unlock(
    options: &SessionOptions,
    id: &str,
    passphrase: Option<String>,
) -> Result<(), CliError> {
    let mut session = Session::open(options).await?;
    session.require_user()?;
    let id = resolve_note_ref(session.app.my_notes(), id)?;

    let mut input = ActionInput::note(id);
    if let Some(passphrase) = passphrase {
        input = input.with_value(passphrase);
    }
    session.perform(Action::Unlock, input).await
}

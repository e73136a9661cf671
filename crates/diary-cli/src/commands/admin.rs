use diary_core::actions::{Action, ActionInput};
use diary_core::app::Surface;

use super::common::{admin_list, Session, SessionOptions};
use super::delete::delete_row;
use super::edit::{edit_row, EditActions};
use crate::error::CliError;
use crate::surface::ListOutput;

async fn open_admin(options: &SessionOptions) -> Result<Session, CliError> {
    let session = Session::open(options).await?;
    session.require_admin()?;
    Ok(session)
}

pub async fn run_admin_list(
    options: &SessionOptions,
    email: Option<String>,
    json: bool,
) -> Result<(), CliError> {
    let mut session = open_admin(options).await?;
    if let Some(email) = email {
        session
            .perform(Action::AdminSearch, ActionInput::value(email))
            .await?;
    }

    session.surface.set_list_output(if json {
        ListOutput::Json
    } else {
        ListOutput::Text
    });
    session.surface.render_list(session.app.all_notes());
    Ok(())
}

pub async fn run_admin_edit(
    options: &SessionOptions,
    id: &str,
    content_parts: &[String],
) -> Result<(), CliError> {
    let mut session = open_admin(options).await?;
    edit_row(&mut session, EditActions::ADMIN, id, content_parts).await
}

pub async fn run_admin_delete(options: &SessionOptions, id: &str) -> Result<(), CliError> {
    let mut session = open_admin(options).await?;
    delete_row(&mut session, Action::AdminDelete, admin_list, id).await
}

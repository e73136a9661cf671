use diary_core::actions::{Action, ActionInput};
use diary_core::app::Surface;

use super::common::{Session, SessionOptions};
use crate::error::CliError;
use crate::surface::ListOutput;

pub async fn run_list(
    options: &SessionOptions,
    search: Option<String>,
    date: Option<String>,
    json: bool,
) -> Result<(), CliError> {
    let mut session = Session::open(options).await?;
    session.require_user()?;

    session.surface.set_list_output(ListOutput::Hidden);
    if let Some(date) = date {
        session
            .perform(Action::FilterDate, ActionInput::value(date))
            .await?;
    }
    if let Some(search) = search {
        session
            .perform(Action::Search, ActionInput::value(search))
            .await?;
    }

    session.surface.set_list_output(if json {
        ListOutput::Json
    } else {
        ListOutput::Text
    });
    session.surface.render_list(session.app.my_notes());
    Ok(())
}

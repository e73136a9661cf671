use diary_core::actions::{Action, ActionInput};

use super::common::{
    admin_list, capture_editor_input_with_initial, normalize_content, owner_list,
    resolve_note_ref, row_text, ListSelector, Session, SessionOptions,
};
use crate::error::CliError;

pub async fn run_edit(
    options: &SessionOptions,
    id: &str,
    content_parts: &[String],
) -> Result<(), CliError> {
    let mut session = Session::open(options).await?;
    session.require_user()?;
    edit_row(&mut session, EditActions::OWNER, id, content_parts).await
}

/// The begin/commit pair for one list.
#[derive(Clone, Copy)]
pub struct EditActions {
    pub begin: Action,
    pub save: Action,
    pub list: ListSelector,
}

impl EditActions {
    pub const OWNER: Self = Self {
        begin: Action::Edit,
        save: Action::SaveEdit,
        list: owner_list,
    };

    pub const ADMIN: Self = Self {
        begin: Action::AdminEdit,
        save: Action::AdminSave,
        list: admin_list,
    };
}

pub async fn edit_row(
    session: &mut Session,
    actions: EditActions,
    raw_id: &str,
    content_parts: &[String],
) -> Result<(), CliError> {
    let id = resolve_note_ref((actions.list)(session), raw_id)?;
    session
        .perform(actions.begin, ActionInput::note(id.clone()))
        .await?;

    let content = match normalize_content(&content_parts.join(" ")) {
        Some(content) => content,
        None => {
            let initial = row_text((actions.list)(session), &id).unwrap_or_default();
            capture_editor_input_with_initial(&initial)?.ok_or(CliError::EmptyContent)?
        }
    };

    session
        .perform(actions.save, ActionInput::note(id.clone()).with_value(content))
        .await?;
    println!("Updated note {id}");
    Ok(())
}

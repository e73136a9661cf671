use diary_core::actions::{Action, ActionInput};

use super::common::{resolve_note_ref, Session, SessionOptions};
use crate::error::CliError;

/// One output channel, applied to a single note or the whole visible list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Pdf,
    Print,
    Share,
}

impl Delivery {
    pub const fn action(self, single: bool) -> Action {
        match (self, single) {
            (Self::Pdf, true) => Action::ExportPdf,
            (Self::Pdf, false) => Action::ExportAllPdf,
            (Self::Print, true) => Action::Print,
            (Self::Print, false) => Action::PrintAll,
            (Self::Share, true) => Action::Share,
            (Self::Share, false) => Action::ShareAll,
        }
    }
}

pub async fn run_delivery(
    options: &SessionOptions,
    delivery: Delivery,
    id: Option<&str>,
) -> Result<(), CliError> {
    let mut session = Session::open(options).await?;
    session.require_user()?;

    let input = match id {
        Some(raw) => ActionInput::note(resolve_note_ref(session.app.my_notes(), raw)?),
        None => ActionInput::none(),
    };
    session.perform(delivery.action(id.is_some()), input).await
}

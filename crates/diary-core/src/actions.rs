//! UI event registration table.
//!
//! Front ends report user events by name; the table routes each name to a
//! handler on the application controller. Nothing here depends on a
//! particular display toolkit.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::models::NoteId;

/// Every user event the diary reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    SignUp,
    SignIn,
    AdminSignIn,
    FederatedSignIn,
    SignOut,
    SaveNote,
    Search,
    FilterDate,
    ClearFilters,
    Edit,
    SaveEdit,
    Delete,
    Unlock,
    ExportPdf,
    Print,
    Share,
    ExportAllPdf,
    PrintAll,
    ShareAll,
    AdminSearch,
    AdminEdit,
    AdminSave,
    AdminDelete,
    InsertEmoji,
}

impl Action {
    pub const ALL: [Self; 24] = [
        Self::SignUp,
        Self::SignIn,
        Self::AdminSignIn,
        Self::FederatedSignIn,
        Self::SignOut,
        Self::SaveNote,
        Self::Search,
        Self::FilterDate,
        Self::ClearFilters,
        Self::Edit,
        Self::SaveEdit,
        Self::Delete,
        Self::Unlock,
        Self::ExportPdf,
        Self::Print,
        Self::Share,
        Self::ExportAllPdf,
        Self::PrintAll,
        Self::ShareAll,
        Self::AdminSearch,
        Self::AdminEdit,
        Self::AdminSave,
        Self::AdminDelete,
        Self::InsertEmoji,
    ];

    /// Stable event name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SignUp => "sign-up",
            Self::SignIn => "sign-in",
            Self::AdminSignIn => "admin-sign-in",
            Self::FederatedSignIn => "federated-sign-in",
            Self::SignOut => "sign-out",
            Self::SaveNote => "save-note",
            Self::Search => "search",
            Self::FilterDate => "filter-date",
            Self::ClearFilters => "clear-filters",
            Self::Edit => "edit",
            Self::SaveEdit => "save-edit",
            Self::Delete => "delete",
            Self::Unlock => "unlock",
            Self::ExportPdf => "export-pdf",
            Self::Print => "print",
            Self::Share => "share",
            Self::ExportAllPdf => "export-all-pdf",
            Self::PrintAll => "print-all",
            Self::ShareAll => "share-all",
            Self::AdminSearch => "admin-search",
            Self::AdminEdit => "admin-edit",
            Self::AdminSave => "admin-save",
            Self::AdminDelete => "admin-delete",
            Self::InsertEmoji => "insert-emoji",
        }
    }

    /// Whether the event targets a single rendered row.
    #[must_use]
    pub const fn targets_note(self) -> bool {
        matches!(
            self,
            Self::Edit
                | Self::SaveEdit
                | Self::Delete
                | Self::Unlock
                | Self::ExportPdf
                | Self::Print
                | Self::Share
                | Self::AdminEdit
                | Self::AdminSave
                | Self::AdminDelete
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|action| action.name() == s)
            .ok_or_else(|| Error::Validation(format!("Unknown action: {s}")))
    }
}

/// Payload carried by an event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionInput {
    pub note: Option<NoteId>,
    pub value: Option<String>,
}

impl ActionInput {
    #[must_use]
    pub const fn none() -> Self {
        Self {
            note: None,
            value: None,
        }
    }

    #[must_use]
    pub fn note(id: impl Into<NoteId>) -> Self {
        Self {
            note: Some(id.into()),
            value: None,
        }
    }

    #[must_use]
    pub fn value(value: impl Into<String>) -> Self {
        Self {
            note: None,
            value: Some(value.into()),
        }
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn require_note(&self) -> Result<&NoteId> {
        self.note
            .as_ref()
            .ok_or_else(|| Error::Validation("No note selected".to_string()))
    }

    pub fn value_or_empty(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }
}

pub type ActionFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + 'a>>;

/// Handler bound to an action.
pub type Handler<C> = for<'a> fn(&'a mut C, ActionInput) -> ActionFuture<'a>;

/// Name-to-handler registry.
pub struct ActionTable<C> {
    handlers: HashMap<Action, Handler<C>>,
}

impl<C> Default for ActionTable<C> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<C> ActionTable<C> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to `action`, replacing any previous binding.
    #[must_use]
    pub fn on(mut self, action: Action, handler: Handler<C>) -> Self {
        self.handlers.insert(action, handler);
        self
    }

    pub fn contains(&self, action: Action) -> bool {
        self.handlers.contains_key(&action)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Route the event called `name` to its handler.
    pub async fn dispatch(&self, name: &str, context: &mut C, input: ActionInput) -> Result<()> {
        let action = name.parse::<Action>()?;
        self.dispatch_action(action, context, input).await
    }

    pub async fn dispatch_action(
        &self,
        action: Action,
        context: &mut C,
        input: ActionInput,
    ) -> Result<()> {
        let handler = self
            .handlers
            .get(&action)
            .ok_or_else(|| Error::Validation(format!("No handler registered for {action}")))?;
        if action.targets_note() {
            input.require_note()?;
        }
        tracing::trace!(%action, "dispatching");
        handler(context, input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Counter {
        events: Vec<String>,
    }

    impl Counter {
        async fn record(&mut self, label: String) -> Result<()> {
            self.events.push(label);
            Ok(())
        }
    }

    fn table() -> ActionTable<Counter> {
        ActionTable::<Counter>::new()
            .on(Action::Search, |counter, input| {
                Box::pin(counter.record(format!("search:{}", input.value_or_empty())))
            })
            .on(Action::Delete, |counter, input| {
                let id = input.note.map(|id| id.to_string()).unwrap_or_default();
                Box::pin(counter.record(format!("delete:{id}")))
            })
    }

    #[test]
    fn names_round_trip_for_every_action() {
        for action in Action::ALL {
            assert_eq!(action.name().parse::<Action>().unwrap(), action);
        }
    }

    #[tokio::test]
    async fn dispatch_routes_by_name() {
        let table = table();
        let mut counter = Counter::default();

        table
            .dispatch("search", &mut counter, ActionInput::value("cat"))
            .await
            .unwrap();
        table
            .dispatch("delete", &mut counter, ActionInput::note("n1"))
            .await
            .unwrap();

        assert_eq!(counter.events, vec!["search:cat", "delete:n1"]);
    }

    #[tokio::test]
    async fn unknown_name_is_a_validation_error() {
        let mut counter = Counter::default();
        let error = table()
            .dispatch("launch-rockets", &mut counter, ActionInput::none())
            .await
            .unwrap_err();
        assert!(matches!(error, Error::Validation(message) if message.contains("launch-rockets")));
        assert!(counter.events.is_empty());
    }

    #[tokio::test]
    async fn unbound_action_is_a_validation_error() {
        let mut counter = Counter::default();
        let error = table()
            .dispatch("print", &mut counter, ActionInput::note("n1"))
            .await
            .unwrap_err();
        assert!(matches!(error, Error::Validation(_)));
    }

    #[tokio::test]
    async fn row_actions_require_a_note() {
        let mut counter = Counter::default();
        let error = table()
            .dispatch("delete", &mut counter, ActionInput::none())
            .await
            .unwrap_err();
        assert!(matches!(error, Error::Validation(_)));
        assert!(counter.events.is_empty());
    }
}

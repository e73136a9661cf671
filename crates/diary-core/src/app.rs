//! Application controller.
//!
//! [`DiaryApp`] owns the session, both rendered lists and the form state,
//! and reacts to named user events routed through an [`ActionTable`]. All
//! display work goes through the [`Surface`] trait so handlers run the same
//! under a terminal, a GUI or a test recorder.

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::actions::{Action, ActionInput, ActionTable};
use crate::backend::{DocumentStore, IdentityProvider};
use crate::error::{Error, Result};
use crate::export::{
    collect_visible, collection_file_name, export_pdf, note_file_name, print_view, share_or_copy,
    Platform, COLLECTION_SHARE_TITLE, NOTE_SHARE_TITLE,
};
use crate::models::{Identity, NewNote, NoteId, Role, DEFAULT_NOTE_COLOR};
use crate::profile::ProfileBootstrapper;
use crate::render::{RenderedList, RowBody, Viewer};
use crate::repository::{NoteFilter, NoteRepository};
use crate::session::{ProfileCard, SessionController, SessionTransition, View};

/// Emoji offered next to the note input.
pub const EMOJI_BAR: [&str; 8] = ["❤️", "😊", "😢", "😍", "🌸", "✨", "🔥", "🎉"];

pub const DELETE_CONFIRMATION: &str = "Delete this note?";
pub const UNLOCK_PROMPT: &str = "Enter password to unlock:";

/// Controls whose enablement the controller manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    SaveNote,
}

/// Display side of the application.
pub trait Surface: Send + Sync {
    /// Blocking message.
    fn alert(&self, message: &str);

    fn confirm(&self, message: &str) -> bool;

    fn prompt(&self, message: &str) -> Option<String>;

    /// Non-blocking informational line.
    fn status(&self, message: &str);

    fn show_view(&self, view: View);

    fn show_profile(&self, card: Option<&ProfileCard>);

    fn render_list(&self, list: &RenderedList);

    fn show_note_draft(&self, text: &str);

    fn set_enabled(&self, control: Control, enabled: bool);
}

/// Sign-up and sign-in fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub admin_email: String,
    pub admin_password: String,
}

/// New-note fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteForm {
    pub text: String,
    pub passphrase: String,
    pub color: String,
}

impl Default for NoteForm {
    fn default() -> Self {
        Self {
            text: String::new(),
            passphrase: String::new(),
            color: DEFAULT_NOTE_COLOR.to_string(),
        }
    }
}

pub struct DiaryApp<P, S> {
    identity: Arc<P>,
    session: SessionController,
    notes: NoteRepository<S>,
    profiles: ProfileBootstrapper<S>,
    surface: Arc<dyn Surface>,
    platform: Platform,
    auth_form: AuthForm,
    note_form: NoteForm,
    filter: NoteFilter,
    admin_search: String,
    my_notes: RenderedList,
    all_notes: RenderedList,
}

impl<P, S> DiaryApp<P, S>
where
    P: IdentityProvider + 'static,
    S: DocumentStore + 'static,
{
    pub fn new(
        identity: Arc<P>,
        store: Arc<S>,
        admin_email: impl Into<String>,
        surface: Arc<dyn Surface>,
        platform: Platform,
    ) -> Self {
        Self {
            identity,
            session: SessionController::new(admin_email),
            notes: NoteRepository::new(Arc::clone(&store)),
            profiles: ProfileBootstrapper::new(store),
            surface,
            platform,
            auth_form: AuthForm::default(),
            note_form: NoteForm::default(),
            filter: NoteFilter::default(),
            admin_search: String::new(),
            my_notes: RenderedList::new(Viewer::Owner),
            all_notes: RenderedList::new(Viewer::Administrator),
        }
    }

    /// Handlers for every [`Action`].
    pub fn action_table() -> ActionTable<Self> {
        ActionTable::<Self>::new()
            .on(Action::SignUp, |app, _| Box::pin(app.sign_up()))
            .on(Action::SignIn, |app, _| Box::pin(app.sign_in()))
            .on(Action::AdminSignIn, |app, _| Box::pin(app.admin_sign_in()))
            .on(Action::FederatedSignIn, |app, _| {
                Box::pin(app.federated_sign_in())
            })
            .on(Action::SignOut, |app, _| Box::pin(app.sign_out()))
            .on(Action::SaveNote, |app, _| Box::pin(app.save_note()))
            .on(Action::Search, |app, input| Box::pin(app.search(input)))
            .on(Action::FilterDate, |app, input| {
                Box::pin(app.filter_date(input))
            })
            .on(Action::ClearFilters, |app, _| Box::pin(app.clear_filters()))
            .on(Action::Edit, |app, input| Box::pin(app.edit(input)))
            .on(Action::SaveEdit, |app, input| Box::pin(app.save_edit(input)))
            .on(Action::Delete, |app, input| Box::pin(app.delete(input)))
            .on(Action::Unlock, |app, input| Box::pin(app.unlock(input)))
            .on(Action::ExportPdf, |app, input| {
                Box::pin(app.export_note_pdf(input))
            })
            .on(Action::Print, |app, input| Box::pin(app.print_note(input)))
            .on(Action::Share, |app, input| Box::pin(app.share_note(input)))
            .on(Action::ExportAllPdf, |app, _| Box::pin(app.export_all_pdf()))
            .on(Action::PrintAll, |app, _| Box::pin(app.print_all()))
            .on(Action::ShareAll, |app, _| Box::pin(app.share_all()))
            .on(Action::AdminSearch, |app, input| {
                Box::pin(app.admin_search(input))
            })
            .on(Action::AdminEdit, |app, input| Box::pin(app.admin_edit(input)))
            .on(Action::AdminSave, |app, input| Box::pin(app.admin_save(input)))
            .on(Action::AdminDelete, |app, input| {
                Box::pin(app.admin_delete(input))
            })
            .on(Action::InsertEmoji, |app, input| {
                Box::pin(app.insert_emoji(input))
            })
    }

    /// Run the event called `name` and report any failure on the surface.
    pub async fn perform(
        &mut self,
        table: &ActionTable<Self>,
        name: &str,
        input: ActionInput,
    ) -> Result<()> {
        let action = match name.parse::<Action>() {
            Ok(action) => action,
            Err(error) => {
                self.surface.alert(&error.to_string());
                return Err(error);
            }
        };

        let result = table.dispatch_action(action, self, input).await;
        if let Err(error) = &result {
            warn!(%action, %error, "action failed");
            self.surface.alert(&failure_message(action, error));
        }
        result
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.identity.subscribe()
    }

    pub const fn current_identity(&self) -> Option<&Identity> {
        self.session.current()
    }

    pub fn role(&self) -> Role {
        self.session.role()
    }

    pub const fn my_notes(&self) -> &RenderedList {
        &self.my_notes
    }

    pub const fn all_notes(&self) -> &RenderedList {
        &self.all_notes
    }

    pub const fn auth_form(&self) -> &AuthForm {
        &self.auth_form
    }

    pub fn auth_form_mut(&mut self) -> &mut AuthForm {
        &mut self.auth_form
    }

    pub const fn note_form(&self) -> &NoteForm {
        &self.note_form
    }

    pub fn note_form_mut(&mut self) -> &mut NoteForm {
        &mut self.note_form
    }

    pub const fn filter(&self) -> &NoteFilter {
        &self.filter
    }

    /// Pick up the provider's current identity if it changed.
    pub async fn refresh_identity(&mut self) {
        let current = self.identity.current();
        if current.as_ref() != self.session.current() {
            self.on_identity_changed(current).await;
        }
    }

    /// React to a sign-in or sign-out.
    ///
    /// Failures while loading the new view are reported and leave the view
    /// switched.
    pub async fn on_identity_changed(&mut self, identity: Option<Identity>) {
        let transition = self.session.transition(identity);
        self.surface
            .show_profile(transition.identity().map(ProfileCard::for_identity).as_ref());
        self.surface.show_view(transition.view());

        match transition {
            SessionTransition::SignedOut => {
                self.my_notes.clear();
                self.all_notes.clear();
                self.filter = NoteFilter::default();
                self.admin_search.clear();
            }
            SessionTransition::User(identity) => {
                if let Err(error) = self.profiles.ensure(&identity).await {
                    warn!(%error, "profile bootstrap failed");
                    self.surface.alert(&format!("Could not create profile: {error}"));
                }
                if let Err(error) = self.reload_my_notes().await {
                    self.surface.alert(&format!("Could not load notes: {error}"));
                }
            }
            SessionTransition::Administrator(_) => {
                if let Err(error) = self.reload_admin_notes().await {
                    self.surface.alert(&format!("Could not load notes: {error}"));
                }
            }
        }
    }

    async fn sign_up(&mut self) -> Result<()> {
        let name = self.auth_form.name.trim().to_string();
        let email = self.auth_form.email.trim().to_string();
        let password = self.auth_form.password.trim().to_string();
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(Error::Validation("Please fill all fields".to_string()));
        }
        if self.session.is_admin_email(&email) {
            return Err(Error::Validation(
                "This email is reserved for Admin. Use a different email.".to_string(),
            ));
        }

        let identity = self.identity.sign_up(&email, &password, &name).await?;
        self.profiles.write(&identity, &name).await?;
        info!("Signed up {}", identity.id);
        self.auth_form.password.clear();
        self.surface.alert("Signup successful!");
        self.refresh_identity().await;
        Ok(())
    }

    async fn sign_in(&mut self) -> Result<()> {
        let email = self.auth_form.email.trim().to_string();
        let password = self.auth_form.password.trim().to_string();
        if email.is_empty() || password.is_empty() {
            return Err(Error::Validation("Enter email & password!".to_string()));
        }

        self.identity.sign_in(&email, &password).await?;
        self.auth_form.password.clear();
        self.refresh_identity().await;
        Ok(())
    }

    async fn admin_sign_in(&mut self) -> Result<()> {
        let email = self.auth_form.admin_email.trim().to_string();
        let password = self.auth_form.admin_password.trim().to_string();
        if email.is_empty() || password.is_empty() {
            return Err(Error::Validation(
                "Admin email/password required".to_string(),
            ));
        }
        if !self.session.is_admin_email(&email) {
            return Err(Error::Validation(
                "Only the configured admin email can login here!".to_string(),
            ));
        }

        self.identity.sign_in(&email, &password).await?;
        self.auth_form.admin_password.clear();
        self.refresh_identity().await;
        Ok(())
    }

    async fn federated_sign_in(&mut self) -> Result<()> {
        self.identity.federated_sign_in().await?;
        self.refresh_identity().await;
        Ok(())
    }

    async fn sign_out(&mut self) -> Result<()> {
        self.identity.sign_out().await?;
        self.on_identity_changed(None).await;
        Ok(())
    }

    async fn save_note(&mut self) -> Result<()> {
        let note = NewNote::new(
            &self.note_form.text,
            &self.note_form.color,
            Some(self.note_form.passphrase.as_str()),
        )?;
        let owner = self.require_owner()?.clone();

        self.surface.set_enabled(Control::SaveNote, false);
        let created = self
            .notes
            .create(&owner.id, owner.email_or_empty(), &note)
            .await;
        self.surface.set_enabled(Control::SaveNote, true);

        let id = created?;
        debug!(%id, "saved note");
        self.note_form.text.clear();
        self.note_form.passphrase.clear();
        self.surface.show_note_draft("");
        self.reload_my_notes().await
    }

    async fn search(&mut self, input: ActionInput) -> Result<()> {
        self.filter.text = Some(input.value_or_empty().to_string());
        self.reload_my_notes().await
    }

    async fn filter_date(&mut self, input: ActionInput) -> Result<()> {
        let raw = input.value_or_empty().trim();
        self.filter.date = if raw.is_empty() {
            None
        } else {
            Some(NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                Error::Validation(format!("Invalid date: {raw} (expected YYYY-MM-DD)"))
            })?)
        };
        self.reload_my_notes().await
    }

    async fn clear_filters(&mut self) -> Result<()> {
        self.filter = NoteFilter::default();
        self.reload_my_notes().await
    }

    /// Re-fetch the owner's list with the current filters.
    pub async fn reload_my_notes(&mut self) -> Result<()> {
        let Some(owner) = self.session.current().cloned() else {
            return Ok(());
        };
        if self.session.role() != Role::User {
            return Ok(());
        }

        let records = self.notes.list_owned(&owner.id, &self.filter).await?;
        self.my_notes.replace(&records);
        self.surface.render_list(&self.my_notes);
        Ok(())
    }

    async fn edit(&mut self, input: ActionInput) -> Result<()> {
        let id = input.require_note()?;
        self.my_notes.begin_edit(id)?;
        self.surface.render_list(&self.my_notes);
        Ok(())
    }

    async fn save_edit(&mut self, input: ActionInput) -> Result<()> {
        let id = input.require_note()?;
        if let Some(text) = &input.value {
            self.my_notes.set_draft(id, text)?;
        }
        let text = self.my_notes.draft(id)?;
        self.notes.update_text(id, &text).await?;
        self.my_notes.finish_edit(id, &text)?;
        self.surface.render_list(&self.my_notes);
        Ok(())
    }

    async fn delete(&mut self, input: ActionInput) -> Result<()> {
        let id = input.require_note()?;
        if !self.surface.confirm(DELETE_CONFIRMATION) {
            return Ok(());
        }
        self.notes.delete(id).await?;
        self.reload_my_notes().await
    }

    async fn unlock(&mut self, input: ActionInput) -> Result<()> {
        let id = input.require_note()?;
        let passphrase = match input.value.clone() {
            Some(value) => value,
            None => match self.surface.prompt(UNLOCK_PROMPT) {
                Some(value) => value,
                None => return Ok(()),
            },
        };
        if passphrase.is_empty() {
            return Ok(());
        }

        self.my_notes.verify_unlock(id, &passphrase)?;
        let record = self
            .notes
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        self.surface.alert(&record.text);
        Ok(())
    }

    fn visible_text(&self, id: &NoteId) -> Result<String> {
        let row = self
            .my_notes
            .row(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        match &row.body {
            RowBody::Text(text) => Ok(text.clone()),
            RowBody::Locked => Err(Error::Validation("Unlock the note first".to_string())),
        }
    }

    async fn export_note_pdf(&mut self, input: ActionInput) -> Result<()> {
        let id = input.require_note()?;
        let text = self.visible_text(id)?;
        let path = export_pdf(&text, &note_file_name(id), self.platform.files.as_ref())?;
        self.surface.status(&format!("Saved {}", path.display()));
        Ok(())
    }

    async fn print_note(&mut self, input: ActionInput) -> Result<()> {
        let text = self.visible_text(input.require_note()?)?;
        print_view(&text, self.platform.printer.as_ref())
    }

    async fn share_note(&mut self, input: ActionInput) -> Result<()> {
        let text = self.visible_text(input.require_note()?)?;
        self.share_text(NOTE_SHARE_TITLE, &text).await;
        Ok(())
    }

    fn visible_collection(&self) -> String {
        collect_visible(
            &self.my_notes,
            self.session.current().and_then(|identity| identity.email.as_deref()),
        )
    }

    async fn export_all_pdf(&mut self) -> Result<()> {
        let text = self.visible_collection();
        let file_name = collection_file_name(self.session.current());
        let path = export_pdf(&text, &file_name, self.platform.files.as_ref())?;
        self.surface.status(&format!("Saved {}", path.display()));
        Ok(())
    }

    async fn print_all(&mut self) -> Result<()> {
        print_view(&self.visible_collection(), self.platform.printer.as_ref())
    }

    async fn share_all(&mut self) -> Result<()> {
        let text = self.visible_collection();
        self.share_text(COLLECTION_SHARE_TITLE, &text).await;
        Ok(())
    }

    async fn share_text(&self, title: &str, text: &str) {
        let outcome = share_or_copy(title, text, &self.platform).await;
        debug!(?outcome, "share finished");
        if let Some(message) = outcome.message() {
            self.surface.alert(message);
        }
    }

    async fn admin_search(&mut self, input: ActionInput) -> Result<()> {
        self.admin_search = input.value_or_empty().to_string();
        self.reload_admin_notes().await
    }

    /// Re-fetch every note for the administrator panel.
    pub async fn reload_admin_notes(&mut self) -> Result<()> {
        if self.session.role() != Role::Administrator {
            return Ok(());
        }
        let records = self.notes.list_all(Some(&self.admin_search)).await?;
        self.all_notes.replace(&records);
        self.surface.render_list(&self.all_notes);
        Ok(())
    }

    fn require_admin(&self) -> Result<()> {
        if self.session.role() == Role::Administrator {
            Ok(())
        } else {
            Err(Error::Validation("Administrator access required".to_string()))
        }
    }

    fn require_owner(&self) -> Result<&Identity> {
        match (self.session.role(), self.session.current()) {
            (Role::User, Some(identity)) => Ok(identity),
            _ => Err(Error::Validation("Sign in to write notes".to_string())),
        }
    }

    async fn admin_edit(&mut self, input: ActionInput) -> Result<()> {
        self.require_admin()?;
        self.all_notes.begin_edit(input.require_note()?)?;
        self.surface.render_list(&self.all_notes);
        Ok(())
    }

    async fn admin_save(&mut self, input: ActionInput) -> Result<()> {
        self.require_admin()?;
        let id = input.require_note()?;
        if let Some(text) = &input.value {
            self.all_notes.set_draft(id, text)?;
        }
        let text = self.all_notes.draft(id)?;
        self.notes.update_text(id, &text).await?;
        self.all_notes.finish_edit(id, &text)?;
        self.surface.render_list(&self.all_notes);
        Ok(())
    }

    async fn admin_delete(&mut self, input: ActionInput) -> Result<()> {
        self.require_admin()?;
        let id = input.require_note()?;
        if !self.surface.confirm(DELETE_CONFIRMATION) {
            return Ok(());
        }
        self.notes.delete(id).await?;
        self.reload_admin_notes().await
    }

    async fn insert_emoji(&mut self, input: ActionInput) -> Result<()> {
        let emoji = input.value_or_empty();
        if emoji.is_empty() {
            return Err(Error::Validation("No emoji selected".to_string()));
        }
        self.note_form.text.push_str(emoji);
        self.surface.show_note_draft(&self.note_form.text);
        Ok(())
    }
}

/// User-facing message for a failed action. Service failures carry the
/// action's prefix; rejected input is shown as is.
pub fn failure_message(action: Action, error: &Error) -> String {
    if !error.is_service_error() {
        return error.to_string();
    }
    let prefix = match action {
        Action::SignUp => "Signup failed",
        Action::SignIn => "Login failed",
        Action::AdminSignIn => "Admin login failed",
        Action::FederatedSignIn => "Google login failed",
        Action::SignOut => "Logout failed",
        Action::SaveNote => "Error saving",
        Action::Delete | Action::AdminDelete => "Error deleting",
        Action::SaveEdit | Action::AdminSave => "Error updating",
        _ => "Error",
    };
    format!("{prefix}: {error}")
}

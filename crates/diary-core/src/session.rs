//! Session controller: maps identity changes to the visible view.

use crate::models::{Identity, Role};

pub const AVATAR_PLACEHOLDER_URL: &str = "https://via.placeholder.com/80";

/// Top-level region shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Auth,
    Diary,
    Admin,
}

/// Result of one identity-state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionTransition {
    SignedOut,
    User(Identity),
    Administrator(Identity),
}

impl SessionTransition {
    pub const fn view(&self) -> View {
        match self {
            Self::SignedOut => View::Auth,
            Self::User(_) => View::Diary,
            Self::Administrator(_) => View::Admin,
        }
    }

    pub const fn identity(&self) -> Option<&Identity> {
        match self {
            Self::SignedOut => None,
            Self::User(identity) | Self::Administrator(identity) => Some(identity),
        }
    }
}

/// Holds the signed-in identity and classifies it against the configured
/// administrator address.
#[derive(Debug, Clone)]
pub struct SessionController {
    admin_email: String,
    current: Option<Identity>,
}

impl SessionController {
    pub fn new(admin_email: impl Into<String>) -> Self {
        Self {
            admin_email: admin_email.into(),
            current: None,
        }
    }

    pub fn transition(&mut self, identity: Option<Identity>) -> SessionTransition {
        let role = Role::classify(identity.as_ref(), &self.admin_email);
        self.current.clone_from(&identity);
        match (role, identity) {
            (Role::Administrator, Some(identity)) => {
                tracing::info!("Administrator signed in");
                SessionTransition::Administrator(identity)
            }
            (Role::User, Some(identity)) => {
                tracing::debug!("User {} signed in", identity.id);
                SessionTransition::User(identity)
            }
            _ => {
                tracing::debug!("Signed out");
                SessionTransition::SignedOut
            }
        }
    }

    pub const fn current(&self) -> Option<&Identity> {
        self.current.as_ref()
    }

    pub fn role(&self) -> Role {
        Role::classify(self.current.as_ref(), &self.admin_email)
    }

    pub fn admin_email(&self) -> &str {
        &self.admin_email
    }

    /// Exact comparison with the administrator address.
    pub fn is_admin_email(&self, email: &str) -> bool {
        !self.admin_email.is_empty() && email == self.admin_email
    }
}

/// Values shown in the profile header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileCard {
    pub avatar_url: String,
    pub name: String,
    pub email: String,
}

impl ProfileCard {
    pub fn for_identity(identity: &Identity) -> Self {
        Self {
            avatar_url: identity
                .avatar_url
                .clone()
                .unwrap_or_else(|| AVATAR_PLACEHOLDER_URL.to_string()),
            name: identity
                .display_name
                .clone()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| "No Name".to_string()),
            email: identity
                .email
                .clone()
                .filter(|email| !email.is_empty())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADMIN: &str = "admin@example.com";

    #[test]
    fn sign_out_shows_auth_view_and_clears_identity() {
        let mut session = SessionController::new(ADMIN);
        session.transition(Some(Identity::new("u1", "a@example.com")));
        let transition = session.transition(None);

        assert_eq!(transition, SessionTransition::SignedOut);
        assert_eq!(transition.view(), View::Auth);
        assert!(session.current().is_none());
    }

    #[test]
    fn admin_email_selects_admin_view() {
        let mut session = SessionController::new(ADMIN);
        let transition = session.transition(Some(Identity::new("boss", ADMIN)));

        assert_eq!(transition.view(), View::Admin);
        assert_eq!(session.role(), Role::Administrator);
    }

    #[test]
    fn near_miss_emails_never_get_admin_view() {
        let mut session = SessionController::new(ADMIN);
        for email in ["ADMIN@example.com", " admin@example.com", "admin@example.com ", "admin@example.co"] {
            let transition = session.transition(Some(Identity::new("x", email)));
            assert_eq!(transition.view(), View::Diary, "{email:?}");
            assert_eq!(session.role(), Role::User);
        }
    }

    #[test]
    fn unconfigured_admin_email_grants_nothing() {
        let mut session = SessionController::new("");
        let transition = session.transition(Some(Identity::new("x", "")));
        assert_eq!(transition.view(), View::Diary);
        assert!(!session.is_admin_email(""));
    }

    #[test]
    fn profile_card_fallbacks() {
        let mut identity = Identity::new("u1", "");
        identity.email = None;
        let card = ProfileCard::for_identity(&identity);
        assert_eq!(card.avatar_url, AVATAR_PLACEHOLDER_URL);
        assert_eq!(card.name, "No Name");
        assert_eq!(card.email, "-");

        let identity = Identity::new("u1", "a@example.com")
            .with_display_name("Alice")
            .with_avatar_url("https://example.com/a.png");
        let card = ProfileCard::for_identity(&identity);
        assert_eq!(card.name, "Alice");
        assert_eq!(card.avatar_url, "https://example.com/a.png");
        assert_eq!(card.email, "a@example.com");
    }
}

//! Identity and role classification

use serde::{Deserialize, Serialize};

/// An authenticated principal issued by the identity provider.
///
/// Read-only to this crate: every field comes from the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Provider-assigned unique id
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl Identity {
    #[must_use]
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: Some(email.into()),
            display_name: None,
            avatar_url: None,
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_avatar_url(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }

    /// Email or empty string, for fields that must always carry a value.
    pub fn email_or_empty(&self) -> &str {
        self.email.as_deref().unwrap_or("")
    }

    /// Part of the email before `@`, used for export file names.
    pub fn email_local_part(&self) -> Option<&str> {
        let email = self.email.as_deref()?;
        let local = email.split('@').next().unwrap_or(email);
        if local.is_empty() {
            None
        } else {
            Some(local)
        }
    }
}

/// Which view a viewer is entitled to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Anonymous,
    User,
    Administrator,
}

impl Role {
    /// Classify an identity against the configured administrator address.
    ///
    /// The comparison is exact: no trimming and no case folding. This is a
    /// client-side check on a client-visible field and grants no server-side
    /// privilege.
    pub fn classify(identity: Option<&Identity>, admin_email: &str) -> Self {
        match identity {
            None => Self::Anonymous,
            Some(identity) if !admin_email.is_empty() && identity.email.as_deref() == Some(admin_email) => {
                Self::Administrator
            }
            Some(_) => Self::User,
        }
    }
}

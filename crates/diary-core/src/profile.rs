//! Profile bootstrapper: makes sure every identity has a profile record.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::backend::{Document, DocumentStore, DocumentWrite};
use crate::error::{Error, Result};
use crate::models::{Identity, Profile};

pub const USERS_COLLECTION: &str = "users";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileOutcome {
    Created,
    Existing,
}

#[derive(Debug, Deserialize)]
struct ProfileFields {
    #[serde(default)]
    email: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

pub struct ProfileBootstrapper<S> {
    store: Arc<S>,
}

impl<S> Clone for ProfileBootstrapper<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: DocumentStore> ProfileBootstrapper<S> {
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create the profile for `identity` if it does not exist yet.
    ///
    /// Safe to call on every sign-in.
    pub async fn ensure(&self, identity: &Identity) -> Result<ProfileOutcome> {
        if self.store.get(USERS_COLLECTION, &identity.id).await?.is_some() {
            return Ok(ProfileOutcome::Existing);
        }

        let name = identity.display_name.clone().unwrap_or_default();
        self.write(identity, &name).await?;
        tracing::info!("Created profile for {}", identity.id);
        Ok(ProfileOutcome::Created)
    }

    /// Write the profile unconditionally, used right after sign-up where the
    /// entered name is authoritative.
    pub async fn write(&self, identity: &Identity, name: &str) -> Result<()> {
        let write = DocumentWrite::new()
            .field("email", identity.email_or_empty())
            .field("name", name)
            .server_timestamp("created_at");
        self.store.set(USERS_COLLECTION, &identity.id, write).await?;
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<Profile>> {
        self.store
            .get(USERS_COLLECTION, id)
            .await?
            .map(parse_profile)
            .transpose()
    }
}

fn parse_profile(document: Document) -> Result<Profile> {
    let fields: ProfileFields = serde_json::from_value(document.fields.into())
        .map_err(|error| Error::Malformed(format!("profile {}: {error}", document.id)))?;
    Ok(Profile {
        id: document.id,
        email: fields.email,
        name: fields.name,
        created_at: fields.created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryDocumentStore;
    use crate::backend::StoreError;

    fn bootstrapper() -> (MemoryDocumentStore, ProfileBootstrapper<MemoryDocumentStore>) {
        let store = MemoryDocumentStore::new();
        (store.clone(), ProfileBootstrapper::new(Arc::new(store)))
    }

    #[tokio::test]
    async fn ensure_creates_profile_once() {
        let (store, profiles) = bootstrapper();
        let identity = Identity::new("u1", "a@example.com").with_display_name("Alice");

        assert_eq!(profiles.ensure(&identity).await.unwrap(), ProfileOutcome::Created);
        assert_eq!(profiles.ensure(&identity).await.unwrap(), ProfileOutcome::Existing);
        assert_eq!(store.len(USERS_COLLECTION), 1);

        let profile = profiles.get("u1").await.unwrap().unwrap();
        assert_eq!(profile.email, "a@example.com");
        assert_eq!(profile.name, "Alice");
        assert!(profile.created_at.is_some());
    }

    #[tokio::test]
    async fn ensure_uses_empty_name_without_display_name() {
        let (_, profiles) = bootstrapper();
        profiles.ensure(&Identity::new("u1", "a@example.com")).await.unwrap();
        assert_eq!(profiles.get("u1").await.unwrap().unwrap().name, "");
    }

    #[tokio::test]
    async fn ensure_keeps_existing_profile_untouched() {
        let (_, profiles) = bootstrapper();
        let identity = Identity::new("u1", "a@example.com");
        profiles.write(&identity, "Chosen Name").await.unwrap();

        profiles
            .ensure(&identity.clone().with_display_name("Other"))
            .await
            .unwrap();
        assert_eq!(profiles.get("u1").await.unwrap().unwrap().name, "Chosen Name");
    }

    #[tokio::test]
    async fn ensure_surfaces_store_failures() {
        let (store, profiles) = bootstrapper();
        store.set_failure(Some(StoreError::ServiceUnavailable("offline".to_string())));
        let error = profiles
            .ensure(&Identity::new("u1", "a@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(error, Error::ServiceUnavailable(_)));
    }
}

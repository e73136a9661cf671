//! Service boundary: identity provider and document store.
//!
//! Persistence, authentication and session tracking are delegated to a hosted
//! backend. Everything above this module talks to these two traits only, so
//! the hosted service can be swapped for the in-memory adapters in tests.

pub mod memory;
pub mod supabase;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;

use crate::models::Identity;

/// Field map of a stored document.
pub type Fields = serde_json::Map<String, Value>;

/// A stored document: store-assigned id plus its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

/// Fields to write, plus the names of fields the store must stamp with its
/// own clock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentWrite {
    pub fields: Fields,
    pub server_timestamps: Vec<String>,
}

impl DocumentWrite {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn server_timestamp(mut self, name: &str) -> Self {
        self.server_timestamps.push(name.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

/// Equality filters and an optional ordering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<(String, Value)>,
    pub order_by: Option<OrderBy>,
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push((field.to_string(), value.into()));
        self
    }

    #[must_use]
    pub fn order_by_desc(mut self, field: &str) -> Self {
        self.order_by = Some(OrderBy {
            field: field.to_string(),
            descending: true,
        });
        self
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0}")]
    ServiceUnavailable(String),
    #[error("{0}")]
    PermissionDenied(String),
    #[error("{0}")]
    Malformed(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Document store consumed by the repository and profile bootstrapper.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create(&self, collection: &str, write: DocumentWrite) -> StoreResult<String>;

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Create or replace the document at `id`.
    async fn set(&self, collection: &str, id: &str, write: DocumentWrite) -> StoreResult<()>;

    /// Overwrite the given fields only. Missing documents are left alone.
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()>;

    /// Remove a document. Removing a missing document is not an error.
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;

    async fn query(&self, collection: &str, query: Query) -> StoreResult<Vec<Document>>;
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("The email address is already in use.")]
    EmailInUse,
    #[error("Password is too weak: {0}")]
    WeakPassword(String),
    #[error("Invalid email or password.")]
    InvalidCredential,
    #[error("Sign-in was cancelled before it completed.")]
    PopupClosed,
    #[error("Auth is not configured for this build.")]
    NotConfigured,
    #[error("Invalid auth configuration: {0}")]
    InvalidConfiguration(&'static str),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Auth API error: {0}")]
    Api(String),
    #[error("Secure storage error: {0}")]
    SecureStorage(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Identity provider consumed by the application controller.
///
/// Implementations publish every sign-in and sign-out on the channel returned
/// by [`IdentityProvider::subscribe`].
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register a new account and sign it in.
    async fn sign_up(&self, email: &str, password: &str, display_name: &str)
        -> AuthResult<Identity>;

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<Identity>;

    /// Sign in through an external provider (e.g. Google).
    async fn federated_sign_in(&self) -> AuthResult<Identity>;

    async fn sign_out(&self) -> AuthResult<()>;

    fn current(&self) -> Option<Identity>;

    fn subscribe(&self) -> watch::Receiver<Option<Identity>>;
}

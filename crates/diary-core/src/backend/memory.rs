//! In-memory backend adapters.
//!
//! Test fakes for the service boundary. Both adapters are cheap to clone and
//! share their state between clones.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::Value;
use tokio::sync::watch;
use uuid::Uuid;

use super::{
    AuthError, AuthResult, Document, DocumentStore, DocumentWrite, Fields, IdentityProvider,
    Query, StoreError, StoreResult,
};
use crate::models::Identity;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Default)]
struct StoreState {
    collections: HashMap<String, BTreeMap<String, Fields>>,
    ticks: i64,
    failure: Option<StoreError>,
    collection_failures: HashMap<String, StoreError>,
}

/// Document store kept in process memory.
///
/// Server timestamps come from a clock that advances one millisecond per
/// stamp, so documents written in sequence always order by write order.
#[derive(Debug, Clone)]
pub struct MemoryDocumentStore {
    state: Arc<Mutex<StoreState>>,
    epoch: DateTime<Utc>,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::with_epoch(Utc::now())
    }

    /// Start the server clock at a fixed instant.
    pub fn with_epoch(epoch: DateTime<Utc>) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState::default())),
            epoch,
        }
    }

    /// Make every following call fail with `error` until cleared.
    pub fn set_failure(&self, error: Option<StoreError>) {
        self.lock().failure = error;
    }

    /// Make calls against one collection fail with `error` until cleared.
    pub fn set_failure_for(&self, collection: &str, error: Option<StoreError>) {
        let mut state = self.lock();
        match error {
            Some(error) => {
                state.collection_failures.insert(collection.to_string(), error);
            }
            None => {
                state.collection_failures.remove(collection);
            }
        }
    }

    pub fn len(&self, collection: &str) -> usize {
        self.lock()
            .collections
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Raw fields of a stored document, bypassing failure injection.
    pub fn peek(&self, collection: &str, id: &str) -> Option<Fields> {
        self.lock()
            .collections
            .get(collection)
            .and_then(|documents| documents.get(id))
            .cloned()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn checked(&self, collection: &str) -> StoreResult<MutexGuard<'_, StoreState>> {
        let guard = self.lock();
        if let Some(error) = guard
            .failure
            .as_ref()
            .or_else(|| guard.collection_failures.get(collection))
        {
            return Err(error.clone());
        }
        Ok(guard)
    }

    fn apply_write(&self, state: &mut StoreState, write: DocumentWrite) -> Fields {
        let mut fields = write.fields;
        for name in write.server_timestamps {
            state.ticks += 1;
            let stamp = self.epoch + Duration::milliseconds(state.ticks);
            fields.insert(
                name,
                Value::String(stamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
            );
        }
        fields
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create(&self, collection: &str, write: DocumentWrite) -> StoreResult<String> {
        let mut state = self.checked(collection)?;
        let id = Uuid::now_v7().simple().to_string();
        let fields = self.apply_write(&mut state, write);
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), fields);
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let state = self.checked(collection)?;
        Ok(state
            .collections
            .get(collection)
            .and_then(|documents| documents.get(id))
            .map(|fields| Document {
                id: id.to_string(),
                fields: fields.clone(),
            }))
    }

    async fn set(&self, collection: &str, id: &str, write: DocumentWrite) -> StoreResult<()> {
        let mut state = self.checked(collection)?;
        let fields = self.apply_write(&mut state, write);
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()> {
        let mut state = self.checked(collection)?;
        if let Some(existing) = state
            .collections
            .get_mut(collection)
            .and_then(|documents| documents.get_mut(id))
        {
            existing.extend(fields);
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let mut state = self.checked(collection)?;
        if let Some(documents) = state.collections.get_mut(collection) {
            documents.remove(id);
        }
        Ok(())
    }

    async fn query(&self, collection: &str, query: Query) -> StoreResult<Vec<Document>> {
        let state = self.checked(collection)?;
        let Some(documents) = state.collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut matches = documents
            .iter()
            .filter(|(_, fields)| {
                query
                    .filters
                    .iter()
                    .all(|(name, value)| fields.get(name) == Some(value))
            })
            .map(|(id, fields)| Document {
                id: id.clone(),
                fields: fields.clone(),
            })
            .collect::<Vec<_>>();

        if let Some(order) = &query.order_by {
            matches.sort_by(|left, right| {
                let ordering = compare_values(
                    left.fields.get(&order.field),
                    right.fields.get(&order.field),
                );
                if order.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        Ok(matches)
    }
}

fn compare_values(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    match (left, right) {
        (Some(Value::String(left)), Some(Value::String(right))) => left.cmp(right),
        (Some(Value::Number(left)), Some(Value::Number(right))) => left
            .as_f64()
            .partial_cmp(&right.as_f64())
            .unwrap_or(Ordering::Equal),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), Some(_)) => Ordering::Less,
        (Some(_), None | Some(Value::Null)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[derive(Debug, Clone)]
struct Account {
    identity: Identity,
    password: String,
}

#[derive(Debug, Default)]
struct ProviderState {
    accounts: HashMap<String, Account>,
    federated: Option<Identity>,
}

/// Identity provider kept in process memory.
#[derive(Debug, Clone)]
pub struct MemoryIdentityProvider {
    state: Arc<Mutex<ProviderState>>,
    current: Arc<watch::Sender<Option<Identity>>>,
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            state: Arc::new(Mutex::new(ProviderState::default())),
            current: Arc::new(sender),
        }
    }

    /// Identity returned by the next federated sign-in. Without one, the
    /// federated flow behaves as if the user closed the popup.
    #[must_use]
    pub fn with_federated_identity(self, identity: Identity) -> Self {
        self.lock().federated = Some(identity);
        self
    }

    /// Register an account without signing it in.
    pub fn register(&self, identity: Identity, password: &str) {
        let email = identity.email_or_empty().to_string();
        self.lock().accounts.insert(
            email,
            Account {
                identity,
                password: password.to_string(),
            },
        );
    }

    fn lock(&self) -> MutexGuard<'_, ProviderState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn publish(&self, identity: Option<Identity>) {
        self.current.send_replace(identity);
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> AuthResult<Identity> {
        if !email.contains('@') {
            return Err(AuthError::Api("Invalid email address".to_string()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword(format!(
                "Password should be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let identity = {
            let mut state = self.lock();
            if state.accounts.contains_key(email) {
                return Err(AuthError::EmailInUse);
            }
            let mut identity = Identity::new(Uuid::new_v4().simple().to_string(), email);
            if !display_name.trim().is_empty() {
                identity.display_name = Some(display_name.trim().to_string());
            }
            state.accounts.insert(
                email.to_string(),
                Account {
                    identity: identity.clone(),
                    password: password.to_string(),
                },
            );
            identity
        };

        self.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<Identity> {
        let identity = {
            let state = self.lock();
            match state.accounts.get(email) {
                Some(account) if account.password == password => account.identity.clone(),
                _ => return Err(AuthError::InvalidCredential),
            }
        };
        self.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn federated_sign_in(&self) -> AuthResult<Identity> {
        let identity = self.lock().federated.clone().ok_or(AuthError::PopupClosed)?;
        self.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> AuthResult<()> {
        self.publish(None);
        Ok(())
    }

    fn current(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.current.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn create_then_get_round_trips_fields() {
        let store = MemoryDocumentStore::new();
        let id = store
            .create("notes", DocumentWrite::new().field("text", "hi"))
            .await
            .unwrap();

        let document = store.get("notes", &id).await.unwrap().unwrap();
        assert_eq!(document.fields.get("text"), Some(&json!("hi")));
    }

    #[tokio::test]
    async fn server_timestamps_increase_monotonically() {
        let store = MemoryDocumentStore::new();
        let first = store
            .create("notes", DocumentWrite::new().server_timestamp("created_at"))
            .await
            .unwrap();
        let second = store
            .create("notes", DocumentWrite::new().server_timestamp("created_at"))
            .await
            .unwrap();

        let first = store.peek("notes", &first).unwrap();
        let second = store.peek("notes", &second).unwrap();
        assert!(first["created_at"].as_str().unwrap() < second["created_at"].as_str().unwrap());
    }

    #[tokio::test]
    async fn query_filters_and_orders() {
        let store = MemoryDocumentStore::new();
        for (owner, text) in [("a", "one"), ("b", "two"), ("a", "three")] {
            store
                .create(
                    "notes",
                    DocumentWrite::new()
                        .field("owner_id", owner)
                        .field("text", text)
                        .server_timestamp("created_at"),
                )
                .await
                .unwrap();
        }

        let documents = store
            .query(
                "notes",
                Query::new()
                    .where_eq("owner_id", "a")
                    .order_by_desc("created_at"),
            )
            .await
            .unwrap();
        let texts = documents
            .iter()
            .map(|document| document.fields["text"].as_str().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(texts, vec!["three", "one"]);
    }

    #[tokio::test]
    async fn update_of_missing_document_is_a_no_op() {
        let store = MemoryDocumentStore::new();
        let mut fields = Fields::new();
        fields.insert("text".to_string(), json!("x"));
        store.update("notes", "missing", fields).await.unwrap();
        assert!(store.is_empty("notes"));
    }

    #[tokio::test]
    async fn injected_failure_is_returned() {
        let store = MemoryDocumentStore::new();
        store.set_failure(Some(StoreError::ServiceUnavailable("offline".to_string())));
        let error = store.get("notes", "x").await.unwrap_err();
        assert_eq!(error, StoreError::ServiceUnavailable("offline".to_string()));
    }

    #[tokio::test]
    async fn collection_failure_spares_other_collections() {
        let store = MemoryDocumentStore::new();
        store.set_failure_for("users", Some(StoreError::PermissionDenied("no".to_string())));

        assert!(store.get("users", "u1").await.is_err());
        assert!(store.get("notes", "n1").await.unwrap().is_none());

        store.set_failure_for("users", None);
        assert!(store.get("users", "u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sign_up_publishes_identity() {
        let provider = MemoryIdentityProvider::new();
        let receiver = provider.subscribe();

        let identity = provider
            .sign_up("a@example.com", "password", "Alice")
            .await
            .unwrap();

        assert_eq!(receiver.borrow().as_ref(), Some(&identity));
        assert_eq!(identity.display_name.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn sign_up_rejects_duplicates_and_weak_passwords() {
        let provider = MemoryIdentityProvider::new();
        provider
            .sign_up("a@example.com", "password", "")
            .await
            .unwrap();

        assert!(matches!(
            provider.sign_up("a@example.com", "password", "").await,
            Err(AuthError::EmailInUse)
        ));
        assert!(matches!(
            provider.sign_up("b@example.com", "123", "").await,
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[tokio::test]
    async fn sign_in_checks_password() {
        let provider = MemoryIdentityProvider::new();
        provider.register(Identity::new("u1", "a@example.com"), "password");

        assert!(matches!(
            provider.sign_in("a@example.com", "nope").await,
            Err(AuthError::InvalidCredential)
        ));
        let identity = provider.sign_in("a@example.com", "password").await.unwrap();
        assert_eq!(identity.id, "u1");
        assert_eq!(provider.current(), Some(identity));

        provider.sign_out().await.unwrap();
        assert_eq!(provider.current(), None);
    }

    #[tokio::test]
    async fn federated_sign_in_without_identity_is_popup_closed() {
        let provider = MemoryIdentityProvider::new();
        assert!(matches!(
            provider.federated_sign_in().await,
            Err(AuthError::PopupClosed)
        ));
    }
}

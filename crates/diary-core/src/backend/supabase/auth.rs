//! Supabase (GoTrue) identity provider.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use url::Url;
use uuid::Uuid;

use crate::backend::{AuthError, AuthResult, IdentityProvider};
use crate::models::Identity;
use crate::util::{service_endpoint, unix_timestamp_now};

const EXPIRY_SKEW_SECONDS: i64 = 60;
const DEFAULT_FEDERATED_PROVIDER: &str = "google";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl From<AuthUser> for Identity {
    fn from(value: AuthUser) -> Self {
        Self {
            id: value.id,
            email: value.email,
            display_name: value.display_name,
            avatar_url: value.avatar_url,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub user: AuthUser,
}

impl AuthSession {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= unix_timestamp_now() + EXPIRY_SKEW_SECONDS
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// Where the signed-in session survives between runs.
pub trait SessionPersistence: Send + Sync + 'static {
    fn load_session(&self) -> AuthResult<Option<AuthSession>>;
    fn save_session(&self, session: &AuthSession) -> AuthResult<()>;
    fn clear_session(&self) -> AuthResult<()>;
}

/// Completes the browser leg of a federated sign-in.
///
/// Receives the authorize URL to open and returns the code the provider
/// redirected back with, or `None` if the user gave up.
#[async_trait]
pub trait AuthCodeReceiver: Send + Sync {
    async fn receive_code(&self, authorize_url: &str) -> Option<String>;
}

/// Source of the bearer token used for data requests.
pub trait AccessTokenSource: Send + Sync {
    fn access_token(&self) -> Option<String>;
}

pub struct SupabaseIdentityProvider {
    auth_url: String,
    anon_key: String,
    client: Client,
    store: Box<dyn SessionPersistence>,
    code_receiver: Option<Arc<dyn AuthCodeReceiver>>,
    federated_provider: String,
    session: Mutex<Option<AuthSession>>,
    current: watch::Sender<Option<Identity>>,
}

impl SupabaseIdentityProvider {
    pub fn new(
        url: impl AsRef<str>,
        anon_key: impl Into<String>,
        store: impl SessionPersistence,
    ) -> AuthResult<Self> {
        let auth_url = normalize_auth_url(url.as_ref())?;
        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Supabase anon key must not be empty",
            ));
        }

        let (current, _) = watch::channel(None);
        Ok(Self {
            auth_url,
            anon_key,
            client: Client::builder().build()?,
            store: Box::new(store),
            code_receiver: None,
            federated_provider: DEFAULT_FEDERATED_PROVIDER.to_string(),
            session: Mutex::new(None),
            current,
        })
    }

    #[must_use]
    pub fn with_code_receiver(mut self, receiver: Arc<dyn AuthCodeReceiver>) -> Self {
        self.code_receiver = Some(receiver);
        self
    }

    #[must_use]
    pub fn with_federated_provider(mut self, provider: impl Into<String>) -> Self {
        self.federated_provider = provider.into();
        self
    }

    /// Load the persisted session, refreshing it when expired, and publish
    /// the resulting identity.
    pub async fn restore_session(&self) -> AuthResult<Option<Identity>> {
        let Some(stored_session) = self.store.load_session()? else {
            return Ok(None);
        };

        let session = if stored_session.is_expired() {
            match self.refresh_session(&stored_session.refresh_token).await {
                Ok(refreshed) => refreshed,
                Err(error) => {
                    tracing::warn!("Failed to refresh persisted session: {}", error);
                    self.store.clear_session()?;
                    return Ok(None);
                }
            }
        } else {
            stored_session
        };

        Ok(Some(self.activate(session)?))
    }

    async fn refresh_session(&self, refresh_token: &str) -> AuthResult<AuthSession> {
        if refresh_token.trim().is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Refresh token must not be empty",
            ));
        }

        let payload = serde_json::json!({ "refresh_token": refresh_token });
        let request = self.public_request(
            self.client
                .post(format!("{}/token", self.auth_url))
                .query(&[("grant_type", "refresh_token")])
                .json(&payload),
        );
        self.send_auth_request(request)
            .await?
            .into_session()?
            .ok_or_else(|| {
                AuthError::Api("Refresh response did not include an active session".to_string())
            })
    }

    /// URL the user opens to start a federated sign-in.
    pub fn authorize_url(&self, code_challenge: &str) -> AuthResult<String> {
        let url = Url::parse_with_params(
            &format!("{}/authorize", self.auth_url),
            &[
                ("provider", self.federated_provider.as_str()),
                ("code_challenge", code_challenge),
                ("code_challenge_method", "plain"),
            ],
        )
        .map_err(|_| AuthError::InvalidConfiguration("Supabase URL is not a valid URL"))?;
        Ok(url.into())
    }

    async fn exchange_code(&self, auth_code: &str, code_verifier: &str) -> AuthResult<AuthSession> {
        let payload = serde_json::json!({
            "auth_code": auth_code,
            "code_verifier": code_verifier,
        });
        let request = self.public_request(
            self.client
                .post(format!("{}/token", self.auth_url))
                .query(&[("grant_type", "pkce")])
                .json(&payload),
        );
        self.send_auth_request(request)
            .await?
            .into_session()?
            .ok_or_else(|| {
                AuthError::Api("Code exchange did not include an active session".to_string())
            })
    }

    fn activate(&self, session: AuthSession) -> AuthResult<Identity> {
        self.store.save_session(&session)?;
        let identity = Identity::from(session.user.clone());
        *self.session_guard() = Some(session);
        self.current.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    fn session_guard(&self) -> MutexGuard<'_, Option<AuthSession>> {
        self.session
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn public_request(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
    }

    async fn send_auth_request(&self, request: RequestBuilder) -> AuthResult<SupabaseAuthResponse> {
        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_api_error(status, &body));
        }
        Ok(response.json::<SupabaseAuthResponse>().await?)
    }
}

impl fmt::Debug for SupabaseIdentityProvider {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SupabaseIdentityProvider")
            .field("auth_url", &self.auth_url)
            .field("federated_provider", &self.federated_provider)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentityProvider {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> AuthResult<Identity> {
        validate_credentials(email, password)?;

        let payload = serde_json::json!({
            "email": email,
            "password": password,
            "data": { "name": display_name },
        });
        let request = self.public_request(
            self.client
                .post(format!("{}/signup", self.auth_url))
                .json(&payload),
        );
        let response = self.send_auth_request(request).await?;
        match response.into_session()? {
            Some(session) => self.activate(session),
            None => Err(AuthError::Api(
                "Check your inbox to confirm the account, then sign in.".to_string(),
            )),
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<Identity> {
        validate_credentials(email, password)?;

        let payload = serde_json::json!({
            "email": email,
            "password": password,
        });
        let request = self.public_request(
            self.client
                .post(format!("{}/token", self.auth_url))
                .query(&[("grant_type", "password")])
                .json(&payload),
        );
        let session = self
            .send_auth_request(request)
            .await?
            .into_session()?
            .ok_or_else(|| {
                AuthError::Api("Sign-in response did not include an active session".to_string())
            })?;
        self.activate(session)
    }

    async fn federated_sign_in(&self) -> AuthResult<Identity> {
        let receiver = self.code_receiver.clone().ok_or(AuthError::NotConfigured)?;
        let verifier = format!(
            "{}{}",
            Uuid::new_v4().simple(),
            Uuid::new_v4().simple()
        );
        let url = self.authorize_url(&verifier)?;

        let code = receiver
            .receive_code(&url)
            .await
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty())
            .ok_or(AuthError::PopupClosed)?;

        let session = self.exchange_code(&code, &verifier).await?;
        self.activate(session)
    }

    async fn sign_out(&self) -> AuthResult<()> {
        let session = self.session_guard().take();
        if let Some(session) = session {
            let response = self
                .client
                .post(format!("{}/logout", self.auth_url))
                .header("apikey", &self.anon_key)
                .bearer_auth(&session.access_token)
                .send()
                .await;
            match response {
                Ok(response)
                    if !(response.status().is_success()
                        || response.status() == StatusCode::UNAUTHORIZED) =>
                {
                    tracing::warn!("Remote logout returned HTTP {}", response.status());
                }
                Err(error) => tracing::warn!("Remote logout failed: {}", error),
                Ok(_) => {}
            }
        }

        self.store.clear_session()?;
        self.current.send_replace(None);
        Ok(())
    }

    fn current(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.current.subscribe()
    }
}

impl AccessTokenSource for SupabaseIdentityProvider {
    fn access_token(&self) -> Option<String> {
        self.session_guard()
            .as_ref()
            .map(|session| session.access_token.clone())
    }
}

pub fn normalize_auth_url(url: &str) -> AuthResult<String> {
    if url.trim().is_empty() {
        return Err(AuthError::InvalidConfiguration(
            "Supabase URL must not be empty",
        ));
    }
    service_endpoint(url, "/auth/v1").ok_or(AuthError::InvalidConfiguration(
        "Supabase URL must include http:// or https://",
    ))
}

fn validate_credentials(email: &str, password: &str) -> AuthResult<()> {
    if email.trim().is_empty() {
        return Err(AuthError::Api("Email is required".to_string()));
    }
    if password.trim().is_empty() {
        return Err(AuthError::Api("Password is required".to_string()));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct SupabaseAuthResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<SupabaseUser>,
    session: Option<SupabaseAuthResponseSession>,
}

impl SupabaseAuthResponse {
    fn into_session(self) -> AuthResult<Option<AuthSession>> {
        let nested_session = self.session;
        let access_token = self.access_token.or_else(|| {
            nested_session
                .as_ref()
                .and_then(|session| session.access_token.clone())
        });
        let refresh_token = self.refresh_token.or_else(|| {
            nested_session
                .as_ref()
                .and_then(|session| session.refresh_token.clone())
        });
        let expires_at = self
            .expires_at
            .or_else(|| {
                nested_session
                    .as_ref()
                    .and_then(|session| session.expires_at)
            })
            .or_else(|| {
                self.expires_in
                    .or_else(|| {
                        nested_session
                            .as_ref()
                            .and_then(|session| session.expires_in)
                    })
                    .map(|expires_in| unix_timestamp_now().saturating_add(expires_in))
            });
        let user = self
            .user
            .or_else(|| nested_session.and_then(|session| session.user))
            .map(Into::into);

        match (access_token, refresh_token, expires_at, user) {
            (Some(access_token), Some(refresh_token), Some(expires_at), Some(user)) => {
                Ok(Some(AuthSession {
                    access_token,
                    refresh_token,
                    expires_at,
                    user,
                }))
            }
            (None, None, None, Some(_)) => Ok(None),
            _ => Err(AuthError::Api(
                "Auth response did not include enough session fields".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SupabaseAuthResponseSession {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<SupabaseUser>,
}

#[derive(Debug, Deserialize)]
struct SupabaseUser {
    id: String,
    email: Option<String>,
    #[serde(default)]
    user_metadata: Option<SupabaseUserMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct SupabaseUserMetadata {
    name: Option<String>,
    full_name: Option<String>,
    avatar_url: Option<String>,
    picture: Option<String>,
}

impl From<SupabaseUser> for AuthUser {
    fn from(value: SupabaseUser) -> Self {
        let metadata = value.user_metadata.unwrap_or_default();
        Self {
            id: value.id,
            email: value.email,
            display_name: metadata
                .name
                .or(metadata.full_name)
                .filter(|name| !name.trim().is_empty()),
            avatar_url: metadata.avatar_url.or(metadata.picture),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SupabaseErrorResponse {
    error: Option<String>,
    error_code: Option<String>,
    error_description: Option<String>,
    message: Option<String>,
    msg: Option<String>,
}

fn classify_api_error(status: StatusCode, body: &str) -> AuthError {
    if let Ok(payload) = serde_json::from_str::<SupabaseErrorResponse>(body) {
        match payload.error_code.as_deref() {
            Some("user_already_exists" | "email_exists") => return AuthError::EmailInUse,
            Some("invalid_credentials") => return AuthError::InvalidCredential,
            Some("weak_password") => {
                let message = payload
                    .msg
                    .or(payload.message)
                    .unwrap_or_else(|| "weak password".to_string());
                return AuthError::WeakPassword(message);
            }
            _ => {}
        }
        if payload.error.as_deref() == Some("invalid_grant") {
            return AuthError::InvalidCredential;
        }
        if let Some(message) = payload
            .message
            .or(payload.msg)
            .or(payload.error_description)
            .or(payload.error)
        {
            return AuthError::Api(format!("{} ({})", message.trim(), status.as_u16()));
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        AuthError::Api(format!("HTTP {}", status.as_u16()))
    } else {
        AuthError::Api(format!("{} ({})", trimmed, status.as_u16()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct NullStore;

    impl SessionPersistence for NullStore {
        fn load_session(&self) -> AuthResult<Option<AuthSession>> {
            Ok(None)
        }

        fn save_session(&self, _session: &AuthSession) -> AuthResult<()> {
            Ok(())
        }

        fn clear_session(&self) -> AuthResult<()> {
            Ok(())
        }
    }

    fn user(metadata: Option<SupabaseUserMetadata>) -> SupabaseUser {
        SupabaseUser {
            id: "user".to_string(),
            email: Some("user@example.com".to_string()),
            user_metadata: metadata,
        }
    }

    #[test]
    fn normalize_auth_url_appends_auth_path() {
        let normalized = normalize_auth_url("https://demo.supabase.co").unwrap();
        assert_eq!(normalized, "https://demo.supabase.co/auth/v1");
    }

    #[test]
    fn normalize_auth_url_keeps_existing_auth_path() {
        let normalized = normalize_auth_url("https://demo.supabase.co/auth/v1/").unwrap();
        assert_eq!(normalized, "https://demo.supabase.co/auth/v1");
    }

    #[test]
    fn normalize_auth_url_requires_scheme() {
        assert!(normalize_auth_url("demo.supabase.co").is_err());
    }

    #[test]
    fn response_without_session_fields_means_confirmation_required() {
        let response = SupabaseAuthResponse {
            access_token: None,
            refresh_token: None,
            expires_at: None,
            expires_in: None,
            user: Some(user(None)),
            session: None,
        };
        assert!(response.into_session().unwrap().is_none());
    }

    #[test]
    fn user_metadata_supplies_display_name_and_avatar() {
        let auth_user = AuthUser::from(user(Some(SupabaseUserMetadata {
            name: None,
            full_name: Some("Alice Doe".to_string()),
            avatar_url: None,
            picture: Some("https://example.com/a.png".to_string()),
        })));
        assert_eq!(auth_user.display_name.as_deref(), Some("Alice Doe"));
        assert_eq!(
            auth_user.avatar_url.as_deref(),
            Some("https://example.com/a.png")
        );
    }

    #[test]
    fn session_debug_redacts_tokens() {
        let session = AuthSession {
            access_token: "secret-access-token".to_string(),
            refresh_token: "secret-refresh-token".to_string(),
            expires_at: 1_700_000_000,
            user: AuthUser::from(user(None)),
        };
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("secret-access-token"));
        assert!(!rendered.contains("secret-refresh-token"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn api_errors_map_to_typed_variants() {
        assert!(matches!(
            classify_api_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                r#"{"error_code":"user_already_exists","msg":"User already registered"}"#
            ),
            AuthError::EmailInUse
        ));
        assert!(matches!(
            classify_api_error(
                StatusCode::BAD_REQUEST,
                r#"{"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#
            ),
            AuthError::InvalidCredential
        ));
        assert!(matches!(
            classify_api_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                r#"{"error_code":"weak_password","msg":"Password should be at least 6 characters"}"#
            ),
            AuthError::WeakPassword(_)
        ));
        match classify_api_error(StatusCode::INTERNAL_SERVER_ERROR, "") {
            AuthError::Api(message) => assert_eq!(message, "HTTP 500"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn authorize_url_carries_challenge_and_provider() {
        let provider =
            SupabaseIdentityProvider::new("https://demo.supabase.co", "anon", NullStore)
                .unwrap()
                .with_federated_provider("github");
        let url = provider.authorize_url("abc").unwrap();
        assert_eq!(
            url,
            "https://demo.supabase.co/auth/v1/authorize?provider=github&code_challenge=abc&code_challenge_method=plain"
        );
    }

    #[test]
    fn authorize_url_encodes_query_values() {
        let provider =
            SupabaseIdentityProvider::new("https://demo.supabase.co", "anon", NullStore)
                .unwrap()
                .with_federated_provider("my idp&x=1");
        let url = provider.authorize_url("a+b=").unwrap();
        assert_eq!(
            url,
            "https://demo.supabase.co/auth/v1/authorize?provider=my+idp%26x%3D1&code_challenge=a%2Bb%3D&code_challenge_method=plain"
        );
    }

    #[tokio::test]
    async fn federated_sign_in_without_receiver_is_not_configured() {
        let provider =
            SupabaseIdentityProvider::new("https://demo.supabase.co", "anon", NullStore).unwrap();
        assert!(matches!(
            provider.federated_sign_in().await,
            Err(AuthError::NotConfigured)
        ));
    }

    #[test]
    fn empty_anon_key_is_rejected() {
        assert!(matches!(
            SupabaseIdentityProvider::new("https://demo.supabase.co", "  ", NullStore),
            Err(AuthError::InvalidConfiguration(_))
        ));
    }
}

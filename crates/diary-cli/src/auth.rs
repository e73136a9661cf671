//! Supabase session persistence in the OS keychain, and the terminal side of
//! the federated sign-in flow.

#[cfg(test)]
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
#[cfg(test)]
use std::sync::{Mutex, OnceLock};

use async_trait::async_trait;
#[cfg(not(test))]
use keyring::Entry;
use url::Url;

use diary_core::backend::supabase::{
    resolve_optional_supabase_config, AccessTokenSource, AuthCodeReceiver, AuthSession,
    SessionPersistence, SupabaseDocumentStore, SupabaseIdentityProvider,
};
use diary_core::backend::{AuthError, AuthResult};
use diary_core::config::DiaryConfig;

use crate::error::CliError;

#[cfg(not(test))]
const KEYRING_SERVICE_NAME: &str = "diary-cli";

/// Keychain slot holding the session for one Supabase project.
#[derive(Clone)]
pub struct KeyringSessionStore {
    username: String,
}

impl KeyringSessionStore {
    pub fn for_project(supabase_url: &str) -> Self {
        Self {
            username: format!("supabase_session:{}", supabase_url.trim_end_matches('/')),
        }
    }

    #[cfg(test)]
    fn test_store() -> &'static Mutex<HashMap<String, String>> {
        static STORE: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
        STORE.get_or_init(|| Mutex::new(HashMap::new()))
    }

    #[cfg(not(test))]
    fn entry(&self) -> AuthResult<Entry> {
        Entry::new(KEYRING_SERVICE_NAME, &self.username)
            .map_err(|error| AuthError::SecureStorage(error.to_string()))
    }
}

impl SessionPersistence for KeyringSessionStore {
    #[cfg(not(test))]
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        let entry = self.entry()?;
        match entry.get_password() {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(AuthError::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        let guard = Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        guard
            .get(&self.username)
            .map(|raw| serde_json::from_str(raw))
            .transpose()
            .map_err(AuthError::from)
    }

    #[cfg(not(test))]
    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        let raw = serde_json::to_string(session)?;
        self.entry()?
            .set_password(&raw)
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        Ok(())
    }

    #[cfg(test)]
    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        let raw = serde_json::to_string(session)?;
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        guard.insert(self.username.clone(), raw);
        Ok(())
    }

    #[cfg(not(test))]
    fn clear_session(&self) -> AuthResult<()> {
        let entry = self.entry()?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(AuthError::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn clear_session(&self) -> AuthResult<()> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        guard.remove(&self.username);
        Ok(())
    }
}

/// Opens the authorize URL in the browser and reads back the code, or the
/// full redirect URL, from stdin.
pub struct TerminalCodeReceiver;

#[async_trait]
impl AuthCodeReceiver for TerminalCodeReceiver {
    async fn receive_code(&self, authorize_url: &str) -> Option<String> {
        let authorize_url = authorize_url.to_string();
        tokio::task::spawn_blocking(move || {
            match open::that(&authorize_url) {
                Ok(()) => println!(
                    "Continue in your browser. If it did not open, visit:\n\n  {authorize_url}\n"
                ),
                Err(error) => {
                    tracing::warn!("Failed to open browser: {}", error);
                    println!("Open this URL in a browser to continue:\n\n  {authorize_url}\n");
                }
            }
            print!("Paste the redirect URL or code: ");
            io::stdout().flush().ok()?;

            let mut line = String::new();
            io::stdin().lock().read_line(&mut line).ok()?;
            extract_auth_code(&line)
        })
        .await
        .ok()
        .flatten()
    }
}

/// Accepts a bare code or a redirect URL carrying `code=`.
pub fn extract_auth_code(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    let Ok(redirect) = Url::parse(input) else {
        return Some(input.to_string());
    };
    let fragment_pairs = redirect
        .fragment()
        .map(|fragment| url::form_urlencoded::parse(fragment.as_bytes()).into_owned())
        .into_iter()
        .flatten();
    redirect
        .query_pairs()
        .into_owned()
        .chain(fragment_pairs)
        .find(|(key, _)| key == "code")
        .map(|(_, code)| code)
        .filter(|code| !code.is_empty())
}

/// Supabase identity provider and document store sharing one session.
pub struct SupabaseBackend {
    pub identity: Arc<SupabaseIdentityProvider>,
    pub store: Arc<SupabaseDocumentStore>,
}

impl SupabaseBackend {
    pub fn from_config(config: &DiaryConfig) -> Result<Self, CliError> {
        let (url, anon_key) = resolve_optional_supabase_config(
            config.supabase_url.clone(),
            config.supabase_anon_key.clone(),
        )?
        .ok_or(CliError::BackendNotConfigured)?;

        let identity = Arc::new(
            SupabaseIdentityProvider::new(
                &url,
                anon_key.clone(),
                KeyringSessionStore::for_project(&url),
            )?
            .with_code_receiver(Arc::new(TerminalCodeReceiver)),
        );
        let tokens: Arc<dyn AccessTokenSource> = identity.clone();
        let store = Arc::new(SupabaseDocumentStore::new(&url, anon_key, tokens)?);
        Ok(Self { identity, store })
    }

    /// Reactivate the session stored by a previous command, if any.
    pub async fn restore(&self) -> Result<(), CliError> {
        match self.identity.restore_session().await? {
            Some(identity) => tracing::debug!("Restored session for {}", identity.id),
            None => tracing::debug!("No stored session"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use diary_core::backend::supabase::AuthUser;

    use super::*;

    fn session(token: &str) -> AuthSession {
        AuthSession {
            access_token: token.to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: 4_000_000_000,
            user: AuthUser {
                id: "user".to_string(),
                email: Some("a@example.com".to_string()),
                display_name: None,
                avatar_url: None,
            },
        }
    }

    #[test]
    fn session_store_roundtrip() {
        let store = KeyringSessionStore::for_project("https://roundtrip.supabase.co/");
        assert!(store.load_session().unwrap().is_none());

        store.save_session(&session("first")).unwrap();
        assert_eq!(
            store.load_session().unwrap().map(|s| s.access_token),
            Some("first".to_string())
        );

        store.clear_session().unwrap();
        assert!(store.load_session().unwrap().is_none());
    }

    #[test]
    fn sessions_are_scoped_per_project() {
        let one = KeyringSessionStore::for_project("https://one.supabase.co");
        let two = KeyringSessionStore::for_project("https://two.supabase.co");
        one.save_session(&session("one")).unwrap();
        assert!(two.load_session().unwrap().is_none());
        one.clear_session().unwrap();
    }

    #[test]
    fn extract_auth_code_accepts_code_or_redirect() {
        assert_eq!(extract_auth_code(" abc123 \n").as_deref(), Some("abc123"));
        assert_eq!(
            extract_auth_code("http://localhost:3000/?code=xyz&state=1").as_deref(),
            Some("xyz")
        );
        assert_eq!(extract_auth_code("http://localhost:3000/?error=denied"), None);
        assert_eq!(
            extract_auth_code("http://localhost:3000/#code=frag").as_deref(),
            Some("frag")
        );
        assert_eq!(extract_auth_code("   "), None);
    }

    #[test]
    fn backend_requires_configuration() {
        let result = SupabaseBackend::from_config(&DiaryConfig::default());
        assert!(matches!(result, Err(CliError::BackendNotConfigured)));
    }

    #[test]
    fn half_configured_backend_is_an_auth_error() {
        let config = DiaryConfig {
            supabase_url: Some("https://demo.supabase.co".to_string()),
            ..DiaryConfig::default()
        };
        assert!(matches!(
            SupabaseBackend::from_config(&config),
            Err(CliError::Auth(AuthError::NotConfigured))
        ));
    }

    #[test]
    fn extract_auth_code_decodes_percent_escapes() {
        assert_eq!(
            extract_auth_code("http://localhost:3000/?code=a%2Bb%3D&state=1"),
            Some("a+b=".to_string())
        );
    }
}

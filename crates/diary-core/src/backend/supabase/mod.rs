//! Supabase adapters: GoTrue for identity, PostgREST for documents.
//!
//! Expected schema (see `sql/supabase.sql`): a `notes` table with a generated
//! `id` and a `created_at` column defaulting to `now()`, and a `users` table
//! keyed by the identity id.

mod auth;
mod rest;

pub use auth::{
    normalize_auth_url, AccessTokenSource, AuthCodeReceiver, AuthSession, AuthUser,
    SessionPersistence, SupabaseIdentityProvider,
};
pub use rest::{normalize_rest_url, SupabaseDocumentStore};

use crate::backend::{AuthError, AuthResult};
use crate::util::normalize_text_option;

/// Resolve a URL/anon-key pair where both or neither must be present.
pub fn resolve_optional_supabase_config(
    url: Option<String>,
    anon_key: Option<String>,
) -> AuthResult<Option<(String, String)>> {
    let url = normalize_text_option(url);
    let anon_key = normalize_text_option(anon_key);

    match (url, anon_key) {
        (None, None) => Ok(None),
        (Some(url), Some(anon_key)) => Ok(Some((url, anon_key))),
        _ => Err(AuthError::NotConfigured),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_config_requires_both_or_neither() {
        assert!(resolve_optional_supabase_config(None, None).unwrap().is_none());
        assert!(resolve_optional_supabase_config(
            Some("https://demo.supabase.co".to_string()),
            Some("anon".to_string())
        )
        .unwrap()
        .is_some());
        assert!(matches!(
            resolve_optional_supabase_config(Some("https://demo.supabase.co".to_string()), None),
            Err(AuthError::NotConfigured)
        ));
        assert!(matches!(
            resolve_optional_supabase_config(None, Some("  ".to_string()))
                .map(|config| config.is_none()),
            Ok(true)
        ));
    }
}

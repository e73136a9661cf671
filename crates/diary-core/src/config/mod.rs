//! Runtime configuration shared by every client.
//!
//! Values are layered: defaults, then a config file, then environment
//! variables, then explicit overrides from the client.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::util::normalize_text_option;

pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 250;

pub const ENV_SUPABASE_URL: &str = "DIARY_SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "DIARY_SUPABASE_ANON_KEY";
pub const ENV_ADMIN_EMAIL: &str = "DIARY_ADMIN_EMAIL";
pub const ENV_SEARCH_DEBOUNCE_MS: &str = "DIARY_SEARCH_DEBOUNCE_MS";

/// Public, safe-to-ship settings. No secrets belong here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DiaryConfig {
    #[serde(default)]
    pub supabase_url: Option<String>,
    #[serde(default)]
    pub supabase_anon_key: Option<String>,
    /// The single address that gets the administrator panel
    #[serde(default)]
    pub admin_email: String,
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,
}

const fn default_search_debounce_ms() -> u64 {
    DEFAULT_SEARCH_DEBOUNCE_MS
}

impl Default for DiaryConfig {
    fn default() -> Self {
        Self {
            supabase_url: None,
            supabase_anon_key: None,
            admin_email: String::new(),
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
        }
    }
}

impl DiaryConfig {
    pub fn from_json(raw: &str) -> Result<Self, String> {
        let mut config = serde_json::from_str::<Self>(raw)
            .map_err(|error| format!("invalid config JSON: {error}"))?;
        config.normalize();
        Ok(config)
    }

    /// Apply overrides read through `lookup` (normally `std::env::var`).
    #[must_use]
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = normalize_text_option(lookup(ENV_SUPABASE_URL)) {
            self.supabase_url = Some(url);
        }
        if let Some(key) = normalize_text_option(lookup(ENV_SUPABASE_ANON_KEY)) {
            self.supabase_anon_key = Some(key);
        }
        if let Some(email) = normalize_text_option(lookup(ENV_ADMIN_EMAIL)) {
            self.admin_email = email;
        }
        if let Some(raw) = normalize_text_option(lookup(ENV_SEARCH_DEBOUNCE_MS)) {
            match raw.parse::<u64>() {
                Ok(ms) => self.search_debounce_ms = ms,
                Err(error) => {
                    tracing::warn!("Ignoring {}={:?}: {}", ENV_SEARCH_DEBOUNCE_MS, raw, error);
                }
            }
        }
        self
    }

    pub fn with_process_env(self) -> Self {
        self.with_env(|name| std::env::var(name).ok())
    }

    pub const fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn is_backend_configured(&self) -> bool {
        self.supabase_url.is_some() && self.supabase_anon_key.is_some()
    }

    /// Trim text fields. The admin address is trimmed here, once, so that
    /// the exact comparison at sign-in is against a clean value.
    pub fn normalize(&mut self) {
        self.supabase_url = normalize_text_option(self.supabase_url.take());
        self.supabase_anon_key = normalize_text_option(self.supabase_anon_key.take());
        self.admin_email = self.admin_email.trim().to_string();
    }
}

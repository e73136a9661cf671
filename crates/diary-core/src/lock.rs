//! Passphrase lock encoding.
//!
//! A lock is the standard base64 encoding of the owner's passphrase. It is
//! reversible and unsalted, and it travels to every client that can read the
//! note. It only hides note text from a casual glance at the screen; it is not
//! access control.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Encoded passphrase as stored on a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lock(String);

impl Lock {
    pub fn from_passphrase(passphrase: &str) -> Self {
        Self(encode(passphrase))
    }

    /// Wrap a value read back from the store.
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn encoded(&self) -> &str {
        &self.0
    }

    /// Re-encode `candidate` and compare with the stored value.
    pub fn matches(&self, candidate: &str) -> bool {
        encode(candidate) == self.0
    }

    /// Decode the stored passphrase. `None` if the value is not valid base64
    /// of UTF-8 text.
    pub fn reveal(&self) -> Option<String> {
        let bytes = STANDARD.decode(self.0.as_bytes()).ok()?;
        String::from_utf8(bytes).ok()
    }
}

fn encode(passphrase: &str) -> String {
    STANDARD.encode(passphrase.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_matches_plain_base64() {
        assert_eq!(Lock::from_passphrase("secret").encoded(), "c2VjcmV0");
    }

    #[test]
    fn matches_only_original_passphrase() {
        let lock = Lock::from_passphrase("secret");
        assert!(lock.matches("secret"));
        assert!(!lock.matches("wrong"));
        assert!(!lock.matches("Secret"));
        assert!(!lock.matches(""));
    }

    #[test]
    fn encoded_comparison_agrees_with_plaintext_comparison() {
        let passphrases = ["secret", "wrong", "pässwörd", "🔑 key", ""];
        for stored in passphrases {
            let lock = Lock::from_passphrase(stored);
            for candidate in passphrases {
                assert_eq!(lock.matches(candidate), candidate == stored);
            }
        }
    }

    #[test]
    fn encoding_is_reversible() {
        let lock = Lock::from_passphrase("pässwörd");
        assert_eq!(lock.reveal().as_deref(), Some("pässwörd"));
    }

    #[test]
    fn reveal_rejects_garbage() {
        assert_eq!(Lock::from_encoded("not base64!").reveal(), None);
    }
}

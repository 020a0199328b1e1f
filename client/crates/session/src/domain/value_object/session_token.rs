//! Session Token Value Object
//!
//! The opaque bearer string minted by `POST /jwt`. Never printed: `Debug`
//! shows a short SHA-256 fingerprint and the buffer is wiped on drop.

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wrap a raw token; blank input is not a token.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Log-safe identifier of this token
    pub fn fingerprint(&self) -> String {
        platform::crypto::fingerprint(self.0.as_bytes())
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SessionToken")
            .field(&self.fingerprint())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_tokens_are_rejected() {
        assert!(SessionToken::new("").is_none());
        assert!(SessionToken::new("   ").is_none());
        assert_eq!(SessionToken::new(" tok123 ").unwrap().as_str(), "tok123");
    }

    #[test]
    fn debug_never_shows_the_secret() {
        let token = SessionToken::new("tok123").unwrap();
        let rendered = format!("{token:?}");
        assert!(!rendered.contains("tok123"));
        assert!(rendered.contains(&token.fingerprint()));
    }
}

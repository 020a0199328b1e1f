//! Provider Identity Entity
//!
//! What the external identity provider tells us about the person who signed
//! in. Nothing here is trusted by the server until the session exchange has
//! vetted it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::value_object::email::Email;
use crate::error::{AuthError, AuthResult, IdentityError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderIdentity {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

impl ProviderIdentity {
    pub fn new(uid: impl Into<String>, email: Option<String>) -> Self {
        Self {
            uid: uid.into(),
            email,
            display_name: None,
            photo_url: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_photo_url(mut self, url: impl Into<String>) -> Self {
        self.photo_url = Some(url.into());
        self
    }

    /// Email every server lookup is keyed by.
    ///
    /// An identity without an email cannot be exchanged for a session.
    pub fn verified_email(&self) -> AuthResult<Email> {
        let raw = self
            .email
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or(AuthError::Identity(IdentityError::MissingEmail))?;
        Email::new(raw).map_err(|e| AuthError::InvalidEmail(e.message().to_owned()))
    }

    pub fn apply_patch(&mut self, patch: &ProfilePatch) {
        if let Some(name) = &patch.display_name {
            self.display_name = Some(name.clone());
        }
        if let Some(url) = &patch.photo_url {
            self.photo_url = Some(url.clone());
        }
    }
}

/// Profile fields set right after account creation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

impl ProfilePatch {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: Some(display_name.into()),
            photo_url: None,
        }
    }

    pub fn with_photo_url(mut self, url: impl Into<String>) -> Self {
        self.photo_url = Some(url.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.photo_url.is_none()
    }
}

/// Result of a federated popup/redirect flow run by the host.
#[derive(Clone, PartialEq, Eq)]
pub struct FederatedCredential {
    /// e.g. `google.com`
    pub provider_id: String,
    pub id_token: String,
}

impl FederatedCredential {
    pub fn new(provider_id: impl Into<String>, id_token: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            id_token: id_token.into(),
        }
    }
}

impl fmt::Debug for FederatedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FederatedCredential")
            .field("provider_id", &self.provider_id)
            .field("id_token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verified_email_requires_an_address() {
        let identity = ProviderIdentity::new("u1", None);
        assert!(matches!(
            identity.verified_email(),
            Err(AuthError::Identity(IdentityError::MissingEmail))
        ));

        let identity = ProviderIdentity::new("u1", Some("  ".into()));
        assert!(identity.verified_email().is_err());

        let identity = ProviderIdentity::new("u1", Some("A@X.com".into()));
        assert_eq!(identity.verified_email().unwrap().as_str(), "a@x.com");
    }

    #[test]
    fn patch_only_touches_given_fields() {
        let mut identity = ProviderIdentity::new("u1", Some("a@x.com".into()))
            .with_display_name("Ann")
            .with_photo_url("https://img/a.png");
        identity.apply_patch(&ProfilePatch {
            display_name: Some("Ann Lee".into()),
            photo_url: None,
        });
        assert_eq!(identity.display_name.as_deref(), Some("Ann Lee"));
        assert_eq!(identity.photo_url.as_deref(), Some("https://img/a.png"));
    }

    #[test]
    fn credential_debug_is_redacted() {
        let credential = FederatedCredential::new("google.com", "secret-id-token");
        assert!(!format!("{credential:?}").contains("secret-id-token"));
    }
}

use chrono::{DateTime, Utc};

use crate::domain::entity::provider_identity::ProviderIdentity;
use crate::domain::entity::registration::RegistrationDetails;
use crate::domain::value_object::{account_status::AccountStatus, email::Email, role::Role};

/// A provider identity the HR server has confirmed as an active account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationUser {
    pub uid: String,
    pub email: Email,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    /// Role recorded on the account; role routes still ask the server.
    pub role: Option<Role>,
    pub is_verified: bool,
    pub vetted_at: DateTime<Utc>,
}

impl ApplicationUser {
    pub fn vetted(identity: &ProviderIdentity, email: Email, status: &AccountStatus) -> Self {
        Self {
            uid: identity.uid.clone(),
            email,
            display_name: identity.display_name.clone(),
            photo_url: identity.photo_url.clone(),
            role: status.role(),
            is_verified: status.is_verified,
            vetted_at: Utc::now(),
        }
    }

    /// A freshly registered account; HR verifies it later.
    pub fn registered(
        identity: &ProviderIdentity,
        email: Email,
        details: &RegistrationDetails,
    ) -> Self {
        Self {
            uid: identity.uid.clone(),
            email,
            display_name: identity.display_name.clone(),
            photo_url: identity.photo_url.clone(),
            role: Some(details.role),
            is_verified: false,
            vetted_at: Utc::now(),
        }
    }

    pub fn is_same_identity(&self, identity: &ProviderIdentity) -> bool {
        self.uid == identity.uid
    }
}

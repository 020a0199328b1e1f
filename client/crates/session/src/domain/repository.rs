//! Port Traits
//!
//! Interfaces to the identity provider and the HR server. Implementations
//! live in the infrastructure layer.

use crate::domain::entity::{
    provider_identity::{FederatedCredential, ProfilePatch, ProviderIdentity},
    registration::RegistrationDetails,
};
use crate::domain::value_object::{
    account_status::AccountStatus, email::Email, role::Role, session_token::SessionToken,
};
use crate::error::{AuthResult, IdentityResult};

/// External identity provider
#[trait_variant::make(IdentityProvider: Send)]
pub trait LocalIdentityProvider {
    /// Sign in with email and password
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> IdentityResult<ProviderIdentity>;

    /// Sign in with a credential from a federated popup/redirect flow
    async fn sign_in_with_federated(
        &self,
        credential: &FederatedCredential,
    ) -> IdentityResult<ProviderIdentity>;

    /// Create a provider account; the new account is signed in
    async fn create_account(&self, email: &str, password: &str)
    -> IdentityResult<ProviderIdentity>;

    /// Update the signed-in identity's profile
    async fn update_profile(&self, patch: &ProfilePatch) -> IdentityResult<ProviderIdentity>;

    /// End the provider session
    async fn sign_out(&self) -> IdentityResult<()>;

    /// Identity persisted by a previous run, if any
    async fn restore(&self) -> IdentityResult<Option<ProviderIdentity>>;
}

/// HR server account endpoints (unauthenticated)
#[trait_variant::make(AccountRepository: Send)]
pub trait LocalAccountRepository {
    /// `GET /users/check?email=`
    async fn check_account(&self, email: &Email) -> AuthResult<AccountStatus>;

    /// `POST /jwt`
    async fn issue_token(&self, email: &Email) -> AuthResult<SessionToken>;

    /// `POST /users`
    async fn register_user(
        &self,
        identity: &ProviderIdentity,
        email: &Email,
        details: &RegistrationDetails,
    ) -> AuthResult<()>;
}

/// HR server role checks (bearer-authenticated)
#[trait_variant::make(RoleRepository: Send)]
pub trait LocalRoleRepository {
    /// `GET /users/{role}/{email}`
    async fn has_role(&self, role: Role, email: &Email) -> AuthResult<bool>;
}

//! HR API Adapter
//!
//! Implements the account and role ports over the request gateway.

use std::sync::Arc;

use crate::domain::entity::{
    provider_identity::ProviderIdentity, registration::RegistrationDetails,
};
use crate::domain::repository::{AccountRepository, RoleRepository};
use crate::domain::value_object::{
    account_status::AccountStatus, email::Email, role::Role, session_token::SessionToken,
};
use crate::error::{AuthError, AuthResult, SessionCause};
use crate::infra::dto::{
    AccountCheckResponse, NewUserRequest, RoleFlagResponse, TokenRequest, TokenResponse,
};
use crate::infra::gateway::RequestGateway;

#[derive(Clone)]
pub struct HttpSessionApi {
    gateway: Arc<RequestGateway>,
}

impl HttpSessionApi {
    pub fn new(gateway: Arc<RequestGateway>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Arc<RequestGateway> {
        &self.gateway
    }
}

impl AccountRepository for HttpSessionApi {
    async fn check_account(&self, email: &Email) -> AuthResult<AccountStatus> {
        let dto: AccountCheckResponse = self
            .gateway
            .public_get(&["users", "check"], &[("email", email.as_str())])
            .await?;
        Ok(dto.into())
    }

    async fn issue_token(&self, email: &Email) -> AuthResult<SessionToken> {
        let dto: TokenResponse = self
            .gateway
            .public_post(
                &["jwt"],
                &TokenRequest {
                    email: email.as_str(),
                },
            )
            .await?;
        SessionToken::new(dto.token)
            .ok_or_else(|| AuthError::session(SessionCause::Decode("empty token".into())))
    }

    async fn register_user(
        &self,
        identity: &ProviderIdentity,
        email: &Email,
        details: &RegistrationDetails,
    ) -> AuthResult<()> {
        let _: serde_json::Value = self
            .gateway
            .public_post(&["users"], &NewUserRequest::new(identity, email, details))
            .await?;
        Ok(())
    }
}

impl RoleRepository for HttpSessionApi {
    async fn has_role(&self, role: Role, email: &Email) -> AuthResult<bool> {
        let dto: RoleFlagResponse = self
            .gateway
            .secure_get(&["users", role.endpoint_segment(), email.as_str()])
            .await?;
        dto.flag(role).ok_or_else(|| {
            AuthError::session(SessionCause::Decode(format!(
                "missing '{}' in role response",
                role.flag_field()
            )))
        })
    }
}

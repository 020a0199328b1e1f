//! Session Exchange Use Case
//!
//! Turns a provider identity into an application session: check the account,
//! refuse terminated accounts, then mint (or reuse) an access token. Nothing
//! is applied to session state here except the forced logout of a
//! terminated account; the controller commits the outcome.

use std::sync::Arc;

use crate::application::session_state::{InvalidationReason, SessionState};
use crate::domain::entity::{
    application_user::ApplicationUser, provider_identity::ProviderIdentity,
    registration::RegistrationDetails,
};
use crate::domain::repository::AccountRepository;
use crate::domain::value_object::session_token::SessionToken;
use crate::error::{AuthError, AuthResult, DenialReason};

#[derive(Debug)]
pub enum ExchangeOutcome {
    SignedIn {
        user: ApplicationUser,
        token: SessionToken,
    },
    /// Identity is valid but the HR server has no account for it
    RegistrationRequired(ProviderIdentity),
}

pub struct SessionExchange<A>
where
    A: AccountRepository,
{
    accounts: Arc<A>,
    state: Arc<SessionState>,
}

impl<A> SessionExchange<A>
where
    A: AccountRepository,
{
    pub fn new(accounts: Arc<A>, state: Arc<SessionState>) -> Self {
        Self { accounts, state }
    }

    /// Vet `identity` with the server.
    ///
    /// `reuse` is a token kept from an earlier run; when present no new
    /// token is minted, but the account check always runs.
    pub async fn complete_sign_in(
        &self,
        identity: &ProviderIdentity,
        reuse: Option<SessionToken>,
    ) -> AuthResult<ExchangeOutcome> {
        let email = identity.verified_email()?;
        let status = self.accounts.check_account(&email).await?;

        if status.is_terminated() {
            tracing::warn!(email = %email, "Sign-in refused: account terminated");
            self.state
                .force_invalidate(InvalidationReason::AccountTerminated)
                .await;
            return Err(AuthError::AccessDenied {
                reason: DenialReason::Terminated,
            });
        }

        if !status.exists {
            tracing::info!(email = %email, "No account yet, registration required");
            return Ok(ExchangeOutcome::RegistrationRequired(identity.clone()));
        }

        let token = match reuse {
            Some(token) => {
                tracing::debug!(token = %token.fingerprint(), "Reusing stored token");
                token
            }
            None => self.accounts.issue_token(&email).await?,
        };

        Ok(ExchangeOutcome::SignedIn {
            user: ApplicationUser::vetted(identity, email, &status),
            token,
        })
    }

    /// Create the HR account for a first-time identity, then mint its token.
    pub async fn register_new_user(
        &self,
        identity: &ProviderIdentity,
        details: &RegistrationDetails,
    ) -> AuthResult<(ApplicationUser, SessionToken)> {
        details.validate()?;
        let email = identity.verified_email()?;

        self.accounts.register_user(identity, &email, details).await?;
        tracing::info!(email = %email, role = %details.role, "Account registered");

        let token = self.accounts.issue_token(&email).await?;
        Ok((ApplicationUser::registered(identity, email, details), token))
    }
}

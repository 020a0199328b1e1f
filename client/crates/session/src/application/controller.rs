//! Auth Session Controller
//!
//! Owns the session lifecycle: reacts to identity changes, runs the session
//! exchange and commits its outcome. Lifecycle steps run one at a time
//! behind an async mutex so a listener event and an explicit sign-in never
//! interleave.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::application::identity::{IdentityClient, IdentityEvent};
use crate::application::session_exchange::{ExchangeOutcome, SessionExchange};
use crate::application::session_state::{SessionPhase, SessionSnapshot, SessionState};
use crate::domain::entity::{
    application_user::ApplicationUser,
    provider_identity::{FederatedCredential, ProfilePatch, ProviderIdentity},
    registration::RegistrationDetails,
};
use crate::domain::repository::{AccountRepository, IdentityProvider};
use crate::domain::value_object::session_token::SessionToken;
use crate::error::{AuthError, AuthResult, SessionCause};

/// Result of an explicit sign-in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    Authenticated(ApplicationUser),
    /// Show the registration form for this identity
    RegistrationRequired(ProviderIdentity),
}

/// Running identity listener. Dropping it stops the listener.
pub struct SessionListener {
    handle: JoinHandle<()>,
}

impl SessionListener {
    pub fn stop(self) {
        self.handle.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for SessionListener {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub struct AuthSessionController<P, A>
where
    P: IdentityProvider,
    A: AccountRepository,
{
    identity: Arc<IdentityClient<P>>,
    exchange: SessionExchange<A>,
    state: Arc<SessionState>,
    lifecycle: Mutex<()>,
}

impl<P, A> AuthSessionController<P, A>
where
    P: IdentityProvider + Send + Sync + 'static,
    A: AccountRepository + Send + Sync + 'static,
{
    pub fn new(
        identity: Arc<IdentityClient<P>>,
        accounts: Arc<A>,
        state: Arc<SessionState>,
    ) -> Self {
        state.attach_provider(identity.clone());
        Self {
            identity,
            exchange: SessionExchange::new(accounts, state.clone()),
            state,
            lifecycle: Mutex::new(()),
        }
    }

    pub fn identity(&self) -> &IdentityClient<P> {
        &self.identity
    }

    pub fn state(&self) -> &Arc<SessionState> {
        &self.state
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    pub fn current_user(&self) -> Option<ApplicationUser> {
        self.state.current_user()
    }

    /// Restore the provider session, settle the initial state and keep
    /// following identity changes until the returned listener is dropped.
    pub async fn start(self: &Arc<Self>) -> SessionListener {
        let mut events = self.identity.subscribe();

        if let Err(e) = self.identity.restore().await {
            tracing::warn!(error = %e, "Starting without a provider session");
        }

        let initial = events.borrow_and_update().clone();
        if let Err(e) = self.handle_identity_change(initial).await {
            tracing::debug!(error = %e, "Initial session not established");
        }

        let controller = Arc::clone(self);
        let handle = tokio::spawn(async move {
            while events.changed().await.is_ok() {
                let event = events.borrow_and_update().clone();
                if let Err(e) = controller.handle_identity_change(event).await {
                    tracing::debug!(error = %e, "Identity change not applied");
                }
            }
            tracing::debug!("Identity listener stopped");
        });

        SessionListener { handle }
    }

    /// Apply one identity change.
    pub async fn handle_identity_change(
        &self,
        event: IdentityEvent,
    ) -> AuthResult<Option<SignInOutcome>> {
        let _guard = self.lifecycle.lock().await;

        match event {
            IdentityEvent::Pending => Ok(None),
            IdentityEvent::SignedOut => {
                if self.state.sign_out_locally() {
                    tracing::info!("Signed out");
                }
                Ok(None)
            }
            IdentityEvent::SignedIn(identity) => {
                let snap = self.state.snapshot();
                if let Some(user) = snap
                    .user
                    .as_ref()
                    .filter(|u| u.is_same_identity(&identity))
                    .filter(|_| snap.phase == SessionPhase::Authenticated)
                {
                    return Ok(Some(SignInOutcome::Authenticated(user.clone())));
                }
                if snap
                    .pending_registration
                    .as_ref()
                    .is_some_and(|pending| pending.uid == identity.uid)
                {
                    return Ok(Some(SignInOutcome::RegistrationRequired(identity)));
                }

                let reuse = self.state.token();
                self.run_exchange(identity, reuse).await.map(Some)
            }
        }
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> AuthResult<SignInOutcome> {
        let _guard = self.lifecycle.lock().await;
        let identity = self.identity.sign_in_with_password(email, password).await?;
        let outcome = self.run_exchange(identity, None).await;
        self.release_failed_sign_in(&outcome).await;
        outcome
    }

    pub async fn sign_in_with_federated(
        &self,
        credential: &FederatedCredential,
    ) -> AuthResult<SignInOutcome> {
        let _guard = self.lifecycle.lock().await;
        let identity = self.identity.sign_in_with_federated(credential).await?;
        let outcome = self.run_exchange(identity, None).await;
        self.release_failed_sign_in(&outcome).await;
        outcome
    }

    /// Complete a pending registration.
    pub async fn register(
        &self,
        identity: &ProviderIdentity,
        details: &RegistrationDetails,
    ) -> AuthResult<ApplicationUser> {
        let _guard = self.lifecycle.lock().await;
        self.register_locked(identity, details).await
    }

    /// Create a provider account, set its profile and register it with the
    /// HR server in one go.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        profile: &ProfilePatch,
        details: &RegistrationDetails,
    ) -> AuthResult<ApplicationUser> {
        details.validate()?;

        let _guard = self.lifecycle.lock().await;
        self.identity.create_account(email, password).await?;
        let identity = self.identity.update_profile(profile).await?;
        self.register_locked(&identity, details).await
    }

    /// Sign out of the provider and tear the session down.
    pub async fn log_out(&self) -> AuthResult<()> {
        let result = self.identity.sign_out().await;
        self.handle_identity_change(IdentityEvent::SignedOut).await?;
        result.map_err(AuthError::from)
    }

    async fn run_exchange(
        &self,
        identity: ProviderIdentity,
        reuse: Option<SessionToken>,
    ) -> AuthResult<SignInOutcome> {
        let epoch = self.state.begin_authenticating();
        tracing::debug!(uid = %identity.uid, epoch, "Session exchange started");

        match self.exchange.complete_sign_in(&identity, reuse).await {
            Ok(ExchangeOutcome::SignedIn { user, token }) => {
                if self.state.commit(epoch, user.clone(), token) {
                    Ok(SignInOutcome::Authenticated(user))
                } else {
                    Err(AuthError::session(SessionCause::Superseded))
                }
            }
            Ok(ExchangeOutcome::RegistrationRequired(identity)) => {
                self.state.require_registration(epoch, identity.clone());
                Ok(SignInOutcome::RegistrationRequired(identity))
            }
            Err(e @ AuthError::AccessDenied { .. }) => Err(e),
            Err(e) => {
                e.log();
                self.state.abandon(epoch);
                Err(e)
            }
        }
    }

    /// An explicit sign-in that produced no session also ends the provider
    /// session, so the listener does not run the exchange again. The user
    /// retries by signing in again.
    async fn release_failed_sign_in(&self, outcome: &AuthResult<SignInOutcome>) {
        match outcome {
            Ok(_)
            | Err(AuthError::AccessDenied { .. })
            | Err(AuthError::Session {
                cause: SessionCause::Superseded,
            }) => {}
            Err(_) => {
                if let Err(e) = self.identity.sign_out().await {
                    tracing::warn!(error = %e, "Provider sign-out after failed sign-in failed");
                }
            }
        }
    }

    async fn register_locked(
        &self,
        identity: &ProviderIdentity,
        details: &RegistrationDetails,
    ) -> AuthResult<ApplicationUser> {
        let epoch = self.state.begin_authenticating();

        match self.exchange.register_new_user(identity, details).await {
            Ok((user, token)) => {
                if self.state.commit(epoch, user.clone(), token) {
                    Ok(user)
                } else {
                    Err(AuthError::session(SessionCause::Superseded))
                }
            }
            Err(e) => {
                e.log();
                // Keep the form available for another attempt.
                self.state.require_registration(epoch, identity.clone());
                Err(e)
            }
        }
    }
}

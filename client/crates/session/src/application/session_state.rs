//! Session State
//!
//! The single shared record of who is signed in. The controller, the request
//! gateway, the role resolver and the route guards all hold the same
//! `Arc<SessionState>`; every transition is an atomic check-and-set on a
//! `watch` channel so observers always see a consistent snapshot.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};

use derive_more::Display;
use tokio::sync::watch;

use crate::application::config::SessionConfig;
use crate::application::identity::IdentityClient;
use crate::application::token_store::TokenStore;
use crate::domain::entity::{
    application_user::ApplicationUser, provider_identity::ProviderIdentity,
};
use crate::domain::navigation::{Location, Navigator};
use crate::domain::repository::IdentityProvider;
use crate::domain::value_object::{email::Email, session_token::SessionToken};
use crate::error::IdentityResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SessionPhase {
    /// Nothing known yet (app start)
    Unknown,
    /// A session exchange is in flight
    Authenticating,
    Authenticated,
    Unauthenticated,
}

impl SessionPhase {
    /// Guards must wait rather than decide while this is true.
    pub fn is_resolving(&self) -> bool {
        matches!(self, SessionPhase::Unknown | SessionPhase::Authenticating)
    }
}

/// Why the session was revoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum InvalidationReason {
    #[display("account terminated")]
    AccountTerminated,
    #[display("server rejected the session ({_0})")]
    ServerRejected(u16),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub user: Option<ApplicationUser>,
    /// Bumped on every new exchange and every teardown
    pub epoch: u64,
    /// Signed-in identity the server does not know yet
    pub pending_registration: Option<ProviderIdentity>,
    pub last_invalidation: Option<InvalidationReason>,
}

impl SessionSnapshot {
    fn initial() -> Self {
        Self {
            phase: SessionPhase::Unknown,
            user: None,
            epoch: 0,
            pending_registration: None,
            last_invalidation: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.phase == SessionPhase::Authenticated && self.user.is_some()
    }

    pub fn email(&self) -> Option<&Email> {
        self.user.as_ref().map(|u| &u.email)
    }

    fn reset(&mut self) {
        self.phase = SessionPhase::Unauthenticated;
        self.user = None;
        self.pending_registration = None;
        self.epoch += 1;
    }
}

pub type SignOutFuture<'a> = Pin<Box<dyn Future<Output = IdentityResult<()>> + Send + 'a>>;

/// Type-erased handle used to end the provider session on forced logout.
pub trait ProviderSignOut: Send + Sync {
    fn sign_out(&self) -> SignOutFuture<'_>;
}

impl<P> ProviderSignOut for IdentityClient<P>
where
    P: IdentityProvider + Send + Sync,
{
    fn sign_out(&self) -> SignOutFuture<'_> {
        Box::pin(IdentityClient::sign_out(self))
    }
}

pub struct SessionState {
    tokens: TokenStore,
    snapshot: watch::Sender<SessionSnapshot>,
    navigator: Arc<dyn Navigator>,
    login_path: String,
    provider: OnceLock<Arc<dyn ProviderSignOut>>,
}

impl SessionState {
    pub fn new(tokens: TokenStore, navigator: Arc<dyn Navigator>, config: &SessionConfig) -> Self {
        let (snapshot, _) = watch::channel(SessionSnapshot::initial());
        Self {
            tokens,
            snapshot,
            navigator,
            login_path: config.login_path.clone(),
            provider: OnceLock::new(),
        }
    }

    /// Register the provider that forced logouts sign out of. First call wins.
    pub fn attach_provider(&self, provider: Arc<dyn ProviderSignOut>) {
        if self.provider.set(provider).is_err() {
            tracing::debug!("Provider sign-out handle already attached");
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn epoch(&self) -> u64 {
        self.snapshot.borrow().epoch
    }

    pub fn token(&self) -> Option<SessionToken> {
        self.tokens.get()
    }

    pub fn current_user(&self) -> Option<ApplicationUser> {
        self.snapshot.borrow().user.clone()
    }

    /// Enter `Authenticating`; returns the epoch the exchange must commit in.
    pub(crate) fn begin_authenticating(&self) -> u64 {
        let mut epoch = 0;
        self.snapshot.send_modify(|snap| {
            snap.phase = SessionPhase::Authenticating;
            snap.pending_registration = None;
            snap.epoch += 1;
            epoch = snap.epoch;
        });
        epoch
    }

    /// Apply a successful exchange. User and token land together, or not
    /// at all when the session moved on since `epoch` began.
    pub(crate) fn commit(&self, epoch: u64, user: ApplicationUser, token: SessionToken) -> bool {
        let tokens = &self.tokens;
        let committed = self.snapshot.send_if_modified(|snap| {
            if snap.epoch != epoch || snap.phase != SessionPhase::Authenticating {
                return false;
            }
            tracing::info!(
                uid = %user.uid,
                email = %user.email,
                token = %token.fingerprint(),
                "Session established"
            );
            tokens.stage(Some(token));
            snap.user = Some(user);
            snap.phase = SessionPhase::Authenticated;
            snap.last_invalidation = None;
            true
        });
        self.flush_if(committed)
    }

    /// The server does not know this identity; wait for registration.
    pub(crate) fn require_registration(&self, epoch: u64, identity: ProviderIdentity) -> bool {
        let tokens = &self.tokens;
        let applied = self.snapshot.send_if_modified(|snap| {
            if snap.epoch != epoch {
                return false;
            }
            tokens.stage(None);
            snap.phase = SessionPhase::Unauthenticated;
            snap.user = None;
            snap.pending_registration = Some(identity);
            true
        });
        self.flush_if(applied)
    }

    /// A failed exchange leaves the user fully signed out. No redirect.
    pub(crate) fn abandon(&self, epoch: u64) -> bool {
        let tokens = &self.tokens;
        let applied = self.snapshot.send_if_modified(|snap| {
            if snap.epoch != epoch {
                return false;
            }
            tokens.stage(None);
            snap.reset();
            true
        });
        self.flush_if(applied)
    }

    /// The provider reported sign-out.
    pub(crate) fn sign_out_locally(&self) -> bool {
        let tokens = &self.tokens;
        let applied = self.snapshot.send_if_modified(|snap| {
            let had_token = tokens.stage(None);
            if !had_token
                && snap.user.is_none()
                && snap.pending_registration.is_none()
                && snap.phase == SessionPhase::Unauthenticated
            {
                return false;
            }
            snap.reset();
            true
        });
        self.flush_if(applied)
    }

    /// Revoke the session: clear user and token, sign out of the provider
    /// and send the user to login.
    ///
    /// Acts only when there is something to revoke (a user, a token or an
    /// exchange in flight), so concurrent callers produce one redirect.
    /// Returns whether this call did the revoking.
    pub async fn force_invalidate(&self, reason: InvalidationReason) -> bool {
        if !self.invalidate_locally(reason) {
            tracing::debug!(%reason, "Session already invalidated");
            return false;
        }

        tracing::warn!(%reason, "Session invalidated");
        self.navigator.navigate(&Location::new(self.login_path.clone()));

        if let Some(provider) = self.provider.get() {
            if let Err(e) = provider.sign_out().await {
                tracing::warn!(error = %e, "Provider sign-out after invalidation failed");
            }
        }
        true
    }

    fn invalidate_locally(&self, reason: InvalidationReason) -> bool {
        let tokens = &self.tokens;
        let applied = self.snapshot.send_if_modified(|snap| {
            let had_token = tokens.stage(None);
            let active = snap.user.is_some()
                || snap.pending_registration.is_some()
                || snap.phase == SessionPhase::Authenticating;
            if !had_token && !active {
                return false;
            }
            snap.reset();
            snap.last_invalidation = Some(reason);
            true
        });
        self.flush_if(applied)
    }

    /// Durable writes happen after the snapshot lock is released.
    fn flush_if(&self, applied: bool) -> bool {
        if applied {
            self.tokens.flush();
        }
        applied
    }
}

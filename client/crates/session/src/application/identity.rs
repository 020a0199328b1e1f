//! Identity Client
//!
//! Wraps an [`IdentityProvider`] and publishes every identity change on a
//! `watch` channel so the session controller can react to sign-ins and
//! sign-outs no matter where they came from.

use tokio::sync::watch;

use crate::domain::entity::provider_identity::{
    FederatedCredential, ProfilePatch, ProviderIdentity,
};
use crate::domain::repository::IdentityProvider;
use crate::error::{IdentityError, IdentityResult};

/// Identity state as seen by subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityEvent {
    /// Provider state not known yet (before `restore`)
    Pending,
    SignedIn(ProviderIdentity),
    SignedOut,
}

impl IdentityEvent {
    pub fn identity(&self) -> Option<&ProviderIdentity> {
        match self {
            IdentityEvent::SignedIn(identity) => Some(identity),
            _ => None,
        }
    }
}

pub struct IdentityClient<P> {
    provider: P,
    events: watch::Sender<IdentityEvent>,
}

impl<P: IdentityProvider> IdentityClient<P> {
    pub fn new(provider: P) -> Self {
        let (events, _) = watch::channel(IdentityEvent::Pending);
        Self { provider, events }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn current(&self) -> IdentityEvent {
        self.events.borrow().clone()
    }

    /// Subscribe to identity changes. The current value is marked unseen.
    pub fn subscribe(&self) -> watch::Receiver<IdentityEvent> {
        let mut rx = self.events.subscribe();
        rx.mark_changed();
        rx
    }

    /// Pick up a provider session persisted by a previous run.
    pub async fn restore(&self) -> IdentityResult<Option<ProviderIdentity>> {
        match self.provider.restore().await {
            Ok(Some(identity)) => {
                tracing::info!(uid = %identity.uid, "Restored provider session");
                self.publish(IdentityEvent::SignedIn(identity.clone()));
                Ok(Some(identity))
            }
            Ok(None) => {
                self.publish(IdentityEvent::SignedOut);
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to restore provider session");
                self.publish(IdentityEvent::SignedOut);
                Err(e)
            }
        }
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> IdentityResult<ProviderIdentity> {
        let identity = self
            .provider
            .sign_in_with_password(email, password)
            .await
            .inspect_err(|e| tracing::debug!(error = %e, "Password sign-in failed"))?;
        self.publish(IdentityEvent::SignedIn(identity.clone()));
        Ok(identity)
    }

    pub async fn sign_in_with_federated(
        &self,
        credential: &FederatedCredential,
    ) -> IdentityResult<ProviderIdentity> {
        let identity = self
            .provider
            .sign_in_with_federated(credential)
            .await
            .inspect_err(|e| {
                tracing::debug!(error = %e, provider = %credential.provider_id, "Federated sign-in failed")
            })?;
        self.publish(IdentityEvent::SignedIn(identity.clone()));
        Ok(identity)
    }

    /// Create a provider account. The provider signs the new account in.
    pub async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> IdentityResult<ProviderIdentity> {
        let identity = self.provider.create_account(email, password).await?;
        tracing::info!(uid = %identity.uid, "Provider account created");
        self.publish(IdentityEvent::SignedIn(identity.clone()));
        Ok(identity)
    }

    /// Profile updates replace the current identity without notifying.
    pub async fn update_profile(&self, patch: &ProfilePatch) -> IdentityResult<ProviderIdentity> {
        if patch.is_empty() {
            return self
                .current()
                .identity()
                .cloned()
                .ok_or(IdentityError::NotSignedIn);
        }

        let identity = self.provider.update_profile(patch).await?;
        self.events.send_if_modified(|event| {
            *event = IdentityEvent::SignedIn(identity.clone());
            false
        });
        Ok(identity)
    }

    /// End the provider session. Subscribers always see `SignedOut`, even
    /// when the provider call fails.
    pub async fn sign_out(&self) -> IdentityResult<()> {
        let result = self.provider.sign_out().await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Provider sign-out failed");
        }
        self.publish(IdentityEvent::SignedOut);
        result
    }

    fn publish(&self, event: IdentityEvent) {
        self.events.send_replace(event);
    }
}

//! In-Memory Identity Provider
//!
//! A provider that keeps accounts in process memory. Used for offline
//! development and in tests; supports one-shot failure injection.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::entity::provider_identity::{
    FederatedCredential, ProfilePatch, ProviderIdentity,
};
use crate::domain::repository::IdentityProvider;
use crate::error::{IdentityError, IdentityResult};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Default)]
struct Inner {
    /// email -> (password, identity)
    accounts: HashMap<String, (String, ProviderIdentity)>,
    /// id token -> identity
    federated: HashMap<String, ProviderIdentity>,
    current: Option<ProviderIdentity>,
    /// What `restore` returns
    persisted: Option<ProviderIdentity>,
    fail_next: Option<IdentityError>,
    next_uid: u64,
    sign_out_calls: usize,
}

impl Inner {
    fn take_failure(&mut self) -> IdentityResult<()> {
        match self.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn sign_in(&mut self, identity: ProviderIdentity) -> ProviderIdentity {
        self.current = Some(identity.clone());
        self.persisted = Some(identity.clone());
        identity
    }

    fn new_uid(&mut self) -> String {
        self.next_uid += 1;
        format!("mem-{:04}", self.next_uid)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryIdentityProvider {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a password account.
    pub fn with_account(self, email: &str, password: &str, display_name: &str) -> Self {
        {
            let mut inner = self.lock();
            let uid = inner.new_uid();
            let identity = ProviderIdentity::new(uid, Some(email.to_owned()))
                .with_display_name(display_name);
            inner.accounts.insert(
                email.trim().to_lowercase(),
                (password.to_owned(), identity),
            );
        }
        self
    }

    /// Accept `id_token` as a federated credential for `identity`.
    pub fn with_federated(self, id_token: &str, identity: ProviderIdentity) -> Self {
        self.lock().federated.insert(id_token.to_owned(), identity);
        self
    }

    /// Pretend a previous run left `identity` signed in.
    pub fn with_persisted_session(self, identity: ProviderIdentity) -> Self {
        self.lock().persisted = Some(identity);
        self
    }

    /// Identity of the password account registered for `email`
    pub fn account(&self, email: &str) -> Option<ProviderIdentity> {
        self.lock()
            .accounts
            .get(&email.trim().to_lowercase())
            .map(|(_, identity)| identity.clone())
    }

    /// Make the next provider call fail with `err`.
    pub fn fail_next(&self, err: IdentityError) {
        self.lock().fail_next = Some(err);
    }

    pub fn current(&self) -> Option<ProviderIdentity> {
        self.lock().current.clone()
    }

    pub fn sign_out_calls(&self) -> usize {
        self.lock().sign_out_calls
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl IdentityProvider for InMemoryIdentityProvider {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> IdentityResult<ProviderIdentity> {
        let mut inner = self.lock();
        inner.take_failure()?;
        let identity = match inner.accounts.get(&email.trim().to_lowercase()) {
            Some((stored, identity)) if stored == password => identity.clone(),
            _ => return Err(IdentityError::InvalidCredentials),
        };
        Ok(inner.sign_in(identity))
    }

    async fn sign_in_with_federated(
        &self,
        credential: &FederatedCredential,
    ) -> IdentityResult<ProviderIdentity> {
        let mut inner = self.lock();
        inner.take_failure()?;
        let identity = inner
            .federated
            .get(&credential.id_token)
            .cloned()
            .ok_or_else(|| IdentityError::Provider("INVALID_IDP_RESPONSE".into()))?;
        Ok(inner.sign_in(identity))
    }

    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> IdentityResult<ProviderIdentity> {
        let mut inner = self.lock();
        inner.take_failure()?;

        let key = email.trim().to_lowercase();
        if inner.accounts.contains_key(&key) {
            return Err(IdentityError::EmailInUse);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(IdentityError::WeakPassword);
        }

        let uid = inner.new_uid();
        let identity = ProviderIdentity::new(uid, Some(email.trim().to_owned()));
        inner
            .accounts
            .insert(key, (password.to_owned(), identity.clone()));
        Ok(inner.sign_in(identity))
    }

    async fn update_profile(&self, patch: &ProfilePatch) -> IdentityResult<ProviderIdentity> {
        let mut inner = self.lock();
        inner.take_failure()?;

        let mut identity = inner.current.clone().ok_or(IdentityError::NotSignedIn)?;
        identity.apply_patch(patch);

        if let Some(email) = identity.email.as_deref() {
            let key = email.to_lowercase();
            if let Some((_, stored)) = inner.accounts.get_mut(&key) {
                *stored = identity.clone();
            }
        }
        Ok(inner.sign_in(identity))
    }

    async fn sign_out(&self) -> IdentityResult<()> {
        let mut inner = self.lock();
        inner.sign_out_calls += 1;
        inner.take_failure()?;
        inner.current = None;
        inner.persisted = None;
        Ok(())
    }

    async fn restore(&self) -> IdentityResult<Option<ProviderIdentity>> {
        let mut inner = self.lock();
        inner.take_failure()?;
        inner.current = inner.persisted.clone();
        Ok(inner.current.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn password_accounts() {
        let provider = InMemoryIdentityProvider::new().with_account("a@x.com", "secret1", "Ann");
        assert_eq!(
            provider.sign_in_with_password("a@x.com", "nope").await,
            Err(IdentityError::InvalidCredentials)
        );
        let identity = provider.sign_in_with_password("A@x.com", "secret1").await.unwrap();
        assert_eq!(identity.display_name.as_deref(), Some("Ann"));
        assert_eq!(provider.current(), Some(identity));
    }

    #[tokio::test]
    async fn create_account_rules() {
        let provider = InMemoryIdentityProvider::new().with_account("a@x.com", "secret1", "Ann");
        assert_eq!(
            provider.create_account("a@x.com", "secret2").await,
            Err(IdentityError::EmailInUse)
        );
        assert_eq!(
            provider.create_account("b@x.com", "123").await,
            Err(IdentityError::WeakPassword)
        );
        let identity = provider.create_account("b@x.com", "secret2").await.unwrap();
        assert_eq!(provider.current(), Some(identity));
    }

    #[tokio::test]
    async fn injected_failure_is_one_shot() {
        let provider = InMemoryIdentityProvider::new().with_account("a@x.com", "secret1", "Ann");
        provider.fail_next(IdentityError::PopupClosed);
        assert_eq!(
            provider.sign_in_with_password("a@x.com", "secret1").await,
            Err(IdentityError::PopupClosed)
        );
        assert!(provider.sign_in_with_password("a@x.com", "secret1").await.is_ok());
    }

    #[tokio::test]
    async fn sign_out_clears_persisted_session() {
        let provider = InMemoryIdentityProvider::new().with_account("a@x.com", "secret1", "Ann");
        provider.sign_in_with_password("a@x.com", "secret1").await.unwrap();
        provider.sign_out().await.unwrap();
        assert_eq!(provider.sign_out_calls(), 1);
        assert_eq!(provider.restore().await.unwrap(), None);
    }
}

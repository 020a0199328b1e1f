//! Session Wiring
//!
//! Builds the shared session components over one durable store, one
//! navigator and one identity provider.

use std::sync::Arc;

use platform::storage::KeyValueStore;

use crate::application::config::SessionConfig;
use crate::application::controller::AuthSessionController;
use crate::application::identity::IdentityClient;
use crate::application::role_resolver::RoleResolver;
use crate::application::session_state::SessionState;
use crate::application::token_store::TokenStore;
use crate::domain::navigation::Navigator;
use crate::domain::repository::IdentityProvider;
use crate::error::AuthResult;
use crate::infra::{gateway::RequestGateway, http_api::HttpSessionApi};
use crate::presentation::route_guard::RouteGuard;

pub struct SessionApp<P>
where
    P: IdentityProvider,
{
    pub state: Arc<SessionState>,
    pub gateway: Arc<RequestGateway>,
    pub controller: Arc<AuthSessionController<P, HttpSessionApi>>,
    pub roles: Arc<RoleResolver<HttpSessionApi>>,
    pub guard: RouteGuard<HttpSessionApi>,
}

impl<P> SessionApp<P>
where
    P: IdentityProvider + Send + Sync + 'static,
{
    pub fn build(
        config: &SessionConfig,
        provider: P,
        storage: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
    ) -> AuthResult<Self> {
        let tokens = TokenStore::load(storage, config.token_storage_key.clone());
        let state = Arc::new(SessionState::new(tokens, navigator.clone(), config));

        let gateway = Arc::new(RequestGateway::new(config, state.clone())?);
        let api = Arc::new(HttpSessionApi::new(gateway.clone()));

        let identity = Arc::new(IdentityClient::new(provider));
        let controller = Arc::new(AuthSessionController::new(
            identity,
            api.clone(),
            state.clone(),
        ));

        let roles = Arc::new(RoleResolver::new(
            api,
            state.clone(),
            config.role_cache_ttl,
        ));
        let guard = RouteGuard::new(state.clone(), roles.clone(), navigator, config);

        tracing::debug!(api = %config.api_base_url, "Session components ready");

        Ok(Self {
            state,
            gateway,
            controller,
            roles,
            guard,
        })
    }
}

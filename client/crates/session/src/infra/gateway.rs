//! Request Gateway
//!
//! The one HTTP client every call to the HR API goes through. Secure
//! requests carry the bearer token and have their 401/403 answers turned
//! into a forced logout; public requests (account check, token mint,
//! registration) bypass both.

use std::sync::Arc;

use http::{Method, StatusCode, header::AUTHORIZATION};
use kernel::error::app_error::AppError;
use platform::client::{bearer_header, build_client, is_auth_rejection};
use reqwest::{RequestBuilder, Response, Url};
use serde::{Serialize, de::DeserializeOwned};

use crate::application::config::SessionConfig;
use crate::application::session_state::{InvalidationReason, SessionState};
use crate::error::{AuthError, AuthResult, SessionCause};

pub struct RequestGateway {
    client: reqwest::Client,
    base_url: Url,
    state: Arc<SessionState>,
}

impl RequestGateway {
    pub fn new(config: &SessionConfig, state: Arc<SessionState>) -> AuthResult<Self> {
        let client = build_client(&config.http_client_config())
            .map_err(|e| AuthError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
            state,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `base_url` joined with percent-encoded path segments
    pub fn endpoint(&self, segments: &[&str]) -> AuthResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AuthError::Config(format!("'{}' cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Request with the bearer token attached (when one is held).
    pub fn secure(&self, method: Method, url: Url) -> AuthResult<RequestBuilder> {
        let mut request = self.client.request(method, url);
        if let Some(token) = self.state.token() {
            let value = bearer_header(token.as_str())
                .map_err(|_| AuthError::Internal("token is not a valid header value".into()))?;
            request = request.header(AUTHORIZATION, value);
        }
        Ok(request)
    }

    /// Request without auth interception
    pub fn public(&self, method: Method, url: Url) -> RequestBuilder {
        self.client.request(method, url)
    }

    /// Send a secure request. A 401/403 revokes the session before the
    /// caller sees the error.
    pub async fn send_secure(&self, request: RequestBuilder) -> AuthResult<Response> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if is_auth_rejection(status) {
            tracing::warn!(%status, url = %response.url(), "Protected request rejected");
            self.state
                .force_invalidate(InvalidationReason::ServerRejected(status.as_u16()))
                .await;
            return Err(AuthError::Authorization { status });
        }
        Ok(response)
    }

    pub async fn send_public(&self, request: RequestBuilder) -> AuthResult<Response> {
        request.send().await.map_err(transport_error)
    }

    pub async fn secure_get<T: DeserializeOwned>(&self, segments: &[&str]) -> AuthResult<T> {
        let request = self.secure(Method::GET, self.endpoint(segments)?)?;
        decode(self.send_secure(request).await?).await
    }

    pub async fn secure_post<B, T>(&self, segments: &[&str], body: &B) -> AuthResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.secure(Method::POST, self.endpoint(segments)?)?.json(body);
        decode(self.send_secure(request).await?).await
    }

    pub async fn public_get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> AuthResult<T> {
        let request = self.public(Method::GET, self.endpoint(segments)?).query(query);
        decode(self.send_public(request).await?).await
    }

    pub async fn public_post<B, T>(&self, segments: &[&str], body: &B) -> AuthResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.public(Method::POST, self.endpoint(segments)?).json(body);
        decode(self.send_public(request).await?).await
    }
}

fn transport_error(err: reqwest::Error) -> AuthError {
    let app = AppError::from(err);
    tracing::debug!(error = %app, "HTTP transport failure");
    AuthError::session(SessionCause::Transport(app.message().to_owned()))
}

async fn decode<T: DeserializeOwned>(response: Response) -> AuthResult<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(AuthError::session(SessionCause::Status(status.as_u16())));
    }
    if status == StatusCode::NO_CONTENT {
        return serde_json::from_str("null")
            .map_err(|e| AuthError::session(SessionCause::Decode(e.to_string())));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| AuthError::session(SessionCause::Decode(e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::token_store::TokenStore;
    use crate::presentation::navigation::RecordingNavigator;
    use platform::storage::MemoryStore;

    fn gateway(base: &str) -> RequestGateway {
        let config = SessionConfig::new(base).unwrap();
        let state = Arc::new(SessionState::new(
            TokenStore::load(Arc::new(MemoryStore::new()), "access-token"),
            Arc::new(RecordingNavigator::new()),
            &config,
        ));
        RequestGateway::new(&config, state).unwrap()
    }

    #[test]
    fn endpoint_keeps_base_path_and_encodes_segments() {
        let gateway = gateway("http://localhost:5000/api");
        let url = gateway.endpoint(&["users", "employee", "a@x.com"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/users/employee/a@x.com");

        let url = gateway.endpoint(&["users", "hr", "a b/c@x.com"]).unwrap();
        assert_eq!(url.path(), "/api/users/hr/a%20b%2Fc@x.com");
    }

    #[test]
    fn secure_request_without_token_has_no_authorization() {
        let gateway = gateway("http://localhost:5000/");
        let request = gateway
            .secure(Method::GET, gateway.endpoint(&["protected"]).unwrap())
            .unwrap()
            .build()
            .unwrap();
        assert!(request.headers().get(AUTHORIZATION).is_none());
    }
}

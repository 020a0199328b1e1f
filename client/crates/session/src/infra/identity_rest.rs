//! REST Identity Provider
//!
//! Talks to an Identity Toolkit compatible REST API
//! (`accounts:signInWithPassword`, `accounts:signUp`, `accounts:update`,
//! `accounts:signInWithIdp`). The provider session is kept in durable
//! storage so `restore` works across runs.

use std::sync::{Arc, PoisonError, RwLock};

use platform::client::{HttpClientConfig, build_client};
use platform::storage::KeyValueStore;
use reqwest::Url;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::application::config::IdentityConfig;
use crate::domain::entity::provider_identity::{
    FederatedCredential, ProfilePatch, ProviderIdentity,
};
use crate::domain::repository::IdentityProvider;
use crate::error::{AuthError, AuthResult, IdentityError, IdentityResult};

#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    #[zeroize(skip)]
    identity: ProviderIdentity,
    id_token: String,
    refresh_token: Option<String>,
}

pub struct RestIdentityProvider {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
    storage: Arc<dyn KeyValueStore>,
    storage_key: String,
    session: RwLock<Option<StoredSession>>,
}

impl RestIdentityProvider {
    pub fn new(
        config: &IdentityConfig,
        http: &HttpClientConfig,
        storage: Arc<dyn KeyValueStore>,
        storage_key: impl Into<String>,
    ) -> AuthResult<Self> {
        let client = build_client(http)
            .map_err(|e| AuthError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            storage,
            storage_key: storage_key.into(),
            session: RwLock::new(None),
        })
    }

    fn method_url(&self, method: &str) -> IdentityResult<Url> {
        let mut url = self
            .endpoint
            .join(&format!("v1/accounts:{method}"))
            .map_err(|e| IdentityError::Provider(format!("bad endpoint: {e}")))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> IdentityResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.method_url(method)?)
            .json(body)
            .send()
            .await
            .map_err(|e| IdentityError::Network(e.to_string()))?;

        if response.status().is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| IdentityError::Provider(format!("malformed response: {e}")));
        }

        let status = response.status();
        let message = response
            .json::<ErrorEnvelope>()
            .await
            .map(|envelope| envelope.error.message)
            .unwrap_or_else(|_| status.to_string());
        tracing::debug!(%status, method, message = %message, "Identity provider refused request");
        Err(map_provider_error(&message))
    }

    fn establish(&self, account: AccountResponse) -> ProviderIdentity {
        let identity = account.identity();
        match account.id_token.clone() {
            Some(id_token) => {
                let session = StoredSession {
                    identity: identity.clone(),
                    id_token,
                    refresh_token: account.refresh_token.clone(),
                };
                self.persist(Some(&session));
                *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
            }
            None => {
                // `accounts:update` may omit tokens; keep the ones we have.
                let mut guard = self.session.write().unwrap_or_else(PoisonError::into_inner);
                if let Some(session) = guard.as_mut() {
                    session.identity = identity.clone();
                    self.persist(Some(&*session));
                }
            }
        }
        identity
    }

    fn persist(&self, session: Option<&StoredSession>) {
        let result = match session {
            Some(session) => serde_json::to_string(session)
                .map_err(platform::storage::StorageError::from)
                .and_then(|json| self.storage.set(&self.storage_key, &json)),
            None => self.storage.remove(&self.storage_key),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to persist provider session");
        }
    }

    fn current_id_token(&self) -> Option<String> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.id_token.clone())
    }
}

impl IdentityProvider for RestIdentityProvider {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> IdentityResult<ProviderIdentity> {
        let account: AccountResponse = self
            .call(
                "signInWithPassword",
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;
        Ok(self.establish(account))
    }

    async fn sign_in_with_federated(
        &self,
        credential: &FederatedCredential,
    ) -> IdentityResult<ProviderIdentity> {
        let post_body = format!(
            "id_token={}&providerId={}",
            credential.id_token, credential.provider_id
        );
        let account: AccountResponse = self
            .call(
                "signInWithIdp",
                &IdpRequest {
                    post_body: &post_body,
                    request_uri: "http://localhost",
                    return_idp_credential: true,
                    return_secure_token: true,
                },
            )
            .await?;
        Ok(self.establish(account))
    }

    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> IdentityResult<ProviderIdentity> {
        let account: AccountResponse = self
            .call(
                "signUp",
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;
        Ok(self.establish(account))
    }

    async fn update_profile(&self, patch: &ProfilePatch) -> IdentityResult<ProviderIdentity> {
        let id_token = self.current_id_token().ok_or(IdentityError::NotSignedIn)?;
        let account: AccountResponse = self
            .call(
                "update",
                &UpdateRequest {
                    id_token: &id_token,
                    display_name: patch.display_name.as_deref(),
                    photo_url: patch.photo_url.as_deref(),
                    return_secure_token: true,
                },
            )
            .await?;
        Ok(self.establish(account))
    }

    async fn sign_out(&self) -> IdentityResult<()> {
        self.session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.persist(None);
        Ok(())
    }

    async fn restore(&self) -> IdentityResult<Option<ProviderIdentity>> {
        if let Some(session) = self
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(Some(session.identity.clone()));
        }

        let stored = match self.storage.get(&self.storage_key) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read provider session");
                return Ok(None);
            }
        };
        let Some(json) = stored else {
            return Ok(None);
        };

        match serde_json::from_str::<StoredSession>(&json) {
            Ok(session) => {
                let identity = session.identity.clone();
                *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
                Ok(Some(identity))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable provider session");
                self.persist(None);
                Ok(None)
            }
        }
    }
}

/// Map an Identity Toolkit error message (`CODE` or `CODE : detail`).
fn map_provider_error(message: &str) -> IdentityError {
    let code = message
        .split(|c: char| c == ':' || c.is_whitespace())
        .next()
        .unwrap_or_default();
    match code {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "INVALID_EMAIL" => {
            IdentityError::InvalidCredentials
        }
        "EMAIL_EXISTS" => IdentityError::EmailInUse,
        "WEAK_PASSWORD" => IdentityError::WeakPassword,
        "USER_DISABLED" => IdentityError::UserDisabled,
        "TOO_MANY_ATTEMPTS_TRY_LATER" => IdentityError::TooManyAttempts,
        "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "USER_NOT_FOUND" | "CREDENTIAL_TOO_OLD_LOGIN_AGAIN" => {
            IdentityError::NotSignedIn
        }
        "" => IdentityError::Provider("unknown error".into()),
        other => IdentityError::Provider(other.to_owned()),
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpRequest<'a> {
    post_body: &'a str,
    request_uri: &'a str,
    return_idp_credential: bool,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    id_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    photo_url: Option<&'a str>,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    profile_picture: Option<String>,
    id_token: Option<String>,
    refresh_token: Option<String>,
}

impl AccountResponse {
    fn identity(&self) -> ProviderIdentity {
        ProviderIdentity {
            uid: self.local_id.clone(),
            email: self.email.clone().filter(|e| !e.is_empty()),
            display_name: self.display_name.clone().filter(|n| !n.is_empty()),
            photo_url: self
                .photo_url
                .clone()
                .or_else(|| self.profile_picture.clone())
                .filter(|p| !p.is_empty()),
        }
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, extract::Path, http::StatusCode, routing::post};
    use platform::storage::MemoryStore;
    use serde_json::{Value, json};

    async fn identity_api(Path(action): Path<String>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        let account = |email: &str| {
            json!({
                "localId": "uid-ann",
                "email": email,
                "displayName": "Ann",
                "idToken": "id-token-1",
                "refreshToken": "refresh-1"
            })
        };
        let error = |message: &str| {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": { "code": 400, "message": message } })),
            )
        };

        match action.as_str() {
            "accounts:signInWithPassword" => {
                if body["password"] == "secret1" {
                    (StatusCode::OK, Json(account(body["email"].as_str().unwrap_or_default())))
                } else {
                    error("INVALID_LOGIN_CREDENTIALS")
                }
            }
            "accounts:signUp" => error("WEAK_PASSWORD : Password should be at least 6 characters"),
            "accounts:update" => {
                assert_eq!(body["idToken"], "id-token-1");
                (
                    StatusCode::OK,
                    Json(json!({
                        "localId": "uid-ann",
                        "email": "a@x.com",
                        "displayName": body["displayName"],
                    })),
                )
            }
            _ => error("OPERATION_NOT_ALLOWED"),
        }
    }

    async fn spawn_identity_api() -> String {
        let app = Router::new().route("/v1/{action}", post(identity_api));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/")
    }

    fn provider(endpoint: &str, storage: Arc<dyn KeyValueStore>) -> RestIdentityProvider {
        let config = IdentityConfig::new(endpoint, "test-key").unwrap();
        RestIdentityProvider::new(&config, &HttpClientConfig::default(), storage, "identity-session")
            .unwrap()
    }

    #[test]
    fn maps_provider_error_codes() {
        assert_eq!(map_provider_error("EMAIL_EXISTS"), IdentityError::EmailInUse);
        assert_eq!(
            map_provider_error("WEAK_PASSWORD : Password should be at least 6 characters"),
            IdentityError::WeakPassword
        );
        assert_eq!(
            map_provider_error("TOO_MANY_ATTEMPTS_TRY_LATER : Access disabled"),
            IdentityError::TooManyAttempts
        );
        assert_eq!(
            map_provider_error("INVALID_LOGIN_CREDENTIALS"),
            IdentityError::InvalidCredentials
        );
        assert_eq!(
            map_provider_error("QUOTA_EXCEEDED"),
            IdentityError::Provider("QUOTA_EXCEEDED".into())
        );
    }

    #[tokio::test]
    async fn sign_in_update_and_restore() {
        let endpoint = spawn_identity_api().await;
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());

        let rest = provider(&endpoint, storage.clone());
        let identity = rest.sign_in_with_password("a@x.com", "secret1").await.unwrap();
        assert_eq!(identity.uid, "uid-ann");
        assert_eq!(identity.email.as_deref(), Some("a@x.com"));

        let updated = rest
            .update_profile(&ProfilePatch::new("Ann Lee"))
            .await
            .unwrap();
        assert_eq!(updated.display_name.as_deref(), Some("Ann Lee"));

        // A fresh provider over the same storage picks the session up.
        let reloaded = provider(&endpoint, storage.clone());
        assert_eq!(reloaded.restore().await.unwrap(), Some(updated));

        reloaded.sign_out().await.unwrap();
        assert!(storage.get("identity-session").unwrap().is_none());
        assert_eq!(provider(&endpoint, storage).restore().await.unwrap(), None);
    }

    #[tokio::test]
    async fn provider_errors_are_mapped() {
        let endpoint = spawn_identity_api().await;
        let rest = provider(&endpoint, Arc::new(MemoryStore::new()));

        assert_eq!(
            rest.sign_in_with_password("a@x.com", "wrong").await,
            Err(IdentityError::InvalidCredentials)
        );
        assert_eq!(
            rest.create_account("b@x.com", "123").await,
            Err(IdentityError::WeakPassword)
        );
        assert_eq!(
            rest.update_profile(&ProfilePatch::new("x")).await,
            Err(IdentityError::NotSignedIn)
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_network_error() {
        let rest = provider("http://127.0.0.1:9/", Arc::new(MemoryStore::new()));
        assert!(matches!(
            rest.sign_in_with_password("a@x.com", "secret1").await,
            Err(IdentityError::Network(_))
        ));
    }
}

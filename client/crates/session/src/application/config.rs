//! Application Configuration
//!
//! Configuration for the session core and the identity provider.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use platform::client::HttpClientConfig;
use platform::storage::{FileStore, KeyValueStore, MemoryStore};
use reqwest::Url;

use crate::error::{AuthError, AuthResult};

/// Session core configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base URL of the HR API (always ends with `/`)
    pub api_base_url: Url,
    /// Login entry point
    pub login_path: String,
    /// Home entry point
    pub home_path: String,
    /// Durable key of the access token
    pub token_storage_key: String,
    /// Durable key of the persisted provider session
    pub identity_storage_key: String,
    /// File backing the durable store; in-memory when unset
    pub storage_path: Option<PathBuf>,
    /// Whole-request timeout for HR API calls
    pub request_timeout: Duration,
    /// Connect timeout for HR API calls
    pub connect_timeout: Duration,
    /// Upper bound a route guard waits for identity and role to settle
    pub resolve_timeout: Duration,
    /// How long a resolved role answer is reused (5 minutes)
    pub role_cache_ttl: Duration,
    /// User-Agent sent with every request
    pub user_agent: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let http = HttpClientConfig::default();
        Self {
            api_base_url: default_api_base_url(),
            login_path: "/login".to_string(),
            home_path: "/".to_string(),
            token_storage_key: "access-token".to_string(),
            identity_storage_key: "identity-session".to_string(),
            storage_path: None,
            request_timeout: http.timeout,
            connect_timeout: http.connect_timeout,
            resolve_timeout: Duration::from_secs(20),
            role_cache_ttl: Duration::from_secs(5 * 60),
            user_agent: http.user_agent,
        }
    }
}

fn default_api_base_url() -> Url {
    Url::parse("http://localhost:5000/").unwrap_or_else(|_| unreachable!("static URL is valid"))
}

impl SessionConfig {
    /// Config pointing at a specific HR API
    pub fn new(api_base_url: &str) -> AuthResult<Self> {
        Ok(Self {
            api_base_url: parse_base_url(api_base_url)?,
            ..Default::default()
        })
    }

    /// Config for development (local API, short timeouts, no role caching)
    pub fn development() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            resolve_timeout: Duration::from_secs(5),
            role_cache_ttl: Duration::ZERO,
            ..Default::default()
        }
    }

    /// Load from the environment (and `.env` if present)
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `HR_API_BASE_URL` | `api_base_url` |
    /// | `HR_LOGIN_PATH` | `login_path` |
    /// | `HR_HOME_PATH` | `home_path` |
    /// | `HR_STORAGE_PATH` | `storage_path` |
    /// | `HR_REQUEST_TIMEOUT_SECS` | `request_timeout` |
    /// | `HR_RESOLVE_TIMEOUT_SECS` | `resolve_timeout` |
    /// | `HR_ROLE_CACHE_TTL_SECS` | `role_cache_ttl` |
    pub fn from_env() -> AuthResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AuthResult<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup("HR_API_BASE_URL") {
            config.api_base_url = parse_base_url(&url)?;
        }
        if let Some(path) = lookup("HR_LOGIN_PATH") {
            config.login_path = parse_route_path("HR_LOGIN_PATH", path)?;
        }
        if let Some(path) = lookup("HR_HOME_PATH") {
            config.home_path = parse_route_path("HR_HOME_PATH", path)?;
        }
        if let Some(path) = lookup("HR_STORAGE_PATH").filter(|p| !p.trim().is_empty()) {
            config.storage_path = Some(PathBuf::from(path));
        }
        if let Some(secs) = lookup("HR_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = parse_secs("HR_REQUEST_TIMEOUT_SECS", &secs)?;
        }
        if let Some(secs) = lookup("HR_RESOLVE_TIMEOUT_SECS") {
            config.resolve_timeout = parse_secs("HR_RESOLVE_TIMEOUT_SECS", &secs)?;
        }
        if let Some(secs) = lookup("HR_ROLE_CACHE_TTL_SECS") {
            config.role_cache_ttl = parse_secs("HR_ROLE_CACHE_TTL_SECS", &secs)?;
        }

        Ok(config)
    }

    /// Settings for the shared HTTP client
    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout: self.request_timeout,
            connect_timeout: self.connect_timeout,
            user_agent: self.user_agent.clone(),
        }
    }

    /// Open the durable store this config points at
    pub fn open_storage(&self) -> AuthResult<Arc<dyn KeyValueStore>> {
        match &self.storage_path {
            Some(path) => Ok(Arc::new(FileStore::open(path)?)),
            None => Ok(Arc::new(MemoryStore::new())),
        }
    }
}

/// Identity provider configuration
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Identity Toolkit compatible endpoint
    pub endpoint: Url,
    /// Public API key of the project
    pub api_key: String,
}

impl IdentityConfig {
    pub fn new(endpoint: &str, api_key: impl Into<String>) -> AuthResult<Self> {
        Ok(Self {
            endpoint: parse_base_url(endpoint)?,
            api_key: api_key.into(),
        })
    }

    /// `HR_IDENTITY_API_KEY` is required, `HR_IDENTITY_ENDPOINT` is optional.
    pub fn from_env() -> AuthResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AuthResult<Self> {
        let api_key = lookup("HR_IDENTITY_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AuthError::Config("HR_IDENTITY_API_KEY is not set".into()))?;
        let endpoint = lookup("HR_IDENTITY_ENDPOINT")
            .unwrap_or_else(|| "https://identitytoolkit.googleapis.com/".to_string());
        Self::new(&endpoint, api_key)
    }
}

fn parse_base_url(raw: &str) -> AuthResult<Url> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| AuthError::Config(format!("invalid base URL '{raw}': {e}")))?;
    if url.cannot_be_a_base() {
        return Err(AuthError::Config(format!("'{raw}' cannot be a base URL")));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn parse_route_path(key: &str, path: String) -> AuthResult<String> {
    if !path.starts_with('/') {
        return Err(AuthError::Config(format!("{key} must start with '/'")));
    }
    Ok(path)
}

fn parse_secs(key: &str, raw: &str) -> AuthResult<Duration> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| AuthError::Config(format!("{key} must be a whole number of seconds")))
}

//! HTTP client utilities
//!
//! Construction of the shared `reqwest` client and the helpers every
//! caller needs to speak bearer-token auth.

use http::header::InvalidHeaderValue;
use http::{HeaderValue, StatusCode};
use std::time::Duration;

/// Settings for the shared HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Whole-request timeout
    pub timeout: Duration,
    /// TCP/TLS connect timeout
    pub connect_timeout: Duration,
    /// Value of the User-Agent header
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(5),
            user_agent: concat!("hr-portal-session/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Build the client used for every request
///
/// Both timeouts are always set so a dead server surfaces as an error
/// instead of a request that never finishes.
pub fn build_client(config: &HttpClientConfig) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .user_agent(config.user_agent.clone())
        .build()
}

/// `Authorization: Bearer <token>` value, flagged sensitive
///
/// Sensitive header values are masked by `Debug` output of the
/// request, so the token does not leak through logging.
pub fn bearer_header(token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {token}"))?;
    value.set_sensitive(true);
    Ok(value)
}

/// 401 and 403 mean the server has withdrawn the session
#[inline]
pub fn is_auth_rejection(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

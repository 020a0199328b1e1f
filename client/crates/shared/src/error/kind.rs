//! Error Kind - Classification of errors
//!
//! Defines the [`ErrorKind`] enum. Each kind corresponds to the HTTP status
//! the server would answer with, so errors raised locally and errors reported
//! by the API share one vocabulary.

use serde::Serialize;

/// Error classification
///
/// Variants follow RFC 9110 status semantics. Only the statuses the session
/// client actually distinguishes are listed.
///
/// ## Examples
/// ```rust
/// use kernel::error::kind::ErrorKind;
///
/// let kind = ErrorKind::Forbidden;
/// assert_eq!(kind.status_code(), 403);
/// assert!(kind.is_client_error());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorKind {
    /// 400 - Request was malformed or failed validation
    BadRequest,
    /// 401 - Credentials missing or no longer accepted
    Unauthorized,
    /// 403 - Authenticated but not allowed
    Forbidden,
    /// 404 - Resource does not exist
    NotFound,
    /// 408 - Request did not complete in time
    RequestTimeout,
    /// 409 - Conflicts with current state
    Conflict,
    /// 422 - Understood but cannot be processed
    UnprocessableEntity,
    /// 429 - Rate limited
    TooManyRequests,
    /// 500 - Unexpected failure
    InternalServerError,
    /// 503 - Remote side unreachable or unavailable
    ServiceUnavailable,
}

impl ErrorKind {
    /// HTTP status code for this kind
    #[inline]
    pub const fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::RequestTimeout => 408,
            ErrorKind::Conflict => 409,
            ErrorKind::UnprocessableEntity => 422,
            ErrorKind::TooManyRequests => 429,
            ErrorKind::InternalServerError => 500,
            ErrorKind::ServiceUnavailable => 503,
        }
    }

    /// Standard reason phrase
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "Bad Request",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::NotFound => "Not Found",
            ErrorKind::RequestTimeout => "Request Timeout",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::UnprocessableEntity => "Unprocessable Entity",
            ErrorKind::TooManyRequests => "Too Many Requests",
            ErrorKind::InternalServerError => "Internal Server Error",
            ErrorKind::ServiceUnavailable => "Service Unavailable",
        }
    }

    /// Classify a response status.
    ///
    /// Unlisted 4xx codes collapse to `BadRequest`, unlisted 5xx codes to
    /// `InternalServerError`. Anything below 400 is not an error.
    pub const fn from_status(status: u16) -> Option<Self> {
        match status {
            400 => Some(ErrorKind::BadRequest),
            401 => Some(ErrorKind::Unauthorized),
            403 => Some(ErrorKind::Forbidden),
            404 => Some(ErrorKind::NotFound),
            408 => Some(ErrorKind::RequestTimeout),
            409 => Some(ErrorKind::Conflict),
            422 => Some(ErrorKind::UnprocessableEntity),
            429 => Some(ErrorKind::TooManyRequests),
            502..=504 => Some(ErrorKind::ServiceUnavailable),
            400..=499 => Some(ErrorKind::BadRequest),
            500..=599 => Some(ErrorKind::InternalServerError),
            _ => None,
        }
    }

    /// 5xx kinds; worth logging at error level.
    #[inline]
    pub const fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }

    /// 4xx kinds.
    #[inline]
    pub const fn is_client_error(&self) -> bool {
        let code = self.status_code();
        code >= 400 && code < 500
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ErrorKind::BadRequest.status_code(), 400);
        assert_eq!(ErrorKind::Unauthorized.status_code(), 401);
        assert_eq!(ErrorKind::Forbidden.status_code(), 403);
        assert_eq!(ErrorKind::NotFound.status_code(), 404);
        assert_eq!(ErrorKind::RequestTimeout.status_code(), 408);
        assert_eq!(ErrorKind::Conflict.status_code(), 409);
        assert_eq!(ErrorKind::UnprocessableEntity.status_code(), 422);
        assert_eq!(ErrorKind::TooManyRequests.status_code(), 429);
        assert_eq!(ErrorKind::InternalServerError.status_code(), 500);
        assert_eq!(ErrorKind::ServiceUnavailable.status_code(), 503);
    }

    #[test]
    fn test_from_status() {
        assert_eq!(ErrorKind::from_status(200), None);
        assert_eq!(ErrorKind::from_status(302), None);
        assert_eq!(ErrorKind::from_status(401), Some(ErrorKind::Unauthorized));
        assert_eq!(ErrorKind::from_status(403), Some(ErrorKind::Forbidden));
        assert_eq!(ErrorKind::from_status(418), Some(ErrorKind::BadRequest));
        assert_eq!(ErrorKind::from_status(502), Some(ErrorKind::ServiceUnavailable));
        assert_eq!(ErrorKind::from_status(507), Some(ErrorKind::InternalServerError));
    }

    #[test]
    fn test_server_and_client_errors() {
        assert!(!ErrorKind::BadRequest.is_server_error());
        assert!(ErrorKind::InternalServerError.is_server_error());
        assert!(ErrorKind::ServiceUnavailable.is_server_error());
        assert!(ErrorKind::NotFound.is_client_error());
        assert!(!ErrorKind::InternalServerError.is_client_error());
    }
}

//! Session Error Types
//!
//! Session-specific error variants that integrate with the unified
//! `kernel::error::AppError` system used for user-facing notifications.

use derive_more::Display;
use http::StatusCode;
use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::storage::StorageError;
use thiserror::Error;

use crate::domain::value_object::role::Role;

/// Session-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

/// Identity provider result type alias
pub type IdentityResult<T> = Result<T, IdentityError>;

/// Failures reported by the identity provider.
///
/// These never change session state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("An account already exists for this email")]
    EmailInUse,

    #[error("Password is too weak")]
    WeakPassword,

    #[error("This account has been disabled by the identity provider")]
    UserDisabled,

    #[error("Sign-in window was closed before completing")]
    PopupClosed,

    #[error("Too many attempts, try again later")]
    TooManyAttempts,

    #[error("No identity is signed in")]
    NotSignedIn,

    #[error("The identity has no email address")]
    MissingEmail,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Identity provider error: {0}")]
    Provider(String),
}

impl IdentityError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IdentityError::InvalidCredentials | IdentityError::NotSignedIn => {
                ErrorKind::Unauthorized
            }
            IdentityError::EmailInUse => ErrorKind::Conflict,
            IdentityError::WeakPassword | IdentityError::PopupClosed => ErrorKind::BadRequest,
            IdentityError::UserDisabled => ErrorKind::Forbidden,
            IdentityError::TooManyAttempts => ErrorKind::TooManyRequests,
            IdentityError::MissingEmail => ErrorKind::UnprocessableEntity,
            IdentityError::Network(_) => ErrorKind::ServiceUnavailable,
            IdentityError::Provider(_) => ErrorKind::InternalServerError,
        }
    }
}

/// Why an account was refused outright
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DenialReason {
    #[display("terminated")]
    Terminated,
}

/// What went wrong while talking to the HR server
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum SessionCause {
    #[display("{_0}")]
    Transport(String),
    #[display("unexpected status {_0}")]
    Status(u16),
    #[display("malformed response: {_0}")]
    Decode(String),
    #[display("superseded by a newer session change")]
    Superseded,
}

/// Session-specific error variants
#[derive(Debug, Error)]
pub enum AuthError {
    /// Provider-side failure (bad password, popup closed, ...)
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// The HR server refused the account
    #[error("Access denied: account {reason}")]
    AccessDenied { reason: DenialReason },

    /// Account check, token mint or registration failed
    #[error("Session exchange failed: {cause}")]
    Session { cause: SessionCause },

    /// A protected request was answered with 401/403
    #[error("Request rejected by the server ({status})")]
    Authorization { status: StatusCode },

    /// A role check failed
    #[error("{role} role check failed: {cause}")]
    RoleQuery { role: Role, cause: SessionCause },

    #[error("Invalid registration: {0}")]
    Registration(String),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn session(cause: SessionCause) -> Self {
        AuthError::Session { cause }
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Identity(e) => e.kind(),
            AuthError::AccessDenied { .. } => ErrorKind::Forbidden,
            AuthError::Session {
                cause: SessionCause::Superseded,
            } => ErrorKind::Conflict,
            AuthError::Session { .. } | AuthError::RoleQuery { .. } => {
                ErrorKind::ServiceUnavailable
            }
            AuthError::Authorization { status } => {
                ErrorKind::from_status(status.as_u16()).unwrap_or(ErrorKind::Unauthorized)
            }
            AuthError::Registration(_) | AuthError::InvalidEmail(_) => ErrorKind::BadRequest,
            AuthError::Storage(_) | AuthError::Config(_) | AuthError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    /// Whether trying the same thing again may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            AuthError::Session { cause } | AuthError::RoleQuery { cause, .. } => {
                !matches!(cause, SessionCause::Decode(_))
            }
            AuthError::Identity(IdentityError::Network(_)) => true,
            _ => false,
        }
    }

    /// Convert to AppError with a user-facing message and follow-up action
    pub fn to_app_error(&self) -> AppError {
        let kind = self.kind();
        match self {
            AuthError::Identity(e) => AppError::new(kind, e.to_string()),
            AuthError::AccessDenied { .. } => {
                AppError::new(kind, "Your account has been terminated")
                    .with_action("Please contact support")
            }
            AuthError::Session { .. } => AppError::new(kind, "Sign-in could not be completed")
                .with_action("Please try signing in again"),
            AuthError::Authorization { .. } => AppError::new(kind, "Your session has ended")
                .with_action("Please sign in again"),
            AuthError::RoleQuery { .. } => {
                AppError::new(kind, "Your permissions could not be confirmed")
                    .with_action("Please reload the page")
            }
            AuthError::Registration(msg) | AuthError::InvalidEmail(msg) => {
                AppError::new(kind, msg.clone())
            }
            AuthError::Storage(_) | AuthError::Config(_) | AuthError::Internal(_) => {
                AppError::internal("Something went wrong")
            }
        }
    }

    /// Log the error with appropriate level
    pub(crate) fn log(&self) {
        match self {
            AuthError::Storage(e) => {
                tracing::error!(error = %e, "Session storage error");
            }
            AuthError::Internal(msg) | AuthError::Config(msg) => {
                tracing::error!(message = %msg, "Session internal error");
            }
            AuthError::AccessDenied { reason } => {
                tracing::warn!(%reason, "Account refused by server");
            }
            AuthError::Session { cause } => {
                tracing::warn!(%cause, "Session exchange failed");
            }
            AuthError::RoleQuery { role, cause } => {
                tracing::warn!(%role, %cause, "Role check failed");
            }
            _ => {
                tracing::debug!(error = %self, "Session error");
            }
        }
    }
}

impl From<AppError> for AuthError {
    fn from(err: AppError) -> Self {
        match err.kind() {
            ErrorKind::BadRequest => AuthError::InvalidEmail(err.message().to_owned()),
            _ => AuthError::Internal(err.to_string()),
        }
    }
}

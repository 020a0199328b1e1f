//! User Notifications
//!
//! Maps session errors to the dismissible messages the UI shows.

use kernel::error::app_error::AppError;

use crate::error::{AuthError, IdentityError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub action: Option<String>,
    pub dismissible: bool,
}

impl Notification {
    fn from_app_error(severity: Severity, title: &str, app: &AppError) -> Self {
        Self {
            severity,
            title: title.to_owned(),
            message: app.message().to_owned(),
            action: app.action().map(str::to_owned),
            dismissible: true,
        }
    }
}

/// Notification for `err`, or `None` when the error is handled elsewhere
/// (forced logouts already redirect to login).
pub fn notification_for(err: &AuthError) -> Option<Notification> {
    let app = err.to_app_error();
    let notification = match err {
        AuthError::Authorization { .. } => return None,
        AuthError::Identity(IdentityError::PopupClosed) => {
            Notification::from_app_error(Severity::Info, "Sign-in cancelled", &app)
        }
        AuthError::Identity(_) => {
            Notification::from_app_error(Severity::Warning, "Sign-in failed", &app)
        }
        AuthError::AccessDenied { .. } => Notification {
            dismissible: false,
            ..Notification::from_app_error(Severity::Error, "Access denied", &app)
        },
        AuthError::Session { .. } => {
            Notification::from_app_error(Severity::Error, "Sign-in failed", &app)
        }
        AuthError::RoleQuery { .. } => {
            Notification::from_app_error(Severity::Warning, "Permissions unavailable", &app)
        }
        AuthError::Registration(_) | AuthError::InvalidEmail(_) => {
            Notification::from_app_error(Severity::Warning, "Check your details", &app)
        }
        AuthError::Storage(_) | AuthError::Config(_) | AuthError::Internal(_) => {
            Notification::from_app_error(Severity::Error, "Something went wrong", &app)
        }
    };
    Some(notification)
}

//! HR Portal Session Core
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, port traits
//! - `application/` - Session lifecycle, token store, role resolution
//! - `infra/` - HR API gateway (reqwest), identity provider adapters
//! - `presentation/` - Route guards, navigation, notifications
//!
//! ## Features
//! - Sign-in via an external identity provider (password or federated)
//! - Identity exchanged for an HR API access token (`POST /jwt`)
//! - Bearer token on every protected request
//! - Server-side role checks (admin / HR / employee)
//! - Immediate logout on 401/403 or a terminated account
//! - Role-based route guards
//!
//! ## Security Model
//! - Tokens are never logged; only a SHA-256 fingerprint is
//! - Token buffers are zeroized on drop
//! - A terminated account is refused on every sign-in, including restores

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;


// Re-exports for convenience
pub use application::config::{IdentityConfig, SessionConfig};
pub use application::controller::{AuthSessionController, SessionListener, SignInOutcome};
pub use application::identity::{IdentityClient, IdentityEvent};
pub use application::role_resolver::{RoleClassification, RoleQuery, RoleResolver};
pub use application::session_state::{
    InvalidationReason, SessionPhase, SessionSnapshot, SessionState,
};
pub use application::token_store::TokenStore;
pub use error::{AuthError, AuthResult, IdentityError};
pub use infra::{HttpSessionApi, InMemoryIdentityProvider, RequestGateway, RestIdentityProvider};
pub use presentation::app::SessionApp;
pub use presentation::notification::{Notification, notification_for};
pub use presentation::route_guard::{GuardDecision, RouteGuard, RouteKind};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

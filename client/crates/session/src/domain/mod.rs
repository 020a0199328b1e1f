//! Domain Layer
//!
//! Entities, value objects, navigation vocabulary and the port traits the
//! application layer depends on.

pub mod entity;
pub mod navigation;
pub mod repository;
pub mod value_object;

// Re-exports
pub use entity::{
    application_user::ApplicationUser,
    provider_identity::{FederatedCredential, ProfilePatch, ProviderIdentity},
    registration::RegistrationDetails,
};
pub use navigation::{Location, Navigator};
pub use repository::{AccountRepository, IdentityProvider, RoleRepository};
